//! Downstream trace consumers for the NiFi OpenTelemetry receiver

pub mod fanout;

#[cfg(feature = "jsonl")]
pub mod jsonl;

#[cfg(feature = "otlp")]
pub mod otlp;

pub use fanout::FanoutConsumer;

#[cfg(feature = "jsonl")]
pub use jsonl::JsonlTraceExporter;

#[cfg(feature = "otlp")]
pub use otlp::OtlpTraceExporter;

use nifi_otel_core::config::ExportConfig;
use nifi_otel_core::consumer::{ConsumerResult, LoggingConsumer, TraceConsumer};
use std::sync::Arc;
use tracing::info;

/// Build the consumer described by the export section
///
/// Falls back to [`LoggingConsumer`] when nothing is enabled. Must be called
/// from within a Tokio runtime when OTLP export is on.
pub fn build_consumer(config: &ExportConfig) -> ConsumerResult<Arc<dyn TraceConsumer>> {
    let mut consumers: Vec<Arc<dyn TraceConsumer>> = Vec::new();

    if config.otlp.enabled {
        consumers.push(otlp_consumer(config)?);
    }
    if config.jsonl.enabled {
        consumers.push(jsonl_consumer(config)?);
    }

    match consumers.len() {
        0 => {
            info!("No exporters enabled, logging trace batches only");
            Ok(Arc::new(LoggingConsumer))
        }
        1 => Ok(consumers.remove(0)),
        _ => Ok(Arc::new(FanoutConsumer::new(consumers))),
    }
}

#[cfg(feature = "otlp")]
fn otlp_consumer(config: &ExportConfig) -> ConsumerResult<Arc<dyn TraceConsumer>> {
    Ok(Arc::new(OtlpTraceExporter::new(&config.otlp)?))
}

#[cfg(not(feature = "otlp"))]
fn otlp_consumer(_config: &ExportConfig) -> ConsumerResult<Arc<dyn TraceConsumer>> {
    Err(nifi_otel_core::ConsumerError::NotInitialized)
}

#[cfg(feature = "jsonl")]
fn jsonl_consumer(config: &ExportConfig) -> ConsumerResult<Arc<dyn TraceConsumer>> {
    Ok(Arc::new(JsonlTraceExporter::open(&config.jsonl)?))
}

#[cfg(not(feature = "jsonl"))]
fn jsonl_consumer(_config: &ExportConfig) -> ConsumerResult<Arc<dyn TraceConsumer>> {
    Err(nifi_otel_core::ConsumerError::NotInitialized)
}
