//! OpenTelemetry Protocol (OTLP) trace exporter
//!
//! Sends translated batches to a collector over gRPC. Spans are already in
//! OTLP form, so the generated `TraceServiceClient` is used directly rather
//! than going through an SDK pipeline.

use async_trait::async_trait;
use nifi_otel_core::config::OtlpExportConfig;
use nifi_otel_core::consumer::{ConsumerError, ConsumerResult, TraceConsumer};
use nifi_otel_core::TraceBatch;
use opentelemetry_proto::tonic::collector::trace::v1::trace_service_client::TraceServiceClient;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tonic::codec::CompressionEncoding;
use tonic::metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue};
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::{debug, info, warn};

/// OTLP/gRPC trace exporter
pub struct OtlpTraceExporter {
    endpoint: String,
    client: TraceServiceClient<Channel>,
    metadata: MetadataMap,
    spans_exported: AtomicU64,
    errors: AtomicU64,
}

impl OtlpTraceExporter {
    /// Build the exporter on a lazily connected channel
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &OtlpExportConfig) -> ConsumerResult<Self> {
        // no TLS stack is linked, an https endpoint would get cleartext h2
        if !config.endpoint.starts_with("http://") {
            return Err(ConsumerError::Transport(format!(
                "OTLP endpoint must be an http:// URL: {}",
                config.endpoint
            )));
        }

        let channel = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| {
                ConsumerError::Transport(format!(
                    "Invalid OTLP endpoint {}: {}",
                    config.endpoint, e
                ))
            })?
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_lazy();

        let mut client = TraceServiceClient::new(channel);
        if config.compression {
            client = client.send_compressed(CompressionEncoding::Gzip);
        }

        let mut metadata = MetadataMap::new();
        for (key, value) in &config.headers {
            match (
                key.parse::<MetadataKey<Ascii>>(),
                value.parse::<MetadataValue<Ascii>>(),
            ) {
                (Ok(key), Ok(value)) => {
                    metadata.insert(key, value);
                }
                _ => warn!(header = %key, "Skipping invalid OTLP header"),
            }
        }

        info!(
            endpoint = %config.endpoint,
            compression = config.compression,
            headers = metadata.len(),
            "OTLP trace exporter configured"
        );

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
            metadata,
            spans_exported: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn status_to_error(status: Status) -> ConsumerError {
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => {
            ConsumerError::Transport(status.to_string())
        }
        _ => ConsumerError::Rejected(status.to_string()),
    }
}

#[async_trait]
impl TraceConsumer for OtlpTraceExporter {
    fn name(&self) -> &str {
        "otlp"
    }

    async fn consume(&self, batch: TraceBatch) -> ConsumerResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let spans = batch.span_count();
        let mut request = tonic::Request::new(batch.into_request());
        *request.metadata_mut() = self.metadata.clone();

        let mut client = self.client.clone();
        let response = match client.export(request).await {
            Ok(response) => response.into_inner(),
            Err(status) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                return Err(status_to_error(status));
            }
        };

        if let Some(partial) = response.partial_success {
            if partial.rejected_spans > 0 {
                warn!(
                    rejected = partial.rejected_spans,
                    message = %partial.error_message,
                    "Collector rejected part of the batch"
                );
            }
        }

        self.spans_exported.fetch_add(spans as u64, Ordering::Relaxed);
        debug!(spans, endpoint = %self.endpoint, "Exported trace batch");
        Ok(())
    }

    async fn flush(&self) -> ConsumerResult<()> {
        info!(
            endpoint = %self.endpoint,
            spans_exported = self.spans_exported.load(Ordering::Relaxed),
            errors = self.errors.load(Ordering::Relaxed),
            "OTLP exporter totals"
        );
        Ok(())
    }
}
