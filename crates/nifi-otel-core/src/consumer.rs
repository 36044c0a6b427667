//! Downstream trace consumer trait
//!
//! Whatever receives translated batches (an OTLP collector, a file, a log)
//! implements [`TraceConsumer`]. The receiver owns one consumer and calls it
//! once per translated batch.

use crate::batch::TraceBatch;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Consumer error type
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Batch rejected by downstream: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Consumer not initialized")]
    NotInitialized,
}

pub type ConsumerResult<T> = Result<T, ConsumerError>;

/// Receives translated trace batches
#[async_trait]
pub trait TraceConsumer: Send + Sync {
    /// Consumer name, used in logs
    fn name(&self) -> &str;

    /// Hand one batch downstream
    async fn consume(&self, batch: TraceBatch) -> ConsumerResult<()>;

    /// Flush anything buffered
    async fn flush(&self) -> ConsumerResult<()> {
        Ok(())
    }
}

/// Consumer that only logs what it receives
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingConsumer;

#[async_trait]
impl TraceConsumer for LoggingConsumer {
    fn name(&self) -> &str {
        "logging"
    }

    async fn consume(&self, batch: TraceBatch) -> ConsumerResult<()> {
        info!(
            spans = batch.span_count(),
            services = ?batch.services(),
            "Received trace batch"
        );
        Ok(())
    }
}
