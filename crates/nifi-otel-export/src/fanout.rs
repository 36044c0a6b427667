//! Fan-out to several consumers

use async_trait::async_trait;
use nifi_otel_core::consumer::{ConsumerResult, TraceConsumer};
use nifi_otel_core::TraceBatch;
use std::sync::Arc;
use tracing::warn;

/// Forwards every batch to each inner consumer in order
///
/// Stops at the first failure; consumers after it do not see the batch.
pub struct FanoutConsumer {
    consumers: Vec<Arc<dyn TraceConsumer>>,
}

impl FanoutConsumer {
    pub fn new(consumers: Vec<Arc<dyn TraceConsumer>>) -> Self {
        Self { consumers }
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}

#[async_trait]
impl TraceConsumer for FanoutConsumer {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn consume(&self, batch: TraceBatch) -> ConsumerResult<()> {
        for consumer in &self.consumers {
            if let Err(e) = consumer.consume(batch.clone()).await {
                warn!(consumer = consumer.name(), error = %e, "Consumer failed");
                return Err(e);
            }
        }
        Ok(())
    }

    async fn flush(&self) -> ConsumerResult<()> {
        for consumer in &self.consumers {
            consumer.flush().await?;
        }
        Ok(())
    }
}
