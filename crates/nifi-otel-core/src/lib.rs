//! NiFi OTel Core - Event model, lineage tracking, and trace translation
//!
//! This crate turns Apache NiFi provenance and bulletin reports into
//! OpenTelemetry spans:
//!
//! - **Events**: wire model for provenance and bulletin batches
//! - **Ids**: deterministic UUID to trace/span id derivation
//! - **Carrier**: W3C trace context lookup over flow-file attributes
//! - **Lineage**: TTL-bounded fork/join ancestry
//! - **Translator**: the stateful batch translator
//! - **Consumer**: trait for whatever receives translated batches

pub mod batch;
pub mod carrier;
pub mod clock;
pub mod config;
pub mod consumer;
pub mod error;
pub mod events;
pub mod ids;
pub mod lineage;
pub mod metrics;
pub mod translator;

// Re-export commonly used types
pub use batch::TraceBatch;
pub use carrier::{extract_span_context, ContextAliases, ContextCarrier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ConfigLoader, ConfigResult, ReceiverConfig};
pub use consumer::{ConsumerError, ConsumerResult, LoggingConsumer, TraceConsumer};
pub use error::{TranslateError, TranslateResult};
pub use events::{BulletinEvent, ProvenanceEvent, ProvenanceEventType};
pub use lineage::{LineageEntry, LineageTracker};
pub use metrics::{BatchKind, ReceiverMetrics, SharedMetrics};
pub use translator::{EventTranslator, TranslatorSettings};

/// Receiver version
pub const RECEIVER_VERSION: &str = env!("CARGO_PKG_VERSION");
