//! Translated trace container
//!
//! A thin wrapper over OTLP `ResourceSpans`, one per service bucket, each
//! holding a single scope.

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{
    any_value, AnyValue, InstrumentationScope, KeyValue,
};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span};
use opentelemetry_semantic_conventions as semconv;
use std::collections::BTreeMap;

/// Instrumentation scope name attached to every batch
pub const SCOPE_NAME: &str = "nifi.provenance.receiver";

/// Version reported on the instrumentation scope
pub fn scope_version() -> &'static str {
    option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
}

/// Spans grouped by service, ready for a downstream consumer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceBatch {
    resource_spans: Vec<ResourceSpans>,
    skipped: usize,
}

impl TraceBatch {
    /// Build a batch from service buckets; buckets are emitted in key order
    pub fn from_buckets(buckets: BTreeMap<String, Vec<Span>>, skipped: usize) -> Self {
        let resource_spans = buckets
            .into_iter()
            .map(|(service, spans)| ResourceSpans {
                resource: Some(Resource {
                    attributes: vec![string_kv(semconv::resource::SERVICE_NAME, service)],
                    ..Default::default()
                }),
                scope_spans: vec![ScopeSpans {
                    scope: Some(InstrumentationScope {
                        name: SCOPE_NAME.to_string(),
                        version: scope_version().to_string(),
                        ..Default::default()
                    }),
                    spans,
                    ..Default::default()
                }],
                schema_url: semconv::SCHEMA_URL.to_string(),
            })
            .collect();

        Self {
            resource_spans,
            skipped,
        }
    }

    pub fn resource_spans(&self) -> &[ResourceSpans] {
        &self.resource_spans
    }

    /// Total spans across all services
    pub fn span_count(&self) -> usize {
        self.resource_spans
            .iter()
            .flat_map(|rs| rs.scope_spans.iter())
            .map(|ss| ss.spans.len())
            .sum()
    }

    /// Events dropped during translation (ignored events are not counted)
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.span_count() == 0
    }

    /// Service name of each resource, in output order
    pub fn services(&self) -> Vec<&str> {
        self.resource_spans
            .iter()
            .filter_map(|rs| rs.resource.as_ref())
            .filter_map(|resource| {
                resource
                    .attributes
                    .iter()
                    .find(|kv| kv.key == semconv::resource::SERVICE_NAME)
            })
            .filter_map(|kv| match kv.value.as_ref()?.value.as_ref()? {
                any_value::Value::StringValue(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every span, in output order
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.resource_spans
            .iter()
            .flat_map(|rs| rs.scope_spans.iter())
            .flat_map(|ss| ss.spans.iter())
    }

    pub fn into_request(self) -> ExportTraceServiceRequest {
        ExportTraceServiceRequest {
            resource_spans: self.resource_spans,
        }
    }

    /// OTLP/JSON encoding of the export request
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        let request = ExportTraceServiceRequest {
            resource_spans: self.resource_spans.clone(),
        };
        if pretty {
            serde_json::to_string_pretty(&request)
        } else {
            serde_json::to_string(&request)
        }
    }
}

pub(crate) fn string_kv(key: impl Into<String>, value: impl Into<String>) -> KeyValue {
    KeyValue {
        key: key.into(),
        value: Some(AnyValue {
            value: Some(any_value::Value::StringValue(value.into())),
        }),
    }
}

pub(crate) fn int_kv(key: impl Into<String>, value: i64) -> KeyValue {
    KeyValue {
        key: key.into(),
        value: Some(AnyValue {
            value: Some(any_value::Value::IntValue(value)),
        }),
    }
}
