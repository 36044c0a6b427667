//! Context carrier over flow-file attributes
//!
//! NiFi forwards whatever headers the upstream producer used, so the W3C
//! `traceparent` may show up as `Traceparent`, `TRACEPARENT` or under a
//! different name entirely. The carrier resolves a requested key in three
//! steps: configured alias, exact match, then a case-insensitive scan.

use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{SpanContext, TraceContextExt};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;

/// Alias table error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidAlias {
    #[error("alias for {0:?} is not a trace context propagation field")]
    UnknownField(String),

    #[error("alias for {0:?} has an empty producer key")]
    EmptyTarget(String),

    #[error("alias for {0:?} is configured more than once")]
    Duplicate(String),
}

/// Canonical propagation key -> key actually used by the producer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextAliases(HashMap<String, String>);

impl ContextAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer key configured for `canonical`, if any
    pub fn resolve(&self, canonical: &str) -> Option<&str> {
        if self.0.is_empty() {
            return None;
        }
        self.0
            .get(&canonical.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl TryFrom<HashMap<String, String>> for ContextAliases {
    type Error = InvalidAlias;

    fn try_from(raw: HashMap<String, String>) -> Result<Self, Self::Error> {
        let propagator = TraceContextPropagator::new();
        let mut aliases = HashMap::with_capacity(raw.len());

        for (canonical, target) in raw {
            let canonical_key = canonical.trim().to_ascii_lowercase();
            if !propagator.fields().any(|field| field == canonical_key) {
                return Err(InvalidAlias::UnknownField(canonical));
            }
            let target = target.trim();
            if target.is_empty() {
                return Err(InvalidAlias::EmptyTarget(canonical));
            }
            if aliases.contains_key(&canonical_key) {
                return Err(InvalidAlias::Duplicate(canonical_key));
            }
            aliases.insert(canonical_key, target.to_string());
        }

        Ok(Self(aliases))
    }
}

/// Read/write propagation view over an attribute map
///
/// Borrowed attributes are only cloned on the first [`ContextCarrier::set`].
pub struct ContextCarrier<'a> {
    attributes: Cow<'a, HashMap<String, String>>,
    aliases: &'a ContextAliases,
}

impl<'a> ContextCarrier<'a> {
    pub fn new(attributes: &'a HashMap<String, String>, aliases: &'a ContextAliases) -> Self {
        Self {
            attributes: Cow::Borrowed(attributes),
            aliases,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = self.aliases.resolve(key).unwrap_or(key);

        if let Some(value) = self.attributes.get(key) {
            return Some(value.as_str());
        }

        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Stores under the producer's key name when an alias exists
    pub fn set(&mut self, key: &str, value: String) {
        let key = self.aliases.resolve(key).unwrap_or(key).to_string();
        self.attributes.to_mut().insert(key, value);
    }

    pub fn keys(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }
}

impl Extractor for ContextCarrier<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        ContextCarrier::get(self, key)
    }

    fn keys(&self) -> Vec<&str> {
        ContextCarrier::keys(self)
    }
}

impl Injector for ContextCarrier<'_> {
    fn set(&mut self, key: &str, value: String) {
        ContextCarrier::set(self, key, value)
    }
}

/// Extract a W3C trace context embedded in flow-file attributes
///
/// Returns `None` when no well-formed `traceparent` is present.
pub fn extract_span_context(
    attributes: &HashMap<String, String>,
    aliases: &ContextAliases,
) -> Option<SpanContext> {
    if attributes.is_empty() {
        return None;
    }

    let carrier = ContextCarrier::new(attributes, aliases);
    let cx = TraceContextPropagator::new().extract(&carrier);
    let span_context = cx.span().span_context().clone();

    span_context.is_valid().then_some(span_context)
}
