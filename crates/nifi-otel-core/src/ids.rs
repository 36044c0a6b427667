//! Deterministic UUID to trace/span identifier derivation
//!
//! The span id is the UUID's leading `time_low` field widened to 64 bits and
//! written big-endian. Trace ids repeat that 8-byte pattern in both halves, so
//! a trace id derived from an entity never depends on the full 128 bits.

use crate::error::{TranslateError, TranslateResult};
use opentelemetry::trace::{SpanId, TraceId};
use uuid::Uuid;

/// Parse a UUID-shaped field, naming the field in the error
pub fn parse_uuid(field: &'static str, value: &str) -> TranslateResult<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| TranslateError::InvalidIdentifierFormat {
        field,
        value: value.to_string(),
    })
}

pub fn derive_trace_id(value: &str) -> TranslateResult<TraceId> {
    parse_uuid("trace id source", value).map(|u| trace_id_from_uuid(&u))
}

pub fn derive_span_id(value: &str) -> TranslateResult<SpanId> {
    parse_uuid("span id source", value).map(|u| span_id_from_uuid(&u))
}

pub fn trace_id_from_uuid(uuid: &Uuid) -> TraceId {
    let half = id_bytes(uuid);
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&half);
    bytes[8..].copy_from_slice(&half);
    TraceId::from_bytes(bytes)
}

pub fn span_id_from_uuid(uuid: &Uuid) -> SpanId {
    SpanId::from_bytes(id_bytes(uuid))
}

fn id_bytes(uuid: &Uuid) -> [u8; 8] {
    let (time_low, _, _, _) = uuid.as_fields();
    u64::from(time_low).to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTITY: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";

    #[test]
    fn test_span_id_layout() {
        let span_id = derive_span_id(ENTITY).unwrap();
        assert_eq!(span_id.to_bytes(), [0, 0, 0, 0, 0x6b, 0xa7, 0xb8, 0x10]);
    }

    #[test]
    fn test_trace_id_doubles_span_pattern() {
        let trace_id = derive_trace_id(ENTITY).unwrap();
        let span_id = derive_span_id(ENTITY).unwrap();
        let bytes = trace_id.to_bytes();
        assert_eq!(bytes[..8], span_id.to_bytes());
        assert_eq!(bytes[8..], span_id.to_bytes());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        for _ in 0..16 {
            let u = Uuid::new_v4().to_string();
            assert_eq!(derive_trace_id(&u), derive_trace_id(&u));
            assert_eq!(derive_span_id(&u), derive_span_id(&u));
        }
    }

    #[test]
    fn test_case_and_format_insensitive() {
        let upper = ENTITY.to_uppercase();
        let simple = ENTITY.replace('-', "");
        assert_eq!(derive_span_id(ENTITY), derive_span_id(&upper));
        assert_eq!(derive_trace_id(ENTITY), derive_trace_id(&simple));
    }

    #[test]
    fn test_distinct_inputs_distinct_outputs() {
        let a = derive_span_id("00000001-0000-4000-8000-000000000000").unwrap();
        let b = derive_span_id("00000002-0000-4000-8000-000000000000").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_identifier() {
        let err = derive_span_id("not-a-uuid").unwrap_err();
        assert!(matches!(
            err,
            TranslateError::InvalidIdentifierFormat { ref value, .. } if value == "not-a-uuid"
        ));
        assert!(derive_trace_id("").is_err());
    }
}
