//! Lineage tracking - which trace a flow file belongs to
//!
//! Provenance events only carry local flow-file ids. When a FORK splits a
//! flow file, each child is recorded here with the trace it inherits and the
//! fork span as its parent, so that later events for the child (possibly in a
//! later batch) land in the same trace. Entries expire after a fixed TTL and
//! are removed by an explicit [`LineageTracker::sweep`].

use crate::ids::{parse_uuid, span_id_from_uuid, trace_id_from_uuid};
use chrono::{DateTime, Duration, Utc};
use opentelemetry::trace::{SpanId, TraceId};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default retention for lineage entries, in seconds
pub const DEFAULT_LINEAGE_TTL_SECS: i64 = 300;

/// Ancestor context inherited by a flow file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineageEntry {
    /// Trace the flow file belongs to
    pub trace_id: TraceId,

    /// Span its events are parented under
    pub parent_span_id: SpanId,

    /// When a sweep may drop this entry
    pub expires_at: DateTime<Utc>,
}

/// TTL-bounded map from flow-file id to inherited context
#[derive(Debug)]
pub struct LineageTracker {
    entries: HashMap<Uuid, LineageEntry>,
    ttl: Duration,
}

impl LineageTracker {
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_LINEAGE_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Record every child of a fork
    ///
    /// Children inherit the fork entity's own trace when it has one, so a fork
    /// of a fork stays in the original trace. Returns the number of children
    /// recorded.
    pub fn record_fork(
        &mut self,
        fork_entity: &Uuid,
        fork_event: &Uuid,
        child_ids: &[String],
        now: DateTime<Utc>,
    ) -> usize {
        let trace_id = self.ancestor_trace_id(fork_entity);
        let entry = LineageEntry {
            trace_id,
            parent_span_id: span_id_from_uuid(fork_event),
            expires_at: now + self.ttl,
        };

        let mut recorded = 0;
        for child in child_ids {
            let child_id = match parse_uuid("childIds", child) {
                Ok(id) => id,
                Err(e) => {
                    warn!(fork.entity_id = %fork_entity, error = %e, "Skipping fork child");
                    continue;
                }
            };
            if child_id == *fork_entity {
                debug!(fork.entity_id = %fork_entity, "Fork lists itself as a child, ignoring");
                continue;
            }

            self.entries.insert(child_id, entry);
            recorded += 1;
        }

        recorded
    }

    /// Record a context extracted from a propagation header
    pub fn record_context(
        &mut self,
        entity: Uuid,
        trace_id: TraceId,
        parent_span_id: SpanId,
        now: DateTime<Utc>,
    ) {
        self.entries.insert(
            entity,
            LineageEntry {
                trace_id,
                parent_span_id,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Look up an entity's ancestor context
    ///
    /// Expiry is not checked here; an entry lives until the next sweep.
    pub fn resolve_ancestor(&self, entity: &Uuid) -> Option<&LineageEntry> {
        self.entries.get(entity)
    }

    /// Trace an entity belongs to: inherited if tracked, else its own root trace
    pub fn ancestor_trace_id(&self, entity: &Uuid) -> TraceId {
        self.resolve_ancestor(entity)
            .map(|entry| entry.trace_id)
            .unwrap_or_else(|| trace_id_from_uuid(entity))
    }

    /// Drop every entry whose expiry is at or before `now`
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - self.entries.len();

        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Swept lineage entries");
        }

        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LineageTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn id(n: u32) -> Uuid {
        Uuid::parse_str(&format!("{:08x}-0000-4000-8000-000000000000", n)).unwrap()
    }

    #[test]
    fn test_fork_fan_out() {
        let mut tracker = LineageTracker::new();
        let (fork_entity, fork_event) = (id(1), id(2));
        let children = vec![id(10).to_string(), id(11).to_string()];

        assert_eq!(tracker.record_fork(&fork_entity, &fork_event, &children, t0()), 2);

        for child in [id(10), id(11)] {
            let entry = tracker.resolve_ancestor(&child).unwrap();
            assert_eq!(entry.trace_id, trace_id_from_uuid(&fork_entity));
            assert_eq!(entry.parent_span_id, span_id_from_uuid(&fork_event));
            assert_eq!(entry.expires_at, t0() + Duration::minutes(5));
        }
    }

    #[test]
    fn test_fork_chaining_keeps_original_trace() {
        let mut tracker = LineageTracker::new();
        tracker.record_fork(&id(1), &id(2), &[id(10).to_string()], t0());
        // id(10) is itself forked
        tracker.record_fork(&id(10), &id(3), &[id(20).to_string()], t0());

        let grandchild = tracker.resolve_ancestor(&id(20)).unwrap();
        assert_eq!(grandchild.trace_id, trace_id_from_uuid(&id(1)));
        assert_ne!(grandchild.trace_id, trace_id_from_uuid(&id(10)));
        assert_eq!(grandchild.parent_span_id, span_id_from_uuid(&id(3)));
    }

    #[test]
    fn test_invalid_and_self_children_are_skipped() {
        let mut tracker = LineageTracker::new();
        let children = vec!["bogus".to_string(), id(1).to_string(), id(5).to_string()];
        assert_eq!(tracker.record_fork(&id(1), &id(2), &children, t0()), 1);
        assert!(tracker.resolve_ancestor(&id(1)).is_none());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_entries_are_replaced() {
        let mut tracker = LineageTracker::new();
        tracker.record_fork(&id(1), &id(2), &[id(10).to_string()], t0());
        tracker.record_fork(&id(3), &id(4), &[id(10).to_string()], t0() + Duration::minutes(1));

        let entry = tracker.resolve_ancestor(&id(10)).unwrap();
        assert_eq!(entry.trace_id, trace_id_from_uuid(&id(3)));
        assert_eq!(entry.expires_at, t0() + Duration::minutes(6));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_sweep_honours_ttl() {
        let mut tracker = LineageTracker::new();
        tracker.record_fork(&id(1), &id(2), &[id(10).to_string()], t0());

        assert_eq!(tracker.sweep(t0() + Duration::minutes(4)), 0);
        assert!(tracker.resolve_ancestor(&id(10)).is_some());
        assert_eq!(tracker.len(), 1);

        assert_eq!(tracker.sweep(t0() + Duration::minutes(5)), 1);
        assert!(tracker.is_empty());
        assert!(tracker.resolve_ancestor(&id(10)).is_none());
    }

    #[test]
    fn test_record_context_and_custom_ttl() {
        let mut tracker = LineageTracker::with_ttl(Duration::seconds(30));
        let trace_id = TraceId::from_bytes([7; 16]);
        let span_id = SpanId::from_bytes([9; 8]);
        tracker.record_context(id(1), trace_id, span_id, t0());

        assert_eq!(tracker.ancestor_trace_id(&id(1)), trace_id);
        assert_eq!(tracker.ancestor_trace_id(&id(2)), trace_id_from_uuid(&id(2)));
        assert_eq!(tracker.sweep(t0() + Duration::seconds(30)), 1);
    }
}
