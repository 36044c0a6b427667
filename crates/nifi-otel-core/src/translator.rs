//! Translation engine - turns provenance and bulletin batches into spans

use crate::batch::{int_kv, string_kv, TraceBatch};
use crate::carrier::{extract_span_context, ContextAliases};
use crate::clock::{Clock, SystemClock};
use crate::error::{TranslateError, TranslateResult};
use crate::events::{
    BulletinEvent, ProvenanceEvent, ProvenanceEventType, BULLETIN_TIMESTAMP_FORMAT,
};
use crate::ids::{derive_span_id, derive_trace_id, parse_uuid, span_id_from_uuid};
use crate::lineage::{LineageTracker, DEFAULT_LINEAGE_TTL_SECS};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use opentelemetry::trace::{SpanId, TraceId};
use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::trace::v1::span::{Link, SpanKind};
use opentelemetry_proto::tonic::trace::v1::status::StatusCode;
use opentelemetry_proto::tonic::trace::v1::{Span, Status};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Translator settings, fixed at construction
#[derive(Debug, Clone)]
pub struct TranslatorSettings {
    /// Event types that never produce a span
    pub ignored_event_types: HashSet<ProvenanceEventType>,

    /// Producer-specific names for the propagation headers
    pub aliases: ContextAliases,

    /// Retention for lineage entries
    pub lineage_ttl: Duration,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            ignored_event_types: HashSet::from([ProvenanceEventType::Download]),
            aliases: ContextAliases::default(),
            lineage_ttl: Duration::seconds(DEFAULT_LINEAGE_TTL_SECS),
        }
    }
}

/// Stateful provenance/bulletin translator
///
/// Lineage state persists across calls until [`EventTranslator::sweep`]
/// drops expired entries.
pub struct EventTranslator {
    ignored: HashSet<ProvenanceEventType>,
    aliases: ContextAliases,
    lineage: LineageTracker,
    clock: Arc<dyn Clock>,
}

impl EventTranslator {
    pub fn new(settings: TranslatorSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: TranslatorSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            ignored: settings.ignored_event_types,
            aliases: settings.aliases,
            lineage: LineageTracker::with_ttl(settings.lineage_ttl),
            clock,
        }
    }

    pub fn is_ignored(&self, event_type: ProvenanceEventType) -> bool {
        self.ignored.contains(&event_type)
    }

    /// Translate a provenance batch, in input order
    pub fn translate_provenance(&mut self, events: &[ProvenanceEvent]) -> TraceBatch {
        let now = self.clock.now();
        let mut buckets: BTreeMap<String, Vec<Span>> = BTreeMap::new();
        let mut skipped = 0;

        for event in events {
            if self.is_ignored(event.event_type) {
                continue;
            }

            match self.provenance_span(event, now) {
                Ok(span) => buckets
                    .entry(event.process_group_name.clone())
                    .or_default()
                    .push(span),
                Err(e) => {
                    warn!(
                        event.id = %event.event_id,
                        event.ordinal = event.event_ordinal,
                        error = %e,
                        "Skipping provenance event"
                    );
                    skipped += 1;
                }
            }
        }

        let batch = TraceBatch::from_buckets(buckets, skipped);
        debug!(
            events = events.len(),
            spans = batch.span_count(),
            skipped,
            lineage = self.lineage.len(),
            "Translated provenance batch"
        );
        batch
    }

    /// Translate a bulletin batch, in input order
    pub fn translate_bulletins(&mut self, events: &[BulletinEvent]) -> TraceBatch {
        let mut buckets: BTreeMap<String, Vec<Span>> = BTreeMap::new();
        let mut skipped = 0;

        for event in events {
            match bulletin_span(event) {
                Ok(span) => buckets
                    .entry(event.bulletin_group_name.clone())
                    .or_default()
                    .push(span),
                Err(e) => {
                    warn!(
                        object.id = %event.object_id,
                        bulletin.id = event.bulletin_id,
                        error = %e,
                        "Skipping bulletin"
                    );
                    skipped += 1;
                }
            }
        }

        let batch = TraceBatch::from_buckets(buckets, skipped);
        debug!(
            events = events.len(),
            spans = batch.span_count(),
            skipped,
            "Translated bulletin batch"
        );
        batch
    }

    /// Drop expired lineage entries
    pub fn sweep(&mut self) -> usize {
        self.lineage.sweep(self.clock.now())
    }

    pub fn lineage_len(&self) -> usize {
        self.lineage.len()
    }

    fn provenance_span(
        &mut self,
        event: &ProvenanceEvent,
        now: DateTime<Utc>,
    ) -> TranslateResult<Span> {
        let kind = span_kind(event.event_type);
        let event_id = parse_uuid("eventId", &event.event_id)?;
        let entity_id = parse_uuid("entityId", &event.entity_id)?;

        let (trace_id, parent_span_id) = self.resolve_parent(event, &event_id, &entity_id, now);
        let span_id = span_id_from_uuid(&event_id);

        let links = if event.event_type == ProvenanceEventType::Join {
            self.join_links(event)
        } else {
            Vec::new()
        };

        let start = millis_to_nanos(event.timestamp_millis);
        let end = millis_to_nanos(event.timestamp_millis.saturating_add(event.duration_millis));

        Ok(Span {
            trace_id: trace_id.to_bytes().to_vec(),
            span_id: span_id.to_bytes().to_vec(),
            parent_span_id: parent_span_id
                .map(|id| id.to_bytes().to_vec())
                .unwrap_or_default(),
            name: format!("{} {}", event.component_name, event.event_type),
            kind: kind as i32,
            start_time_unix_nano: start,
            end_time_unix_nano: end,
            attributes: provenance_attributes(event),
            links,
            status: Some(Status {
                code: StatusCode::Ok as i32,
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    /// Header context first, then fork bookkeeping, then lineage lookup
    fn resolve_parent(
        &mut self,
        event: &ProvenanceEvent,
        event_id: &Uuid,
        entity_id: &Uuid,
        now: DateTime<Utc>,
    ) -> (TraceId, Option<SpanId>) {
        if let Some(cx) = extract_span_context(&event.updated_attributes, &self.aliases) {
            debug!(entity.id = %entity_id, trace_id = %cx.trace_id(), "Context header found");
            self.lineage
                .record_context(*entity_id, cx.trace_id(), cx.span_id(), now);
        }

        if event.event_type == ProvenanceEventType::Fork && !event.child_ids.is_empty() {
            let recorded = self
                .lineage
                .record_fork(entity_id, event_id, &event.child_ids, now);
            debug!(entity.id = %entity_id, children = recorded, "Recorded fork");
        }

        match self.lineage.resolve_ancestor(entity_id) {
            Some(entry) => (entry.trace_id, Some(entry.parent_span_id)),
            None => (self.lineage.ancestor_trace_id(entity_id), None),
        }
    }

    /// One link per distinct ancestor trace, in first-seen order
    fn join_links(&self, event: &ProvenanceEvent) -> Vec<Link> {
        let mut ancestors: Vec<(TraceId, Option<SpanId>)> = Vec::new();

        for parent in &event.parent_ids {
            let parent_id = match parse_uuid("parentIds", parent) {
                Ok(id) => id,
                Err(e) => {
                    warn!(event.id = %event.event_id, error = %e, "Skipping join parent");
                    continue;
                }
            };

            let ancestor = match self.lineage.resolve_ancestor(&parent_id) {
                Some(entry) => (entry.trace_id, Some(entry.parent_span_id)),
                None => (self.lineage.ancestor_trace_id(&parent_id), None),
            };
            if !ancestors.iter().any(|(trace_id, _)| *trace_id == ancestor.0) {
                ancestors.push(ancestor);
            }
        }

        ancestors
            .into_iter()
            .map(|(trace_id, span_id)| Link {
                trace_id: trace_id.to_bytes().to_vec(),
                span_id: span_id
                    .map(|id| id.to_bytes().to_vec())
                    .unwrap_or_default(),
                ..Default::default()
            })
            .collect()
    }
}

impl Default for EventTranslator {
    fn default() -> Self {
        Self::new(TranslatorSettings::default())
    }
}

fn span_kind(event_type: ProvenanceEventType) -> SpanKind {
    use ProvenanceEventType as E;

    match event_type {
        E::Fetch | E::Receive => SpanKind::Server,
        E::Send | E::RemoteInvocation => SpanKind::Client,
        E::AddInfo
        | E::AttributesModified
        | E::Clone
        | E::ContentModified
        | E::Create
        | E::Download
        | E::Drop
        | E::Expire
        | E::Fork
        | E::Join
        | E::Replay
        | E::Route
        | E::Unknown => SpanKind::Internal,
    }
}

fn millis_to_nanos(millis: i64) -> u64 {
    u64::try_from(millis).unwrap_or(0).saturating_mul(1_000_000)
}

fn provenance_attributes(event: &ProvenanceEvent) -> Vec<KeyValue> {
    let mut attributes = vec![
        string_kv("nifi.event.id", event.event_id.as_str()),
        string_kv("nifi.event.type", event.event_type.as_str()),
        string_kv("nifi.event.details", event.details.as_str()),
        string_kv("nifi.component.id", event.component_id.as_str()),
        string_kv("nifi.component.type", event.component_type.as_str()),
        string_kv("nifi.component.name", event.component_name.as_str()),
        string_kv("nifi.process.group.id", event.process_group_id.as_str()),
        string_kv("nifi.process.group.name", event.process_group_name.as_str()),
        string_kv("nifi.entity.id", event.entity_id.as_str()),
        string_kv("nifi.entity.type", event.entity_type.as_str()),
        int_kv("nifi.entity.size", event.entity_size),
        string_kv("nifi.hostname", event.actor_hostname.as_str()),
        string_kv("nifi.platform", event.platform.as_str()),
        string_kv("nifi.application", event.application.as_str()),
    ];

    let mut updated: Vec<_> = event.updated_attributes.iter().collect();
    updated.sort_unstable_by(|a, b| a.0.cmp(b.0));
    attributes.extend(updated.into_iter().map(|(key, value)| {
        string_kv(
            format!("nifi.attributes.{}", key.to_lowercase()),
            value.as_str(),
        )
    }));

    attributes
}

fn parse_bulletin_timestamp(value: &str) -> TranslateResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), BULLETIN_TIMESTAMP_FORMAT)
        .map(|ts| ts.and_utc())
        .map_err(|e| TranslateError::TimestampParse {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn bulletin_span(event: &BulletinEvent) -> TranslateResult<Span> {
    let timestamp = parse_bulletin_timestamp(&event.bulletin_timestamp)?;
    let trace_id = derive_trace_id(&event.bulletin_group_id)?;
    let span_id = derive_span_id(&event.object_id)?;
    let nanos = millis_to_nanos(timestamp.timestamp_millis());

    Ok(Span {
        trace_id: trace_id.to_bytes().to_vec(),
        span_id: span_id.to_bytes().to_vec(),
        name: format!("{} {}", event.bulletin_source_name, event.bulletin_level),
        kind: SpanKind::Internal as i32,
        start_time_unix_nano: nanos,
        end_time_unix_nano: nanos,
        attributes: vec![
            string_kv("nifi.object.id", event.object_id.as_str()),
            string_kv("nifi.platform", event.platform.as_str()),
            int_kv("nifi.bulletin.id", event.bulletin_id),
            string_kv("nifi.bulletin.category", event.bulletin_category.as_str()),
            string_kv("nifi.bulletin.group.id", event.bulletin_group_id.as_str()),
            string_kv("nifi.bulletin.group.name", event.bulletin_group_name.as_str()),
            string_kv("nifi.bulletin.group.path", event.bulletin_group_path.as_str()),
            string_kv("nifi.bulletin.level", event.bulletin_level.as_str()),
            string_kv("nifi.bulletin.message", event.bulletin_message.as_str()),
            string_kv("nifi.bulletin.node.address", event.bulletin_node_address.as_str()),
            string_kv("nifi.bulletin.node.id", event.bulletin_node_id.as_str()),
            string_kv("nifi.bulletin.source.id", event.bulletin_source_id.as_str()),
            string_kv("nifi.bulletin.source.name", event.bulletin_source_name.as_str()),
            string_kv("nifi.bulletin.source.type", event.bulletin_source_type.as_str()),
            string_kv("nifi.bulletin.flowfile.id", event.bulletin_flow_file_uuid.as_str()),
        ],
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ids::trace_id_from_uuid;
    use chrono::TimeZone;
    use opentelemetry_proto::tonic::common::v1::any_value::Value;
    use std::collections::HashMap;

    const E1: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";
    const V1: &str = "f47ac10b-58cc-4372-a567-0e02b2c3d479";
    const V2: &str = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";
    const C1: &str = "a3bb189e-8bf9-3888-9912-ace4e6543002";
    const C2: &str = "c9a646d3-9c61-4cb7-bfcd-ee2522c8f633";
    const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn uuid(n: u32) -> String {
        format!("{:08x}-0000-4000-8000-000000000000", n)
    }

    fn event(event_type: ProvenanceEventType, entity: &str, event_id: &str) -> ProvenanceEvent {
        ProvenanceEvent {
            event_id: event_id.to_string(),
            event_type,
            entity_id: entity.to_string(),
            timestamp_millis: 1_705_312_800_000,
            duration_millis: 25,
            component_name: "PutS3Object".to_string(),
            process_group_name: "ingest".to_string(),
            entity_size: 512,
            ..Default::default()
        }
    }

    fn fork(entity: &str, event_id: &str, children: &[&str]) -> ProvenanceEvent {
        ProvenanceEvent {
            child_ids: children.iter().map(|c| c.to_string()).collect(),
            ..event(ProvenanceEventType::Fork, entity, event_id)
        }
    }

    fn bulletin(object_id: &str, timestamp: &str) -> BulletinEvent {
        BulletinEvent {
            object_id: object_id.to_string(),
            bulletin_id: 7,
            bulletin_group_id: E1.to_string(),
            bulletin_group_name: "ingest".to_string(),
            bulletin_level: "ERROR".to_string(),
            bulletin_source_name: "InvokeHTTP".to_string(),
            bulletin_timestamp: timestamp.to_string(),
            ..Default::default()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn translator_at(clock: Arc<ManualClock>) -> EventTranslator {
        EventTranslator::with_clock(TranslatorSettings::default(), clock)
    }

    fn span_for<'a>(batch: &'a TraceBatch, event_id: &str) -> &'a Span {
        let span_id = derive_span_id(event_id).unwrap().to_bytes().to_vec();
        batch.spans().find(|s| s.span_id == span_id).unwrap()
    }

    fn tid(value: &str) -> Vec<u8> {
        derive_trace_id(value).unwrap().to_bytes().to_vec()
    }

    fn sid(value: &str) -> Vec<u8> {
        derive_span_id(value).unwrap().to_bytes().to_vec()
    }

    fn attr<'a>(span: &'a Span, key: &str) -> Option<&'a Value> {
        span.attributes
            .iter()
            .find(|kv| kv.key == key)
            .and_then(|kv| kv.value.as_ref())
            .and_then(|v| v.value.as_ref())
    }

    #[test]
    fn test_fork_then_send() {
        let mut translator = EventTranslator::default();
        let batch = translator.translate_provenance(&[
            fork(E1, V1, &[C1]),
            event(ProvenanceEventType::Send, C1, V2),
        ]);

        assert_eq!(batch.span_count(), 2);

        let fork_span = span_for(&batch, V1);
        assert_eq!(fork_span.trace_id, tid(E1));
        assert!(fork_span.parent_span_id.is_empty());

        let send_span = span_for(&batch, V2);
        assert_eq!(send_span.trace_id, tid(E1));
        assert_eq!(send_span.parent_span_id, sid(V1));
        assert_eq!(send_span.kind, SpanKind::Client as i32);
    }

    #[test]
    fn test_fork_fan_out_across_batches() {
        let mut translator = EventTranslator::default();
        translator.translate_provenance(&[fork(E1, V1, &[C1, C2])]);

        for (child, event_id) in [(C1, uuid(1)), (C2, uuid(2))] {
            let batch = translator
                .translate_provenance(&[event(ProvenanceEventType::Route, child, &event_id)]);
            let span = span_for(&batch, &event_id);
            assert_eq!(span.trace_id, tid(E1));
            assert_eq!(span.parent_span_id, sid(V1));
        }
    }

    #[test]
    fn test_fork_chaining() {
        let mut translator = EventTranslator::default();
        let batch = translator.translate_provenance(&[
            fork(E1, V1, &[C1]),
            fork(C1, V2, &[C2]),
            event(ProvenanceEventType::Drop, C2, &uuid(9)),
        ]);

        // The second fork is itself a child of the first
        let second_fork = span_for(&batch, V2);
        assert_eq!(second_fork.trace_id, tid(E1));
        assert_eq!(second_fork.parent_span_id, sid(V1));

        let grandchild = span_for(&batch, &uuid(9));
        assert_eq!(grandchild.trace_id, tid(E1));
        assert_ne!(grandchild.trace_id, tid(C1));
        assert_eq!(grandchild.parent_span_id, sid(V2));
    }

    #[test]
    fn test_join_links_are_deduplicated() {
        let mut translator = EventTranslator::default();
        // C1 and C2 both descend from E1; uuid(3) is untracked
        translator.translate_provenance(&[fork(E1, V1, &[C1, C2])]);

        let join = ProvenanceEvent {
            parent_ids: vec![C1.to_string(), C2.to_string(), uuid(3), "junk".to_string()],
            ..event(ProvenanceEventType::Join, &uuid(4), V2)
        };
        let batch = translator.translate_provenance(&[join]);
        let span = span_for(&batch, V2);

        assert_eq!(span.links.len(), 2);
        assert_eq!(span.links[0].trace_id, tid(E1));
        assert_eq!(span.links[0].span_id, sid(V1));
        assert_eq!(span.links[1].trace_id, tid(&uuid(3)));
        assert!(span.links[1].span_id.is_empty());
    }

    #[test]
    fn test_ignored_events_produce_nothing() {
        let settings = TranslatorSettings {
            ignored_event_types: ProvenanceEventType::ALL.into_iter().collect(),
            ..Default::default()
        };
        let mut translator = EventTranslator::new(settings);

        let batch = translator.translate_provenance(&[
            fork(E1, V1, &[C1]),
            event(ProvenanceEventType::Download, E1, V2),
        ]);
        assert!(batch.is_empty());
        assert_eq!(batch.skipped(), 0);
        assert_eq!(translator.lineage_len(), 0);
    }

    #[test]
    fn test_default_ignores_download() {
        let mut translator = EventTranslator::default();
        assert!(translator.is_ignored(ProvenanceEventType::Download));
        let batch = translator.translate_provenance(&[
            event(ProvenanceEventType::Download, E1, V1),
            event(ProvenanceEventType::Receive, E1, V2),
        ]);
        assert_eq!(batch.span_count(), 1);
        assert_eq!(span_for(&batch, V2).kind, SpanKind::Server as i32);
    }

    #[test]
    fn test_invalid_ids_skip_event_without_side_effects() {
        let mut translator = EventTranslator::default();
        let mut bad_fork = fork("not-a-uuid", V1, &[C1]);
        bad_fork.process_group_name = "other".to_string();

        let batch = translator.translate_provenance(&[
            bad_fork,
            event(ProvenanceEventType::Create, E1, "also-bad"),
            event(ProvenanceEventType::Create, E1, V2),
        ]);

        assert_eq!(batch.span_count(), 1);
        assert_eq!(batch.skipped(), 2);
        assert_eq!(translator.lineage_len(), 0);
    }

    #[test]
    fn test_span_kinds() {
        use ProvenanceEventType as E;

        assert_eq!(span_kind(E::Fetch), SpanKind::Server);
        assert_eq!(span_kind(E::Receive), SpanKind::Server);
        assert_eq!(span_kind(E::Send), SpanKind::Client);
        assert_eq!(span_kind(E::RemoteInvocation), SpanKind::Client);
        for other in [E::Create, E::Fork, E::Join, E::Route, E::Drop, E::Unknown] {
            assert_eq!(span_kind(other), SpanKind::Internal);
        }
    }

    #[test]
    fn test_span_shape() {
        let mut source = event(ProvenanceEventType::Create, E1, V1);
        source.updated_attributes = HashMap::from([
            ("Filename".to_string(), "a.csv".to_string()),
            ("mime.type".to_string(), "text/csv".to_string()),
        ]);

        let mut translator = EventTranslator::default();
        let batch = translator.translate_provenance(&[source]);
        let span = span_for(&batch, V1);

        assert_eq!(span.name, "PutS3Object CREATE");
        assert_eq!(span.start_time_unix_nano, 1_705_312_800_000_000_000);
        assert_eq!(span.end_time_unix_nano, 1_705_312_800_025_000_000);
        assert_eq!(span.status.as_ref().unwrap().code, StatusCode::Ok as i32);
        assert_eq!(attr(span, "nifi.entity.size"), Some(&Value::IntValue(512)));
        assert_eq!(
            attr(span, "nifi.event.type"),
            Some(&Value::StringValue("CREATE".to_string()))
        );

        let updated: Vec<_> = span
            .attributes
            .iter()
            .filter(|kv| kv.key.starts_with("nifi.attributes."))
            .map(|kv| kv.key.as_str())
            .collect();
        assert_eq!(updated, vec!["nifi.attributes.filename", "nifi.attributes.mime.type"]);
    }

    #[test]
    fn test_negative_timestamps_clamp() {
        let mut source = event(ProvenanceEventType::Create, E1, V1);
        source.timestamp_millis = -5;
        source.duration_millis = 1;

        let batch = EventTranslator::default().translate_provenance(&[source]);
        let span = span_for(&batch, V1);
        assert_eq!(span.start_time_unix_nano, 0);
        assert_eq!(span.end_time_unix_nano, 0);
    }

    #[test]
    fn test_grouping_by_process_group() {
        let mut a = event(ProvenanceEventType::Create, E1, &uuid(1));
        a.process_group_name = "transform".to_string();
        let b = event(ProvenanceEventType::Create, C1, &uuid(2));
        let c = event(ProvenanceEventType::Create, C2, &uuid(3));

        let batch = EventTranslator::default().translate_provenance(&[a, b, c]);
        assert_eq!(batch.services(), vec!["ingest", "transform"]);
        let ingest = &batch.resource_spans()[0].scope_spans[0].spans;
        assert_eq!(ingest.len(), 2);
        // Input order is kept within a bucket
        assert_eq!(ingest[0].span_id, sid(&uuid(2)));
        assert_eq!(ingest[1].span_id, sid(&uuid(3)));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let batch = || {
            EventTranslator::default().translate_provenance(&[
                fork(E1, V1, &[C1]),
                event(ProvenanceEventType::Send, C1, V2),
            ])
        };
        assert_eq!(batch(), batch());
    }

    #[test]
    fn test_context_header_takes_precedence() {
        let mut translator = EventTranslator::default();
        translator.translate_provenance(&[fork(E1, V1, &[C1])]);

        let mut send = event(ProvenanceEventType::Send, C1, V2);
        send.updated_attributes =
            HashMap::from([("TraceParent".to_string(), TRACEPARENT.to_string())]);
        let batch = translator.translate_provenance(&[send]);
        let span = span_for(&batch, V2);

        assert_eq!(
            span.trace_id,
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736")
                .unwrap()
                .to_bytes()
                .to_vec()
        );
        assert_eq!(
            span.parent_span_id,
            SpanId::from_hex("00f067aa0ba902b7").unwrap().to_bytes().to_vec()
        );
    }

    #[test]
    fn test_fork_children_inherit_header_context() {
        let mut source = fork(E1, V1, &[C1]);
        source.updated_attributes =
            HashMap::from([("x-upstream".to_string(), TRACEPARENT.to_string())]);

        let settings = TranslatorSettings {
            aliases: ContextAliases::try_from(HashMap::from([(
                "traceparent".to_string(),
                "x-upstream".to_string(),
            )]))
            .unwrap(),
            ..Default::default()
        };
        let mut translator = EventTranslator::new(settings);
        let batch = translator.translate_provenance(&[
            source,
            event(ProvenanceEventType::Send, C1, V2),
        ]);

        let expected = TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap();
        assert_eq!(span_for(&batch, V1).trace_id, expected.to_bytes().to_vec());
        assert_eq!(span_for(&batch, V2).trace_id, expected.to_bytes().to_vec());
        assert_eq!(span_for(&batch, V2).parent_span_id, sid(V1));
    }

    #[test]
    fn test_sweep_uses_clock() {
        let clock = Arc::new(ManualClock::new(t0()));
        let mut translator = translator_at(clock.clone());
        translator.translate_provenance(&[fork(E1, V1, &[C1, C2])]);
        assert_eq!(translator.lineage_len(), 2);

        clock.advance(Duration::seconds(299));
        assert_eq!(translator.sweep(), 0);

        clock.advance(Duration::seconds(1));
        assert_eq!(translator.sweep(), 2);

        // Once swept, C1 roots its own trace again
        let batch =
            translator.translate_provenance(&[event(ProvenanceEventType::Send, C1, V2)]);
        let span = span_for(&batch, V2);
        assert_eq!(
            span.trace_id,
            trace_id_from_uuid(&Uuid::parse_str(C1).unwrap()).to_bytes().to_vec()
        );
        assert!(span.parent_span_id.is_empty());
    }

    #[test]
    fn test_bulletin_with_bad_timestamp_is_skipped() {
        let mut translator = EventTranslator::default();
        let batch = translator.translate_bulletins(&[
            bulletin(&uuid(1), "2024-01-15T10:30:45.123Z"),
            bulletin(&uuid(2), "15/01/2024 10:30"),
            bulletin(&uuid(3), "2024-01-15T10:31:00.000Z"),
        ]);

        assert_eq!(batch.span_count(), 2);
        assert_eq!(batch.skipped(), 1);
    }

    #[test]
    fn test_bulletin_span_shape() {
        let batch = EventTranslator::default()
            .translate_bulletins(&[bulletin(&uuid(1), "2024-01-15T10:30:45.123Z")]);
        let span = span_for(&batch, &uuid(1));

        assert_eq!(batch.services(), vec!["ingest"]);
        assert_eq!(span.name, "InvokeHTTP ERROR");
        assert_eq!(span.trace_id, tid(E1));
        assert_eq!(span.kind, SpanKind::Internal as i32);
        assert_eq!(span.start_time_unix_nano, 1_705_314_645_123_000_000);
        assert_eq!(span.start_time_unix_nano, span.end_time_unix_nano);
        assert_eq!(attr(span, "nifi.bulletin.id"), Some(&Value::IntValue(7)));
    }

    #[test]
    fn test_bulletin_with_bad_ids_is_skipped() {
        let mut bad_group = bulletin(&uuid(2), "2024-01-15T10:30:45.123Z");
        bad_group.bulletin_group_id = "root".to_string();

        let batch = EventTranslator::default().translate_bulletins(&[
            bulletin("nope", "2024-01-15T10:30:45.123Z"),
            bad_group,
        ]);
        assert!(batch.is_empty());
        assert_eq!(batch.skipped(), 2);
    }
}
