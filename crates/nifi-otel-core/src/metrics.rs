//! Receiver metrics
//!
//! Counters updated by the HTTP receiver and rendered for `/metrics`
//! (Prometheus text) and `/api/metrics` (JSON).

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Which endpoint a batch arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Provenance,
    Bulletin,
}

impl BatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::Provenance => "provenance",
            BatchKind::Bulletin => "bulletin",
        }
    }
}

#[derive(Debug)]
pub struct ReceiverMetrics {
    start_time: Instant,
    pub provenance_batches: AtomicU64,
    pub bulletin_batches: AtomicU64,
    pub decode_failures: AtomicU64,
    pub events_skipped: AtomicU64,
    pub spans_accepted: AtomicU64,
    pub spans_refused: AtomicU64,
    pub consumer_failures: AtomicU64,
    pub lineage_swept: AtomicU64,
    /// Gauge, overwritten after every translation or sweep
    pub lineage_entries: AtomicU64,
}

impl Default for ReceiverMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            provenance_batches: AtomicU64::new(0),
            bulletin_batches: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            events_skipped: AtomicU64::new(0),
            spans_accepted: AtomicU64::new(0),
            spans_refused: AtomicU64::new(0),
            consumer_failures: AtomicU64::new(0),
            lineage_swept: AtomicU64::new(0),
            lineage_entries: AtomicU64::new(0),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn record_batch(&self, kind: BatchKind) {
        let counter = match kind {
            BatchKind::Provenance => &self.provenance_batches,
            BatchKind::Bulletin => &self.bulletin_batches,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self, events: usize) {
        self.events_skipped.fetch_add(events as u64, Ordering::Relaxed);
    }

    /// Outcome of handing `spans` to the downstream consumer
    pub fn record_consumed(&self, spans: usize, ok: bool) {
        if ok {
            self.spans_accepted.fetch_add(spans as u64, Ordering::Relaxed);
        } else {
            self.spans_refused.fetch_add(spans as u64, Ordering::Relaxed);
            self.consumer_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_sweep(&self, removed: usize, remaining: usize) {
        self.lineage_swept.fetch_add(removed as u64, Ordering::Relaxed);
        self.set_lineage_entries(remaining);
    }

    pub fn set_lineage_entries(&self, entries: usize) {
        self.lineage_entries.store(entries as u64, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus text format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        write_metric(
            &mut output,
            "nifi_otel_uptime_seconds",
            "Time since the receiver started",
            "gauge",
            &[("", self.uptime_seconds())],
        );
        write_metric(
            &mut output,
            "nifi_otel_batches_received_total",
            "Batches received per endpoint",
            "counter",
            &[
                (
                    "{kind=\"provenance\"}",
                    self.provenance_batches.load(Ordering::Relaxed),
                ),
                (
                    "{kind=\"bulletin\"}",
                    self.bulletin_batches.load(Ordering::Relaxed),
                ),
            ],
        );
        write_metric(
            &mut output,
            "nifi_otel_decode_failures_total",
            "Request bodies that were not valid event JSON",
            "counter",
            &[("", self.decode_failures.load(Ordering::Relaxed))],
        );
        write_metric(
            &mut output,
            "nifi_otel_events_skipped_total",
            "Events dropped during translation",
            "counter",
            &[("", self.events_skipped.load(Ordering::Relaxed))],
        );
        write_metric(
            &mut output,
            "nifi_otel_spans_accepted_total",
            "Spans accepted by the downstream consumer",
            "counter",
            &[("", self.spans_accepted.load(Ordering::Relaxed))],
        );
        write_metric(
            &mut output,
            "nifi_otel_spans_refused_total",
            "Spans in batches the downstream consumer failed",
            "counter",
            &[("", self.spans_refused.load(Ordering::Relaxed))],
        );
        write_metric(
            &mut output,
            "nifi_otel_consumer_failures_total",
            "Failed downstream consume calls",
            "counter",
            &[("", self.consumer_failures.load(Ordering::Relaxed))],
        );
        write_metric(
            &mut output,
            "nifi_otel_lineage_swept_total",
            "Lineage entries removed by sweeps",
            "counter",
            &[("", self.lineage_swept.load(Ordering::Relaxed))],
        );
        write_metric(
            &mut output,
            "nifi_otel_lineage_entries",
            "Lineage entries currently tracked",
            "gauge",
            &[("", self.lineage_entries.load(Ordering::Relaxed))],
        );

        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uptime_seconds": self.uptime_seconds(),
            "batches": {
                "provenance": self.provenance_batches.load(Ordering::Relaxed),
                "bulletin": self.bulletin_batches.load(Ordering::Relaxed),
            },
            "decode_failures": self.decode_failures.load(Ordering::Relaxed),
            "events_skipped": self.events_skipped.load(Ordering::Relaxed),
            "spans": {
                "accepted": self.spans_accepted.load(Ordering::Relaxed),
                "refused": self.spans_refused.load(Ordering::Relaxed),
            },
            "consumer_failures": self.consumer_failures.load(Ordering::Relaxed),
            "lineage": {
                "entries": self.lineage_entries.load(Ordering::Relaxed),
                "swept": self.lineage_swept.load(Ordering::Relaxed),
            },
        })
    }
}

fn write_metric(out: &mut String, name: &str, help: &str, kind: &str, samples: &[(&str, u64)]) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
    for (labels, value) in samples {
        let _ = writeln!(out, "{}{} {}", name, labels, value);
    }
    out.push('\n');
}

/// Shared metrics instance
pub type SharedMetrics = Arc<ReceiverMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(ReceiverMetrics::new())
}
