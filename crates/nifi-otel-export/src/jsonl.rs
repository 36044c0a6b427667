//! JSONL file exporter
//!
//! Each batch becomes one line holding the OTLP/JSON encoding of an
//! `ExportTraceServiceRequest`.

use async_trait::async_trait;
use nifi_otel_core::config::JsonlExportConfig;
use nifi_otel_core::consumer::{ConsumerResult, TraceConsumer};
use nifi_otel_core::TraceBatch;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// JSONL file exporter
pub struct JsonlTraceExporter {
    path: PathBuf,
    flush_each: bool,
    writer: Mutex<BufWriter<File>>,
    batches_written: AtomicU64,
}

impl JsonlTraceExporter {
    /// Open the output file, creating it if needed
    pub fn open(config: &JsonlExportConfig) -> ConsumerResult<Self> {
        let path = PathBuf::from(&config.path);
        let file = if config.append {
            OpenOptions::new().create(true).append(true).open(&path)?
        } else {
            File::create(&path)?
        };

        info!("JSONL exporter writing to: {}", path.display());
        Ok(Self {
            path,
            flush_each: config.flush_each,
            writer: Mutex::new(BufWriter::new(file)),
            batches_written: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn batches_written(&self) -> u64 {
        self.batches_written.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TraceConsumer for JsonlTraceExporter {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn consume(&self, batch: TraceBatch) -> ConsumerResult<()> {
        let spans = batch.span_count();
        let json = batch.to_json(false)?;

        let mut w = self.writer.lock();
        writeln!(w, "{}", json)?;
        if self.flush_each {
            w.flush()?;
        }

        self.batches_written.fetch_add(1, Ordering::Relaxed);
        debug!(spans, path = %self.path.display(), "Wrote trace batch");
        Ok(())
    }

    async fn flush(&self) -> ConsumerResult<()> {
        self.writer.lock().flush()?;
        Ok(())
    }
}
