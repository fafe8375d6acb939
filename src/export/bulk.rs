//! Bulk API payload rendering.
//!
//! Every emitted metric becomes an action line followed by a document line:
//!
//! ```text
//! {"index":{"_type":"metric","_index":"metric-2024.01.31"}}
//! {"ts":1706659200000,"host":"web-1","type":"counter","name":"org.one.Foo.count","count":1,"dur":60}
//! ```

use crate::core::{ReporterConfig, ReporterError, Result};
use crate::metrics::{DistributionSummary, MetricKind, MetricRecord, ReportMetrics, TimedRecord};
use std::io::{self, Write};

/// Renders a [`ReportMetrics`] snapshot into a bulk payload.
///
/// The action line is derived once per encoder because a payload always
/// targets a single day's index.
#[derive(Debug)]
pub struct BulkEncoder<'a> {
    config: &'a ReporterConfig,
    header: String,
}

impl<'a> BulkEncoder<'a> {
    /// Create an encoder targeting `<index_prefix><index_suffix>`.
    pub fn new(config: &'a ReporterConfig, index_suffix: &str) -> Self {
        let index = format!("{}{}", config.index_prefix, index_suffix);
        let header = format!(
            "{{\"index\":{{\"_type\":{},\"_index\":{}}}}}\n",
            quote(&config.index_type),
            quote(&index)
        );
        Self { config, header }
    }

    /// The action line written before every document, newline included.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Render into `out` using the current time for durations.
    ///
    /// Returns the number of documents written.
    pub fn render<W: Write>(&self, report: &ReportMetrics, out: &mut W) -> io::Result<usize> {
        self.render_at(report, out, chrono::Utc::now().timestamp_millis())
    }

    /// Render into `out` with durations measured up to `now_millis`.
    pub fn render_at<W: Write>(
        &self,
        report: &ReportMetrics,
        out: &mut W,
        now_millis: i64,
    ) -> io::Result<usize> {
        let mut pass = RenderPass {
            encoder: self,
            report,
            now_millis,
            out,
            written: 0,
        };
        for metric in &report.metrics {
            pass.metric(metric)?;
        }
        Ok(pass.written)
    }

    /// Render the whole payload into a string.
    pub fn render_to_string(&self, report: &ReportMetrics) -> Result<String> {
        let mut buffer = Vec::with_capacity(report.len() * 256);
        self.render(report, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ReporterError::Encode(e.to_string()))
    }
}

/// State for one rendering pass; `now_millis` is shared by every duration.
struct RenderPass<'e, 'a, W: Write> {
    encoder: &'e BulkEncoder<'a>,
    report: &'e ReportMetrics,
    now_millis: i64,
    out: &'e mut W,
    written: usize,
}

impl<'e, 'a, W: Write> RenderPass<'e, 'a, W> {
    fn metric(&mut self, metric: &MetricRecord) -> io::Result<()> {
        match metric {
            MetricRecord::Timed(timed) => self.timed(timed),
            MetricRecord::BucketedTimed { buckets, .. } => {
                for bucket in buckets {
                    self.timed(bucket)?;
                }
                Ok(())
            },
            MetricRecord::Value { name, summary } => {
                if summary.is_empty() {
                    return Ok(());
                }
                let mut doc = self.start(MetricKind::Value, name)?;
                doc.summary("norm", Some(summary))?;
                doc.end()
            },
            MetricRecord::Counter { name, stats } => {
                let mut doc = self.start(MetricKind::Counter, name)?;
                let dur = doc.duration_secs(stats.start_millis);
                doc.raw("count", stats.count)?;
                doc.raw("dur", dur)?;
                doc.end()
            },
            MetricRecord::GaugeDouble { name, value } => {
                let places = self.encoder.config.decimal_places;
                let mut doc = self.start(MetricKind::Gauge, name)?;
                if value.is_finite() {
                    doc.raw("val", format!("{:.*}", places, value))?;
                } else {
                    doc.raw("val", "null")?;
                }
                doc.end()
            },
            MetricRecord::GaugeLong { name, value } => {
                let mut doc = self.start(MetricKind::GaugeLong, name)?;
                doc.raw("val", value)?;
                doc.end()
            },
        }
    }

    fn timed(&mut self, timed: &TimedRecord) -> io::Result<()> {
        if !timed.has_events() {
            return Ok(());
        }
        let mut doc = self.start(MetricKind::Timed, &timed.name)?;
        if let Some(label) = &timed.bucket {
            doc.string("bucket", label)?;
        }
        doc.summary("norm", timed.success.as_ref())?;
        doc.summary("error", timed.error.as_ref())?;
        doc.end()
    }

    /// Write the action line and the common document fields.
    fn start(&mut self, kind: MetricKind, name: &str) -> io::Result<Document<'_, W>> {
        let config = self.encoder.config;
        self.out.write_all(self.encoder.header.as_bytes())?;
        self.written += 1;

        let mut doc = Document::begin(&mut *self.out, self.now_millis)?;
        doc.raw(&config.timestamp_field, self.report.collection_time_millis)?;
        for (key, value) in &config.tags {
            doc.string(key, value)?;
        }
        doc.string(&config.type_field, kind.wire_name())?;
        doc.string(&config.name_field, name)?;
        Ok(doc)
    }
}

/// A single JSON object being written field by field.
struct Document<'w, W: Write> {
    out: &'w mut W,
    now_millis: i64,
    empty: bool,
}

impl<'w, W: Write> Document<'w, W> {
    fn begin(out: &'w mut W, now_millis: i64) -> io::Result<Self> {
        out.write_all(b"{")?;
        Ok(Self {
            out,
            now_millis,
            empty: true,
        })
    }

    fn key(&mut self, key: &str) -> io::Result<()> {
        if !self.empty {
            self.out.write_all(b",")?;
        }
        self.empty = false;
        serde_json::to_writer(&mut *self.out, key)?;
        self.out.write_all(b":")
    }

    fn string(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.key(key)?;
        serde_json::to_writer(&mut *self.out, value)?;
        Ok(())
    }

    fn raw(&mut self, key: &str, value: impl std::fmt::Display) -> io::Result<()> {
        self.key(key)?;
        write!(self.out, "{}", value)
    }

    /// `{"count":0}` when empty, otherwise count/avg/max/sum/dur.
    fn summary(&mut self, key: &str, summary: Option<&DistributionSummary>) -> io::Result<()> {
        self.key(key)?;
        match summary.filter(|s| !s.is_empty()) {
            Some(s) => {
                let dur = self.duration_secs(s.start_millis);
                write!(
                    self.out,
                    "{{\"count\":{},\"avg\":{},\"max\":{},\"sum\":{},\"dur\":{}}}",
                    s.count,
                    s.mean(),
                    s.max,
                    s.sum,
                    dur
                )
            },
            None => self.out.write_all(b"{\"count\":0}"),
        }
    }

    /// Whole seconds since `start_millis`, rounded half away from zero.
    fn duration_secs(&self, start_millis: i64) -> i64 {
        let elapsed = self.now_millis - start_millis;
        if elapsed >= 0 {
            (elapsed + 500) / 1000
        } else {
            (elapsed - 500) / 1000
        }
    }

    fn end(self) -> io::Result<()> {
        self.out.write_all(b"}\n")
    }
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
