//! Immutable per-interval metric snapshots.
//!
//! These are produced by the metric registry once per collection interval and
//! handed to a reporter. Nothing here is mutated after construction.

/// Count/sum/max snapshot of a sampled value stream over one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DistributionSummary {
    /// Number of recorded events
    pub count: u64,
    /// Sum of all recorded values
    pub sum: u64,
    /// Largest recorded value
    pub max: u64,
    /// Epoch millis when accumulation started
    pub start_millis: i64,
}

impl DistributionSummary {
    /// Create a summary for an interval that saw events.
    pub fn new(count: u64, sum: u64, max: u64, start_millis: i64) -> Self {
        Self {
            count,
            sum,
            max,
            start_millis,
        }
    }

    /// Summary of an interval with no events.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no events were recorded; the other fields carry no meaning.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Mean value rounded half away from zero, `0` when empty.
    pub fn mean(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        let rounded = (u128::from(self.sum) + u128::from(self.count / 2)) / u128::from(self.count);
        u64::try_from(rounded).unwrap_or(u64::MAX)
    }
}

/// Counter reading for one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterStats {
    /// Events counted in the interval
    pub count: u64,
    /// Epoch millis when counting started
    pub start_millis: i64,
}

/// A timer, either standalone or one bucket of a bucketed timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedRecord {
    /// Dotted metric name
    pub name: String,
    /// Successful executions, `None` when there were none
    pub success: Option<DistributionSummary>,
    /// Failed executions, `None` when there were none
    pub error: Option<DistributionSummary>,
    /// Range label such as `100-1000` when this is a bucket
    pub bucket: Option<String>,
}

impl TimedRecord {
    /// Create a timer record without a bucket label.
    pub fn new(
        name: impl Into<String>,
        success: Option<DistributionSummary>,
        error: Option<DistributionSummary>,
    ) -> Self {
        Self {
            name: name.into(),
            success,
            error,
            bucket: None,
        }
    }

    /// Attach a bucket range label.
    pub fn with_bucket(mut self, label: impl Into<String>) -> Self {
        self.bucket = Some(label.into());
        self
    }

    /// Number of successful events
    pub fn success_count(&self) -> u64 {
        self.success.map_or(0, |s| s.count)
    }

    /// Number of failed events
    pub fn error_count(&self) -> u64 {
        self.error.map_or(0, |s| s.count)
    }

    /// True if anything happened in this interval.
    pub fn has_events(&self) -> bool {
        self.success_count() > 0 || self.error_count() > 0
    }
}

/// Kind of a metric as written to the document type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Timer or bucketed timer
    Timed,
    /// Value distribution
    Value,
    /// Counter
    Counter,
    /// Floating point gauge
    Gauge,
    /// Integer gauge
    GaugeLong,
}

impl MetricKind {
    /// Document type value
    pub fn wire_name(&self) -> &'static str {
        match self {
            MetricKind::Timed => "timed",
            MetricKind::Value => "value",
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::GaugeLong => "gaugeLong",
        }
    }
}

/// One metric in a report.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricRecord {
    /// A timer with success and error distributions
    Timed(TimedRecord),
    /// A timer split into latency buckets, in bucket order
    BucketedTimed {
        /// Dotted metric name
        name: String,
        /// One timer per bucket
        buckets: Vec<TimedRecord>,
    },
    /// A value distribution
    Value {
        /// Dotted metric name
        name: String,
        /// Collected distribution
        summary: DistributionSummary,
    },
    /// An event counter
    Counter {
        /// Dotted metric name
        name: String,
        /// Collected counter reading
        stats: CounterStats,
    },
    /// A floating point gauge reading
    GaugeDouble {
        /// Dotted metric name
        name: String,
        /// Current reading
        value: f64,
    },
    /// An integer gauge reading
    GaugeLong {
        /// Dotted metric name
        name: String,
        /// Current reading
        value: i64,
    },
}

impl MetricRecord {
    /// Counter with `count` events since `start_millis`.
    pub fn counter(name: impl Into<String>, count: u64, start_millis: i64) -> Self {
        MetricRecord::Counter {
            name: name.into(),
            stats: CounterStats {
                count,
                start_millis,
            },
        }
    }

    /// Value distribution.
    pub fn value(name: impl Into<String>, summary: DistributionSummary) -> Self {
        MetricRecord::Value {
            name: name.into(),
            summary,
        }
    }

    /// Floating point gauge.
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        MetricRecord::GaugeDouble {
            name: name.into(),
            value,
        }
    }

    /// Integer gauge.
    pub fn gauge_long(name: impl Into<String>, value: i64) -> Self {
        MetricRecord::GaugeLong {
            name: name.into(),
            value,
        }
    }

    /// Dotted metric name
    pub fn name(&self) -> &str {
        match self {
            MetricRecord::Timed(timed) => &timed.name,
            MetricRecord::BucketedTimed { name, .. }
            | MetricRecord::Value { name, .. }
            | MetricRecord::Counter { name, .. }
            | MetricRecord::GaugeDouble { name, .. }
            | MetricRecord::GaugeLong { name, .. } => name,
        }
    }

    /// Kind written to the type field
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricRecord::Timed(_) | MetricRecord::BucketedTimed { .. } => MetricKind::Timed,
            MetricRecord::Value { .. } => MetricKind::Value,
            MetricRecord::Counter { .. } => MetricKind::Counter,
            MetricRecord::GaugeDouble { .. } => MetricKind::Gauge,
            MetricRecord::GaugeLong { .. } => MetricKind::GaugeLong,
        }
    }
}

/// Everything collected in one interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMetrics {
    /// Epoch millis of the collection
    pub collection_time_millis: i64,
    /// Collected metrics in registry order
    pub metrics: Vec<MetricRecord>,
}

impl ReportMetrics {
    /// Create a report.
    pub fn new(collection_time_millis: i64, metrics: Vec<MetricRecord>) -> Self {
        Self {
            collection_time_millis,
            metrics,
        }
    }

    /// True if there is nothing to report
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Number of metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }
}
