//! Metric snapshot model.
//!
//! The registry normalises each metric into a [`MetricRecord`] before it is
//! encoded. The set of variants is closed so the encoder can match on it
//! exhaustively.

pub mod types;

pub use types::{
    CounterStats, DistributionSummary, MetricKind, MetricRecord, ReportMetrics, TimedRecord,
};

#[cfg(test)]
mod tests {
    use super::types::*;

    #[test]
    fn test_summary_mean_rounds_half_up() {
        let summary = DistributionSummary::new(2, 5, 3, 0);
        assert_eq!(summary.mean(), 3);

        let summary = DistributionSummary::new(3, 10, 5, 0);
        assert_eq!(summary.mean(), 3);
    }

    #[test]
    fn test_summary_mean_near_max_does_not_overflow() {
        let summary = DistributionSummary::new(3, u64::MAX, u64::MAX, 0);
        assert_eq!(summary.mean(), u64::MAX / 3);

        let summary = DistributionSummary::new(1, u64::MAX, u64::MAX, 0);
        assert_eq!(summary.mean(), u64::MAX);
    }

    #[test]
    fn test_empty_summary() {
        let summary = DistributionSummary::empty();
        assert!(summary.is_empty());
        assert_eq!(summary.mean(), 0);
    }

    #[test]
    fn test_timed_has_events() {
        let timed = TimedRecord::new("org.test.Foo.doStuff", None, None);
        assert!(!timed.has_events());

        let timed = TimedRecord::new(
            "org.test.Foo.doStuff",
            Some(DistributionSummary::empty()),
            Some(DistributionSummary::new(1, 205, 205, 0)),
        );
        assert!(timed.has_events());
        assert_eq!(timed.success_count(), 0);
        assert_eq!(timed.error_count(), 1);
    }

    #[test]
    fn test_record_kind_and_name() {
        let counter = MetricRecord::counter("org.one.Foo.count", 1, 0);
        assert_eq!(counter.name(), "org.one.Foo.count");
        assert_eq!(counter.kind().wire_name(), "counter");

        let bucketed = MetricRecord::BucketedTimed {
            name: "org.test.Bucket.doStuff".to_string(),
            buckets: vec![],
        };
        assert_eq!(bucketed.kind(), MetricKind::Timed);
        assert_eq!(MetricRecord::gauge_long("x", 1).kind().wire_name(), "gaugeLong");
    }
}
