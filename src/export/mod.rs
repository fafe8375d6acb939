//! Export of metric snapshots in the Elasticsearch bulk format.
//!
//! Indices roll over daily: the index name is the configured prefix followed
//! by the local date, e.g. `metric-2024.01.31`.

pub mod bulk;

pub use bulk::BulkEncoder;

use chrono::NaiveDate;

/// Date format used for the daily index suffix
pub const INDEX_DATE_FORMAT: &str = "%Y.%m.%d";

/// Index suffix for the given day.
pub fn index_suffix(date: NaiveDate) -> String {
    date.format(INDEX_DATE_FORMAT).to_string()
}

/// Index suffix for the current local day.
pub fn today_suffix() -> String {
    index_suffix(chrono::Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_suffix_format() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(index_suffix(date), "2024.01.05");
    }

    #[test]
    fn test_today_suffix_shape() {
        let suffix = today_suffix();
        assert_eq!(suffix.len(), 10);
        assert_eq!(suffix.matches('.').count(), 2);
    }
}
