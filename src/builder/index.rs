use chrono::{DateTime, Utc};

pub const DEFAULT_INDEX_PREFIX: &str = "logstash-";

/// Daily index naming, `logstash-2017.05.11` style.
#[derive(Debug, Clone)]
pub struct IndexRouter {
    prefix: String,
}

impl Default for IndexRouter {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_PREFIX)
    }
}

impl IndexRouter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn index_for(&self, event_time: &DateTime<Utc>) -> String {
        format!("{}{}", self.prefix, event_time.format("%Y.%m.%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_daily_index_name() {
        let router = IndexRouter::default();
        let time = Utc.with_ymd_and_hms(2017, 5, 11, 23, 59, 59).unwrap();
        assert_eq!(router.index_for(&time), "logstash-2017.05.11");
    }

    #[test]
    fn test_custom_prefix() {
        let router = IndexRouter::new("containers-");
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(router.index_for(&time), "containers-2024.01.02");
    }
}
