//! The single row written and read back by every read/write check

use serde::{Deserialize, Serialize};

/// Table holding health-check records
pub const HEALTH_TABLE: &str = "dbprobe_health_check";

/// Value written on every check
pub const HEALTHY_VALUE: &str = "healthy";

/// A health-check row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Unix timestamp in seconds
    pub check_time: i64,
    pub check_value: String,
}

impl HealthRecord {
    pub fn new(check_time: i64, check_value: impl Into<String>) -> Self {
        Self {
            check_time,
            check_value: check_value.into(),
        }
    }

    /// A `"healthy"` record stamped with the current time
    pub fn healthy_now() -> Self {
        Self::new(chrono::Utc::now().timestamp(), HEALTHY_VALUE)
    }
}

impl std::fmt::Display for HealthRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.check_value, self.check_time)
    }
}
