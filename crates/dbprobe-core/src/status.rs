//! Tri-state health vocabulary shared by every backend driver
//!
//! A driver reports exactly one of three states after each probe step:
//!
//! - [`Status::Up`]: every step of the most recent cycle succeeded
//! - [`Status::Degraded`]: the connection is usable but a partial failure occurred
//!   (table provisioning, a write, a read, or a read/write mismatch)
//! - [`Status::Down`]: a hard failure (open, ping, or no connection at all)
//!
//! # Example
//!
//! ```rust
//! use dbprobe_core::Status;
//!
//! let status = Status::Degraded;
//! assert!(status.is_operational());
//! assert_eq!(status.health_value(), 0.5);
//! assert_eq!(status.to_string(), "degraded");
//! ```

use serde::{Deserialize, Serialize};

/// Health status of a monitored database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Database is fully operational
    Up,
    /// Database is reachable but experiencing issues
    Degraded,
    /// Database is not available
    #[default]
    Down,
}

impl Status {
    /// Check if the status is up
    pub fn is_up(&self) -> bool {
        matches!(self, Status::Up)
    }

    /// Check if the status is degraded
    pub fn is_degraded(&self) -> bool {
        matches!(self, Status::Degraded)
    }

    /// Check if the status is down
    pub fn is_down(&self) -> bool {
        matches!(self, Status::Down)
    }

    /// Check if the database can still serve requests (up or degraded)
    pub fn is_operational(&self) -> bool {
        !self.is_down()
    }

    /// Gauge value exported as `service_health`
    pub fn health_value(&self) -> f64 {
        match self {
            Status::Up => 1.0,
            Status::Degraded => 0.5,
            Status::Down => 0.0,
        }
    }

    /// Stable lowercase name, used as a metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "up",
            Status::Degraded => "degraded",
            Status::Down => "down",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(Status::Up.is_up());
        assert!(Status::Degraded.is_degraded());
        assert!(Status::Down.is_down());

        assert!(Status::Up.is_operational());
        assert!(Status::Degraded.is_operational());
        assert!(!Status::Down.is_operational());
    }

    #[test]
    fn test_health_values() {
        assert_eq!(Status::Up.health_value(), 1.0);
        assert_eq!(Status::Degraded.health_value(), 0.5);
        assert_eq!(Status::Down.health_value(), 0.0);
    }

    #[test]
    fn test_default_is_down() {
        assert_eq!(Status::default(), Status::Down);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Degraded).unwrap(), "\"degraded\"");
        let parsed: Status = serde_json::from_str("\"up\"").unwrap();
        assert_eq!(parsed, Status::Up);
    }
}
