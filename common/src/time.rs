//! Time utilities and constants for rate resolution.

use chrono::{DateTime, Duration, Utc};

/// Timing constants.
pub mod constants {
    use super::Duration;

    /// Cache lifetime of black-market quotes (5 minutes).
    pub fn black_market_ttl() -> Duration {
        Duration::minutes(5)
    }

    /// Cache lifetime of general API quotes (60 minutes).
    pub fn general_ttl() -> Duration {
        Duration::minutes(60)
    }

    /// Upper bound on a single upstream fetch (10 seconds).
    pub fn fetch_timeout() -> Duration {
        Duration::seconds(10)
    }

    /// Budget of one source inside a fallback chain (4 seconds).
    pub fn provider_timeout() -> Duration {
        Duration::seconds(4)
    }
}

/// A timestamp, always UTC.
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Check if a timestamp has been reached.
pub fn is_expired(expiry: Timestamp) -> bool {
    now() >= expiry
}

/// Calculate expiry time from now.
pub fn expires_in(duration: Duration) -> Timestamp {
    now() + duration
}

/// Duration extensions for convenient construction.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired() {
        let past = now() - Duration::seconds(10);
        assert!(is_expired(past));

        let future = expires_in(Duration::seconds(10));
        assert!(!is_expired(future));
    }

    #[test]
    fn test_as_std_clamps_negative() {
        assert_eq!(Duration::seconds(-5).as_std(), std::time::Duration::ZERO);
        assert_eq!(
            constants::fetch_timeout().as_std(),
            std::time::Duration::from_secs(10)
        );
    }
}
