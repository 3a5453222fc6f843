//! Platform abstraction ports
//!
//! Kept behind traits so reconciliation code stays deterministic under test.

use chrono::{DateTime, Utc};

/// Wall-clock time source
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
