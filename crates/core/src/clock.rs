//! Wall-clock source for expiry checks

use chrono::{DateTime, Utc};

/// Source of the current time used by every expiry predicate
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system (or browser) time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
