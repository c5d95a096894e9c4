//! Time source for the polling loops and payload timestamps.

use std::thread;
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Injectable clock.
pub trait Clock: Send + Sync {
    /// Monotonic instant used for deadlines.
    fn now(&self) -> Instant;

    /// Suspends the calling thread.
    fn sleep(&self, duration: Duration);

    /// Current UTC time as RFC 3339 text.
    fn timestamp(&self) -> String;
}

/// Wall-clock implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    fn timestamp(&self) -> String {
        let now = OffsetDateTime::now_utc();
        now.format(&Rfc3339)
            .unwrap_or_else(|_| now.unix_timestamp().to_string())
    }
}
