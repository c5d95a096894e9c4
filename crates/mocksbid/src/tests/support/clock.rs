//! Clock with a frozen wall-clock timestamp.

use std::thread;
use std::time::{Duration, Instant};

use crate::device::Clock;

/// Real monotonic time and sleeps, but a fixed `timestamp()`.
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: String,
}

impl FixedClock {
    pub fn at(timestamp: &str) -> Self {
        Self {
            timestamp: timestamp.to_owned(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    fn timestamp(&self) -> String {
        self.timestamp.clone()
    }
}
