//! The server's notion of "now". Clients never get to supply a timestamp.

use chrono::{DateTime, Utc};

/// Time source for admission decisions.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct FixedTimeSource(std::sync::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl FixedTimeSource {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(std::sync::Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

#[cfg(test)]
impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}
