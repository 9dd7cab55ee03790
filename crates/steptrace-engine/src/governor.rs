//! Resource governor: bounds runaway traced programs.
//!
//! Two independent caps, both checked at every instrumentation event before
//! any other work happens for that event: a maximum event count (catches
//! busy loops that trace many lines) and a maximum wall-clock duration since
//! run start (catches long-running, low-event-rate loops). The governor is
//! polled only at event boundaries, so code inside unaccepted frames is not
//! reliably bounded — a documented limitation of cooperative cancellation.

use std::time::{Duration, Instant};

use crate::error::RuntimeError;

/// Caps applied to a single traced run.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum number of instrumentation events (calls, lines, returns).
    pub max_events: u64,
    /// Maximum wall-clock duration since run start.
    pub max_duration: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_events: 10_000,
            max_duration: Duration::from_secs(5),
        }
    }
}

/// Per-run event and time accounting.
#[derive(Debug)]
pub struct Governor {
    limits: Limits,
    started: Instant,
    events: u64,
}

impl Governor {
    pub fn new(limits: Limits) -> Self {
        Governor {
            limits,
            started: Instant::now(),
            events: 0,
        }
    }

    /// Accounts for one instrumentation event and trips if either cap is
    /// exceeded. The resulting error unwinds like any runtime failure; the
    /// trace collected so far is retained by the caller.
    pub fn on_event(&mut self) -> Result<(), RuntimeError> {
        self.events += 1;
        if self.events > self.limits.max_events {
            return Err(RuntimeError::StepLimitExceeded {
                limit: self.limits.max_events,
            });
        }
        if self.started.elapsed() > self.limits.max_duration {
            return Err(RuntimeError::TimeLimitExceeded {
                millis: self.limits.max_duration.as_millis() as u64,
            });
        }
        Ok(())
    }

    /// Events accounted so far.
    pub fn events(&self) -> u64 {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_both_caps_is_ok() {
        let mut gov = Governor::new(Limits::default());
        for _ in 0..100 {
            gov.on_event().unwrap();
        }
        assert_eq!(gov.events(), 100);
    }

    #[test]
    fn event_cap_trips_with_step_limit() {
        let mut gov = Governor::new(Limits {
            max_events: 3,
            max_duration: Duration::from_secs(60),
        });
        gov.on_event().unwrap();
        gov.on_event().unwrap();
        gov.on_event().unwrap();
        let err = gov.on_event().unwrap_err();
        assert!(matches!(err, RuntimeError::StepLimitExceeded { limit: 3 }));
    }

    #[test]
    fn time_cap_trips_with_time_limit() {
        let mut gov = Governor::new(Limits {
            max_events: u64::MAX,
            max_duration: Duration::ZERO,
        });
        std::thread::sleep(Duration::from_millis(2));
        let err = gov.on_event().unwrap_err();
        assert!(matches!(err, RuntimeError::TimeLimitExceeded { .. }));
    }
}
