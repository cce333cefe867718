//! Unlock throttling.
//!
//! After `max_attempts` consecutive wrong passwords every unlock is refused
//! until the cool-down elapses, even with the right password. State is kept
//! in memory per wallet instance.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::SecurityConfig;

#[derive(Debug, Default)]
struct ThrottleState {
    failures: u32,
    locked_until: Option<Instant>,
}

/// Five strikes, then a cool-down.
#[derive(Debug)]
pub struct UnlockThrottle {
    max_attempts: u32,
    cooldown: Duration,
    state: Mutex<ThrottleState>,
}

impl UnlockThrottle {
    pub fn new(max_attempts: u32, cooldown: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            cooldown,
            state: Mutex::new(ThrottleState::default()),
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.max_unlock_attempts, Duration::from_secs(config.cooldown_secs))
    }

    fn state(&self) -> MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// `Err(remaining)` while a cool-down is active.
    ///
    /// An expired cool-down resets the failure count.
    pub fn check(&self) -> Result<(), Duration> {
        let mut state = self.state();
        if let Some(until) = state.locked_until {
            let now = Instant::now();
            if now < until {
                return Err(until - now);
            }
            *state = ThrottleState::default();
            tracing::info!("Unlock cool-down expired");
        }
        Ok(())
    }

    /// Count a wrong password. Returns the cool-down length when this
    /// failure starts one.
    pub fn record_failure(&self) -> Option<Duration> {
        let mut state = self.state();
        state.failures = state.failures.saturating_add(1);
        if state.failures >= self.max_attempts && state.locked_until.is_none() {
            state.locked_until = Some(Instant::now() + self.cooldown);
            tracing::warn!(
                failures = state.failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Too many failed unlock attempts, cool-down started"
            );
            return Some(self.cooldown);
        }
        None
    }

    pub fn record_success(&self) {
        *self.state() = ThrottleState::default();
    }

    pub fn failures(&self) -> u32 {
        self.state().failures
    }
}
