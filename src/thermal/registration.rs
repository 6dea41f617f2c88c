//! Platform profile framework collaborator and registration retries.
//!
//! The framework may not be ready when the device starts, so registration is
//! retried with bounded exponential backoff. This is the only retried
//! firmware-adjacent operation in the crate.

use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{Result, SenseError};
use crate::thermal::{ProfileSet, ThermalProfile};

/// External platform profile framework.
///
/// Receives the probed profile choices once and is told whenever firmware
/// changes the profile on its own (mode key).
pub trait ProfileFramework: Send + Sync {
    /// Register the device with its supported profiles.
    fn register(&self, choices: ProfileSet) -> std::result::Result<(), String>;

    /// Profile changed outside the framework's own set path.
    fn profile_changed(&self, profile: ThermalProfile);
}

/// Framework that accepts everything and only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFramework;

impl ProfileFramework for NullFramework {
    fn register(&self, choices: ProfileSet) -> std::result::Result<(), String> {
        debug!("Profile choices: {}", choices);
        Ok(())
    }

    fn profile_changed(&self, profile: ThermalProfile) {
        info!("Thermal profile changed to {}", profile);
    }
}

/// Bounded exponential backoff schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    pub attempts: u32,
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 10,
            initial: Duration::from_millis(100),
            max: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    /// Delays slept between consecutive attempts (one fewer than `attempts`).
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let count = self.attempts.saturating_sub(1) as usize;
        std::iter::successors(Some(self.initial.min(self.max)), |d| {
            Some((*d * 2).min(self.max))
        })
        .take(count)
    }
}

/// Register `choices` with `framework`, retrying on failure.
///
/// # Arguments
/// * `sleep` - Called with each delay between attempts
///
/// # Returns
/// The attempt number that succeeded.
///
/// # Errors
/// Returns `Registration` once every attempt has failed.
pub fn register_with_backoff(
    framework: &dyn ProfileFramework,
    choices: ProfileSet,
    backoff: &Backoff,
    mut sleep: impl FnMut(Duration),
) -> Result<u32> {
    let mut delays = backoff.delays();
    let mut last_error = String::from("no attempts configured");

    for attempt in 1..=backoff.attempts {
        match framework.register(choices) {
            Ok(()) => {
                info!(
                    "Platform profile registered successfully (attempt {})",
                    attempt
                );
                return Ok(attempt);
            }
            Err(e) => {
                warn!(
                    "Platform profile registration failed (attempt {}/{}): {}",
                    attempt, backoff.attempts, e
                );
                last_error = e;
            }
        }
        if let Some(delay) = delays.next() {
            sleep(delay);
        }
    }

    Err(SenseError::Registration {
        attempts: backoff.attempts,
        message: last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyFramework {
        failures: u32,
        calls: AtomicU32,
    }

    impl ProfileFramework for FlakyFramework {
        fn register(&self, _choices: ProfileSet) -> std::result::Result<(), String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err("not ready".into())
            } else {
                Ok(())
            }
        }

        fn profile_changed(&self, _profile: ThermalProfile) {}
    }

    #[test]
    fn test_backoff_schedule() {
        let delays: Vec<u64> = Backoff::default()
            .delays()
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000, 1000, 1000, 1000]);
    }

    #[test]
    fn test_register_succeeds_after_retries() {
        let framework = FlakyFramework {
            failures: 3,
            calls: AtomicU32::new(0),
        };
        let mut slept = Vec::new();
        let attempt = register_with_backoff(
            &framework,
            ProfileSet::empty(),
            &Backoff::default(),
            |d| slept.push(d),
        )
        .unwrap();

        assert_eq!(attempt, 4);
        assert_eq!(slept.len(), 3);
    }

    #[test]
    fn test_register_gives_up() {
        let framework = FlakyFramework {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        };
        let mut sleeps = 0;
        let result = register_with_backoff(
            &framework,
            ProfileSet::empty(),
            &Backoff::default(),
            |_| sleeps += 1,
        );

        assert!(matches!(
            result,
            Err(SenseError::Registration { attempts: 10, .. })
        ));
        assert_eq!(framework.calls.load(Ordering::SeqCst), 10);
        assert_eq!(sleeps, 9);
    }
}
