use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::GlycoError;

pub const DEFAULT_MAX_RETRIES: usize = 5;
pub const DEFAULT_TIME_UNIT: Duration = Duration::from_secs(1);

/// Exponential backoff with jitter: the delay starts at one time unit and
/// becomes `delay * 2 + uniform[0, 1)` after every failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub time_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            time_unit: DEFAULT_TIME_UNIT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, time_unit: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            time_unit,
        }
    }

    /// Delays, in time units, slept after each failed attempt.
    pub fn delays<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        let mut delays = Vec::with_capacity(self.max_retries);
        let mut delay = 1.0_f64;
        for _ in 0..self.max_retries {
            delays.push(delay);
            delay = next_delay(delay, rng);
        }
        delays
    }

    pub fn run<T, F>(&self, service: &'static str, target: &str, mut op: F) -> Result<T, GlycoError>
    where
        F: FnMut() -> Result<T, GlycoError>,
    {
        let mut rng = rand::thread_rng();
        let mut delay = 1.0_f64;
        let attempts = self.max_retries.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    warn!(service, target, attempt, error = %err, "remote call failed");
                    last_error = err.to_string();
                }
                Err(err) => return Err(err),
            }
            if attempt < attempts {
                thread::sleep(backoff(self.time_unit, delay));
                delay = next_delay(delay, &mut rng);
            }
        }
        Err(GlycoError::FetchExhausted {
            service,
            target: target.to_string(),
            attempts,
            last_error,
        })
    }
}

/// `delay` time units as a `Duration`, saturating at `Duration::MAX` once the
/// doubling schedule overflows.
fn backoff(time_unit: Duration, delay: f64) -> Duration {
    if time_unit.is_zero() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(time_unit.as_secs_f64() * delay).unwrap_or(Duration::MAX)
}

fn next_delay<R: Rng>(delay: f64, rng: &mut R) -> f64 {
    delay * 2.0 + rng.gen_range(0.0..1.0)
}
