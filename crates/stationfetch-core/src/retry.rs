//! Bounded retry with a fixed (or optionally exponential) delay

use std::time::Duration;

/// How the delay between attempts evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Same delay before every retry
    #[default]
    Fixed,
    /// delay * 2^(retry - 1): 1x, 2x, 4x, ...
    Exponential,
}

/// Retry budget for opening a remote session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (0 is treated as 1)
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor)
            }
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Every attempt failed; carries the last error.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `attempt_fn` until it succeeds or the policy's attempts are used up.
///
/// Sleeps on the calling thread between attempts only, never after the
/// final one. The closure receives the 1-based attempt number.
pub fn retry<T, E: std::fmt::Display>(
    policy: &RetryPolicy,
    label: &str,
    mut attempt_fn: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, Exhausted<E>> {
    let max = policy.attempts();
    let mut attempt = 1u32;
    loop {
        match attempt_fn(attempt) {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max => {
                let wait = policy.delay_after(attempt);
                log::debug!(
                    "{label}: attempt {attempt}/{max} failed: {e}, retrying in {:.1}s",
                    wait.as_secs_f64()
                );
                std::thread::sleep(wait);
                attempt += 1;
            }
            Err(e) => {
                log::warn!("{label}: giving up after {attempt} attempt(s): {e}");
                return Err(Exhausted {
                    attempts: attempt,
                    last: e,
                });
            }
        }
    }
}
