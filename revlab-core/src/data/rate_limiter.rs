//! Request spacing and exponential backoff for the data provider.
//!
//! Two pieces:
//! - [`RateLimiter`]: process-wide minimum spacing between granted requests,
//!   shared by all fetch workers.
//! - [`RetryPolicy`] / [`Backoff`]: per-request exponential backoff expressed
//!   as an explicit state machine, independent of any concurrency primitive.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Backoff configuration for rate-limited requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Minimum spacing between requests, and the base of the backoff curve.
    pub base_delay: Duration,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Multiplicative backoff factor.
    pub backoff_factor: f64,
    /// Add a random 0.5–2.0s offset to backoff sleeps (thundering-herd
    /// avoidance for live fetching; keep off in deterministic tests).
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs_f64(3.0),
            max_retries: 3,
            backoff_factor: 2.0,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay for the given failure (1-based):
    /// `base_delay * backoff_factor ^ attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let scale = self.backoff_factor.powi(attempt as i32);
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * scale)
    }

    /// Delay to actually sleep: `delay(attempt)` plus jitter when enabled.
    pub fn sleep_delay(&self, attempt: u32) -> Duration {
        let mut delay = self.delay(attempt);
        if self.jitter {
            use rand::Rng;
            delay += Duration::from_secs_f64(rand::thread_rng().gen_range(0.5..2.0));
        }
        delay
    }
}

/// Where a request stands in its retry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// A request attempt is in flight (or about to be issued).
    Attempting { attempt: u32 },
    /// The last attempt was rate limited; sleeping before the next one.
    BackingOff { attempt: u32, delay: Duration },
    /// Retries are used up; the request is permanently failed.
    Exhausted,
}

/// Retry state machine for a single request.
///
/// Driven by the caller: `on_rate_limit()` on each rate-limit failure,
/// `resume()` after sleeping out the returned delay. Failure count resets
/// only by constructing a fresh Backoff for the next request.
#[derive(Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    failures: u32,
    state: RetryState,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
            state: RetryState::Attempting { attempt: 1 },
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Total attempts made so far (including the one that just failed).
    pub fn attempts(&self) -> u32 {
        self.failures
    }

    /// Record a rate-limit failure. Returns the backoff delay to sleep
    /// before retrying, or None once retries are exhausted.
    pub fn on_rate_limit(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures <= self.policy.max_retries {
            let delay = self.policy.sleep_delay(self.failures);
            self.state = RetryState::BackingOff {
                attempt: self.failures,
                delay,
            };
            Some(delay)
        } else {
            self.state = RetryState::Exhausted;
            None
        }
    }

    /// Transition from BackingOff back to Attempting after the sleep.
    pub fn resume(&mut self) {
        if let RetryState::BackingOff { attempt, .. } = self.state {
            self.state = RetryState::Attempting {
                attempt: attempt + 1,
            };
        }
    }
}

/// Enforces minimum spacing between outbound requests across all workers.
///
/// The last granted timestamp is the only state shared between concurrent
/// fetch workers. `acquire()` reserves the next slot under the lock and
/// sleeps outside it, so two workers can never both fire immediately.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_grant: Mutex::new(None),
        }
    }

    /// Block until the minimum inter-request interval has elapsed since the
    /// previously granted request, then grant permission for one request.
    pub fn acquire(&self) {
        let slot = {
            let mut last = self.last_grant.lock().unwrap();
            let now = Instant::now();
            let slot = match *last {
                Some(prev) => {
                    let earliest = prev + self.interval;
                    if earliest > now {
                        earliest
                    } else {
                        now
                    }
                }
                None => now,
            };
            *last = Some(slot);
            slot
        };

        let now = Instant::now();
        if slot > now {
            std::thread::sleep(slot - now);
        }
    }
}
