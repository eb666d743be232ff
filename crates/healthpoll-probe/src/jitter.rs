//! Randomized delay between rounds.
//!
//! The delay is `u² × max_delay` with `u` uniform in `[0, 1)`, so
//! `P(delay ≤ x) = sqrt(x / max_delay)`: mostly short waits with a long
//! tail up to the cap. `u` comes from the OS CSPRNG so independent
//! pollers do not fall into step with each other.

use std::time::Duration;

use tracing::error;

/// Upper bound of the delay unless configured otherwise (20 minutes).
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(1_200_000);

/// Resolution of the uniform draw.
const SCALE: u32 = 1_000_000_000;

/// Source of uniformly distributed integers.
pub trait RandomSource: Send {
    /// A uniform integer in `[0, bound)`.
    fn next_below(&mut self, bound: u32) -> Result<u32, getrandom::Error>;
}

/// Uniform integers from the operating system's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn next_below(&mut self, bound: u32) -> Result<u32, getrandom::Error> {
        // Reject draws from the incomplete last bucket to stay unbiased.
        let zone = u32::MAX - (u32::MAX % bound);
        loop {
            let mut buf = [0u8; 4];
            getrandom::getrandom(&mut buf)?;
            let n = u32::from_le_bytes(buf);
            if n < zone {
                return Ok(n % bound);
            }
        }
    }
}

/// Computes the delay before the next round.
pub struct JitterScheduler {
    max_delay: Duration,
    random: Box<dyn RandomSource>,
}

impl JitterScheduler {
    /// Scheduler drawing from the OS CSPRNG.
    pub fn new(max_delay: Duration) -> Self {
        Self::with_source(max_delay, Box::new(OsRandom))
    }

    pub fn with_source(max_delay: Duration, random: Box<dyn RandomSource>) -> Self {
        Self { max_delay, random }
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Draw the next delay, in `[0, max_delay]`.
    ///
    /// Falls back to `max_delay` if the random source fails.
    pub fn next_delay(&mut self) -> Duration {
        match self.random.next_below(SCALE) {
            Ok(n) => {
                let u = f64::from(n) / f64::from(SCALE);
                self.max_delay.mul_f64(u * u)
            }
            Err(e) => {
                error!(error = %e, "random source failed, using maximum delay");
                self.max_delay
            }
        }
    }
}

impl Default for JitterScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELAY)
    }
}
