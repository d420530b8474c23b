use std::time::Duration;

use rand::Rng;

/// Randomised pause range used between discovery requests and after every
/// apply or message attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    min_secs: f64,
    max_secs: f64,
}

impl Pacing {
    /// Bounds are clamped to be non-negative and swapped if reversed.
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        let (a, b) = (min_secs.max(0.0), max_secs.max(0.0));
        if a <= b {
            Self { min_secs: a, max_secs: b }
        } else {
            Self { min_secs: b, max_secs: a }
        }
    }

    pub fn none() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn min_secs(&self) -> f64 {
        self.min_secs
    }

    pub fn max_secs(&self) -> f64 {
        self.max_secs
    }

    pub fn sample(&self) -> Duration {
        if self.max_secs <= self.min_secs {
            return Duration::from_secs_f64(self.min_secs);
        }
        let secs = rand::rng().random_range(self.min_secs..=self.max_secs);
        Duration::from_secs_f64(secs)
    }

    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tracing::debug!("Pausing {:.1}s", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }
}
