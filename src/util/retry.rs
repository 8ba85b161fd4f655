//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::SkillError;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Execute an async operation, retrying errors that report `is_retryable`.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, SkillError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SkillError>>,
    {
        let mut backoff = self.initial_backoff;
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || attempt + 1 >= attempts {
                        return Err(e);
                    }

                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "Retrying after error"
                    );

                    let wait = match e {
                        SkillError::RateLimited {
                            retry_after_ms: Some(ms),
                        } => Duration::from_millis(ms).min(self.max_backoff),
                        _ => {
                            // Jitter: 75%-125% of backoff
                            let jitter_factor = 0.75 + (rand_factor() * 0.5);
                            Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor)
                        }
                    };
                    tokio::time::sleep(wait).await;

                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );
                }
            }
        }

        Err(SkillError::Timeout(0))
    }
}

/// Pseudo-random factor in [0, 1), seeded from the clock.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    let hash = hasher.finish();
    (hash % 10000) as f64 / 10000.0
}
