//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::SkillError;

/// Wrap a future with a timeout, mapping expiry to [`SkillError::Timeout`].
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, SkillError>>,
) -> Result<T, SkillError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(SkillError::Timeout(duration.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expiry_maps_to_timeout_error() {
        let result: Result<(), SkillError> = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(SkillError::Timeout(50))));
    }

    #[tokio::test]
    async fn inner_result_passes_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
