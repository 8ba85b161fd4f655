//! Tests for utility modules (retry, timeout, reply text helpers).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use skill_runner::error::SkillError;
use skill_runner::util::retry::RetryPolicy;
use skill_runner::util::text::{extract_json_payload, needs_more_input, truncate_utf8};
use skill_runner::util::timeout::with_timeout;

#[tokio::test(start_paused = true)]
async fn retry_policy_returns_last_error_when_attempts_are_exhausted() {
    let policy = RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(50),
        max_backoff: Duration::from_millis(50),
        multiplier: 2.0,
    };
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_task = attempts.clone();

    let task = tokio::spawn(async move {
        policy
            .execute(|| {
                let attempts = attempts_for_task.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(SkillError::RateLimited {
                        retry_after_ms: None,
                    })
                }
            })
            .await
    });

    let result = task.await.unwrap();

    match result {
        Err(SkillError::RateLimited { retry_after_ms }) => assert_eq!(retry_after_ms, None),
        other => panic!("expected rate limit error, got {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_policy_none_makes_a_single_attempt() {
    let attempts = AtomicUsize::new(0);

    let result = RetryPolicy::none()
        .execute(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(SkillError::Timeout(10)) }
        })
        .await;

    assert!(matches!(result, Err(SkillError::Timeout(10))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn session_errors_are_never_retried() {
    let attempts = AtomicUsize::new(0);

    let result = RetryPolicy::default()
        .execute(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(SkillError::transport("gone")) }
        })
        .await;

    assert!(matches!(result, Err(SkillError::Transport(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn with_timeout_reports_configured_duration() {
    let result = with_timeout(Duration::from_millis(250), async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok::<_, SkillError>(())
    })
    .await;

    assert!(matches!(result, Err(SkillError::Timeout(250))));
}

#[test]
fn payload_is_extracted_from_a_typical_reply() {
    let reply = "I found these options:\n\n```json\n{\"options\": [\"a\", \"b\"]}\n```\n\nWhich one?";
    assert_eq!(extract_json_payload(reply), Some(json!({"options": ["a", "b"]})));
    assert_eq!(extract_json_payload("No structured data here."), None);
}

#[test]
fn need_more_input_is_case_insensitive() {
    assert!(needs_more_input("PLEASE SPECIFY the city."));
    assert!(needs_more_input("I need to know your budget."));
    assert!(!needs_more_input("Here is the forecast."));
}

#[test]
fn truncate_utf8_respects_char_boundaries() {
    assert_eq!(truncate_utf8("héllo", 2), "h");
    assert_eq!(truncate_utf8("hello", 10), "hello");
}
