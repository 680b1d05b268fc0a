use super::*;

#[test]
fn per_user_allows_up_to_limit() {
    let rl = RateLimiter::new();
    let user = Uuid::new_v4();
    let now = Instant::now();

    for i in 0..DEFAULT_PER_USER_LIMIT {
        assert!(rl.check_and_record_at(user, now).is_ok(), "request {i} should succeed");
    }
    assert!(matches!(
        rl.check_and_record_at(user, now),
        Err(RateLimitError::PerUserExceeded { .. })
    ));
}

#[test]
fn global_allows_up_to_limit() {
    let rl = RateLimiter::new();
    let now = Instant::now();

    // Use distinct users to avoid hitting the per-user limit first.
    for i in 0..DEFAULT_GLOBAL_LIMIT {
        let user = Uuid::new_v4();
        assert!(rl.check_and_record_at(user, now).is_ok(), "request {i} should succeed");
    }
    let user = Uuid::new_v4();
    assert!(matches!(
        rl.check_and_record_at(user, now),
        Err(RateLimitError::GlobalExceeded { .. })
    ));
}

#[test]
fn window_expiry_allows_new_requests() {
    let rl = RateLimiter::new();
    let user = Uuid::new_v4();
    let start = Instant::now();

    // Fill up the per-user limit.
    for _ in 0..DEFAULT_PER_USER_LIMIT {
        rl.check_and_record_at(user, start).unwrap();
    }
    assert!(rl.check_and_record_at(user, start).is_err());

    // After the window passes, requests should succeed again.
    let after_window = start + Duration::from_secs(DEFAULT_PER_USER_WINDOW_SECS) + Duration::from_millis(1);
    assert!(rl.check_and_record_at(user, after_window).is_ok());
}

#[test]
fn distinct_users_do_not_interfere() {
    let rl = RateLimiter::new();
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    let now = Instant::now();

    // Fill up user A.
    for _ in 0..DEFAULT_PER_USER_LIMIT {
        rl.check_and_record_at(user_a, now).unwrap();
    }
    assert!(rl.check_and_record_at(user_a, now).is_err());

    // User B should still be able to make requests.
    assert!(rl.check_and_record_at(user_b, now).is_ok());
}

#[test]
fn idle_users_are_swept_after_a_window() {
    let rl = RateLimiter::new();
    let start = Instant::now();

    rl.check_and_record_at(Uuid::new_v4(), start).unwrap();
    assert_eq!(rl.tracked_user_count(), 1);

    // A request a full window later sweeps the idle entry out of the map.
    let after_window = start + Duration::from_secs(DEFAULT_PER_USER_WINDOW_SECS) + Duration::from_millis(1);
    rl.check_and_record_at(Uuid::new_v4(), after_window).unwrap();
    assert_eq!(rl.tracked_user_count(), 1);
}

#[test]
fn error_messages_name_the_window() {
    let err = RateLimitError::PerUserExceeded { limit: 120, window_secs: 60 };
    assert!(err.to_string().contains("120"));
    assert!(err.to_string().contains("60"));
}
