use super::*;

#[test]
fn no_codes_before_first_completion() {
    assert!(earned_codes(0).is_empty());
}

#[test]
fn first_completion_earns_first_done() {
    assert_eq!(earned_codes(1), vec!["first_done"]);
}

#[test]
fn thresholds_are_inclusive() {
    assert_eq!(earned_codes(9), vec!["first_done"]);
    assert_eq!(earned_codes(10), vec!["first_done", "ten_done"]);
}

#[test]
fn all_codes_at_one_hundred() {
    assert_eq!(earned_codes(100), vec!["first_done", "ten_done", "fifty_done", "hundred_done"]);
    assert_eq!(earned_codes(10_000), earned_codes(100));
}

#[test]
fn negative_counts_earn_nothing() {
    assert!(earned_codes(-5).is_empty());
}
