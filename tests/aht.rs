use tempotype::aht::{AhtEstimator, AHT_POINTS};

fn estimate_at(duration: f64, difficulty: f64) -> tempotype::aht::Estimate {
    let mut est = AhtEstimator::new(duration);
    est.set_difficulty(difficulty);
    est.estimate()
}

#[test]
fn anchor_table_is_sorted_and_monotonic() {
    for pair in AHT_POINTS.windows(2) {
        assert!(pair[0].duration < pair[1].duration);
        assert!(pair[0].lower_bound <= pair[1].lower_bound);
        assert!(pair[0].target <= pair[1].target);
        assert!(pair[0].upper_bound <= pair[1].upper_bound);
    }
}

#[test]
fn bounds_are_ordered_for_all_durations() {
    let mut d = 5.0;
    while d <= 45.0 {
        let e = estimate_at(d, 1.0);
        assert!(
            e.lower_bound <= e.target && e.target <= e.upper_bound,
            "bounds out of order at duration {d}"
        );
        d += 0.25;
    }
}

#[test]
fn target_is_monotonic_within_table_range() {
    let mut prev = estimate_at(5.0, 1.0);
    let mut d = 5.5;
    while d <= 45.0 {
        let e = estimate_at(d, 1.0);
        assert!(e.lower_bound >= prev.lower_bound, "lower bound decreased at {d}");
        assert!(e.target >= prev.target, "target decreased at {d}");
        assert!(e.upper_bound >= prev.upper_bound, "upper bound decreased at {d}");
        prev = e;
        d += 0.5;
    }
}

#[test]
fn difficulty_scales_linearly() {
    for d in [6.0, 10.0, 17.3, 30.0, 44.5] {
        let base = estimate_at(d, 1.0);
        for k in [1.5, 2.0, 3.25, 7.0] {
            let scaled = estimate_at(d, k);
            assert!((scaled.target - k * base.target).abs() < 1e-9);
            assert!((scaled.lower_bound - k * base.lower_bound).abs() < 1e-9);
            assert!((scaled.upper_bound - k * base.upper_bound).abs() < 1e-9);
        }
    }
}

#[test]
fn difficulty_is_clamped_to_configured_range() {
    let mut est = AhtEstimator::new(10.0);
    est.set_difficulty(0.2);
    assert_eq!(est.difficulty(), 1.0);
    est.set_difficulty(9.0);
    assert_eq!(est.difficulty(), 7.0);
}

#[test]
fn exact_anchor_with_difficulty_two() {
    // Anchor {10.0, 60.0, 95.0, 130.0} doubled.
    let e = estimate_at(10.0, 2.0);
    assert_eq!(e.lower_bound, 120.0);
    assert_eq!(e.target, 190.0);
    assert_eq!(e.upper_bound, 260.0);
}

#[test]
fn midpoint_interpolates_between_anchors() {
    // Between duration=7.0 (target 66.5) and duration=8.0 (target 76.0).
    let e = estimate_at(7.5, 1.0);
    assert_eq!(e.target, 71.25);
}

#[test]
fn non_positive_duration_yields_zero_bounds() {
    for d in [0.0, -3.0] {
        let e = estimate_at(d, 2.0);
        assert_eq!(e.lower_bound, 0.0);
        assert_eq!(e.target, 0.0);
        assert_eq!(e.upper_bound, 0.0);
    }
}

#[test]
fn durations_beyond_table_continue_the_last_segment() {
    // Last segment gains 9.5 target minutes per duration minute.
    let at_45 = estimate_at(45.0, 1.0);
    let at_46 = estimate_at(46.0, 1.0);
    assert!((at_46.target - (at_45.target + 9.5)).abs() < 1e-9);
}

#[test]
fn durations_below_table_continue_the_first_segment() {
    let e = estimate_at(4.0, 1.0);
    assert!((e.target - 38.0).abs() < 1e-9);
    assert!((e.lower_bound - 24.0).abs() < 1e-9);
}

#[test]
fn reconfiguring_duration_changes_the_estimate() {
    let mut est = AhtEstimator::new(10.0);
    assert_eq!(est.estimate().target, 95.0);
    est.configure(20.0);
    assert_eq!(est.estimate().target, 190.0);
}
