//! Tests for learning rate schedulers

use super::*;
use crate::config::LrSchedulerKind;
use approx::assert_abs_diff_eq;

#[test]
fn test_one_cycle_starts_low() {
    let scheduler = OneCycleLR::new(1.0, 100, 0.3);
    assert_abs_diff_eq!(scheduler.get_lr(), 1.0 / 25.0, epsilon = 1e-6);
    assert_eq!(scheduler.warmup_steps(), 30);
}

#[test]
fn test_one_cycle_peaks_after_warmup() {
    let mut scheduler = OneCycleLR::new(0.5, 100, 0.3);
    for _ in 0..30 {
        scheduler.step();
    }
    assert_abs_diff_eq!(scheduler.get_lr(), 0.5, epsilon = 1e-6);
}

#[test]
fn test_one_cycle_ends_at_min() {
    let mut scheduler = OneCycleLR::new(1.0, 100, 0.3);
    scheduler.set_step(100);
    assert_abs_diff_eq!(scheduler.get_lr(), 1.0 / 25.0 / 1e4, epsilon = 1e-6);

    // Past the budget the schedule holds its final value
    scheduler.set_step(500);
    assert_abs_diff_eq!(scheduler.get_lr(), 1.0 / 25.0 / 1e4, epsilon = 1e-6);
}

#[test]
fn test_one_cycle_shape() {
    let mut scheduler = OneCycleLR::new(1.0, 200, 0.25);
    let mut lrs = Vec::new();
    for _ in 0..=200 {
        lrs.push(scheduler.get_lr());
        scheduler.step();
    }
    let peak = scheduler.warmup_steps() as usize;
    for w in lrs[..=peak].windows(2) {
        assert!(w[1] >= w[0], "warmup not increasing: {w:?}");
    }
    for w in lrs[peak..].windows(2) {
        assert!(w[1] <= w[0], "anneal not decreasing: {w:?}");
    }
}

#[test]
fn test_set_step_matches_stepping() {
    let mut stepped = OneCycleLR::new(0.001, 1000, 0.3);
    for _ in 0..437 {
        stepped.step();
    }
    let mut jumped = OneCycleLR::new(0.001, 1000, 0.3);
    jumped.set_step(437);
    assert_eq!(stepped.get_lr(), jumped.get_lr());
}

#[test]
fn test_constant_lr() {
    let mut scheduler = ConstantLR::new(0.01);
    for _ in 0..10 {
        scheduler.step();
    }
    scheduler.set_step(9999);
    assert_abs_diff_eq!(scheduler.get_lr(), 0.01, epsilon = 1e-9);
}

#[test]
fn test_build_scheduler_kinds() {
    let one_cycle = build_scheduler(LrSchedulerKind::OneCycle, 1.0, 10, 0.3);
    assert_abs_diff_eq!(one_cycle.get_lr(), 0.04, epsilon = 1e-6);

    let constant = build_scheduler(LrSchedulerKind::Constant, 1.0, 10, 0.3);
    assert_abs_diff_eq!(constant.get_lr(), 1.0, epsilon = 1e-6);
}
