use office_sim_core::{
    rng::SimRng,
    sampler::{select_attendance_days, DayWeights},
};

#[test]
fn zero_weight_day_is_never_chosen_while_others_remain() {
    let weights = DayWeights::new([1.0, 1.0, 1.0, 1.0, 0.0]);
    let mut rng = SimRng::new(31);
    for _ in 0..2_000 {
        let days = select_attendance_days(4, &weights, &mut rng);
        assert_eq!(days.len(), 4);
        assert!(!days.contains(4), "Friday has zero weight but was picked");
    }
}

#[test]
fn target_above_five_is_clamped() {
    let mut rng = SimRng::new(32);
    let days = select_attendance_days(9, &DayWeights::uniform(), &mut rng);
    assert_eq!(days.len(), 5);
}

#[test]
fn all_zero_weights_fall_back_to_uniform() {
    let weights = DayWeights::new([0.0; 5]);
    let mut rng = SimRng::new(33);
    let mut hits = [0u32; 5];
    for _ in 0..5_000 {
        let days = select_attendance_days(2, &weights, &mut rng);
        assert_eq!(days.len(), 2);
        for day in days.iter() {
            hits[day] += 1;
        }
    }
    assert!(hits.iter().all(|&h| h > 1_500), "uniform fallback is lopsided: {hits:?}");
}

#[test]
fn heavier_days_are_picked_more_often() {
    let weights = DayWeights::new([4.0, 1.0, 1.0, 1.0, 1.0]);
    let mut rng = SimRng::new(34);
    let mut monday = 0u32;
    let mut friday = 0u32;
    for _ in 0..5_000 {
        let days = select_attendance_days(1, &weights, &mut rng);
        if days.contains(0) {
            monday += 1;
        }
        if days.contains(4) {
            friday += 1;
        }
    }
    // Expected shares: 50% vs 12.5%.
    assert!(monday > friday * 3, "monday={monday} friday={friday}");
}

#[test]
fn zero_target_attends_nothing() {
    let mut rng = SimRng::new(35);
    assert!(select_attendance_days(0, &DayWeights::uniform(), &mut rng).is_empty());
}
