//! Property-based tests for configuration validation

use super::error::ValidationError;
use super::validator::validate_config;
use crate::config::schema::*;
use crate::config::template::default_spec;
use proptest::prelude::*;

fn arb_valid_spec() -> impl Strategy<Value = TrainSpec> {
    (
        proptest::collection::vec(0.0f64..10.0, 3), // oversampling weights
        1.0f64..500.0,                              // batch_max_length
        1.0f64..5000.0,                             // binning_length
        1e-6f32..1.0,                               // lr backbone
        1e-6f32..1.0,                               // lr head
        1u64..100_000,                              // total_steps
        proptest::collection::vec(0.0f32..20.0, 7), // loss weights
        proptest::collection::vec(any::<bool>(), 7), // ramp flags
    )
        .prop_filter("at least one stream enabled", |(w, ..)| w.iter().any(|&x| x > 0.0))
        .prop_map(|(ow, bml, bl, lr_b, lr_h, steps, weights, ramp)| {
            let mut spec = default_spec();
            spec.oversampling_weights = ow;
            spec.batch_max_length = bml;
            spec.binning_length = bl;
            spec.optimizer_config.lr = GroupLr { backbone: lr_b, head: lr_h };
            spec.optimizer_config.total_steps = steps;
            spec.loss_config.losses.weights = weights;
            spec.loss_config.losses.enable_ramp_up = ramp;
            spec
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_valid_spec_passes(spec in arb_valid_spec()) {
        prop_assert!(validate_config(&spec).is_ok());
    }

    #[test]
    fn prop_ramp_list_length_mismatch_fails(spec in arb_valid_spec(), drop in 1usize..7) {
        let mut spec = spec;
        spec.loss_config.losses.enable_ramp_up.truncate(7 - drop);
        let is_mismatch = matches!(
            validate_config(&spec),
            Err(ValidationError::LossListLengthMismatch { .. })
        );
        prop_assert!(is_mismatch);
    }

    #[test]
    fn prop_zero_total_steps_fails(spec in arb_valid_spec()) {
        let mut spec = spec;
        spec.optimizer_config.total_steps = 0;
        prop_assert_eq!(validate_config(&spec), Err(ValidationError::InvalidTotalSteps(0)));
    }

    #[test]
    fn prop_effective_batch_length_halves_with_augmentation(
        spec in arb_valid_spec(),
        aug in 1usize..4,
    ) {
        let mut spec = spec;
        let full = spec.effective_batch_max_length();
        spec.data_augmentation_size = aug;
        prop_assert!((spec.effective_batch_max_length() * 2.0 - full).abs() < 1e-9);
    }
}
