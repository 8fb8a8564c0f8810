use super::*;
use crate::data::demo::{SyntheticConfig, SyntheticSource};
use crate::data::example::ExampleMeta;
use crate::data::source::InMemorySource;
use crate::data::Example;
use ndarray::Array2;
use proptest::prelude::*;
use std::collections::HashSet;

fn meta(id: usize, regime: LabelRegime, duration: f64) -> ExampleMeta {
    ExampleMeta { id: format!("ex{id}"), regime, duration }
}

fn example(id: usize, regime: LabelRegime, duration: f64) -> Example {
    Example {
        meta: meta(id, regime, duration),
        features: Array2::zeros((4, 2)),
        augmented: None,
        phonemes: vec![1],
        frame_labels: None,
        edges: None,
    }
}

fn plan_config(max: f64, drop_last: bool) -> PlanConfig {
    PlanConfig {
        weights: [1.0, 1.0, 1.0],
        batch_max_length: max,
        binning_length: 1000.0,
        drop_last,
        seed: 7,
    }
}

fn sampler_config(plan: PlanConfig, workers: usize, epoch_restart: bool) -> SamplerConfig {
    SamplerConfig { plan, workers, prefetch_factor: 2, epoch_restart }
}

fn uniform_source(n: usize, duration: f64) -> Arc<dyn ExampleSource> {
    let examples = (0..n).map(|i| example(i, LabelRegime::ALL[i % 3], duration)).collect();
    Arc::new(InMemorySource::new(examples, 4))
}

#[test]
fn test_packs_until_budget() {
    let metas: Vec<_> = (0..6).map(|i| meta(i, LabelRegime::Full, 4.0)).collect();
    let planner = Planner::new(plan_config(10.0, false), &metas);
    let plan = planner.plan_epoch(0);

    // 6 draws of 4.0 each: batches of two, three batches
    assert_eq!(plan.batches.len(), 3);
    for batch in &plan.batches {
        assert_eq!(batch.indices.len(), 2);
        assert!(batch.duration <= 10.0);
    }
}

#[test]
fn test_drop_last_discards_partial_batch() {
    let metas: Vec<_> = (0..5).map(|i| meta(i, LabelRegime::Full, 4.0)).collect();

    let keep = Planner::new(plan_config(10.0, false), &metas).plan_epoch(0);
    assert_eq!(keep.batches.len(), 3);
    assert_eq!(keep.dropped_partial, 0);

    let drop = Planner::new(plan_config(10.0, true), &metas).plan_epoch(0);
    assert_eq!(drop.batches.len(), 2);
    assert_eq!(drop.dropped_partial, 1);
}

#[test]
fn test_oversized_examples_are_skipped() {
    let mut metas: Vec<_> = (0..4).map(|i| meta(i, LabelRegime::Full, 3.0)).collect();
    metas.push(meta(4, LabelRegime::Full, 50.0));
    let plan = Planner::new(plan_config(10.0, false), &metas).plan_epoch(0);

    let placed: usize = plan.batches.iter().map(|b| b.indices.len()).sum();
    assert!(plan.skipped_oversized >= 1);
    assert_eq!(placed + plan.skipped_oversized, 5);
    assert!(plan.batches.iter().all(|b| !b.indices.contains(&4)));
}

#[test]
fn test_batches_stay_within_one_bin() {
    let metas: Vec<_> = (0..20)
        .map(|i| meta(i, LabelRegime::Full, if i % 2 == 0 { 1.5 } else { 2.5 }))
        .collect();
    let mut config = plan_config(100.0, false);
    config.binning_length = 2.0;
    let planner = Planner::new(config, &metas);
    let plan = planner.plan_epoch(0);

    for batch in &plan.batches {
        for &i in &batch.indices {
            assert_eq!(planner.bin_of(metas[i].duration), batch.bin);
        }
    }
    assert_eq!(plan.batches.len(), 2);
}

#[test]
fn test_zero_weight_disables_stream() {
    let metas: Vec<_> = (0..30).map(|i| meta(i, LabelRegime::ALL[i % 3], 1.0)).collect();
    let mut config = plan_config(5.0, false);
    config.weights = [1.0, 0.0, 1.0];
    let planner = Planner::new(config, &metas);

    assert_eq!(planner.enabled_regimes(), vec![LabelRegime::Full, LabelRegime::None]);
    assert_eq!(planner.draws_per_epoch(), 20);
    let plan = planner.plan_epoch(0);
    for batch in &plan.batches {
        for &i in &batch.indices {
            assert_ne!(metas[i].regime, LabelRegime::Weak);
        }
    }
}

#[test]
fn test_oversampling_cycles_small_stream() {
    // One full example against 99 unlabeled ones with a 50/50 split
    let mut metas = vec![meta(0, LabelRegime::Full, 1.0)];
    metas.extend((1..100).map(|i| meta(i, LabelRegime::None, 1.0)));
    let mut config = plan_config(1000.0, false);
    config.weights = [1.0, 0.0, 1.0];
    let plan = Planner::new(config, &metas).plan_epoch(0);

    let full_draws = plan.batches.iter().flat_map(|b| &b.indices).filter(|&&i| i == 0).count();
    assert!(full_draws > 20, "full example drawn only {full_draws} times");
}

#[test]
fn test_plan_is_deterministic() {
    let metas: Vec<_> = (0..50).map(|i| meta(i, LabelRegime::ALL[i % 3], 1.0 + (i % 7) as f64)).collect();
    let planner = Planner::new(plan_config(12.0, false), &metas);
    assert_eq!(planner.plan_epoch(3), planner.plan_epoch(3));
    assert_ne!(planner.plan_epoch(0).batches, planner.plan_epoch(1).batches);
}

#[test]
fn test_sampler_empty_streams_fail() {
    let source = uniform_source(6, 1.0);
    let mut plan = plan_config(10.0, false);
    plan.weights = [0.0, 0.0, 0.0];
    assert!(matches!(Sampler::new(source, sampler_config(plan, 0, true)), Err(Error::Data(_))));
}

#[test]
fn test_sampler_exhausts_without_restart() {
    let source = uniform_source(6, 4.0);
    let mut sampler = Sampler::new(source, sampler_config(plan_config(10.0, false), 0, false)).unwrap();

    let mut batches = 0;
    loop {
        match sampler.next_batch() {
            Ok(_) => batches += 1,
            Err(Error::Exhausted { last_step }) => {
                assert_eq!(last_step, batches);
                break;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(batches, 3);
}

#[test]
fn test_sampler_restarts_epochs() {
    let source = uniform_source(6, 4.0);
    let mut sampler = Sampler::new(source, sampler_config(plan_config(10.0, false), 0, true)).unwrap();
    let epochs: Vec<u64> = (0..7).map(|_| sampler.next_batch().unwrap().epoch).collect();
    assert_eq!(epochs, vec![0, 0, 0, 1, 1, 1, 2]);
}

#[test]
fn test_prefetch_matches_inline_order() {
    let source: Arc<dyn ExampleSource> = Arc::new(SyntheticSource::new(SyntheticConfig {
        num_examples: 40,
        ..SyntheticConfig::default()
    }));
    let plan = plan_config(30.0, false);

    let mut inline = Sampler::new(Arc::clone(&source), sampler_config(plan.clone(), 0, true)).unwrap();
    let mut threaded = Sampler::new(source, sampler_config(plan, 3, true)).unwrap();

    for _ in 0..25 {
        let a = inline.next_batch().unwrap();
        let b = threaded.next_batch().unwrap();
        let ids_a: Vec<_> = a.examples.iter().map(|e| e.meta.id.clone()).collect();
        let ids_b: Vec<_> = b.examples.iter().map(|e| e.meta.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!((a.epoch, a.index), (b.epoch, b.index));
    }
}

#[test]
fn test_seek_resumes_sequence() {
    let source = uniform_source(30, 3.0);
    let config = sampler_config(plan_config(10.0, false), 2, true);

    let mut reference = Sampler::new(Arc::clone(&source), config.clone()).unwrap();
    let ids: Vec<Vec<String>> = (0..15)
        .map(|_| reference.next_batch().unwrap().examples.iter().map(|e| e.meta.id.clone()).collect())
        .collect();

    let mut first = Sampler::new(Arc::clone(&source), config.clone()).unwrap();
    for _ in 0..6 {
        first.next_batch().unwrap();
    }
    let position = first.position();
    drop(first);

    let mut resumed = Sampler::new(source, config).unwrap();
    resumed.seek(position).unwrap();
    for expected in &ids[6..] {
        let got: Vec<String> = resumed.next_batch().unwrap().examples.iter().map(|e| e.meta.id.clone()).collect();
        assert_eq!(&got, expected);
    }
}

#[test]
fn test_dropping_prefetcher_mid_epoch_does_not_hang() {
    let source = uniform_source(200, 1.0);
    let mut sampler = Sampler::new(source, sampler_config(plan_config(2.0, false), 4, true)).unwrap();
    sampler.next_batch().unwrap();
    drop(sampler);
}

#[test]
fn test_regime_mix_follows_weights() {
    let metas: Vec<_> = (0..300).map(|i| meta(i, LabelRegime::ALL[i % 3], 1.0)).collect();
    let mut config = plan_config(1000.0, false);
    config.weights = [8.0, 1.0, 1.0];
    let plan = Planner::new(config, &metas).plan_epoch(0);

    let mut counts = [0usize; 3];
    for &i in plan.batches.iter().flat_map(|b| &b.indices) {
        counts[metas[i].regime.index()] += 1;
    }
    assert!(counts[0] > counts[1] * 3, "counts {counts:?}");
    let distinct_full: HashSet<_> = plan
        .batches
        .iter()
        .flat_map(|b| &b.indices)
        .filter(|&&i| metas[i].regime == LabelRegime::Full)
        .collect();
    assert_eq!(distinct_full.len(), 100);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_batch_duration_bound(
        durations in proptest::collection::vec(0.1f64..30.0, 1..80),
        max in 5.0f64..60.0,
        binning in 1.0f64..50.0,
        drop_last in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let metas: Vec<_> = durations
            .iter()
            .enumerate()
            .map(|(i, &d)| meta(i, LabelRegime::ALL[i % 3], d))
            .collect();
        let config = PlanConfig { weights: [1.0, 2.0, 0.5], batch_max_length: max, binning_length: binning, drop_last, seed };
        let planner = Planner::new(config, &metas);
        let plan = planner.plan_epoch(0);

        for batch in &plan.batches {
            let total: f64 = batch.indices.iter().map(|&i| metas[i].duration).sum();
            prop_assert!(total <= max);
            prop_assert!(!batch.indices.is_empty());
            for &i in &batch.indices {
                prop_assert_eq!(planner.bin_of(metas[i].duration), batch.bin);
            }
        }
        let placed: usize = plan.batches.iter().map(|b| b.indices.len()).sum();
        prop_assert!(placed + plan.skipped_oversized <= planner.draws_per_epoch());
        if !drop_last {
            prop_assert_eq!(placed + plan.skipped_oversized, planner.draws_per_epoch());
        }
    }

    #[test]
    fn prop_drop_last_removes_at_most_one_batch_per_bin(
        durations in proptest::collection::vec(0.5f64..4.0, 1..60),
        seed in any::<u64>(),
    ) {
        let metas: Vec<_> = durations.iter().enumerate().map(|(i, &d)| meta(i, LabelRegime::Full, d)).collect();
        let per_bin = |drop_last: bool| {
            let config = PlanConfig { weights: [1.0, 1.0, 1.0], batch_max_length: 10.0, binning_length: 2.0, drop_last, seed };
            let mut counts = std::collections::BTreeMap::new();
            for batch in Planner::new(config, &metas).plan_epoch(0).batches {
                *counts.entry(batch.bin).or_insert(0usize) += 1;
            }
            counts
        };
        let kept = per_bin(false);
        let dropped = per_bin(true);
        for (bin, count) in &kept {
            let after = dropped.get(bin).copied().unwrap_or(0);
            prop_assert_eq!(*count, after + 1);
        }
    }
}
