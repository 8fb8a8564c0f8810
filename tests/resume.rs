//! Resuming from a checkpoint continues the run without duplicating or
//! skipping steps

use alinear::config::{default_spec, TrainSpec};
use alinear::data::{ExampleSource, Sampler, SamplerConfig, SyntheticConfig, SyntheticSource};
use alinear::precision::Precision;
use alinear::train::{
    CallbackAction, CallbackContext, CheckpointStore, FileCheckpointStore, LinearAligner,
    TrainerCallback, Trainer,
};
use alinear::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn spec() -> TrainSpec {
    let mut spec = default_spec();
    spec.model_name = "resume".to_string();
    spec.optimizer_config.total_steps = 10;
    spec.val_check_interval = 5;
    spec.num_ckpt_keep = 2;
    spec.batch_max_length = 30.0;
    spec.binning_length = 5.0;
    spec.model.hidden_dims = 8;
    spec.precision = Precision::Fp32;
    spec.checkpoint_backoff_ms = 0;
    spec
}

fn trainer(ckpt_root: &Path) -> Trainer {
    let source: Arc<dyn ExampleSource> =
        Arc::new(SyntheticSource::new(SyntheticConfig { num_examples: 40, ..SyntheticConfig::default() }));
    let spec = Arc::new(spec());
    let model = LinearAligner::for_source(source.as_ref(), &spec);
    let sampler = Sampler::new(source, SamplerConfig::from_spec(&spec)).unwrap();
    let store = FileCheckpointStore::for_model(ckpt_root, &spec.model_name);
    Trainer::new(spec, Box::new(model), Box::new(sampler), Box::new(store)).unwrap()
}

/// Records every completed step; stops after `stop_at`
#[derive(Clone)]
struct Steps {
    seen: Arc<Mutex<Vec<u64>>>,
    stop_at: Option<u64>,
}

impl Steps {
    fn new(stop_at: Option<u64>) -> Self {
        Self { seen: Arc::default(), stop_at }
    }
}

impl TrainerCallback for Steps {
    fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.seen.lock().unwrap().push(ctx.step);
        if self.stop_at == Some(ctx.step) {
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }
}

#[test]
fn interrupted_and_resumed_run_matches_uninterrupted_run() {
    let straight_dir = TempDir::new().unwrap();
    let mut straight = trainer(straight_dir.path());
    straight.train().unwrap();

    let dir = TempDir::new().unwrap();
    let first = Steps::new(Some(7));
    let mut interrupted = trainer(dir.path()).with_callback(first.clone());
    let partial = interrupted.train().unwrap();
    assert!(partial.stopped_early);
    assert_eq!(partial.final_step, 7);
    assert_eq!(partial.checkpoints, vec![5, 7]);

    let second = Steps::new(None);
    let mut resumed = trainer(dir.path()).with_callback(second.clone());
    assert_eq!(resumed.resume_latest().unwrap(), Some(7));
    let result = resumed.train().unwrap();
    assert_eq!(result.resumed_from, Some(7));
    assert_eq!(result.final_step, 10);

    let mut steps = first.seen.lock().unwrap().clone();
    steps.extend(second.seen.lock().unwrap().iter());
    assert_eq!(steps, (1..=10).collect::<Vec<u64>>());

    for (a, b) in straight.model().params().iter().zip(resumed.model().params()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.data, b.data, "{} diverged after resume", a.name);
    }
}

#[test]
fn resume_from_empty_directory_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let mut trainer = trainer(dir.path());
    assert_eq!(trainer.resume_latest().unwrap(), None);
    assert_eq!(trainer.step(), 0);
}

#[test]
fn corrupt_checkpoint_is_fatal() {
    let dir = TempDir::new().unwrap();
    let store = FileCheckpointStore::for_model(dir.path(), "resume");
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(store.path_for(5), "{ not json").unwrap();
    assert_eq!(store.list().unwrap(), vec![5]);

    let mut trainer = trainer(dir.path());
    let err = trainer.resume_latest().unwrap_err();
    assert!(matches!(err, Error::CheckpointIo { .. }), "unexpected error: {err}");
}
