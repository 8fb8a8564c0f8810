//! Train command implementation

use super::validate::print_detailed_summary;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{apply_overrides, load_run_config, validate_config, TrainArgs, TrainSpec};
use crate::data::{
    open_source, ExampleSource, Sampler, SamplerConfig, SyntheticConfig, TRAIN_MANIFEST,
    VALID_MANIFEST,
};
use crate::error::{Error, Result};
use crate::train::{
    weights_path, FileCheckpointStore, LinearAligner, LossEvaluator, StopSignal, TrainResult,
    Trainer, TrainerOptions,
};
use std::sync::Arc;

/// Examples scored per validation pass
const VALIDATION_EXAMPLES: usize = 64;

/// Size of the synthetic validation corpus used when `valid.jsonl` is absent
const SYNTHETIC_VALIDATION_EXAMPLES: usize = 24;

/// Load the config, merge the data folder's global config and apply overrides
pub fn resolve_spec(args: &TrainArgs) -> Result<TrainSpec> {
    let mut spec = load_run_config(&args.config, Some(&args.data_folder))?;
    apply_overrides(&mut spec, args);
    validate_config(&spec)?;
    Ok(spec)
}

/// Wire sources, model, store and evaluator into a trainer
///
/// Resume, pretrained initialisation and fine-tune mode are applied here so
/// the returned trainer is ready for `train()`.
pub fn build_trainer(spec: TrainSpec, args: &TrainArgs, stop: StopSignal) -> Result<Trainer> {
    let train_fallback = SyntheticConfig {
        augment: spec.data_augmentation_size > 0,
        seed: spec.random_seed,
        ..SyntheticConfig::default()
    };
    let train = open_source(&args.data_folder, TRAIN_MANIFEST, train_fallback)?;
    let valid_fallback = SyntheticConfig {
        num_examples: SYNTHETIC_VALIDATION_EXAMPLES,
        vocab_size: train.vocab_size(),
        feature_dim: train.feature_dim(),
        seed: spec.random_seed.wrapping_add(1),
        ..SyntheticConfig::default()
    };
    let valid = open_source(&args.data_folder, VALID_MANIFEST, valid_fallback)?;
    check_compatible(train.as_ref(), valid.as_ref())?;

    let spec = Arc::new(spec);
    let sampler = Sampler::new(Arc::clone(&train), SamplerConfig::from_spec(&spec))?;
    let model = LinearAligner::for_source(train.as_ref(), &spec);
    let store = FileCheckpointStore::for_model(&args.ckpt_dir, &spec.model_name);
    let evaluator = LossEvaluator::new(valid).with_max_examples(VALIDATION_EXAMPLES);

    let options = if args.ft {
        TrainerOptions::fine_tune(weights_path(&args.ckpt_dir, &spec.model_name))
    } else {
        TrainerOptions::default()
    };

    let mut trainer = Trainer::new(spec, Box::new(model), Box::new(sampler), Box::new(store))?
        .with_evaluator(Box::new(evaluator))
        .with_stop_signal(stop)
        .with_options(options);

    // Pretrained weights start a fresh run; resume is ignored alongside them
    if let Some(pretrained) = &args.pretrained {
        if args.resume {
            tracing::warn!(path = %pretrained.display(), "both pretrained weights and resume given, not resuming");
        }
        trainer.init_from_pretrained(pretrained)?;
    } else if args.resume {
        trainer.resume_latest()?;
    }
    Ok(trainer)
}

fn check_compatible(train: &dyn ExampleSource, valid: &dyn ExampleSource) -> Result<()> {
    if train.feature_dim() != valid.feature_dim() {
        return Err(Error::Data(format!(
            "train features have {} dims but validation features have {}",
            train.feature_dim(),
            valid.feature_dim()
        )));
    }
    if valid.vocab_size() > train.vocab_size() {
        return Err(Error::Data(format!(
            "validation vocabulary ({}) is larger than the training vocabulary ({})",
            valid.vocab_size(),
            train.vocab_size()
        )));
    }
    Ok(())
}

/// Format a finished run as a multi-line summary
pub fn format_result(result: &TrainResult) -> String {
    let mut lines = vec![format!(
        "  Final step: {} (epoch {})",
        result.final_step, result.final_epoch
    )];
    if let Some(loss) = result.final_loss {
        lines.push(format!("  Final loss: {loss:.6}"));
    }
    if let Some(step) = result.resumed_from {
        lines.push(format!("  Resumed from: step {step}"));
    }
    if result.dropped_steps > 0 || result.overflow_steps > 0 {
        lines.push(format!(
            "  Dropped steps: {} non-finite, {} overflow",
            result.dropped_steps, result.overflow_steps
        ));
    }
    lines.push(format!("  Validations: {}", result.validation_steps.len()));
    if let Some(metrics) = &result.last_metrics {
        for (name, value) in metrics {
            lines.push(format!("    {name}: {value:.6}"));
        }
    }
    lines.push(format!("  Checkpoints: {:?}", result.checkpoints));
    if result.failed_saves > 0 {
        lines.push(format!("  Failed saves: {}", result.failed_saves));
    }
    lines.push(format!("  Elapsed: {:.1}s", result.elapsed_secs));
    lines.join("\n")
}

pub fn run_train(args: TrainArgs, level: LogLevel) -> std::result::Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Alinear: Training from {}", args.config.display()),
    );

    let spec = resolve_spec(&args).map_err(|e| format!("Config error: {e}"))?;

    if args.dry_run {
        log(
            level,
            LogLevel::Normal,
            "Dry run - config validated successfully",
        );
        if level == LogLevel::Verbose {
            print_detailed_summary(&spec);
        }
        return Ok(());
    }

    let stop = StopSignal::new();
    if let Err(e) = stop.install_ctrlc_handler() {
        tracing::warn!(error = %e, "running without an interrupt handler");
    }

    let mut trainer =
        build_trainer(spec, &args, stop).map_err(|e| format!("Setup error: {e}"))?;
    let result = trainer.train().map_err(|e| format!("Training error: {e}"))?;

    if result.stopped_early {
        log(level, LogLevel::Normal, "Training stopped early");
    } else {
        log(level, LogLevel::Normal, "Training complete!");
    }
    log(level, LogLevel::Normal, &format_result(&result));
    Ok(())
}
