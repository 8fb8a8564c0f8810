//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, validate_config, TrainSpec, ValidateArgs};
use crate::train::LossTerm;

/// Format run identity and data pipeline settings as a string
pub fn format_data_info(spec: &TrainSpec) -> String {
    let mut lines = vec![
        format!("  Model name: {}", spec.model_name),
        format!("  Random seed: {}", spec.random_seed),
        format!(
            "  Oversampling (full/weak/none): {:?}",
            spec.oversampling_weights
        ),
        format!(
            "  Batch max length: {} (effective {})",
            spec.batch_max_length,
            spec.effective_batch_max_length()
        ),
        format!("  Binning length: {}", spec.binning_length),
        format!("  Drop last: {}", spec.drop_last),
    ];
    if spec.data_augmentation_size > 0 {
        lines.push(format!("  Augmentation size: {}", spec.data_augmentation_size));
    }
    if spec.dataloader_workers > 0 {
        lines.push(format!(
            "  Workers: {} (prefetch {})",
            spec.dataloader_workers, spec.dataloader_prefetch_factor
        ));
    }
    lines.join("\n")
}

/// Format model architecture as a string
pub fn format_model_info(spec: &TrainSpec) -> String {
    let m = &spec.model;
    format!(
        "  Hidden dims: {}\n  Down-sampling: x{} over {} stages (channel scale-up {})",
        m.hidden_dims, m.down_sampling_factor, m.down_sampling_times, m.channels_scaleup_factor
    )
}

/// Format optimizer configuration as a string
pub fn format_optimizer_info(spec: &TrainSpec) -> String {
    let opt = &spec.optimizer_config;
    let mut lines = vec![
        format!("  Total steps: {}", opt.total_steps),
        format!("  Learning rate: backbone={} head={}", opt.lr.backbone, opt.lr.head),
        format!("  Weight decay: {}", opt.weight_decay),
        format!("  Schedule: {:?} (pct_start {})", opt.lr_scheduler, opt.pct_start),
    ];
    if opt.freeze.backbone || opt.freeze.head {
        lines.push(format!(
            "  Frozen: backbone={} head={}",
            opt.freeze.backbone, opt.freeze.head
        ));
    }
    lines.push(format!(
        "  Gradient clipping: {} ({:?})",
        spec.gradient_clip_val, spec.gradient_clip_algorithm
    ));
    lines.push(format!("  Precision: {}", spec.precision));
    lines.join("\n")
}

/// Format the composite loss as a string, one line per term
pub fn format_loss_info(spec: &TrainSpec) -> String {
    let losses = &spec.loss_config.losses;
    let mut lines = vec!["  Loss terms:".to_string()];
    for term in LossTerm::ALL {
        let i = term.index();
        let weight = losses.weights.get(i).copied().unwrap_or_default();
        let ramped = losses.enable_ramp_up.get(i).copied().unwrap_or_default();
        let marker = if ramped { " (ramped)" } else { "" };
        lines.push(format!("    {term}: {weight}{marker}"));
    }
    lines.push(format!(
        "  Ramp-up: {:?} from step {} to {}",
        spec.loss_config.ramp_up.policy,
        spec.ramp_start_step(),
        spec.ramp_end_step()
    ));
    let f = &spec.loss_config.function;
    lines.push(format!(
        "  GHM bins: {} (alpha {}), label smoothing {}, pseudo-label ratio {}",
        f.num_bins, f.alpha, f.label_smoothing, f.pseudo_label_ratio
    ));
    lines.join("\n")
}

/// Format validation and checkpoint cadence as a string
pub fn format_schedule_info(spec: &TrainSpec) -> String {
    let mut lines = vec![
        format!("  Validation every: {} steps", spec.val_check_interval),
        format!("  Checkpoint every: {} steps", spec.checkpoint_interval()),
        format!("  Checkpoints kept: {}", spec.num_ckpt_keep),
        format!("  Epoch restart: {}", spec.epoch_restart),
    ];
    if spec.max_consecutive_nonfinite > 0 {
        lines.push(format!(
            "  Non-finite tolerance: {} consecutive steps",
            spec.max_consecutive_nonfinite
        ));
    }
    lines.join("\n")
}

/// Print detailed configuration summary
pub fn print_detailed_summary(spec: &TrainSpec) {
    println!();
    println!("Configuration Summary:");
    println!("{}", format_data_info(spec));
    println!();
    println!("{}", format_model_info(spec));
    println!();
    println!("{}", format_optimizer_info(spec));
    println!();
    println!("{}", format_loss_info(spec));
    println!();
    println!("{}", format_schedule_info(spec));
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    validate_config(&spec).map_err(|e| format!("Validation failed: {e}"))?;

    log(level, LogLevel::Normal, "Configuration is valid");

    if args.detailed && level != LogLevel::Quiet {
        print_detailed_summary(&spec);
    }

    Ok(())
}
