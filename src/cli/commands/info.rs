//! Info command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, InfoArgs, OutputFormat};

pub fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Configuration Info:");
            if level == LogLevel::Quiet {
                return Ok(());
            }
            println!();
            println!("Model name: {}", spec.model_name);
            println!("Total steps: {}", spec.optimizer_config.total_steps);
            println!(
                "Learning rate: backbone={} head={}",
                spec.optimizer_config.lr.backbone, spec.optimizer_config.lr.head
            );
            println!("Batch max length: {}", spec.effective_batch_max_length());
            println!("Precision: {}", spec.precision);
            println!(
                "Validation every {} steps, keeping {} checkpoints",
                spec.val_check_interval, spec.num_ckpt_keep
            );
            println!("Fingerprint: {}", spec.fingerprint());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&spec)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&spec)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}
