//! Init command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{render_template, InitArgs};

pub fn run_init(args: InitArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Verbose,
        &format!("Generating configuration for: {}", args.name),
    );

    let yaml = render_template(Some(&args.name)).map_err(|e| format!("Template error: {e}"))?;

    if let Some(output_path) = &args.output {
        if output_path.exists() && !args.force {
            return Err(format!(
                "{} already exists (use --force to overwrite)",
                output_path.display()
            ));
        }
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
        std::fs::write(output_path, &yaml).map_err(|e| format!("Failed to write file: {e}"))?;
        log(
            level,
            LogLevel::Normal,
            &format!("Configuration saved to: {}", output_path.display()),
        );
    } else {
        println!("{yaml}");
    }

    Ok(())
}
