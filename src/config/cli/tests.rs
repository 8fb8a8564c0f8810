//! Tests for CLI argument parsing

use super::*;
use crate::config::template::default_spec;
use proptest::prelude::*;
use std::path::PathBuf;

fn train_args(cli: Cli) -> TrainArgs {
    match cli.command {
        Command::Train(args) => args,
        other => panic!("Expected Train command, got {other:?}"),
    }
}

#[test]
fn test_parse_train_command() {
    let args = train_args(parse_args(["alinear", "train", "config.yaml"]).unwrap());
    assert_eq!(args.config, PathBuf::from("config.yaml"));
    assert_eq!(args.data_folder, PathBuf::from("data"));
    assert_eq!(args.ckpt_dir, PathBuf::from("ckpt"));
    assert!(!args.resume);
    assert!(!args.ft);
    assert!(!args.dry_run);
    assert!(args.pretrained.is_none());
}

#[test]
fn test_parse_train_with_data_and_pretrained() {
    let cli = parse_args([
        "alinear",
        "train",
        "config.yaml",
        "-d",
        "data/full_label",
        "-p",
        "ckpt/base.ckpt",
        "--ft",
    ])
    .unwrap();
    let args = train_args(cli);
    assert_eq!(args.data_folder, PathBuf::from("data/full_label"));
    assert_eq!(args.pretrained, Some(PathBuf::from("ckpt/base.ckpt")));
    assert!(args.ft);
}

#[test]
fn test_parse_train_resume_flag() {
    let args = train_args(parse_args(["alinear", "train", "config.yaml", "-r"]).unwrap());
    assert!(args.resume);
}

#[test]
fn test_parse_validate_detailed() {
    let cli = parse_args(["alinear", "validate", "config.yaml", "--detailed"]).unwrap();
    match cli.command {
        Command::Validate(args) => {
            assert_eq!(args.config, PathBuf::from("config.yaml"));
            assert!(args.detailed);
        }
        _ => panic!("Expected Validate command"),
    }
}

#[test]
fn test_parse_info_formats() {
    for (flag, expected) in [
        ("text", OutputFormat::Text),
        ("json", OutputFormat::Json),
        ("YAML", OutputFormat::Yaml),
    ] {
        let cli = parse_args(["alinear", "info", "config.yaml", "--format", flag]).unwrap();
        match cli.command {
            Command::Info(args) => assert_eq!(args.format, expected),
            _ => panic!("Expected Info command"),
        }
    }
}

#[test]
fn test_parse_init_defaults() {
    let cli = parse_args(["alinear", "init"]).unwrap();
    match cli.command {
        Command::Init(args) => {
            assert_eq!(args.name, "aligner");
            assert!(args.output.is_none());
            assert!(!args.force);
        }
        _ => panic!("Expected Init command"),
    }
}

#[test]
fn test_global_flags() {
    let cli = parse_args(["alinear", "-v", "train", "config.yaml"]).unwrap();
    assert!(cli.verbose && !cli.quiet);

    let cli = parse_args(["alinear", "train", "config.yaml", "--quiet"]).unwrap();
    assert!(!cli.verbose && cli.quiet);
}

#[test]
fn test_missing_config_file() {
    assert!(parse_args(["alinear", "train"]).is_err());
}

#[test]
fn test_unknown_command() {
    assert!(parse_args(["alinear", "quantize", "model.bin"]).is_err());
}

#[test]
fn test_apply_overrides() {
    let mut spec = default_spec();
    let args = train_args(
        parse_args([
            "alinear",
            "train",
            "config.yaml",
            "--total-steps",
            "10",
            "--seed",
            "7",
            "--val-every",
            "5",
        ])
        .unwrap(),
    );
    apply_overrides(&mut spec, &args);
    assert_eq!(spec.optimizer_config.total_steps, 10);
    assert_eq!(spec.random_seed, 7);
    assert_eq!(spec.val_check_interval, 5);
}

#[test]
fn test_apply_overrides_none_keeps_spec() {
    let mut spec = default_spec();
    let before = spec.fingerprint();
    let args = train_args(parse_args(["alinear", "train", "config.yaml"]).unwrap());
    apply_overrides(&mut spec, &args);
    assert_eq!(spec.fingerprint(), before);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_train_command_parses(config in "[a-zA-Z][a-zA-Z0-9_-]{0,20}\\.(yaml|yml)") {
        let cli = parse_args(["alinear", "train", &config]);
        prop_assert!(cli.is_ok());
        if let Ok(Cli { command: Command::Train(args), .. }) = cli {
            prop_assert_eq!(args.config.to_str(), Some(config.as_str()));
        }
    }

    #[test]
    fn prop_total_steps_override(steps in 1u64..10_000_000) {
        let steps_str = steps.to_string();
        let cli = parse_args(["alinear", "train", "c.yaml", "--total-steps", &steps_str]).unwrap();
        match cli.command {
            Command::Train(args) => prop_assert_eq!(args.total_steps, Some(steps)),
            _ => prop_assert!(false, "Expected Train command"),
        }
    }
}
