//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{normalize_channels, PoolMode, RecorderBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    mode: PoolMode,
    endpoint: String,
    channel_count: usize,
    shard_size: usize,
    nick: String,
    output_dir: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return invalid(config_path, format!("File not found: {}", args.config.display()));
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let (channels, _) = normalize_channels(&blueprint.channels);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings,
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    mode: blueprint.server.mode,
                    endpoint: blueprint.server.endpoint.to_string(),
                    channel_count: channels.len(),
                    shard_size: blueprint.server.shard_size,
                    nick: blueprint.login.nick.clone(),
                    output_dir: blueprint.output.directory.display().to_string(),
                }),
            }
        }
        Err(e) => invalid(config_path, e.to_string()),
    }
}

fn invalid(config_path: String, error: String) -> ValidationResult {
    ValidationResult {
        valid: false,
        config_path,
        error: Some(error),
        warnings: Vec::new(),
        summary: None,
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RecorderBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    let (channels, duplicates) = normalize_channels(&blueprint.channels);
    if channels.is_empty() {
        warnings.push("No channels configured - pass channels on the command line".to_string());
    }
    for duplicate in duplicates {
        warnings.push(format!("Channel '{duplicate}' is listed more than once"));
    }

    if blueprint.timing.join_interval_ms < 1000 {
        warnings.push(format!(
            "timing.join_interval_ms = {} is below the 1s server flood limit",
            blueprint.timing.join_interval_ms
        ));
    }

    if blueprint.reconnect.max_attempts == 0 {
        warnings.push("reconnect.max_attempts = 0 - shards will never reconnect".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Mode: {}", summary.mode);
            println!("  Endpoint: {}", summary.endpoint);
            println!("  Channels: {}", summary.channel_count);
            println!("  Shard size: {}", summary.shard_size);
            println!("  Nick: {}", summary.nick);
            println!("  Output: {}", summary.output_dir);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/nope/recorder.toml".into(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_valid_file_with_warnings() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "channels = [\"foo\", \"#FOO\"]\n[timing]\njoin_interval_ms = 500").unwrap();

        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });
        assert!(result.valid);
        assert_eq!(result.summary.as_ref().unwrap().channel_count, 1);
        assert_eq!(result.warnings.len(), 2);
    }
}
