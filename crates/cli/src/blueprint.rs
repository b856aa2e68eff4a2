//! Builds the effective configuration from file, environment and flags.

use config_loader::ConfigLoader;
use contracts::RecorderBlueprint;
use tracing::info;

use crate::cli::PoolArgs;
use crate::error::CliError;

/// Load the config file (or defaults), apply CLI overrides, append CLI
/// channels and validate the result.
pub fn load_blueprint(args: &PoolArgs) -> Result<RecorderBlueprint, CliError> {
    let mut blueprint = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path)?
        }
        None => RecorderBlueprint::default(),
    };

    apply_overrides(&mut blueprint, args);
    ConfigLoader::validate(&blueprint)?;

    info!(
        mode = %blueprint.server.mode,
        endpoint = %blueprint.server.endpoint,
        channels = blueprint.channels.len(),
        "Configuration loaded"
    );
    Ok(blueprint)
}

fn apply_overrides(blueprint: &mut RecorderBlueprint, args: &PoolArgs) {
    if let Some(mode) = args.mode {
        info!(mode = ?mode, "Overriding pool mode from CLI");
        blueprint.server.mode = mode.into();
    }
    if let Some(ref endpoint) = args.endpoint {
        info!(endpoint = %endpoint, "Overriding endpoint from CLI");
        blueprint.server.endpoint = endpoint.clone();
    }
    if let Some(shard_size) = args.shard_size {
        blueprint.server.shard_size = shard_size;
    }
    if let Some(ref url) = args.resolver_url {
        blueprint.server.resolver_url = url.clone();
    }
    blueprint.channels.extend(args.channels.iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ModeArg;
    use contracts::{Endpoint, PoolMode};
    use std::io::Write;

    #[test]
    fn test_defaults_without_config() {
        let args = PoolArgs {
            channels: vec!["foo".into()],
            ..Default::default()
        };
        let bp = load_blueprint(&args).unwrap();
        assert_eq!(bp.channels, ["foo"]);
        assert_eq!(bp.server.mode, PoolMode::Sharded);
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
channels = ["a", "b"]

[server]
mode = "sharded"
shard_size = 10
"#
        )
        .unwrap();

        let args = PoolArgs {
            channels: vec!["c".into()],
            config: Some(file.path().to_path_buf()),
            mode: Some(ModeArg::Direct),
            endpoint: Some(Endpoint::new("irc.example", 6697)),
            shard_size: Some(2),
            resolver_url: Some("http://localhost:8080".into()),
        };
        let bp = load_blueprint(&args).unwrap();

        assert_eq!(bp.channels, ["a", "b", "c"]);
        assert_eq!(bp.server.mode, PoolMode::Direct);
        assert_eq!(bp.server.endpoint, Endpoint::new("irc.example", 6697));
        assert_eq!(bp.server.shard_size, 2);
        assert_eq!(bp.server.resolver_url, "http://localhost:8080");
    }

    #[test]
    fn test_missing_config_file() {
        let args = PoolArgs {
            config: Some("/definitely/not/here.toml".into()),
            ..Default::default()
        };
        assert!(matches!(
            load_blueprint(&args),
            Err(CliError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_overrides_are_validated() {
        let args = PoolArgs {
            shard_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(load_blueprint(&args), Err(CliError::Config(_))));
    }
}
