//! Config validation
//!
//! Rules:
//! - shard_size > 0
//! - resolver_url is http(s)
//! - nick non-empty, no whitespace; capabilities non-empty strings
//! - join_interval_ms > 0, join_burst >= 1, join_queue_capacity > 0
//! - keepalive_interval_secs > 0, connect_timeout_secs > 0
//! - reconnect factor >= 1.0, initial backoff <= max backoff
//! - read_buffer_size > 0, flush_interval_ms > 0, file_prefix non-empty

use contracts::{ContractError, RecorderBlueprint};

/// Validate a RecorderBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    validate_server(blueprint)?;
    validate_login(blueprint)?;
    validate_timing(blueprint)?;
    validate_reconnect(blueprint)?;
    validate_output(blueprint)?;
    Ok(())
}

fn validate_server(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    let server = &blueprint.server;

    if server.shard_size == 0 {
        return Err(ContractError::config_validation(
            "server.shard_size",
            "shard_size must be > 0",
        ));
    }

    let url = server.resolver_url.as_str();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ContractError::config_validation(
            "server.resolver_url",
            format!("resolver_url must be an http(s) URL, got '{url}'"),
        ));
    }

    Ok(())
}

fn validate_login(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    let login = &blueprint.login;

    if login.nick.is_empty() || login.nick.chars().any(char::is_whitespace) {
        return Err(ContractError::config_validation(
            "login.nick",
            "nick cannot be empty or contain whitespace",
        ));
    }

    for (idx, cap) in login.capabilities.iter().enumerate() {
        if cap.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("login.capabilities[{idx}]"),
                "capability cannot be empty",
            ));
        }
    }

    Ok(())
}

fn validate_timing(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    let timing = &blueprint.timing;

    let checks = [
        ("timing.join_interval_ms", timing.join_interval_ms == 0),
        ("timing.join_burst", timing.join_burst == 0),
        ("timing.join_queue_capacity", timing.join_queue_capacity == 0),
        (
            "timing.keepalive_interval_secs",
            timing.keepalive_interval_secs == 0,
        ),
        (
            "timing.connect_timeout_secs",
            timing.connect_timeout_secs == 0,
        ),
    ];

    for (field, is_zero) in checks {
        if is_zero {
            return Err(ContractError::config_validation(field, "must be > 0"));
        }
    }

    if timing.keepalive_target.trim().is_empty() {
        return Err(ContractError::config_validation(
            "timing.keepalive_target",
            "keepalive_target cannot be empty",
        ));
    }

    Ok(())
}

fn validate_reconnect(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    let reconnect = &blueprint.reconnect;

    if !reconnect.factor.is_finite() || reconnect.factor < 1.0 {
        return Err(ContractError::config_validation(
            "reconnect.factor",
            format!("factor must be >= 1.0, got {}", reconnect.factor),
        ));
    }

    if reconnect.initial_backoff_ms > reconnect.max_backoff_ms {
        return Err(ContractError::config_validation(
            "reconnect.initial_backoff_ms / reconnect.max_backoff_ms",
            format!(
                "initial_backoff_ms ({}) must be <= max_backoff_ms ({})",
                reconnect.initial_backoff_ms, reconnect.max_backoff_ms
            ),
        ));
    }

    Ok(())
}

fn validate_output(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    let output = &blueprint.output;

    if output.read_buffer_size == 0 {
        return Err(ContractError::config_validation(
            "output.read_buffer_size",
            "read_buffer_size must be > 0",
        ));
    }

    if output.flush_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "output.flush_interval_ms",
            "flush_interval_ms must be > 0",
        ));
    }

    if output.file_prefix.is_empty() || output.file_prefix.contains(['/', '\\']) {
        return Err(ContractError::config_validation(
            "output.file_prefix",
            "file_prefix cannot be empty or contain path separators",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_blueprint() -> RecorderBlueprint {
        RecorderBlueprint {
            channels: vec!["foo".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_zero_shard_size() {
        let mut bp = minimal_blueprint();
        bp.server.shard_size = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("shard_size"), "got: {err}");
    }

    #[test]
    fn test_bad_resolver_url() {
        let mut bp = minimal_blueprint();
        bp.server.resolver_url = "ftp://example".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("resolver_url"), "got: {err}");
    }

    #[test]
    fn test_nick_with_whitespace() {
        let mut bp = minimal_blueprint();
        bp.login.nick = "justin fan".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("login.nick"), "got: {err}");
    }

    #[test]
    fn test_zero_join_interval() {
        let mut bp = minimal_blueprint();
        bp.timing.join_interval_ms = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("timing.join_interval_ms"), "got: {err}");
    }

    #[test]
    fn test_zero_join_burst() {
        let mut bp = minimal_blueprint();
        bp.timing.join_burst = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("timing.join_burst"), "got: {err}");
    }

    #[test]
    fn test_backoff_factor_below_one() {
        let mut bp = minimal_blueprint();
        bp.reconnect.factor = 0.5;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("factor must be >= 1.0"), "got: {err}");
    }

    #[test]
    fn test_inverted_backoff_range() {
        let mut bp = minimal_blueprint();
        bp.reconnect.initial_backoff_ms = 10_000;
        bp.reconnect.max_backoff_ms = 100;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("initial_backoff_ms"), "got: {err}");
    }

    #[test]
    fn test_zero_flush_interval() {
        let mut bp = minimal_blueprint();
        bp.output.flush_interval_ms = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("output.flush_interval_ms"), "got: {err}");
    }

    #[test]
    fn test_prefix_with_separator() {
        let mut bp = minimal_blueprint();
        bp.output.file_prefix = "../escape".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("file_prefix"), "got: {err}");
    }
}
