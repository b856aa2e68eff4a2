//! Layered error definitions
//!
//! Categorized by source: config / resolver / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Malformed `host:port` string
    #[error("invalid endpoint '{input}': {message}")]
    InvalidEndpoint { input: String, message: String },

    // ===== Resolver Errors =====
    /// Server discovery failed for a channel
    #[error("failed to resolve channel '{channel}': {message}")]
    Resolve { channel: String, message: String },

    // ===== Sink Errors =====
    /// Output file could not be created
    #[error("sink '{sink_name}' create error: {message}")]
    SinkCreate { sink_name: String, message: String },

    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_endpoint(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create resolver error
    pub fn resolve(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolve {
            channel: channel.into(),
            message: message.into(),
        }
    }

    pub fn sink_create(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreate {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
