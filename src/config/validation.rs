use std::{net::SocketAddr, time::Duration};

use crate::config::models::ServerConfig;

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Invalid duration for '{field}': {message}")]
    InvalidDuration { field: String, message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if config.listen_addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidListenAddress {
                address: config.listen_addr.clone(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }

        for (field, value) in [
            ("registry_ttl", config.registry_ttl),
            ("history_ttl", config.history_ttl),
            ("sweep_interval", config.sweep_interval),
        ] {
            if value == Duration::ZERO {
                errors.push(ValidationError::InvalidDuration {
                    field: field.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        errors
            .iter()
            .map(|error| format!("  • {error}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
