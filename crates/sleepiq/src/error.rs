//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use sleepiq_config::ConfigError;
use sleepiq_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach SleepIQ")]
    #[diagnostic(
        code(sleepiq::connection_failed),
        help("Check your network connection and try again.\n{reason}")
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(sleepiq::auth_failed),
        help(
            "Verify the email and password for profile '{profile}'.\n\
             Run: sleepiq config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(sleepiq::no_credentials),
        help(
            "Configure credentials with: sleepiq config init\n\
             Or set SLEEPIQ_EMAIL and SLEEPIQ_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(sleepiq::not_found), help("Run: sleepiq status to see available beds"))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("Bed has no foundation")]
    #[diagnostic(
        code(sleepiq::no_foundation),
        help("Flex, outlet, light and foot warmer controls need a FlexFit foundation.")
    )]
    NoFoundation { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(sleepiq::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sleepiq::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(sleepiq::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: sleepiq config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration could not be loaded")]
    #[diagnostic(code(sleepiq::config), help("{message}"))]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Timed out after {seconds}s: {what}")]
    #[diagnostic(
        code(sleepiq::timeout),
        help("Increase the timeout or try again once the bed is idle.")
    )]
    Timeout { what: String, seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(sleepiq::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::NoFoundation { .. } | Self::ProfileNotFound { .. } => {
                exit_code::NOT_FOUND
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { .. } | CoreError::Disabled => CliError::AuthFailed {
                profile: "current".into(),
            },
            CoreError::SessionExpired | CoreError::SessionClosed => CliError::ConnectionFailed {
                reason: "The SleepIQ session ended unexpectedly.".into(),
            },
            CoreError::TransientUpstream { message } => {
                CliError::ConnectionFailed { reason: message }
            }
            CoreError::CapabilityAbsent { message } => CliError::NoFoundation { message },
            CoreError::MalformedResponse { message } => CliError::ApiError {
                code: "malformed".into(),
                message,
            },
            CoreError::Rejected { code, message } => CliError::ApiError {
                code: code.to_string(),
                message,
            },
            CoreError::MotionTimeout {
                bed_id,
                waited_secs,
            } => CliError::Timeout {
                what: format!("foundation on bed {bed_id} kept moving"),
                seconds: waited_secs,
            },
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_exit_with_auth_code() {
        let err = CliError::from(CoreError::AuthenticationFailed {
            message: "bad password".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);

        let err = CliError::from(ConfigError::NoCredentials {
            profile: "home".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn upstream_outage_is_a_connection_error() {
        let err = CliError::from(CoreError::TransientUpstream {
            message: "503".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn motion_timeout_is_a_timeout() {
        let err = CliError::from(CoreError::MotionTimeout {
            bed_id: "B1".into(),
            waited_secs: 30,
        });
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
        assert!(err.to_string().contains("30s"));
    }
}
