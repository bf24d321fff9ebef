// ── Core error types ──
//
// Errors from sleepiq-core, phrased in bridge terms. The
// `From<sleepiq_api::Error>` impl sorts transport-layer failures into
// the categories the polling loop acts on: re-authenticate, record a
// missing capability, or skip the tick.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    /// Login rejected. Fatal on the initial login.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The upstream dropped the session (401 / 50002). Recovered by re-login.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// The bridge gave up after rejected credentials.
    #[error("Bridge is disabled")]
    Disabled,

    /// A scheduled write outlived the bridge that issued it.
    #[error("Session closed")]
    SessionClosed,

    // ── Upstream errors ──────────────────────────────────────────────
    /// The bed has no such device (foundation endpoints answer 404).
    #[error("Capability not present: {message}")]
    CapabilityAbsent { message: String },

    /// Timeouts, connection failures, 5xx. Worth retrying next tick.
    #[error("Upstream temporarily unavailable: {message}")]
    TransientUpstream { message: String },

    /// The response could not be understood.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Any other upstream error code.
    #[error("Request rejected by SleepIQ (code {code}): {message}")]
    Rejected { code: u32, message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Foundation on bed {bed_id} still moving after {waited_secs}s")]
    MotionTimeout { bed_id: String, waited_secs: u64 },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if a fresh login is the fix.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sleepiq_api::Error> for CoreError {
    fn from(err: sleepiq_api::Error) -> Self {
        if err.is_auth_expired() {
            return CoreError::SessionExpired;
        }
        if err.is_not_found() {
            return CoreError::CapabilityAbsent {
                message: err.to_string(),
            };
        }
        if err.is_transient() {
            return CoreError::TransientUpstream {
                message: err.to_string(),
            };
        }

        match err {
            sleepiq_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            sleepiq_api::Error::Api { code, message, .. } => CoreError::Rejected { code, message },
            sleepiq_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
            sleepiq_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sleepiq_api::Error::Tls(message) => CoreError::Config { message },
            other @ (sleepiq_api::Error::Transport(_)
            | sleepiq_api::Error::SessionExpired { .. }
            | sleepiq_api::Error::NotAuthenticated) => CoreError::TransientUpstream {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_codes_map_to_session_expired() {
        let err: CoreError = sleepiq_api::Error::SessionExpired { code: 50002 }.into();
        assert!(err.is_session_expired());

        let err: CoreError = sleepiq_api::Error::NotAuthenticated.into();
        assert!(err.is_session_expired());
    }

    #[test]
    fn not_found_maps_to_capability_absent() {
        let err: CoreError = sleepiq_api::Error::Api {
            status: 200,
            code: 404,
            message: "No Foundation Device".into(),
        }
        .into();
        assert!(matches!(err, CoreError::CapabilityAbsent { .. }));
    }

    #[test]
    fn server_errors_are_transient() {
        let err: CoreError = sleepiq_api::Error::Api {
            status: 503,
            code: 503,
            message: String::new(),
        }
        .into();
        assert!(matches!(err, CoreError::TransientUpstream { .. }));
    }

    #[test]
    fn bad_body_is_malformed() {
        let err: CoreError = sleepiq_api::Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        }
        .into();
        assert!(matches!(err, CoreError::MalformedResponse { .. }));
    }

    #[test]
    fn rejected_login_stays_authentication_failed() {
        let err: CoreError = sleepiq_api::Error::Authentication {
            message: "bad password".into(),
        }
        .into();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }
}
