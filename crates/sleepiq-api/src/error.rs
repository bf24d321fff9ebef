use thiserror::Error;

/// Upstream code for a missing or rejected session key.
pub const CODE_UNAUTHORIZED: u32 = 401;
/// Upstream code for "session is invalid" after a remote sign-out.
pub const CODE_SESSION_INVALID: u32 = 50002;
/// Upstream code for a missing resource (no foundation, unknown outlet).
pub const CODE_NOT_FOUND: u32 = 404;

/// Top-level error type for the `sleepiq-api` crate.
///
/// Every failure is annotated with enough structure for `sleepiq-core`
/// to decide between re-authenticating, recording a missing capability,
/// or skipping a poll tick.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (bad credentials) or the login call itself failed.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The upstream reported 401 / 50002 for an authenticated call.
    #[error("Session expired (code {code}) -- re-authentication required")]
    SessionExpired { code: u32 },

    /// A request was attempted before a session key was acquired.
    #[error("Not authenticated -- call login() first")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup error (custom CA could not be loaded).
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Structured error: either a non-2xx status or a 2xx body carrying
    /// `{"Error": {"Code": .., "Message": ..}}`.
    #[error("SleepIQ API error {code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: u32,
        message: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. } | Self::NotAuthenticated)
    }

    /// Returns `true` for a "not found" answer, which foundation endpoints
    /// use to signal that no foundation is attached.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => *code == CODE_NOT_FOUND || *status == 404,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// The upstream error code, if the error carried one.
    pub fn api_code(&self) -> Option<u32> {
        match self {
            Self::Api { code, .. } | Self::SessionExpired { code } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_codes_are_auth_expired() {
        assert!(Error::SessionExpired { code: 50002 }.is_auth_expired());
        assert!(Error::NotAuthenticated.is_auth_expired());
        assert!(
            !Error::Authentication {
                message: "bad password".into()
            }
            .is_auth_expired()
        );
    }

    #[test]
    fn embedded_404_is_not_found() {
        let err = Error::Api {
            status: 200,
            code: 404,
            message: "No Foundation Device".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_transient());
        assert_eq!(err.api_code(), Some(404));
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Api {
            status: 503,
            code: 503,
            message: "maintenance".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }
}
