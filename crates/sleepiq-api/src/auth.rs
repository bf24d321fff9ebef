// Session authentication
//
// `PUT /login` returns a session key (passed as `_k` on every later call)
// and sets a session cookie in the client's jar. The key is held in
// memory only and is cleared whenever the API reports 401 / 50002.

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::{SleepIqClient, embedded_error};
use crate::error::Error;
use crate::models::RegistrationResponse;

/// In-memory session state.
///
/// An empty `key` means unauthenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub key: String,
    /// Account (sleeper) id returned by login as `userID`.
    pub account_id: String,
    /// Bed the typed bed endpoints default to; the first bed seen in
    /// the latest family status.
    pub current_bed_id: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "userID", alias = "userId")]
    user_id: String,
    key: String,
}

impl SleepIqClient {
    /// Authenticate with the account credentials.
    ///
    /// `PUT /login` with `{"login", "password"}`. Any failure -- transport,
    /// non-2xx, or an embedded `Error` body -- is reported as
    /// [`Error::Authentication`] and leaves the session unauthenticated.
    pub async fn login(&self) -> Result<(), Error> {
        let url = self.endpoint_url("login")?;

        debug!("logging in at {}", url);

        let body = json!({
            "login": self.username(),
            "password": self.password().expose_secret(),
        });

        let resp = self
            .http()
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Authentication {
                message: format!("login request failed: {e}"),
            })?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if let Some((code, message)) = embedded_error(&text) {
            self.clear_session();
            return Err(Error::Authentication {
                message: format!("login rejected ({code}): {message}"),
            });
        }

        if !status.is_success() {
            self.clear_session();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status})"),
            });
        }

        let login: LoginResponse =
            serde_json::from_str(&text).map_err(|e| Error::Authentication {
                message: format!("unexpected login response: {e}"),
            })?;

        if login.key.is_empty() {
            return Err(Error::Authentication {
                message: "login response carried an empty session key".into(),
            });
        }

        self.update_session(|session| {
            session.key = login.key;
            session.account_id = login.user_id;
        });

        debug!("login successful");
        Ok(())
    }

    /// Fetch account registration details.
    ///
    /// `GET /registration`
    pub async fn registration(&self) -> Result<RegistrationResponse, Error> {
        debug!("fetching registration");
        self.get("registration", &[]).await
    }
}
