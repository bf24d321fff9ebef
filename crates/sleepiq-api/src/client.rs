// SleepIQ HTTP client
//
// Wraps `reqwest::Client` with session-key query injection, error
// annotation, and a last-seen JSON cache. Endpoint groups (auth, bed,
// foundation) are implemented as inherent methods in separate files to
// keep this module focused on transport mechanics.

use std::sync::{Arc, RwLock};

use arc_swap::ArcSwapOption;
use reqwest::Method;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::auth::Session;
use crate::error::{CODE_SESSION_INVALID, CODE_UNAUTHORIZED, Error};
use crate::transport::TransportConfig;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.sleepiq.sleepnumber.com/rest/";

/// The API reports failures as `{"Error":{"Code":N,"Message":"..."}}`,
/// sometimes alongside HTTP 200.
#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "Error")]
    error: Option<ErrorBody>,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(rename = "Code")]
    code: u32,
    #[serde(rename = "Message")]
    message: Option<String>,
}

/// Session-scoped client for the SleepIQ REST API.
///
/// Owns the account credentials and the current session (key, account id,
/// current bed id). All calls after [`login`](Self::login) carry the
/// session key as the `_k` query parameter.
pub struct SleepIqClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    session: RwLock<Session>,
    /// Body of the most recent successful response.
    last_json: ArcSwapOption<Value>,
}

impl SleepIqClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// A cookie jar is added if the config doesn't carry one; login sets a
    /// session cookie that the API expects next to the key.
    pub fn new(
        base_url: Url,
        username: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self::with_client(http, base_url, username, password))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: String,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            username,
            password,
            session: RwLock::new(Session::default()),
            last_json: ArcSwapOption::empty(),
        }
    }

    /// The API root all endpoint paths are joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The account login (email).
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Session state ────────────────────────────────────────────────

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.session.read().expect("session lock poisoned").clone()
    }

    /// The session key, if logged in.
    pub fn session_key(&self) -> Option<String> {
        let guard = self.session.read().expect("session lock poisoned");
        (!guard.key.is_empty()).then(|| guard.key.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_key().is_some()
    }

    /// Forget the session key. The next call must re-login.
    pub fn clear_session(&self) {
        debug!("clearing session key");
        self.session.write().expect("session lock poisoned").key.clear();
    }

    pub(crate) fn update_session(&self, f: impl FnOnce(&mut Session)) {
        f(&mut self.session.write().expect("session lock poisoned"));
    }

    /// Body of the most recent successful response, if any.
    pub fn last_json(&self) -> Option<Arc<Value>> {
        self.last_json.load_full()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Join an endpoint path (e.g. `bed/familyStatus`) onto the API root.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Build a bed-scoped path: `bed/{bed_id}/{suffix}`.
    pub(crate) fn bed_path(bed_id: &str, suffix: &str) -> String {
        format!("bed/{bed_id}/{suffix}")
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated request and return the raw JSON body.
    ///
    /// Fails with [`Error::SessionExpired`] on 401 / 50002, with
    /// [`Error::Api`] for any other non-2xx status or embedded
    /// `Error` object, and with [`Error::Deserialization`] when the body
    /// is not JSON. On success the body replaces the last-seen cache.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let key = self.session_key().ok_or(Error::NotAuthenticated)?;
        let url = self.endpoint_url(path)?;

        debug!("{} {}", method, url);

        let mut builder = self
            .http
            .request(method, url)
            .query(&[("_k", key.as_str())]);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        let value = parse_response(resp).await?;
        trace!(body = %value, "response body");

        self.last_json.store(Some(Arc::new(value.clone())));
        Ok(value)
    }

    /// GET a typed payload.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let value = self.request(Method::GET, path, query, None).await?;
        decode(value)
    }

    /// PUT with an optional JSON body, discarding the (usually empty) reply.
    pub(crate) async fn put(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        self.request(Method::PUT, path, query, body).await
    }
}

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Extract an embedded `{"Error": {...}}` object, if present.
pub(crate) fn embedded_error(body: &str) -> Option<(u32, String)> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    envelope
        .error
        .map(|e| (e.code, e.message.unwrap_or_default().trim().to_owned()))
}

/// Classify the response, returning the parsed body on success.
async fn parse_response(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if let Some((code, message)) = embedded_error(&body) {
        return Err(classify(status.as_u16(), code, message));
    }

    if !status.is_success() {
        return Err(classify(
            status.as_u16(),
            u32::from(status.as_u16()),
            preview(&body).to_owned(),
        ));
    }

    if body.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })
}

fn classify(status: u16, code: u32, message: String) -> Error {
    if code == CODE_UNAUTHORIZED || code == CODE_SESSION_INVALID {
        Error::SessionExpired { code }
    } else {
        Error::Api {
            status,
            code,
            message,
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: value.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base(Url::parse("http://localhost:8080/rest").unwrap());
        assert_eq!(url.as_str(), "http://localhost:8080/rest/");
    }

    #[test]
    fn embedded_error_is_detected() {
        let body = r#"{"Error":{"Code":404,"Message":" No Foundation Device"}}"#;
        assert_eq!(
            embedded_error(body),
            Some((404, "No Foundation Device".to_owned()))
        );
        assert_eq!(embedded_error(r#"{"pauseMode":"off"}"#), None);
    }

    #[test]
    fn session_codes_classify_as_expired() {
        assert!(matches!(
            classify(200, 50002, String::new()),
            Error::SessionExpired { code: 50002 }
        ));
        assert!(matches!(
            classify(401, 401, String::new()),
            Error::SessionExpired { code: 401 }
        ));
        assert!(matches!(
            classify(500, 500, String::new()),
            Error::Api { status: 500, .. }
        ));
    }

    #[test]
    fn bed_path_is_bed_scoped() {
        assert_eq!(
            SleepIqClient::bed_path("-9223372019958625412", "pauseMode"),
            "bed/-9223372019958625412/pauseMode"
        );
    }
}
