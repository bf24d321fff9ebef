// ── Runtime bridge configuration ──
//
// Describes which account to poll and how the bridge paces itself.
// Never touches disk: the CLI resolves a profile and hands this in.

use std::time::Duration;

use secrecy::SecretString;
use sleepiq_api::{DEFAULT_BASE_URL, TlsMode, TransportConfig};
use url::Url;

/// Configuration for one SleepIQ account bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// API root (overridable for tests).
    pub base_url: Url,
    /// Account email.
    pub username: String,
    pub password: SecretString,
    pub tls: TlsMode,
    /// Request timeout.
    pub timeout: Duration,
    /// Time between poll ticks. Zero disables the background task.
    pub refresh_interval: Duration,
    /// Quiet window before a sleep-number write is sent.
    pub send_delay: Duration,
    /// Timer (minutes) sent with foot-warmer writes.
    pub foot_warmer_timer: u32,
    /// Ceiling on waiting for the foundation to stop moving.
    pub motion_wait_timeout: Duration,
    /// Foundation status poll period while waiting on motion.
    pub motion_poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.parse().expect("default base URL is valid"),
            username: String::new(),
            password: SecretString::from(String::new()),
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(5),
            send_delay: Duration::from_secs(2),
            foot_warmer_timer: 120,
            motion_wait_timeout: Duration::from_secs(30),
            motion_poll_interval: Duration::from_millis(500),
        }
    }
}

impl BridgeConfig {
    /// Defaults plus the given account credentials.
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            ..Self::default()
        }
    }

    /// Transport settings for building the session client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
            cookie_jar: None,
        }
    }
}
