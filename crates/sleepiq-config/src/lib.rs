//! Configuration for the SleepIQ bridge.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `sleepiq_core::BridgeConfig`. The core crate never
//! sees these types; the CLI resolves a profile and hands the result in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sleepiq_core::{BridgeConfig, TlsMode};

/// Keyring service name; entries are keyed `<profile>/password`.
pub const KEYRING_SERVICE: &str = "sleepiq";

/// Environment variable consulted for the account email.
pub const EMAIL_ENV: &str = "SLEEPIQ_EMAIL";

/// Environment variable consulted for the account password.
pub const PASSWORD_ENV: &str = "SLEEPIQ_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found in config")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: `requested`, else the configured
    /// default, else `"default"`.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// One SleepIQ account.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Account email.
    pub email: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// API root override.
    pub base_url: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Seconds between polls.
    pub refresh_time: Option<u64>,

    /// Seconds a sleep-number write waits for further changes.
    pub send_delay: Option<u64>,

    /// Foot warmer timer in minutes.
    pub foot_warmer_timer: Option<u32>,

    /// Seconds to wait for the foundation to stop moving.
    pub motion_wait_timeout: Option<u64>,

    /// Request timeout override in seconds.
    pub timeout: Option<u64>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "sleepiq", "sleepiq")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "sleepiq", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for runtime data such as the accessory cache.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "sleepiq"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Loading & saving ────────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if any), then `SLEEPIQ_*`
/// variables with `__` as the nesting separator
/// (`SLEEPIQ_PROFILES__HOME__REFRESH_TIME=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SLEEPIQ_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, falling back to defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Serialize config to TOML at the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Account email: the profile's, else `SLEEPIQ_EMAIL`.
pub fn resolve_email(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .email
        .clone()
        .or_else(|| std::env::var(EMAIL_ENV).ok())
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Password chain: `password_env` → `SLEEPIQ_PASSWORD` → keyring →
/// plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(pw) = profile
        .password_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(SecretString::from(pw));
    }

    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    if let Some(pw) = keyring_entry(profile_name).and_then(|e| e.get_password().ok()) {
        return Ok(SecretString::from(pw));
    }

    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

fn keyring_entry(profile_name: &str) -> Option<keyring::Entry> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")).ok()
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))?;
    entry.set_password(password)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `BridgeConfig` from a profile. Missing email or password is
/// `NoCredentials`; the bridge must not be started without both.
pub fn profile_to_bridge_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<BridgeConfig, ConfigError> {
    let username = resolve_email(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;

    let mut config = BridgeConfig::new(username, password);

    if let Some(ref raw) = profile.base_url {
        let mut url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
        // Relative joins drop the last segment without it.
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }
        config.base_url = url;
    }
    if let Some(ref ca) = profile.ca_cert {
        config.tls = TlsMode::CustomCa(ca.clone());
    }

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some(secs) = profile.refresh_time {
        config.refresh_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = profile.send_delay {
        config.send_delay = Duration::from_secs(secs);
    }
    if let Some(minutes) = profile.foot_warmer_timer {
        config.foot_warmer_timer = minutes;
    }
    if let Some(secs) = profile.motion_wait_timeout {
        if secs == 0 {
            return Err(ConfigError::Validation {
                field: "motion_wait_timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        config.motion_wait_timeout = Duration::from_secs(secs);
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
        default_profile = "home"

        [defaults]
        output = "json"

        [profiles.home]
        email = "sleeper@example.com"
        password = "plaintext"
        refresh_time = 10
        send_delay = 1
        foot_warmer_timer = 60
    "#;

    #[test]
    fn loads_profiles_from_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            let cfg = load_config_from(Path::new("config.toml")).unwrap();

            assert_eq!(cfg.profile_name(None), "home");
            assert_eq!(cfg.profile_name(Some("cabin")), "cabin");
            assert_eq!(cfg.defaults.output, "json");
            assert_eq!(cfg.defaults.timeout, 30);

            let home = cfg.profile("home").unwrap();
            assert_eq!(home.email.as_deref(), Some("sleeper@example.com"));
            assert_eq!(home.refresh_time, Some(10));
            assert!(matches!(
                cfg.profile("cabin"),
                Err(ConfigError::UnknownProfile { .. })
            ));
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_| {
            let cfg = load_config_from(Path::new("absent.toml")).unwrap();
            assert_eq!(cfg.profile_name(None), "default");
            assert!(cfg.profiles.is_empty());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_nested_profile_keys() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            jail.set_env("SLEEPIQ_PROFILES__HOME__REFRESH_TIME", "20");
            jail.set_env("SLEEPIQ_DEFAULT_PROFILE", "cabin");

            let cfg = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(cfg.profile_name(None), "cabin");
            assert_eq!(cfg.profile("home").unwrap().refresh_time, Some(20));
            Ok(())
        });
    }

    #[test]
    fn password_env_takes_precedence_over_plaintext() {
        Jail::expect_with(|jail| {
            jail.set_env("HOME_BED_PASSWORD", "from-env");
            let profile = Profile {
                email: Some("sleeper@example.com".into()),
                password: Some("plaintext".into()),
                password_env: Some("HOME_BED_PASSWORD".into()),
                ..Profile::default()
            };
            let pw = resolve_password(&profile, "home").unwrap();
            assert_eq!(pw.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn email_falls_back_to_env() {
        Jail::expect_with(|jail| {
            let profile = Profile::default();
            assert!(matches!(
                resolve_email(&profile, "home"),
                Err(ConfigError::NoCredentials { .. })
            ));

            jail.set_env(EMAIL_ENV, "env@example.com");
            assert_eq!(resolve_email(&profile, "home").unwrap(), "env@example.com");
            Ok(())
        });
    }

    #[test]
    fn profile_translates_to_bridge_config() {
        Jail::expect_with(|jail| {
            jail.set_env(PASSWORD_ENV, "secret");
            let profile = Profile {
                email: Some("sleeper@example.com".into()),
                base_url: Some("http://127.0.0.1:9000/rest".into()),
                refresh_time: Some(10),
                send_delay: Some(1),
                foot_warmer_timer: Some(60),
                motion_wait_timeout: Some(5),
                ..Profile::default()
            };

            let cfg = profile_to_bridge_config(&profile, "home", &Defaults::default()).unwrap();
            assert_eq!(cfg.username, "sleeper@example.com");
            assert_eq!(cfg.password.expose_secret(), "secret");
            assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:9000/rest/");
            assert_eq!(cfg.refresh_interval, Duration::from_secs(10));
            assert_eq!(cfg.send_delay, Duration::from_secs(1));
            assert_eq!(cfg.foot_warmer_timer, 60);
            assert_eq!(cfg.motion_wait_timeout, Duration::from_secs(5));
            assert_eq!(cfg.timeout, Duration::from_secs(30));
            Ok(())
        });
    }

    #[test]
    fn unset_fields_keep_bridge_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env(PASSWORD_ENV, "secret");
            let profile = Profile {
                email: Some("sleeper@example.com".into()),
                ..Profile::default()
            };
            let cfg = profile_to_bridge_config(&profile, "home", &Defaults::default()).unwrap();
            assert_eq!(cfg.refresh_interval, Duration::from_secs(5));
            assert_eq!(cfg.send_delay, Duration::from_secs(2));
            assert_eq!(cfg.foot_warmer_timer, 120);
            assert_eq!(cfg.base_url.as_str(), BridgeConfig::default().base_url.as_str());
            Ok(())
        });
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env(PASSWORD_ENV, "secret");
            let profile = Profile {
                email: Some("sleeper@example.com".into()),
                base_url: Some("not a url".into()),
                ..Profile::default()
            };
            let err = profile_to_bridge_config(&profile, "home", &Defaults::default()).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "base_url"));
            Ok(())
        });
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                email: Some("sleeper@example.com".into()),
                refresh_time: Some(15),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded: Config = Figment::new()
            .merge(Toml::file(&path))
            .extract()
            .unwrap();
        let home = loaded.profile("home").unwrap();
        assert_eq!(home.email.as_deref(), Some("sleeper@example.com"));
        assert_eq!(home.refresh_time, Some(15));
    }
}
