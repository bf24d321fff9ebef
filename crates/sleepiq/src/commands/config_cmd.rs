//! Config subcommand handlers.

use std::collections::HashMap;

use dialoguer::{Input, Select};

use sleepiq_config::{self as config, Config, Defaults, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

const VALID_KEYS: &str = "email, password_env, base_url, ca_cert, refresh_time, send_delay, \
                          foot_warmer_timer, motion_wait_timeout, timeout";

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref email) = p.email {
            let _ = writeln!(out, "email = \"{email}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref url) = p.base_url {
            let _ = writeln!(out, "base_url = \"{url}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        for (key, value) in [
            ("refresh_time", p.refresh_time),
            ("send_delay", p.send_delay),
            ("motion_wait_timeout", p.motion_wait_timeout),
            ("timeout", p.timeout),
        ] {
            if let Some(v) = value {
                let _ = writeln!(out, "{key} = {v}");
            }
        }
        if let Some(minutes) = p.foot_warmer_timer {
            let _ = writeln!(out, "foot_warmer_timer = {minutes}");
        }
    }

    out
}

/// Same view as JSON, with the plaintext password masked.
#[derive(serde::Serialize)]
struct RedactedConfig<'a> {
    default_profile: Option<&'a str>,
    defaults: &'a Defaults,
    profiles: HashMap<&'a str, Profile>,
}

fn redacted(cfg: &Config) -> RedactedConfig<'_> {
    RedactedConfig {
        default_profile: cfg.default_profile.as_deref(),
        defaults: &cfg.defaults,
        profiles: cfg
            .profiles
            .iter()
            .map(|(name, p)| {
                let mut p = p.clone();
                if p.password.is_some() {
                    p.password = Some("****".into());
                }
                (name.as_str(), p)
            })
            .collect(),
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_password() -> Result<String, CliError> {
    let pass = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if pass.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(pass)
}

fn store_in_keyring(profile_name: &str, password: &str) -> Result<(), CliError> {
    config::store_password(profile_name, password).map_err(|e| CliError::Validation {
        field: "keyring".into(),
        reason: format!("failed to store password in keyring: {e}"),
    })
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: "must be a whole number".into(),
    })
}

/// Apply `key = value` to a profile.
fn apply_setting(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "email" => profile.email = Some(value),
        "password_env" | "password-env" => profile.password_env = Some(value),
        "base_url" | "base-url" => profile.base_url = Some(value),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "refresh_time" | "refresh-time" => {
            profile.refresh_time = Some(parse_number("refresh_time", &value)?);
        }
        "send_delay" | "send-delay" => {
            profile.send_delay = Some(parse_number("send_delay", &value)?);
        }
        "foot_warmer_timer" | "foot-warmer-timer" => {
            profile.foot_warmer_timer = Some(parse_number("foot_warmer_timer", &value)?);
        }
        "motion_wait_timeout" | "motion-wait-timeout" => {
            profile.motion_wait_timeout = Some(parse_number("motion_wait_timeout", &value)?);
        }
        "timeout" => profile.timeout = Some(parse_number("timeout", &value)?),
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!("unknown config key '{other}'. Valid keys: {VALID_KEYS}"),
            });
        }
    }
    Ok(())
}

fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("SleepIQ bridge configuration");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let email: String = Input::new()
                .with_prompt("SleepIQ account email")
                .interact_text()
                .map_err(prompt_err)?;

            let password = prompt_password()?;

            let choices = &[
                "Store in system keyring (recommended)",
                "Save to config file (plaintext)",
            ];
            let selection = Select::new()
                .with_prompt("Where to store the password?")
                .items(choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let password_field = if selection == 0 {
                store_in_keyring(&profile_name, &password)?;
                eprintln!("   ✓ Password stored in system keyring");
                None
            } else {
                Some(password)
            };

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    email: Some(email),
                    password: password_field,
                    ..Profile::default()
                },
            );
            cfg.default_profile = Some(profile_name.clone());
            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: sleepiq status");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let view = redacted(&cfg);
            let out = output::render_single(
                &global.output,
                &view,
                |_| format_config_redacted(&cfg),
                |_| cfg.profile_name(global.profile.as_deref()),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = cfg.profile_name(global.profile.as_deref());
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            apply_setting(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| cfg.profile_name(global.profile.as_deref()));

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let password = prompt_password()?;
            store_in_keyring(&profile_name, &password)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_numbers() {
        let mut profile = Profile::default();
        apply_setting(&mut profile, "refresh-time", "10".into()).ok();
        apply_setting(&mut profile, "foot_warmer_timer", "60".into()).ok();
        apply_setting(&mut profile, "email", "sleeper@example.com".into()).ok();
        assert_eq!(profile.refresh_time, Some(10));
        assert_eq!(profile.foot_warmer_timer, Some(60));
        assert_eq!(profile.email.as_deref(), Some("sleeper@example.com"));
    }

    #[test]
    fn bad_settings_are_rejected() {
        let mut profile = Profile::default();
        assert!(matches!(
            apply_setting(&mut profile, "send_delay", "soon".into()),
            Err(CliError::Validation { .. })
        ));
        assert!(matches!(
            apply_setting(&mut profile, "password", "hunter2".into()),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn redaction_masks_plaintext_password() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                email: Some("sleeper@example.com".into()),
                password: Some("hunter2".into()),
                refresh_time: Some(10),
                ..Profile::default()
            },
        );

        let text = format_config_redacted(&cfg);
        assert!(text.contains("password = \"****\""));
        assert!(text.contains("refresh_time = 10"));
        assert!(!text.contains("hunter2"));

        let json = serde_json::to_string(&redacted(&cfg)).unwrap_or_default();
        assert!(!json.contains("hunter2"));
    }
}
