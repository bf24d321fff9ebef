mod cli;
mod commands;
mod error;
mod host;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sleepiq_core::BridgeConfig;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need an account connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "sleepiq", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let (profile_name, config) = build_bridge_config(&cli.global)?;
            tracing::debug!(command = ?cmd, profile = %profile_name, "dispatching command");
            commands::dispatch(cmd, config, &cli.global)
                .await
                .map_err(|e| match e {
                    CliError::AuthFailed { .. } => CliError::AuthFailed {
                        profile: profile_name,
                    },
                    other => other,
                })
        }
    }
}

/// Build a `BridgeConfig` from the config file, profile, and CLI overrides.
///
/// With no config file at all, email and password may still come from
/// `--email` / `SLEEPIQ_EMAIL` and `SLEEPIQ_PASSWORD`.
fn build_bridge_config(global: &cli::GlobalOpts) -> Result<(String, BridgeConfig), CliError> {
    let cfg = sleepiq_config::load_config_or_default();
    let profile_name = cfg.profile_name(global.profile.as_deref());

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => sleepiq_config::Profile::default(),
    };

    if let Some(ref email) = global.email {
        profile.email = Some(email.clone());
    }
    if let Some(ref url) = global.base_url {
        profile.base_url = Some(url.clone());
    }
    if let Some(secs) = global.timeout {
        profile.timeout = Some(secs);
    }

    let config = sleepiq_config::profile_to_bridge_config(&profile, &profile_name, &cfg.defaults)?;
    Ok((profile_name, config))
}
