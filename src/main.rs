mod client;
mod config;
mod signature;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::client::{BackupRequest, CallbackClient};
use crate::config::Settings;

/// Backup callback tool
#[derive(Parser, Debug)]
#[command(name = "backup-callback")]
#[command(about = "Load backup callback settings and send signed callbacks")]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "backup.conf", env = "BACKUP_CALLBACK_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the config file and print the effective settings
    Check,

    /// Print the X-Signature for a backup request
    Sign {
        /// Arguments forwarded to the backup script
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Check an X-Signature against a backup request
    Verify {
        /// Hex signature to check
        #[arg(short, long)]
        signature: String,

        /// Arguments forwarded to the backup script
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Send a signed backup request to the callback service
    Trigger {
        /// Callback URL, defaults to http://localhost:<port>/backup
        #[arg(short, long, env = "BACKUP_CALLBACK_URL")]
        url: Option<String>,

        /// Arguments forwarded to the backup script
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn load(path: &Path) -> Result<Settings> {
    info!("Loading config from {}", path.display());
    Ok(config::load_config(path)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("backup_callback=info".parse()?))
        .init();

    let args = Args::parse();
    let mut settings = load(&args.config)?;

    match args.command {
        Command::Check => {
            println!("port: {}", settings.port);
            println!("scriptpath: {}", settings.script_path);
            println!("callback_secret: ***");
        }
        Command::Sign { args } => {
            let body = BackupRequest::new(args).to_body()?;
            println!("{}", signature::sign(&settings.callback_secret, &body));
        }
        Command::Verify { signature: sig, args } => {
            let body = BackupRequest::new(args).to_body()?;
            if !signature::verify(&settings.callback_secret, &body, &sig) {
                bail!("signature does not match");
            }
            println!("signature ok");
        }
        Command::Trigger { url, args } => {
            if let Some(url) = url {
                settings.callback_url = url;
            }
            let client = CallbackClient::new(Arc::new(settings));
            let response = client
                .trigger(args)
                .await
                .context("failed to send backup callback")?;
            println!("Status Code: {}", response.status);
            println!("Response Body: {}", response.body);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_defaults_to_backup_conf() {
        let args = Args::try_parse_from(["backup-callback", "check"]).unwrap();
        assert_eq!(args.config, PathBuf::from("backup.conf"));
        assert!(matches!(args.command, Command::Check));
    }

    #[test]
    fn trigger_forwards_hyphenated_args() {
        let args = Args::try_parse_from([
            "backup-callback",
            "-c",
            "/etc/backup.conf",
            "trigger",
            "--url",
            "http://10.0.0.2:47731/backup",
            "--all",
            "db",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("/etc/backup.conf"));
        match args.command {
            Command::Trigger { url, args } => {
                assert_eq!(url.as_deref(), Some("http://10.0.0.2:47731/backup"));
                assert_eq!(args, vec!["--all", "db"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn verify_requires_signature() {
        assert!(Args::try_parse_from(["backup-callback", "verify", "x"]).is_err());
    }
}
