#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use maildrop::{
    controller::{self, Maildrop},
    exit,
};
use maildrop_common::{logging, tracing};

/// Deliver a message read from stdin into local Maildir mailboxes
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Envelope sender, empty for the null reverse-path
    #[arg(short, long, default_value = "")]
    from: String,

    /// Identifier of the connection the message arrived on [default: a fresh ULID]
    #[arg(long)]
    connection_id: Option<String>,

    /// Host name written into delivered filenames [default: this host's name]
    #[arg(long)]
    host: Option<String>,

    /// Configuration file to load
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Envelope recipients
    #[arg(required = true)]
    recipients: Vec<String>,
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<Maildrop> {
    let env = std::env::var_os(controller::CONFIG_ENV).map(PathBuf::from);
    let defaults = controller::DEFAULT_CONFIG_PATHS.map(PathBuf::from);
    let path = controller::find_config_file(explicit, env, &defaults)?;

    Maildrop::from_file(&path)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init();

    let maildrop = match load_config(args.config.as_deref()) {
        Ok(maildrop) => maildrop,
        Err(e) => {
            eprintln!("maildrop: {e:#}");
            return ExitCode::from(exit::CONFIG);
        }
    };

    let connection_id = args
        .connection_id
        .unwrap_or_else(|| ulid::Ulid::new().to_string());
    let host = args
        .host
        .unwrap_or_else(maildrop_common::host::hostname);

    let envelope =
        match controller::envelope_from_args(&args.from, &args.recipients, connection_id, host) {
            Ok(envelope) => envelope,
            Err(e) => {
                eprintln!("maildrop: {e}");
                return ExitCode::from(exit::USAGE);
            }
        };

    let outcome = maildrop.run(tokio::io::stdin(), &envelope).await;

    if outcome.is_accepted() {
        tracing::info!(
            connection = envelope.connection_id(),
            delivered = outcome.delivered().count(),
            "Message accepted"
        );
        ExitCode::SUCCESS
    } else {
        eprintln!("maildrop: {}", outcome.reason().unwrap_or_default());
        ExitCode::from(exit::TEMPFAIL)
    }
}
