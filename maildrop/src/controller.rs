use std::path::{Path, PathBuf};

use anyhow::Context as _;
use maildrop_common::{Address, AddressError, Envelope, internal};
use maildrop_delivery::{DeliveryConfig, DeliveryCoordinator, Outcome};
use serde::Deserialize;
use tokio::io::AsyncRead;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "MAILDROP_CONFIG";

/// Places a configuration file is looked for when neither `--config` nor
/// [`CONFIG_ENV`] is given, in order
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = [
    "./maildrop.config.ron",
    "/etc/maildrop/maildrop.config.ron",
];

/// Top level configuration
///
/// ```ron
/// Maildrop (
///     delivery: (
///         mailbox: (
///             root: "%domain%/%user%/Maildir",
///             base_dir: Some("/var/mail"),
///         ),
///     ),
/// )
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Maildrop {
    #[serde(default)]
    delivery: DeliveryConfig,
}

impl Maildrop {
    pub const fn new(delivery: DeliveryConfig) -> Self {
        Self { delivery }
    }

    pub const fn delivery(&self) -> &DeliveryConfig {
        &self.delivery
    }

    /// Load the configuration from a RON file
    ///
    /// # Errors
    ///
    /// If the file can't be read or isn't a valid configuration
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        ron::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Deliver the message read from `source`
    pub async fn run<R>(self, source: R, envelope: &Envelope) -> Outcome
    where
        R: AsyncRead + Unpin,
    {
        internal!(
            level = DEBUG,
            "Delivering message from {:?} to {}",
            envelope.sender().map(ToString::to_string),
            envelope.recipients()
        );

        DeliveryCoordinator::new(self.delivery)
            .deliver(source, envelope)
            .await
    }
}

/// Find the configuration file using the following precedence:
/// 1. an explicitly given path
/// 2. the `MAILDROP_CONFIG` environment variable
/// 3. the first of `defaults` that exists
///
/// # Errors
///
/// If an explicit or environment path doesn't exist, or none of the
/// defaults do.
pub fn find_config_file(
    explicit: Option<&Path>,
    env: Option<PathBuf>,
    defaults: &[PathBuf],
) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        anyhow::bail!("Config file does not exist: {}", path.display());
    }

    if let Some(path) = env {
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!(
            "{CONFIG_ENV} points to non-existent file: {}",
            path.display()
        );
    }

    if let Some(path) = defaults.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let paths_tried = defaults
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}

/// Build the envelope for a message from command line values.
///
/// # Errors
///
/// If the sender or any recipient isn't a valid address
pub fn envelope_from_args(
    sender: &str,
    recipients: &[String],
    connection_id: impl Into<String>,
    host: impl Into<String>,
) -> Result<Envelope, AddressError> {
    let sender = Address::parse_reverse_path(sender)?;
    let recipients = recipients
        .iter()
        .map(|r| r.parse::<Address>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Envelope::new(sender, recipients, connection_id, host))
}
