use maildrop_common::{Address, AddressError};
use maildrop_maildir::MailboxLayout;
use serde::{Deserialize, Deserializer};

/// Domain given to a `force_user` that is just a local part
const FORCED_DEFAULT_DOMAIN: &str = "localhost";

/// Configuration for local delivery
///
/// # Examples
///
/// ```ron
/// delivery: (
///     mailbox: (
///         root: "%domain%/%user%/Maildir",
///         base_dir: Some("/var/mail"),
///     ),
///     force_user: Some("catchall@example.com"),
///     sent_folder: ".Sent",
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub mailbox: MailboxLayout,

    /// Deliver every message to this one mailbox, ignoring the envelope
    #[serde(default, deserialize_with = "forced_user")]
    pub force_user: Option<Address>,

    /// Folder the sender's copy is filed in
    #[serde(default = "defaults::sent_folder")]
    pub sent_folder: String,
}

mod defaults {
    pub fn sent_folder() -> String {
        String::from(".Sent")
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mailbox: MailboxLayout::default(),
            force_user: None,
            sent_folder: defaults::sent_folder(),
        }
    }
}

/// Parse a `force_user` value, either `user@domain` or a bare `user` which
/// is taken to be at `localhost`.
///
/// # Errors
///
/// Returns an [`AddressError`] if the value is empty or not a valid address.
pub fn parse_forced_user(value: &str) -> Result<Address, AddressError> {
    let value = value.trim();

    if value.is_empty() {
        Err(AddressError::Empty)
    } else if value.contains('@') {
        value.parse()
    } else {
        Ok(Address::new(value, FORCED_DEFAULT_DOMAIN))
    }
}

fn forced_user<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|value| parse_forced_user(&value))
        .transpose()
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config: DeliveryConfig = ron::from_str("()").unwrap();
        assert_eq!(config, DeliveryConfig::default());
        assert_eq!(config.sent_folder, ".Sent");
        assert_eq!(config.force_user, None);
    }

    #[test]
    fn test_full_config() {
        let config: DeliveryConfig = ron::from_str(
            r#"(
                mailbox: (
                    root: "%domain%/%user%/Maildir",
                    base_dir: Some("/var/mail"),
                    dir_mode: 0o750,
                    file_mode: 0o640,
                ),
                force_user: Some("catchall@example.com"),
                sent_folder: ".Outbox",
            )"#,
        )
        .unwrap();

        assert_eq!(config.mailbox.base_dir, Some(PathBuf::from("/var/mail")));
        assert_eq!(config.mailbox.dir_mode, 0o750);
        assert_eq!(
            config.force_user,
            Some(Address::new("catchall", "example.com"))
        );
        assert_eq!(config.sent_folder, ".Outbox");
    }

    #[test]
    fn test_bare_forced_user() {
        assert_eq!(
            parse_forced_user("postmaster").unwrap(),
            Address::new("postmaster", "localhost")
        );
        assert!(parse_forced_user("  ").is_err());

        let config: DeliveryConfig = ron::from_str(r#"(force_user: Some("admin"))"#).unwrap();
        assert_eq!(config.force_user, Some(Address::new("admin", "localhost")));
    }

    #[test]
    fn test_invalid_forced_user() {
        assert!(ron::from_str::<DeliveryConfig>(r#"(force_user: Some("@nowhere"))"#).is_err());
    }
}
