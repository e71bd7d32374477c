//! Shared fixtures for delivery scenarios

use std::path::{Path, PathBuf};

use maildrop_common::{Address, Envelope};
use maildrop_delivery::{DeliveryConfig, DeliveryCoordinator};
use maildrop_maildir::MailboxLayout;
use tempfile::TempDir;

pub const MESSAGE: &[u8] =
    b"From: alice@example.com\r\nTo: bob@example.com\r\nSubject: Lunch\r\n\r\nNoon?\r\n";

/// A scratch mail spool with mailboxes at `<scratch>/<domain>/<user>/Maildir`
pub struct Spool {
    scratch: TempDir,
}

impl Spool {
    pub fn new() -> Self {
        Self {
            scratch: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.scratch.path()
    }

    pub fn config(&self) -> DeliveryConfig {
        DeliveryConfig {
            mailbox: MailboxLayout {
                base_dir: Some(self.root().to_path_buf()),
                ..MailboxLayout::default()
            },
            ..DeliveryConfig::default()
        }
    }

    pub fn coordinator(&self) -> DeliveryCoordinator {
        DeliveryCoordinator::new(self.config())
    }

    /// `<scratch>/<domain>/<user>/Maildir[/<folder>]`
    pub fn mailbox(&self, address: &str, folder: Option<&str>) -> PathBuf {
        let address: Address = address.parse().unwrap();
        let mut path = self
            .root()
            .join(&address.domain)
            .join(&address.local_part)
            .join("Maildir");
        if let Some(folder) = folder {
            path.push(folder);
        }
        path
    }

    /// Files in one of a mailbox's `tmp`, `new` or `cur`. A missing
    /// directory has no files.
    pub fn files(&self, address: &str, folder: Option<&str>, leaf: &str) -> Vec<PathBuf> {
        let dir = self.mailbox(address, folder).join(leaf);
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut files: Vec<_> = entries.map(|e| e.unwrap().path()).collect();
        files.sort();
        files
    }
}

pub fn envelope(sender: &str, recipients: &[&str], connection_id: &str) -> Envelope {
    Envelope::new(
        Address::parse_reverse_path(sender).unwrap(),
        recipients
            .iter()
            .map(|r| r.parse::<Address>().unwrap())
            .collect::<Vec<_>>(),
        connection_id,
        "mx.example.com",
    )
}
