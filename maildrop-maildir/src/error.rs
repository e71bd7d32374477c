//! Error types for Maildir storage.
//!
//! The `Display` output of these errors is what ends up in the reason handed
//! back to the mail transport, so it never names filesystem paths. The paths
//! are kept alongside for logging.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MaildirError {
    /// One of `tmp`, `new` or `cur` could not be created, e.g. permission
    /// denied or something that isn't a directory is in the way.
    #[error("Unable to create mailbox directory: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing the message into `tmp` failed.
    #[error("Unable to write message: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Linking the finished message into `new` failed.
    #[error("Unable to publish message: {source}")]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The message bytes could not be read from their source, e.g. the
    /// client went away mid-transfer.
    #[error("Message source failed: {0}")]
    SourceStream(#[source] io::Error),

    /// The recipient or folder would resolve to a path outside its mailbox.
    #[error("Invalid mailbox: {0}")]
    InvalidMailbox(String),
}

impl MaildirError {
    /// The filesystem path involved, if any
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::DirectoryCreation { path, .. }
            | Self::Write { path, .. }
            | Self::Publish { path, .. } => Some(path),
            Self::SourceStream(_) | Self::InvalidMailbox(_) => None,
        }
    }
}

/// Specialized `Result` type for Maildir operations.
pub type Result<T> = std::result::Result<T, MaildirError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_does_not_leak_paths() {
        let err = MaildirError::DirectoryCreation {
            path: PathBuf::from("/var/mail/example.com/carol/Maildir/tmp"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        };

        let message = err.to_string();
        assert!(message.contains("Unable to create mailbox directory"));
        assert!(message.contains("access denied"));
        assert!(!message.contains("/var/mail"));
        assert!(err.path().is_some());
    }

    #[test]
    fn test_source_stream_has_no_path() {
        let err = MaildirError::SourceStream(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "client went away",
        ));
        assert!(err.path().is_none());
        assert_eq!(err.to_string(), "Message source failed: client went away");
    }
}
