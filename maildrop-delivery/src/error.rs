//! Per-target delivery failures.

use maildrop_maildir::MaildirError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Anything that went wrong inside the recipient's Maildir.
    #[error(transparent)]
    Maildir(#[from] MaildirError),

    /// The message never arrived in full, so nothing was written.
    #[error("Unable to receive message: {0}")]
    Receive(#[source] std::io::Error),

    /// The delivery task panicked or was cancelled before reporting back.
    #[error("Delivery aborted: {0}")]
    Aborted(String),
}

impl DeliveryError {
    /// Returns `true` if the failure came from the message source rather
    /// than the mailbox.
    pub const fn is_source_failure(&self) -> bool {
        matches!(
            self,
            Self::Receive(_) | Self::Maildir(MaildirError::SourceStream(_))
        )
    }

    /// The filesystem path involved, for logging
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Maildir(e) => e.path(),
            Self::Receive(_) | Self::Aborted(_) => None,
        }
    }
}
