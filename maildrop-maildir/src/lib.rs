//! Maildir storage: unique filenames, per-mailbox `tmp`/`new`/`cur`
//! resolution and the write-then-link publish step.

#[cfg(not(unix))]
compile_error!("Only unix-like systems are currently supported");

pub mod error;
pub mod filename;
pub mod layout;
pub mod testing;
pub mod writer;

pub use error::{MaildirError, Result};
pub use filename::{FilenameGenerator, maildir_filename};
pub use layout::{MailboxLayout, MailboxPaths};
pub use writer::{AtomicWriter, AttemptState, DeliveryAttempt, Published};
