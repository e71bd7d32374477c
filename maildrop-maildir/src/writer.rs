//! Write-then-link delivery into a single Maildir folder.
//!
//! A message is streamed into `tmp/<filename>`, synced, and then hard linked
//! to `new/<filename>` before the `tmp` entry is unlinked. Mail readers only
//! look at `new` and `cur`, so they either see the complete file or nothing.
//!
//! Linking (rather than renaming) means an existing file in `new` is never
//! replaced, and a crash between the link and the unlink leaves a complete
//! copy in `new` plus a stray entry in `tmp`, which is harmless.

use std::{
    fmt,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use maildrop_common::{internal, mailbox, tracing};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::{
    error::{MaildirError, Result},
    layout::{MailboxLayout, MailboxPaths},
};

const CHUNK_SIZE: usize = 64 * 1024;

/// Where a [`DeliveryAttempt`] is in its lifecycle.
///
/// ```text
/// Pending -> Writing -> WrittenToTmp -> Published -> Done
///               |             |
///               v             v
///            Failed     PublishFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Writing,
    WrittenToTmp,
    Published,
    Done,
    Failed,
    PublishFailed,
}

impl AttemptState {
    /// Whether the attempt has finished, successfully or not
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::PublishFailed)
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One message being written into one mailbox folder.
///
/// The attempt owns its temp file from the moment it is created until it has
/// been unlinked. If the attempt is dropped while still owning it (e.g. the
/// delivery task was cancelled) the temp file is removed on drop.
#[derive(Debug)]
pub struct DeliveryAttempt {
    filename: String,
    tmp_path: PathBuf,
    new_path: PathBuf,
    state: AttemptState,
    owns_tmp: bool,
}

impl DeliveryAttempt {
    pub fn new(paths: &MailboxPaths, filename: impl Into<String>) -> Self {
        let filename = filename.into();

        Self {
            tmp_path: paths.tmp.join(&filename),
            new_path: paths.new.join(&filename),
            filename,
            state: AttemptState::Pending,
            owns_tmp: false,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    pub fn new_path(&self) -> &Path {
        &self.new_path
    }

    pub const fn state(&self) -> AttemptState {
        self.state
    }

    fn transition(&mut self, next: AttemptState) {
        internal!("{}: {} -> {next}", self.filename, self.state);
        self.state = next;
    }

    /// Remove the temp file if this attempt created it and it is still there.
    ///
    /// Safe to call any number of times. A file that is already gone counts
    /// as cleaned up, and failures are logged rather than returned so they
    /// can't mask the outcome of the delivery itself.
    pub async fn cleanup(&mut self) {
        if !self.owns_tmp {
            return;
        }

        match tokio::fs::remove_file(&self.tmp_path).await {
            Ok(()) => self.owns_tmp = false,
            Err(e) if e.kind() == ErrorKind::NotFound => self.owns_tmp = false,
            Err(e) => {
                tracing::warn!(
                    filename = %self.filename,
                    path = %self.tmp_path.display(),
                    error = %e,
                    "Failed to remove temporary message file"
                );
            }
        }
    }
}

impl Drop for DeliveryAttempt {
    fn drop(&mut self) {
        if self.owns_tmp {
            // Best effort, we may be unwinding or cancelled
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}

/// A message that made it into `new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Streams messages into a Maildir folder and publishes them atomically.
#[derive(Debug, Clone, Copy)]
pub struct AtomicWriter {
    file_mode: u32,
}

impl From<&MailboxLayout> for AtomicWriter {
    fn from(layout: &MailboxLayout) -> Self {
        Self::new(layout.file_mode)
    }
}

impl AtomicWriter {
    pub const fn new(file_mode: u32) -> Self {
        Self { file_mode }
    }

    /// Stream everything from `source` into `paths.tmp/<filename>`, then
    /// publish it as `paths.new/<filename>`.
    ///
    /// The temp file is always gone by the time this returns, whichever way
    /// the attempt ended.
    ///
    /// # Errors
    ///
    /// - [`MaildirError::Write`] if the temp file can't be created (including
    ///   when it already exists) or written to
    /// - [`MaildirError::SourceStream`] if reading from `source` fails
    /// - [`MaildirError::Publish`] if the link into `new` fails
    #[tracing::instrument(level = tracing::Level::DEBUG, skip(self, source, paths), fields(folder = %paths.folder.display()))]
    pub async fn write<R>(
        &self,
        source: &mut R,
        paths: &MailboxPaths,
        filename: &str,
    ) -> Result<Published>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut attempt = DeliveryAttempt::new(paths, filename);
        let result = self.run(&mut attempt, source).await;

        attempt.cleanup().await;
        if result.is_ok() {
            attempt.transition(AttemptState::Done);
        }

        result
    }

    async fn run<R>(&self, attempt: &mut DeliveryAttempt, source: &mut R) -> Result<Published>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        attempt.transition(AttemptState::Writing);

        let size = match self.write_tmp(attempt, source).await {
            Ok(size) => size,
            Err(e) => {
                attempt.transition(AttemptState::Failed);
                return Err(e);
            }
        };

        attempt.transition(AttemptState::WrittenToTmp);

        if let Err(source) = tokio::fs::hard_link(&attempt.tmp_path, &attempt.new_path).await {
            attempt.transition(AttemptState::PublishFailed);
            return Err(MaildirError::Publish {
                path: attempt.new_path.clone(),
                source,
            });
        }

        attempt.transition(AttemptState::Published);
        mailbox!(
            "{size} bytes published to {}",
            attempt.new_path.display()
        );

        Ok(Published {
            filename: attempt.filename.clone(),
            path: attempt.new_path.clone(),
            size,
        })
    }

    async fn write_tmp<R>(&self, attempt: &mut DeliveryAttempt, source: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let write_error = |source| MaildirError::Write {
            path: attempt.tmp_path.clone(),
            source,
        };

        // create_new: an existing file here means two attempts were handed
        // the same name, which must not be papered over
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(self.file_mode)
            .open(&attempt.tmp_path)
            .await
            .map_err(write_error)?;
        attempt.owns_tmp = true;

        let mut buf = vec![0; CHUNK_SIZE];
        let mut written = 0_u64;

        loop {
            let read = source
                .read(&mut buf)
                .await
                .map_err(MaildirError::SourceStream)?;
            if read == 0 {
                break;
            }

            file.write_all(&buf[..read]).await.map_err(write_error)?;
            written += read as u64;
        }

        file.flush().await.map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_in(dir: &Path) -> MailboxPaths {
        let layout = MailboxLayout {
            root: String::from("%user%"),
            base_dir: Some(dir.to_path_buf()),
            ..MailboxLayout::default()
        };
        layout
            .resolve(&maildrop_common::Address::new("bob", "example.com"), None)
            .unwrap()
    }

    #[test]
    fn test_terminal_states() {
        assert!(AttemptState::Done.is_terminal());
        assert!(AttemptState::Failed.is_terminal());
        assert!(AttemptState::PublishFailed.is_terminal());
        assert!(!AttemptState::WrittenToTmp.is_terminal());
        assert!(!AttemptState::Published.is_terminal());
    }

    #[test]
    fn test_attempt_paths_share_filename() {
        let paths = paths_in(Path::new("/var/mail"));
        let attempt = DeliveryAttempt::new(&paths, "1.conn.0.host");

        assert_eq!(attempt.state(), AttemptState::Pending);
        assert_eq!(attempt.tmp_path(), Path::new("/var/mail/bob/tmp/1.conn.0.host"));
        assert_eq!(attempt.new_path(), Path::new("/var/mail/bob/new/1.conn.0.host"));
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let scratch = tempfile::tempdir().unwrap();
        let paths = paths_in(scratch.path());
        std::fs::create_dir_all(&paths.tmp).unwrap();

        let mut attempt = DeliveryAttempt::new(&paths, "msg");
        std::fs::write(attempt.tmp_path(), b"partial").unwrap();
        attempt.owns_tmp = true;

        attempt.cleanup().await;
        assert!(!attempt.tmp_path().exists());

        attempt.cleanup().await;
        assert!(!attempt.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_file_removed_elsewhere() {
        let scratch = tempfile::tempdir().unwrap();
        let paths = paths_in(scratch.path());
        std::fs::create_dir_all(&paths.tmp).unwrap();

        let mut attempt = DeliveryAttempt::new(&paths, "msg");
        attempt.owns_tmp = true;

        attempt.cleanup().await;
        assert!(!attempt.owns_tmp);
    }

    #[test]
    fn test_drop_removes_owned_tmp() {
        let scratch = tempfile::tempdir().unwrap();
        let paths = paths_in(scratch.path());
        std::fs::create_dir_all(&paths.tmp).unwrap();

        let tmp = {
            let mut attempt = DeliveryAttempt::new(&paths, "msg");
            std::fs::write(attempt.tmp_path(), b"partial").unwrap();
            attempt.owns_tmp = true;
            attempt.tmp_path().to_path_buf()
        };

        assert!(!tmp.exists());
    }

    #[test]
    fn test_drop_leaves_unowned_tmp() {
        let scratch = tempfile::tempdir().unwrap();
        let paths = paths_in(scratch.path());
        std::fs::create_dir_all(&paths.tmp).unwrap();

        let tmp = {
            let attempt = DeliveryAttempt::new(&paths, "msg");
            std::fs::write(attempt.tmp_path(), b"someone else's").unwrap();
            attempt.tmp_path().to_path_buf()
        };

        assert!(tmp.exists());
    }
}
