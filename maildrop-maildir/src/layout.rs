use std::{
    io::{Error, ErrorKind},
    path::{Path, PathBuf},
};

use maildrop_common::{Address, internal};
use serde::Deserialize;

use crate::error::{MaildirError, Result};

const DOMAIN_PLACEHOLDER: &str = "%domain%";
const USER_PLACEHOLDER: &str = "%user%";

/// Where mailboxes live, and the permissions new entries are created with
///
/// # Examples
///
/// ```ron
/// mailbox: (
///     root: "%domain%/%user%/Maildir",
///     base_dir: Some("/var/mail"),
///     dir_mode: 0o700,
///     file_mode: 0o600,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MailboxLayout {
    /// Template for the mailbox root, `%domain%` and `%user%` are replaced
    /// with the recipient's (lower-cased) domain and local part
    #[serde(default = "defaults::root")]
    pub root: String,

    /// Directory a relative `root` is resolved against. Without one, relative
    /// roots are relative to the working directory.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Mode for any directories created while resolving a mailbox
    #[serde(default = "defaults::dir_mode")]
    pub dir_mode: u32,

    /// Mode for delivered message files
    #[serde(default = "defaults::file_mode")]
    pub file_mode: u32,
}

mod defaults {
    pub fn root() -> String {
        String::from("%domain%/%user%/Maildir")
    }

    pub const fn dir_mode() -> u32 {
        0o700
    }

    pub const fn file_mode() -> u32 {
        0o600
    }
}

impl Default for MailboxLayout {
    fn default() -> Self {
        Self {
            root: defaults::root(),
            base_dir: None,
            dir_mode: defaults::dir_mode(),
            file_mode: defaults::file_mode(),
        }
    }
}

/// The resolved directories of one mailbox folder. `tmp`, `new` and `cur`
/// are always siblings under `folder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxPaths {
    pub folder: PathBuf,
    pub tmp: PathBuf,
    pub new: PathBuf,
    pub cur: PathBuf,
}

impl MailboxPaths {
    fn new(folder: PathBuf) -> Self {
        Self {
            tmp: folder.join("tmp"),
            new: folder.join("new"),
            cur: folder.join("cur"),
            folder,
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Path> {
        [self.tmp.as_path(), self.new.as_path(), self.cur.as_path()].into_iter()
    }
}

/// Reject anything that isn't a single, ordinary path component.
fn validate_component(kind: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\0')
    {
        return Err(MaildirError::InvalidMailbox(format!(
            "{kind} {value:?} is not a valid path component"
        )));
    }

    Ok(())
}

/// Replace the placeholders in a single pass, so a substituted value is
/// never itself searched for placeholders.
fn substitute(template: &str, domain: &str, user: &str) -> String {
    let mut resolved = String::with_capacity(template.len() + domain.len() + user.len());
    let mut rest = template;

    while let Some(start) = rest.find('%') {
        resolved.push_str(&rest[..start]);
        let candidate = &rest[start..];

        if candidate.starts_with(DOMAIN_PLACEHOLDER) {
            resolved.push_str(domain);
            rest = &candidate[DOMAIN_PLACEHOLDER.len()..];
        } else if candidate.starts_with(USER_PLACEHOLDER) {
            resolved.push_str(user);
            rest = &candidate[USER_PLACEHOLDER.len()..];
        } else {
            resolved.push('%');
            rest = &candidate[1..];
        }
    }

    resolved.push_str(rest);
    resolved
}

impl MailboxLayout {
    /// Work out the `tmp`, `new` and `cur` directories for `address`, with
    /// `folder` (e.g. `.Sent`) inserted between the mailbox root and the
    /// Maildir leaves.
    ///
    /// # Errors
    ///
    /// Returns [`MaildirError::InvalidMailbox`] if the local part, domain or
    /// folder would escape the mailbox root.
    pub fn resolve(&self, address: &Address, folder: Option<&str>) -> Result<MailboxPaths> {
        let domain = address.domain.to_ascii_lowercase();
        validate_component("domain", &domain)?;
        validate_component("user", &address.local_part)?;

        let root = PathBuf::from(substitute(&self.root, &domain, &address.local_part));
        let mut folder_path = match &self.base_dir {
            Some(base) if root.is_relative() => base.join(root),
            _ => root,
        };

        if let Some(folder) = folder {
            validate_component("folder", folder)?;
            folder_path.push(folder);
        }

        Ok(MailboxPaths::new(folder_path))
    }

    /// Make sure `tmp`, `new` and `cur` all exist, creating any that are
    /// missing (and their parents) with `dir_mode`.
    ///
    /// Directories that already exist are left as they are, their
    /// permissions are not touched.
    ///
    /// # Errors
    ///
    /// Returns [`MaildirError::DirectoryCreation`] for the first directory
    /// that can't be created, or that exists as something other than a
    /// directory.
    #[tracing::instrument(level = tracing::Level::TRACE, skip(self), fields(folder = %paths.folder.display()))]
    pub async fn ensure_directories(&self, paths: &MailboxPaths) -> Result<()> {
        for dir in paths.iter() {
            self.ensure_directory(dir)
                .await
                .map_err(|source| MaildirError::DirectoryCreation {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        Ok(())
    }

    async fn ensure_directory(&self, dir: &Path) -> std::io::Result<()> {
        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => return Ok(()),
            Ok(_) => {
                return Err(Error::new(
                    ErrorKind::NotADirectory,
                    "Expected a directory, but found something else",
                ));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        internal!("{} does not exist, creating...", dir.display());

        tokio::fs::DirBuilder::new()
            .recursive(true)
            .mode(self.dir_mode)
            .create(dir)
            .await
    }
}
