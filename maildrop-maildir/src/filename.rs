//! Unique names for messages delivered into a Maildir.

use std::{
    fmt::Write as _,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

/// Separator between the components of a Maildir filename. Never appears
/// inside a component, see [`escape_component`].
const DELIMITER: char = '.';

/// Build a Maildir filename from its parts.
///
/// The layout is `<millis>.<connection>.<sequence>.<host>`, with the
/// sequence in lowercase hex. The connection id and host are escaped so the
/// result contains no `.` other than the delimiters, and never a `/` or `:`.
pub fn maildir_filename(timestamp_ms: u128, connection_id: &str, sequence: u64, host: &str) -> String {
    format!(
        "{timestamp_ms}{DELIMITER}{}{DELIMITER}{sequence:x}{DELIMITER}{}",
        escape_component(connection_id),
        escape_component(host),
    )
}

/// Escape every byte outside `[A-Za-z0-9_-]` as a backslash followed by
/// three octal digits, the same way Maildir writers encode `/` and `:` in
/// host names.
fn escape_component(component: &str) -> String {
    let mut escaped = String::with_capacity(component.len());

    for byte in component.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            escaped.push(char::from(byte));
        } else {
            let _ = write!(escaped, "\\{byte:03o}");
        }
    }

    escaped
}

/// Hands out filenames for delivery attempts.
///
/// Uniqueness across connections comes from the connection id. Within one
/// connection the sequence counter keeps two attempts apart even when they
/// land in the same millisecond, which happens whenever a transaction has
/// several targets.
#[derive(Debug, Default)]
pub struct FilenameGenerator {
    sequence: AtomicU64,
}

impl FilenameGenerator {
    pub const fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
        }
    }

    pub fn generate(&self, connection_id: &str, host: &str) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        maildir_filename(now, connection_id, sequence, host)
    }
}
