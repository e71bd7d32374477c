use maildrop_maildir::Published;

use crate::{error::DeliveryError, target::DeliveryTarget};

/// How delivery to a single target went.
#[derive(Debug)]
pub struct TargetReport {
    pub target: DeliveryTarget,
    pub result: Result<Published, DeliveryError>,
}

/// The overall result of delivering one message.
///
/// There is no partial success: the transport can only accept or reject the
/// whole transaction, so a single failed target rejects it.
#[derive(Debug, Default)]
pub struct Outcome {
    reports: Vec<TargetReport>,
}

impl Outcome {
    pub const fn new(reports: Vec<TargetReport>) -> Self {
        Self { reports }
    }

    /// Per-target reports, in target order
    pub fn reports(&self) -> &[TargetReport] {
        &self.reports
    }

    /// Accepted only if every target received its copy. A transaction with
    /// no targets at all has nothing left undelivered.
    pub fn is_accepted(&self) -> bool {
        self.reports.iter().all(|r| r.result.is_ok())
    }

    pub fn delivered(&self) -> impl Iterator<Item = (&DeliveryTarget, &Published)> {
        self.reports
            .iter()
            .filter_map(|r| r.result.as_ref().ok().map(|p| (&r.target, p)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&DeliveryTarget, &DeliveryError)> {
        self.reports
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (&r.target, e)))
    }

    /// Why the transaction was rejected, suitable for handing back to the
    /// client. `None` if it was accepted.
    pub fn reason(&self) -> Option<String> {
        let reason = self
            .failures()
            .map(|(target, error)| format!("{target}: {error}"))
            .collect::<Vec<_>>()
            .join("; ");

        (!reason.is_empty()).then_some(reason)
    }
}

#[cfg(test)]
mod tests {
    use std::{io, path::PathBuf};

    use maildrop_common::Address;
    use maildrop_maildir::MaildirError;
    use pretty_assertions::assert_eq;

    use super::*;

    fn delivered(user: &str) -> TargetReport {
        TargetReport {
            target: DeliveryTarget::inbox(Address::new(user, "example.com")),
            result: Ok(Published {
                filename: String::from("1.c.0.h"),
                path: PathBuf::from(format!("/var/mail/{user}/new/1.c.0.h")),
                size: 42,
            }),
        }
    }

    fn failed(user: &str) -> TargetReport {
        TargetReport {
            target: DeliveryTarget::inbox(Address::new(user, "example.com")),
            result: Err(DeliveryError::from(MaildirError::DirectoryCreation {
                path: PathBuf::from(format!("/var/mail/{user}/tmp")),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            })),
        }
    }

    #[test]
    fn test_all_delivered_is_accepted() {
        let outcome = Outcome::new(vec![delivered("bob"), delivered("carol")]);

        assert!(outcome.is_accepted());
        assert_eq!(outcome.reason(), None);
        assert_eq!(outcome.delivered().count(), 2);
        assert_eq!(outcome.failures().count(), 0);
    }

    #[test]
    fn test_one_failure_rejects() {
        let outcome = Outcome::new(vec![delivered("bob"), failed("carol")]);

        assert!(!outcome.is_accepted());
        assert_eq!(outcome.delivered().count(), 1);
        assert_eq!(
            outcome.reason().unwrap(),
            "carol@example.com: Unable to create mailbox directory: denied"
        );
    }

    #[test]
    fn test_reason_lists_every_failure_without_paths() {
        let outcome = Outcome::new(vec![failed("bob"), delivered("dave"), failed("carol")]);

        let reason = outcome.reason().unwrap();
        assert!(reason.starts_with("bob@example.com: "));
        assert!(reason.contains("; carol@example.com: "));
        assert!(!reason.contains("/var/mail"));
    }

    #[test]
    fn test_nothing_to_deliver_is_accepted() {
        let outcome = Outcome::default();

        assert!(outcome.is_accepted());
        assert_eq!(outcome.reason(), None);
        assert_eq!(outcome.delivered().count(), 0);
    }
}
