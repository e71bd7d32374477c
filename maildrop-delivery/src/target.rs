use std::fmt;

use maildrop_common::{Address, Envelope};

use crate::config::DeliveryConfig;

/// One mailbox folder that gets its own copy of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryTarget {
    address: Address,
    folder: Option<String>,
}

impl DeliveryTarget {
    /// The recipient's inbox
    pub const fn inbox(address: Address) -> Self {
        Self {
            address,
            folder: None,
        }
    }

    /// A named folder in the recipient's mailbox
    pub fn in_folder(address: Address, folder: impl Into<String>) -> Self {
        Self {
            address,
            folder: Some(folder.into()),
        }
    }

    pub const fn address(&self) -> &Address {
        &self.address
    }

    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.folder {
            Some(folder) => write!(f, "{}/{folder}", self.address),
            None => fmt::Display::fmt(&self.address, f),
        }
    }
}

/// Work out who gets a copy of a message.
///
/// With `force_user` configured that is the forced mailbox alone. Otherwise
/// it is the sender's Sent folder (unless the sender is null, as for
/// bounces) followed by each recipient's inbox, in envelope order. Repeated
/// addresses are not merged.
pub fn targets_for(envelope: &Envelope, config: &DeliveryConfig) -> Vec<DeliveryTarget> {
    if let Some(forced) = &config.force_user {
        return vec![DeliveryTarget::inbox(forced.clone())];
    }

    envelope
        .sender()
        .map(|sender| DeliveryTarget::in_folder(sender.clone(), &config.sent_folder))
        .into_iter()
        .chain(envelope.recipients().iter().cloned().map(DeliveryTarget::inbox))
        .collect()
}
