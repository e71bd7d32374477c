use crate::address::{Address, AddressList};

/// Transaction-level addressing handed over by the mail transport once the
/// message data has been (or is being) received.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    sender: Option<Address>,
    recipients: AddressList,
    connection_id: String,
    host: String,
}

impl Envelope {
    pub fn new(
        sender: Option<Address>,
        recipients: impl Into<AddressList>,
        connection_id: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            recipients: recipients.into(),
            connection_id: connection_id.into(),
            host: host.into(),
        }
    }

    /// Returns a reference to the [`Envelope`] sender, `None` for the null
    /// reverse-path used by bounces
    #[inline]
    pub const fn sender(&self) -> Option<&Address> {
        self.sender.as_ref()
    }

    /// Returns a reference to the [`Envelope`] recipients, in the order they
    /// were given
    #[inline]
    pub const fn recipients(&self) -> &AddressList {
        &self.recipients
    }

    /// Identifier unique to the connection (or transaction) that produced
    /// this message
    #[inline]
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Name of the host accepting the message
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }
}
