use std::{
    fmt::{self, Display},
    ops::Deref,
    str::FromStr,
};

use mailparse::MailAddr;
use thiserror::Error;

/// Reasons an envelope address could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Empty address")]
    Empty,

    #[error("Address is missing a '@': {0}")]
    MissingAtSign(String),

    #[error("Address has an empty local part or domain: {0}")]
    MissingPart(String),

    #[error("Expected a single mailbox, found a group: {0}")]
    Group(String),

    #[error("Unable to parse address: {0}")]
    Malformed(String),
}

/// A single envelope mailbox, split at the final `@`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub local_part: String,
    pub domain: String,
}

impl Address {
    pub fn new(local_part: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            local_part: local_part.into(),
            domain: domain.into(),
        }
    }

    /// Parse a reverse-path (`MAIL FROM`) value.
    ///
    /// The null reverse-path, written as `<>` or as an empty string, is how
    /// bounces are sent, and yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an [`AddressError`] when the value is neither null nor a valid
    /// single address.
    pub fn parse_reverse_path(value: &str) -> Result<Option<Self>, AddressError> {
        match value.trim() {
            "" | "<>" => Ok(None),
            value => value.parse().map(Some),
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let value = value
            .strip_prefix('<')
            .and_then(|v| v.strip_suffix('>'))
            .unwrap_or(value);
        if value.is_empty() {
            return Err(AddressError::Empty);
        }

        let list = mailparse::addrparse(value)
            .map_err(|e| AddressError::Malformed(format!("{value}: {e}")))?;

        let addr = match list.first() {
            Some(MailAddr::Single(info)) if list.len() == 1 => info.addr.clone(),
            Some(MailAddr::Group(_)) => return Err(AddressError::Group(value.to_string())),
            _ => return Err(AddressError::Malformed(value.to_string())),
        };

        let (local_part, domain) = addr
            .rsplit_once('@')
            .ok_or_else(|| AddressError::MissingAtSign(addr.clone()))?;

        if local_part.is_empty() || domain.is_empty() {
            return Err(AddressError::MissingPart(addr));
        }

        Ok(Self::new(local_part, domain))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressList(pub Vec<Address>);

impl Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, addr) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            Display::fmt(addr, f)?;
        }
        Ok(())
    }
}

impl From<Vec<Address>> for AddressList {
    fn from(value: Vec<Address>) -> Self {
        Self(value)
    }
}

impl FromIterator<Address> for AddressList {
    fn from_iter<T: IntoIterator<Item = Address>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Deref for AddressList {
    type Target = Vec<Address>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
