pub mod address;
pub mod envelope;
pub mod host;
pub mod logging;

pub use address::{Address, AddressError, AddressList};
pub use envelope::Envelope;
pub use tracing;
