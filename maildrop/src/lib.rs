pub mod controller;

/// Exit statuses, following `sysexits.h` as mail transports expect from a
/// delivery agent
pub mod exit {
    pub const USAGE: u8 = 64;
    pub const TEMPFAIL: u8 = 75;
    pub const CONFIG: u8 = 78;
}
