//! Startup policy for the harness.
//!
//! Harnesses of this kind traditionally hide their behavior switches
//! behind compile-time flags. Here they are a plain record, resolved
//! once at startup and handed to the binder, the dispatcher and the
//! privilege dropper.

/// Address family of the listening socket.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Family {
    V4,
    V6,
}

impl Default for Family {
    fn default() -> Self {
        Family::V4
    }
}

/// Behavior switches, resolved once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Skip the worker deadline and descriptor shuffling while debugging.
    pub debug: bool,
    /// Move each connection to an unpredictable descriptor slot.
    pub randomize_descriptors: bool,
    /// Address family of the listening socket.
    pub address_family: Family,
    /// Seal each worker into the drop account's home directory.
    pub confine_root: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            randomize_descriptors: true,
            address_family: Family::default(),
            confine_root: false,
        }
    }
}
