use derive_more::{Display, From};
use std::{borrow::Cow, io};

/// Common errors.
///
/// Everything that can fail before the dispatch loop starts is a
/// startup error: callers are expected to print the diagnostic and
/// exit non-zero rather than retry.
#[derive(Debug, Display, From)]
pub enum Error {
    #[display(fmt = "I/O error: {}", "_0")]
    IoError(io::Error),
    #[display(fmt = "{}", "_0")]
    UnixError(nix::Error),
    #[display(fmt = "Interface '{}' not found", "_0")]
    InterfaceNotFound(String),
    #[display(fmt = "Account '{}' for dropping privileges not found", "_0")]
    UserNotFound(Cow<'static, str>),
    #[display(fmt = "Failed to drop privileges ({}) - {}", "_0", "_1")]
    Privdrop(&'static str, nix::Error),
}

impl std::error::Error for Error {}
