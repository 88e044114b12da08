//! Sockets and owned descriptors.

mod fd;
mod listener;

pub use fd::Fd;
pub use listener::{Listener, Protocol};
