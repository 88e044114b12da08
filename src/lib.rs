//! Accept, isolate, harden: a fork-per-connection harness for
//! exploitable network services.
//!
//! The harness stands up exactly one listening socket and forks one
//! worker process per accepted connection. Before any service logic
//! touches untrusted bytes, each worker is hardened: the connection can
//! be relocated to an unpredictable descriptor slot, the worker can
//! permanently drop to an unprivileged account, and the kernel kills it
//! when it exceeds its handling deadline. The peer is assumed hostile
//! and expected to attempt memory corruption; a corrupted worker must
//! not be able to reach the listening parent or any other connection,
//! which is why isolation is a process boundary and not a thread.
//!
//! # Examples
//!
//! ```no_run
//! use forkserv::{io, net::{Listener, Protocol}, server, Config};
//!
//! fn main() {
//!     let config = Config::default();
//!
//!     // Startup errors are not recoverable; print and exit.
//!     let listener = Listener::bind(9999, Protocol::Stream, None, &config)
//!         .unwrap_or_else(|err| {
//!             eprintln!("forkserv: {}", err);
//!             std::process::exit(1);
//!         });
//!
//!     server::serve(listener, |client| {
//!         let mut buf = [0u8; 4];
//!         let count = io::read_full(client, &mut buf);
//!         io::write_full(client, &buf[..count]);
//!         0
//!     });
//! }
//! ```

mod config;
mod error;
pub mod io;
pub mod net;
mod privdrop;
pub mod server;

pub use {
    config::{Config, Family},
    error::Error,
    privdrop::drop_privileges,
};
