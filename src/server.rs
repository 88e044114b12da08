//! The accept loop: one forked worker per connection.

use crate::net::{Fd, Listener};
use log::{debug, warn};
use nix::{
    sys::socket::accept,
    unistd::{alarm, close, fork, ForkResult},
};
use std::{os::unix::io::AsRawFd, process};

/// Seconds a worker may spend on one connection before the kernel
/// kills it. Hostile peers like to stall handlers on purpose.
pub const HANDLER_DEADLINE: u32 = 16;

/// Accepts connections forever, isolating each one in a forked worker.
///
/// Each worker closes the inherited listener, optionally relocates the
/// connection to an unpredictable descriptor slot, arms the handling
/// deadline, runs the handler, and exits with the handler's return
/// value as its status. The parent closes its copy of the connection
/// right away and keeps accepting; it never waits on workers.
///
/// A failed accept or a failed fork costs one connection, not the
/// service: both are logged and the loop continues.
pub fn serve<H>(listener: Listener, mut handler: H) -> !
where
    H: FnMut(&Fd) -> i32,
{
    loop {
        let client = match accept(listener.as_raw_fd()) {
            Ok(fd) => Fd::from(fd),
            Err(err) => {
                debug!("accept failed: {}", err);
                continue;
            }
        };

        match unsafe { fork() } {
            Ok(ForkResult::Parent { .. }) => {
                // The worker owns the connection now.
                drop(client);
            }
            Ok(ForkResult::Child) => {
                // A worker never accepts; release the listener at once.
                let _ = close(listener.as_raw_fd());

                let client = if listener.config.debug || !listener.config.randomize_descriptors {
                    client
                } else {
                    client.randomize()
                };

                if !listener.config.debug {
                    let _ = alarm::set(HANDLER_DEADLINE);
                }

                let status = handler(&client);
                drop(client);
                process::exit(status);
            }
            Err(err) => {
                warn!("fork failed, dropping connection: {}", err);
                drop(client);
            }
        }
    }
}
