//! Owned, droppable file descriptors.

use crate::error::Error;
use derive_more::{From, Into};
use nix::{
    fcntl::{fcntl, FcntlArg},
    unistd::{close, dup, dup2},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    fs::File,
    io::{self, Read},
    mem,
    os::unix::io::{AsRawFd, IntoRawFd, RawFd},
    time::{SystemTime, UNIX_EPOCH},
};

/// Slots drawn before descriptor randomization gives up.
const RANDOM_DRAWS: usize = 128;

/// Wrapper for `RawFd` that closes the file descriptor when dropped.
#[derive(Debug, From, Into)]
pub struct Fd(RawFd);

impl Fd {
    /// Duplicate the file descriptor into an independent `Fd`.
    pub fn duplicate(&self) -> Result<Self, Error> {
        dup(self.0).map(Self::from).map_err(Error::from)
    }

    /// Check if the file descriptor is valid.
    pub fn is_open(&self) -> Result<(), Error> {
        fcntl(self.0, FcntlArg::F_GETFD)
            .map(|_| ())
            .map_err(|err| io::Error::new(io::ErrorKind::NotConnected, err).into())
    }

    /// Relocates the descriptor to an unpredictable slot above its
    /// current number, so exploit payloads that hardcode a descriptor
    /// lose their target.
    ///
    /// This cannot fail: when no candidate slot is found or the
    /// duplication fails, the original descriptor is returned
    /// unchanged. Losing the shuffle is acceptable, losing the
    /// connection is not.
    pub fn randomize(self) -> Self {
        // Stay within the process' descriptor table.
        let max = unsafe { libc::getdtablesize() };

        match random_slot(self.0, max) {
            Some(slot) => match dup2(self.0, slot) {
                // Dropping `self` closes the old slot.
                Ok(new) => Self::from(new),
                Err(_) => self,
            },
            None => self,
        }
    }
}

/// Picks a descriptor slot strictly between `old` and `max`, preferring
/// the kernel's entropy pool over a clock-seeded generator. Draws are
/// bounded so a descriptor high up in a crowded table cannot stall the
/// worker.
fn random_slot(old: RawFd, max: RawFd) -> Option<RawFd> {
    if old + 1 >= max {
        return None;
    }

    match File::open("/dev/urandom") {
        Ok(mut urandom) => {
            let mut buf = [0u8; 2];

            for _ in 0..RANDOM_DRAWS {
                if urandom.read_exact(&mut buf).is_err() {
                    break;
                }
                let slot = RawFd::from(u16::from_ne_bytes(buf)) % max;
                if slot > old {
                    return Some(slot);
                }
            }

            None
        }
        Err(_) => {
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default();
            let mut rng = StdRng::seed_from_u64(seed);

            for _ in 0..RANDOM_DRAWS {
                let slot = rng.gen_range(0..max);
                if slot > old {
                    return Some(slot);
                }
            }

            None
        }
    }
}

impl Drop for Fd {
    fn drop(&mut self) {
        let _ = close(self.0);
    }
}

impl IntoRawFd for Fd {
    fn into_raw_fd(self) -> RawFd {
        let fd = self.0;
        mem::forget(self);
        fd
    }
}

impl AsRawFd for Fd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{pipe, read, write};

    #[test]
    fn random_slot_stays_in_range() {
        for _ in 0..64 {
            let slot = random_slot(4, 1024).expect("no slot found");
            assert!(slot > 4 && slot < 1024);
        }
    }

    #[test]
    fn random_slot_rejects_impossible_ranges() {
        assert!(random_slot(1023, 1024).is_none());
        assert!(random_slot(7, 7).is_none());
        assert!(random_slot(7, 3).is_none());
    }

    #[test]
    fn randomize_keeps_the_bytes_flowing() {
        let (rx, tx) = pipe().expect("pipe");
        let rx = Fd::from(rx);

        // Park the write end on a high slot first so the shuffle target
        // cannot collide with descriptors owned by the test harness.
        let parked = dup2(tx, 200).expect("dup2");
        close(tx).expect("close");
        let old = parked;

        let tx = Fd::from(parked).randomize();
        assert!(tx.as_raw_fd() > old);
        assert!(tx.is_open().is_ok());

        // The old slot is gone.
        assert!(fcntl(old, FcntlArg::F_GETFD).is_err());

        write(tx.as_raw_fd(), b"ping").expect("write");
        let mut buf = [0u8; 4];
        assert_eq!(read(rx.as_raw_fd(), &mut buf).expect("read"), 4);
        assert_eq!(&buf, b"ping");
    }

    #[test]
    fn duplicate_is_independent() {
        let (rx, tx) = pipe().expect("pipe");
        let (rx, tx) = (Fd::from(rx), Fd::from(tx));

        let copy = tx.duplicate().expect("dup");
        drop(tx);

        write(copy.as_raw_fd(), b"x").expect("write");
        let mut buf = [0u8; 1];
        assert_eq!(read(rx.as_raw_fd(), &mut buf).expect("read"), 1);
    }
}
