//! Blocking byte I/O for connection handlers.
//!
//! These helpers are how a handler talks to its peer. They block, they
//! do not buffer, and they treat every failure as the end of the
//! conversation: short counts are reported, not retried.

use log::debug;
use nix::unistd::{read, write};
use std::{fmt, os::unix::io::AsRawFd};

/// Reads until `buf` is full. Returns the bytes actually received,
/// which is short when the peer closes early or a read fails.
pub fn read_full<F: AsRawFd>(fd: &F, buf: &mut [u8]) -> usize {
    let mut count = 0;

    while count < buf.len() {
        match read(fd.as_raw_fd(), &mut buf[count..]) {
            Ok(0) | Err(_) => {
                debug!("short read: {} of {} bytes", count, buf.len());
                break;
            }
            Ok(received) => count += received,
        }
    }

    count
}

/// Reads up to `buf.len()` bytes, stopping at `delim`. The delimiter is
/// replaced by a NUL terminator and left out of the returned count.
pub fn read_until<F: AsRawFd>(fd: &F, buf: &mut [u8], delim: u8) -> usize {
    let mut count = 0;
    let mut byte = [0u8; 1];

    while count < buf.len() {
        match read(fd.as_raw_fd(), &mut byte) {
            Ok(1) => {}
            _ => {
                debug!("short read: no delimiter after {} bytes", count);
                break;
            }
        }

        if byte[0] == delim {
            buf[count] = 0;
            break;
        }

        buf[count] = byte[0];
        count += 1;
    }

    count
}

/// Writes all of `buf`, chunking as needed. Returns the bytes written;
/// the first failed write gives up immediately.
pub fn write_full<F: AsRawFd>(fd: &F, buf: &[u8]) -> usize {
    let mut count = 0;

    while count < buf.len() {
        match write(fd.as_raw_fd(), &buf[count..]) {
            Ok(0) | Err(_) => {
                debug!("short write: {} of {} bytes", count, buf.len());
                break;
            }
            Ok(sent) => count += sent,
        }
    }

    count
}

/// [`write_full`] for string payloads.
pub fn write_str<F: AsRawFd>(fd: &F, msg: &str) -> usize {
    write_full(fd, msg.as_bytes())
}

/// [`write_full`] for formatted payloads:
/// `write_fmt(&fd, format_args!("count: {}", count))`.
pub fn write_fmt<F: AsRawFd>(fd: &F, args: fmt::Arguments<'_>) -> usize {
    write_str(fd, &args.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Fd;
    use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};

    fn pair() -> (Fd, Fd) {
        let (a, b) = socketpair(AddressFamily::Unix, SockType::Stream, None, SockFlag::empty())
            .expect("socketpair");

        (Fd::from(a), Fd::from(b))
    }

    #[test]
    fn full_reads_and_writes_round_trip() {
        let (a, b) = pair();

        assert_eq!(write_full(&a, b"ping"), 4);

        let mut buf = [0u8; 4];
        assert_eq!(read_full(&b, &mut buf), 4);
        assert_eq!(&buf, b"ping");
    }

    #[test]
    fn short_reads_report_what_arrived() {
        let (a, b) = pair();

        assert_eq!(write_full(&a, b"hi"), 2);
        drop(a);

        let mut buf = [0u8; 8];
        assert_eq!(read_full(&b, &mut buf), 2);
        assert_eq!(&buf[..2], b"hi");
    }

    #[test]
    fn delimited_reads_stop_at_the_delimiter() {
        let (a, b) = pair();

        write_str(&a, "user\nrest");

        let mut buf = [0u8; 16];
        assert_eq!(read_until(&b, &mut buf, b'\n'), 4);
        assert_eq!(&buf[..4], b"user");
        assert_eq!(buf[4], 0);

        // The delimiter was consumed; the rest is still readable.
        let mut tail = [0u8; 4];
        assert_eq!(read_full(&b, &mut tail), 4);
        assert_eq!(&tail, b"rest");
    }

    #[test]
    fn delimited_reads_respect_the_buffer_length() {
        let (a, b) = pair();

        write_str(&a, "abcdef\n");

        let mut buf = [0u8; 4];
        assert_eq!(read_until(&b, &mut buf, b'\n'), 4);
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn formatted_writes_render_their_arguments() {
        let (a, b) = pair();

        assert_eq!(write_fmt(&a, format_args!("{} {}", "status", 7)), 8);

        let mut buf = [0u8; 8];
        assert_eq!(read_full(&b, &mut buf), 8);
        assert_eq!(&buf, b"status 7");
    }
}
