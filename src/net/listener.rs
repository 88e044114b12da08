//! Listening socket setup.

use crate::{
    config::{Config, Family},
    error::Error,
    net::Fd,
};
use nix::{
    ifaddrs::getifaddrs,
    sys::{
        signal::{signal, SigHandler, Signal},
        socket::{bind, listen, setsockopt, sockopt, InetAddr, IpAddr, SockAddr},
    },
};
use std::{
    io,
    os::unix::io::{AsRawFd, RawFd},
};

/// Pending connections the kernel queues before `accept`.
const LISTEN_BACKLOG: usize = 16;

/// Transport protocol of the listening socket.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Protocol {
    /// Raw IP datagrams.
    Raw,
    /// Reliable datagrams (SCTP).
    SeqPacket,
    /// Unreliable datagrams (UDP).
    Datagram,
    /// Connected byte streams (TCP).
    Stream,
}

impl Protocol {
    fn sock_type(self) -> libc::c_int {
        match self {
            Protocol::Raw => libc::SOCK_RAW,
            Protocol::SeqPacket => libc::SOCK_SEQPACKET,
            Protocol::Datagram => libc::SOCK_DGRAM,
            Protocol::Stream => libc::SOCK_STREAM,
        }
    }

    fn number(self) -> libc::c_int {
        match self {
            Protocol::Raw => libc::IPPROTO_RAW,
            Protocol::SeqPacket => libc::IPPROTO_SCTP,
            Protocol::Datagram => libc::IPPROTO_UDP,
            Protocol::Stream => libc::IPPROTO_TCP,
        }
    }

    /// Connectionless sockets have no backlog to listen on.
    fn has_backlog(self) -> bool {
        matches!(self, Protocol::SeqPacket | Protocol::Stream)
    }
}

impl Family {
    fn domain(self) -> libc::c_int {
        match self {
            Family::V4 => libc::AF_INET,
            Family::V6 => libc::AF_INET6,
        }
    }

    fn wildcard(self) -> IpAddr {
        match self {
            Family::V4 => IpAddr::new_v4(0, 0, 0, 0),
            Family::V6 => IpAddr::new_v6(0, 0, 0, 0, 0, 0, 0, 0),
        }
    }

    fn matches(self, addr: &InetAddr) -> bool {
        matches!(
            (self, addr),
            (Family::V4, InetAddr::V4(_)) | (Family::V6, InetAddr::V6(_))
        )
    }
}

/// A bound listening socket, ready to accept or receive.
#[derive(Debug)]
pub struct Listener {
    pub(crate) fd: Fd,
    pub(crate) config: Config,
}

impl Listener {
    /// Creates, configures, and binds the listening socket.
    ///
    /// Without an interface name the socket binds to the wildcard
    /// address on `port`; with one, to the address of the named
    /// interface. Connection-oriented protocols start listening
    /// immediately, so a peer may connect before the first `accept`.
    ///
    /// Errors here mean a misconfigured environment and are not worth
    /// retrying; callers should print the diagnostic and exit.
    pub fn bind(
        port: u16,
        protocol: Protocol,
        interface: Option<&str>,
        config: &Config,
    ) -> Result<Self, Error> {
        // Workers disappear on exit instead of lingering as zombies;
        // the server never collects their status itself.
        unsafe { signal(Signal::SIGCHLD, SigHandler::SigIgn) }?;

        let fd = match unsafe {
            libc::socket(
                config.address_family.domain(),
                protocol.sock_type(),
                protocol.number(),
            )
        } {
            fd if fd < 0 => return Err(io::Error::last_os_error().into()),
            fd => Fd::from(fd),
        };

        setsockopt(fd.as_raw_fd(), sockopt::ReuseAddr, &true)?;

        let addr = match interface {
            None => SockAddr::new_inet(InetAddr::new(config.address_family.wildcard(), port)),
            Some(name) => {
                let interfaces = getifaddrs()?.filter_map(|ifaddr| {
                    let name = ifaddr.interface_name;
                    ifaddr.address.map(|addr| (name, addr))
                });

                interface_addr(interfaces, name, config.address_family, port)
                    .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))?
            }
        };
        bind(fd.as_raw_fd(), &addr)?;

        if protocol.has_backlog() {
            listen(fd.as_raw_fd(), LISTEN_BACKLOG)?;
        }

        Ok(Self {
            fd,
            config: config.clone(),
        })
    }
}

impl AsRawFd for Listener {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

/// Picks the bind address of the named interface with `port` patched
/// in. The first interface matching both the name and the configured
/// address family wins.
fn interface_addr<I>(interfaces: I, name: &str, family: Family, port: u16) -> Option<SockAddr>
where
    I: IntoIterator<Item = (String, SockAddr)>,
{
    interfaces.into_iter().find_map(|(ifname, addr)| match addr {
        SockAddr::Inet(inet) if ifname == name && family.matches(&inet) => {
            Some(SockAddr::new_inet(InetAddr::new(inet.ip(), port)))
        }
        _ => None,
    })
}
