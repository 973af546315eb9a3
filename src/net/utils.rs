use libc::{AF_INET, in_addr, sa_family_t, sockaddr_in};

use std::io;
use std::net::{SocketAddr, SocketAddrV4, ToSocketAddrs};

/// Resolves `host:port` to the first IPv4 address it names.
///
/// Host names such as `localhost` go through the system resolver.
pub(crate) fn resolve_sockaddr(address: &str) -> io::Result<sockaddr_in> {
    let resolved = address
        .to_socket_addrs()?
        .find_map(|candidate| match candidate {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no IPv4 address for {address}"),
            )
        })?;

    Ok(socketaddr_to_sockaddr(&resolved))
}

pub(crate) fn socketaddr_to_sockaddr(address: &SocketAddrV4) -> sockaddr_in {
    sockaddr_in {
        sin_family: AF_INET as sa_family_t,
        sin_port: address.port().to_be(),
        sin_addr: in_addr {
            s_addr: u32::from(*address.ip()).to_be(),
        },
        sin_zero: [0; 8],
    }
}

pub(crate) fn sockaddr_to_socketaddr(address: &sockaddr_in) -> SocketAddr {
    let ip_u32 = u32::from_be(address.sin_addr.s_addr);
    let port = u16::from_be(address.sin_port);

    SocketAddr::from((ip_u32.to_be_bytes(), port))
}
