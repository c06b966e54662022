//! Data types produced by a completed SOCKS handshake.

use caret::caret_int;
use std::net::IpAddr;

/// Which dialect of SOCKS a request arrived as.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SocksVersion {
    /// SOCKS4, with a literal IPv4 address.
    V4,
    /// SOCKS4a, with a hostname instead of an address.
    V4a,
    /// SOCKS5.
    V5,
}

caret_int! {
    /// A SOCKS command code, as sent by the client.
    pub struct SocksCmd(u8) {
        /// Open a TCP connection.
        CONNECT = 0x01,
        /// Resolve a hostname to an address.
        RESOLVE = 0xF0,
        /// Resolve an address to a hostname (reverse DNS).
        RESOLVE_PTR = 0xF1,
    }
}

/// The destination a SOCKS client asked to reach.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SocksAddr {
    /// A literal IP address.
    Ip(IpAddr),
    /// A hostname, to be resolved by the proxy.
    Hostname(String),
}

/// A fully parsed and validated SOCKS request.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct Request {
    /// Which SOCKS dialect produced this request.
    pub version: SocksVersion,
    /// The requested command.
    pub command: SocksCmd,
    /// The destination address.
    pub addr: SocksAddr,
    /// The destination port.
    pub port: u16,
    /// Username supplied for isolation purposes (SOCKS5 RFC1929 sub-negotiation only).
    pub username: Option<Vec<u8>>,
    /// Password supplied for isolation purposes (SOCKS5 RFC1929 sub-negotiation only).
    pub password: Option<Vec<u8>>,
}

/// Largest address (including a trailing NUL, where relevant) a SOCKS message may carry.
pub const MAX_SOCKS_ADDR_LEN: usize = 256;

/// Do not attempt to parse SOCKS messages longer than this.
pub const MAX_SOCKS_MESSAGE_LEN: usize = 512;

/// Largest reply this crate will ever write into a caller-provided reply buffer.
pub const MAX_SOCKS_REPLY_LEN: usize = 1024;
