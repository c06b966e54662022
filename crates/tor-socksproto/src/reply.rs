//! Fixed reply payloads a SOCKS handshake can produce.
//!
//! These mirror the reply shapes the original proxy code builds when it
//! has to reject a request before a circuit exists to answer with a real
//! status: there is no connection result to report yet, so the address and
//! port fields are always zeroed.

/// The diagnostic sent back when the peer's first bytes look like an HTTP
/// request rather than a SOCKS handshake.
pub const NOT_AN_HTTP_PROXY_MSG: &[u8] = b"HTTP/1.0 501 Tor is not an HTTP Proxy\r\n";

/// Build a SOCKS4 rejection reply.
///
/// Byte 0 is always 0 (SOCKS4 replies have no version byte); byte 1 is the
/// status (`0x5B` = request rejected or failed); the remaining six bytes
/// (port and address) are zeroed, since no connection was made.
pub fn socks4_reject() -> [u8; 8] {
    [0x00, 0x5B, 0, 0, 0, 0, 0, 0]
}

/// SOCKS5 reply status codes (RFC 1928 §6).
pub mod socks5_status {
    /// General server failure.
    pub const GENERAL_FAILURE: u8 = 0x01;
    /// Not allowed by ruleset.
    pub const NOT_ALLOWED: u8 = 0x02;
    /// Address type not supported.
    pub const ADDRESS_TYPE_NOT_SUPPORTED: u8 = 0x08;
}

/// Build a SOCKS5 rejection reply with the given status code.
///
/// `ATYP` is always `0x01` (IPv4) with a zeroed address and port, since no
/// connection was made to report a real one.
pub fn socks5_reject(status: u8) -> [u8; 10] {
    [0x05, status, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
}

/// Build the SOCKS5 method-selection reply choosing `method`.
pub fn socks5_method_reply(method: u8) -> [u8; 2] {
    [0x05, method]
}

/// Build the SOCKS5 username/password sub-negotiation reply (RFC 1929 §2).
///
/// This crate always reports success: these credentials are used as
/// isolation keys, not as an authentication check.
pub fn socks5_userpass_reply_ok() -> [u8; 2] {
    [0x01, 0x00]
}
