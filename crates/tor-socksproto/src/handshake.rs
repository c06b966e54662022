//! The SOCKS4/4a/5 handshake state machine.
//!
//! Callers feed inbound bytes to [`SocksProxyHandshake::handshake`] one
//! chunk at a time; it reports how much input it consumed, any reply bytes
//! that should be written back, and (once the negotiation is done) the
//! completed [`Request`].

use crate::err::Error;
use crate::reply::{self, socks5_status};
use crate::types::{
    Request, SocksAddr, SocksCmd, SocksVersion, MAX_SOCKS_ADDR_LEN, MAX_SOCKS_MESSAGE_LEN,
};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tor_bytes::Reader;
use tracing::warn;

/// A predicate, supplied by the caller, that reports whether a hostname has
/// an existing address mapping. Used to decide whether a SOCKS4a/SOCKS5
/// hostname request can be resolved locally instead of being rejected under
/// `safe_socks`.
///
/// This crate has no notion of an address map of its own; callers that care
/// about this policy knob should inject one. When absent, `safe_socks`
/// unconditionally permits hostnames and forbids literal IP addresses.
pub type AddressMapPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Policy knobs controlling what a handshake will accept.
pub struct HandshakeConfig {
    /// If true, reject `CONNECT`/`RESOLVE` requests that name a literal IP
    /// address rather than a hostname, unless `addr_is_mapped` says
    /// otherwise. Mirrors the `SafeSocks` option.
    pub safe_socks: bool,
    /// If true, and the client's SOCKS5 greeting offers both "no auth" and
    /// username/password methods, prefer "no auth". If false, prefer
    /// username/password whenever it's offered (the default, since
    /// credentials can be used as stream-isolation keys).
    pub prefer_no_auth: bool,
    /// Optional predicate consulted before enforcing `safe_socks` against a
    /// literal IP address.
    pub addr_is_mapped: Option<AddressMapPredicate>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        HandshakeConfig {
            safe_socks: false,
            prefer_no_auth: false,
            addr_is_mapped: None,
        }
    }
}

/// One step's worth of progress through a handshake.
#[derive(Debug)]
pub enum Action {
    /// The handshake needs at least this many more bytes before it can make
    /// progress; none of the input was consumed.
    NeedMore(usize),
    /// The handshake consumed `n` bytes of input. `reply`, if non-empty,
    /// must be written back to the peer. `request`, if present, is the
    /// final negotiated request; the handshake is complete and must not be
    /// driven further.
    Consumed {
        /// Number of input bytes consumed.
        n: usize,
        /// Bytes to send back to the peer, if any.
        reply: Vec<u8>,
        /// The completed request, once negotiation finishes.
        request: Option<Request>,
    },
}

/// Internal phase of a SOCKS5 negotiation in progress.
enum Phase {
    /// Waiting for the very first byte, to distinguish protocol version and
    /// sniff for stray HTTP traffic.
    Start,
    /// Sent the method-selection reply; now waiting for the SOCKS5 request,
    /// or for username/password sub-negotiation if that method was chosen.
    WaitingForUserPass,
    /// Waiting for the SOCKS5 request proper.
    WaitingForRequest,
    /// Negotiation finished.
    Done,
}

/// A SOCKS4/4a/5 handshake in progress.
pub struct SocksProxyHandshake {
    /// Handshake policy.
    config: HandshakeConfig,
    /// Current phase, for the SOCKS5 multi-step negotiation.
    phase: Phase,
    /// Username captured during RFC1929 sub-negotiation, pending the request.
    pending_username: Option<Vec<u8>>,
    /// Password captured during RFC1929 sub-negotiation, pending the request.
    pending_password: Option<Vec<u8>>,
}

impl SocksProxyHandshake {
    /// Start a new handshake with the given policy.
    pub fn new(config: HandshakeConfig) -> Self {
        SocksProxyHandshake {
            config,
            phase: Phase::Start,
            pending_username: None,
            pending_password: None,
        }
    }

    /// Feed `input` to the handshake and report what happened.
    ///
    /// `input` should be the entirety of what has been received so far on
    /// this connection that hasn't yet been consumed; this function will
    /// never ask for less than it needs, but it may ask for more input
    /// than it ultimately turns out to need if a length field hasn't
    /// arrived yet.
    pub fn handshake(&mut self, input: &[u8]) -> Result<Action, Error> {
        if input.len() > MAX_SOCKS_MESSAGE_LEN {
            return Err(Error::Malformed("message too long to be a SOCKS request"));
        }
        match self.phase {
            Phase::Start => self.handshake_start(input),
            Phase::WaitingForUserPass => self.handshake_userpass(input),
            Phase::WaitingForRequest => self.handshake_request(input),
            Phase::Done => Err(Error::Malformed("handshake already finished")),
        }
    }

    /// Handle the first message: SOCKS4/4a request, or SOCKS5 greeting, or
    /// (if it looks like HTTP) a diagnostic rejection.
    fn handshake_start(&mut self, input: &[u8]) -> Result<Action, Error> {
        if input.is_empty() {
            return Ok(Action::NeedMore(1));
        }
        if looks_like_http(input) {
            return Err(Error::WrongProtocol {
                reply: reply::NOT_AN_HTTP_PROXY_MSG.to_vec(),
            });
        }
        match input[0] {
            0x04 => self.handshake_socks4(input),
            0x05 => self.handshake_socks5_greeting(input),
            _ => Err(Error::Malformed("unrecognized SOCKS version byte")),
        }
    }

    /// Parse a SOCKS4/4a request: `VER CMD PORT(2) IP(4) USERID\0 [HOST\0]`.
    fn handshake_socks4(&mut self, input: &[u8]) -> Result<Action, Error> {
        // Minimal fixed header: version, command, port, address.
        if input.len() < 8 {
            return Ok(Action::NeedMore(8 - input.len()));
        }
        let mut r = Reader::from_slice(input);
        let _version = r.take_u8()?;
        let cmd_byte = r.take_u8()?;
        let port = r.take_u16()?;
        let mut addr_bytes = [0u8; 4];
        r.take_into(&mut addr_bytes)?;

        // USERID, NUL-terminated.
        let body = r.take_rest();
        let userid_end = match body.iter().position(|&b| b == 0) {
            Some(pos) => pos,
            None => return Ok(Action::NeedMore(1)),
        };
        let userid = body[..userid_end].to_vec();
        let rest = &body[userid_end + 1..];

        let is_socks4a = addr_bytes[0] == 0 && addr_bytes[1] == 0 && addr_bytes[2] == 0 && addr_bytes[3] != 0;

        let (addr, consumed_after_fixed) = if is_socks4a {
            let host_end = match rest.iter().position(|&b| b == 0) {
                Some(pos) => pos,
                None => return Ok(Action::NeedMore(1)),
            };
            let hostname = String::from_utf8(rest[..host_end].to_vec())
                .map_err(|_| Error::Malformed("non-UTF8 SOCKS4a hostname"))?;
            (SocksAddr::Hostname(hostname), userid_end + 1 + host_end + 1)
        } else {
            (
                SocksAddr::Ip(IpAddr::V4(Ipv4Addr::from(addr_bytes))),
                userid_end + 1,
            )
        };

        if is_socks4a && hostname_too_long(&addr) {
            return Err(Error::Malformed("SOCKS4a hostname too long"));
        }

        let total_consumed = 8 + consumed_after_fixed;
        let command = socks4_command(cmd_byte)?;
        let version = if is_socks4a {
            SocksVersion::V4a
        } else {
            SocksVersion::V4
        };

        if port == 0 && command != SocksCmd::RESOLVE {
            return Err(Error::Malformed("port 0 is only valid for RESOLVE"));
        }

        // Anti-leak: a non-4a SOCKS4 request always carries a literal IP,
        // which means the application resolved the hostname itself instead
        // of letting the proxy do it.
        if !is_socks4a {
            warn!("application using SOCKS4 (not 4a) with a literal IP; it may be leaking DNS requests");
        }
        if let Err(reason) = self.check_safe_socks(&addr) {
            return Err(Error::UnsafeSocks {
                reply: reply::socks4_reject().to_vec(),
                reason,
            });
        }

        // The SOCKS4 userid is read and discarded, as the original proxy
        // code does: it isn't validated, and `username`/`password` are
        // populated only by SOCKS5's RFC1929 sub-negotiation.
        let _ = userid;

        self.phase = Phase::Done;
        Ok(Action::Consumed {
            n: total_consumed,
            reply: Vec::new(),
            request: Some(Request {
                version,
                command,
                addr,
                port,
                username: None,
                password: None,
            }),
        })
    }

    /// Parse a SOCKS5 greeting: `VER NMETHODS METHODS[NMETHODS]`.
    fn handshake_socks5_greeting(&mut self, input: &[u8]) -> Result<Action, Error> {
        if input.len() < 2 {
            return Ok(Action::NeedMore(2 - input.len()));
        }
        let nmethods = input[1] as usize;
        let total_len = 2 + nmethods;
        if input.len() < total_len {
            return Ok(Action::NeedMore(total_len - input.len()));
        }
        let methods = &input[2..total_len];

        let method = choose_method(methods, self.config.prefer_no_auth);
        let method = match method {
            Some(m) => m,
            None => {
                return Err(Error::UnsafeSocks {
                    reply: reply::socks5_method_reply(0xFF).to_vec(),
                    reason: "no mutually acceptable SOCKS5 auth method",
                })
            }
        };

        self.phase = if method == METHOD_USERPASS {
            Phase::WaitingForUserPass
        } else {
            Phase::WaitingForRequest
        };

        Ok(Action::Consumed {
            n: total_len,
            reply: reply::socks5_method_reply(method).to_vec(),
            request: None,
        })
    }

    /// Parse the RFC1929 username/password sub-negotiation message:
    /// `VER ULEN UNAME PLEN PASSWD`.
    fn handshake_userpass(&mut self, input: &[u8]) -> Result<Action, Error> {
        if input.len() < 2 {
            return Ok(Action::NeedMore(2 - input.len()));
        }
        let ulen = input[1] as usize;
        if input.len() < 2 + ulen + 1 {
            return Ok(Action::NeedMore(2 + ulen + 1 - input.len()));
        }
        let plen = input[2 + ulen] as usize;
        let total_len = 2 + ulen + 1 + plen;
        if input.len() < total_len {
            return Ok(Action::NeedMore(total_len - input.len()));
        }
        let username = input[2..2 + ulen].to_vec();
        let password = input[2 + ulen + 1..total_len].to_vec();
        self.pending_username = Some(username);
        self.pending_password = Some(password);
        self.phase = Phase::WaitingForRequest;
        Ok(Action::Consumed {
            n: total_len,
            reply: reply::socks5_userpass_reply_ok().to_vec(),
            request: None,
        })
    }

    /// Parse a SOCKS5 request: `VER CMD RSV ATYP DST.ADDR DST.PORT`.
    fn handshake_request(&mut self, input: &[u8]) -> Result<Action, Error> {
        if input.len() < 4 {
            return Ok(Action::NeedMore(4 - input.len()));
        }
        let cmd_byte = input[1];
        let atyp = input[3];

        let (addr, addr_len) = match atyp {
            0x01 => {
                if input.len() < 4 + 4 {
                    return Ok(Action::NeedMore(4 + 4 - input.len()));
                }
                let mut a = [0u8; 4];
                a.copy_from_slice(&input[4..8]);
                (SocksAddr::Ip(IpAddr::V4(Ipv4Addr::from(a))), 4)
            }
            0x03 => {
                if input.len() < 5 {
                    return Ok(Action::NeedMore(5 - input.len()));
                }
                let hostlen = input[4] as usize;
                if input.len() < 5 + hostlen {
                    return Ok(Action::NeedMore(5 + hostlen - input.len()));
                }
                let hostname = String::from_utf8(input[5..5 + hostlen].to_vec())
                    .map_err(|_| Error::Malformed("non-UTF8 SOCKS5 hostname"))?;
                (SocksAddr::Hostname(hostname), 1 + hostlen)
            }
            0x04 => {
                if input.len() < 4 + 16 {
                    return Ok(Action::NeedMore(4 + 16 - input.len()));
                }
                let mut a = [0u8; 16];
                a.copy_from_slice(&input[4..20]);
                (SocksAddr::Ip(IpAddr::V6(Ipv6Addr::from(a))), 16)
            }
            _ => {
                return Err(Error::UnsafeSocks {
                    reply: reply::socks5_reject(socks5_status::ADDRESS_TYPE_NOT_SUPPORTED).to_vec(),
                    reason: "unsupported SOCKS5 address type",
                });
            }
        };

        let port_start = 4 + addr_len;
        let total_len = port_start + 2;
        if input.len() < total_len {
            return Ok(Action::NeedMore(total_len - input.len()));
        }
        let port = u16::from_be_bytes([input[port_start], input[port_start + 1]]);
        let command = socks5_command(cmd_byte)?;

        if command == SocksCmd::RESOLVE_PTR && !matches!(addr, SocksAddr::Ip(_)) {
            return Err(Error::UnsafeSocks {
                reply: reply::socks5_reject(socks5_status::ADDRESS_TYPE_NOT_SUPPORTED).to_vec(),
                reason: "RESOLVE_PTR requires an IP address type",
            });
        }
        if port == 0 && command != SocksCmd::RESOLVE {
            return Err(Error::UnsafeSocks {
                reply: reply::socks5_reject(socks5_status::GENERAL_FAILURE).to_vec(),
                reason: "port 0 is only valid for RESOLVE",
            });
        }

        if let SocksAddr::Ip(_) = &addr {
            if !self.addr_is_mapped(&addr) {
                warn!("application using SOCKS5 with a literal IP and no address mapping; it may be leaking DNS requests");
            }
        }
        if let Err(reason) = self.check_safe_socks(&addr) {
            return Err(Error::UnsafeSocks {
                reply: reply::socks5_reject(socks5_status::NOT_ALLOWED).to_vec(),
                reason,
            });
        }

        self.phase = Phase::Done;
        Ok(Action::Consumed {
            n: total_len,
            reply: Vec::new(),
            request: Some(Request {
                version: SocksVersion::V5,
                command,
                addr,
                port,
                username: self.pending_username.take(),
                password: self.pending_password.take(),
            }),
        })
    }

    /// Report whether `addr` (a literal IP) has a known address-map entry,
    /// per the caller-supplied predicate. Hostnames are never "mapped".
    fn addr_is_mapped(&self, addr: &SocksAddr) -> bool {
        match addr {
            SocksAddr::Hostname(_) => false,
            SocksAddr::Ip(ip) => self
                .config
                .addr_is_mapped
                .as_ref()
                .map(|f| f(&ip.to_string()))
                .unwrap_or(false),
        }
    }

    /// Enforce the `safe_socks` policy against a destination address.
    fn check_safe_socks(&self, addr: &SocksAddr) -> Result<(), &'static str> {
        if !self.config.safe_socks {
            return Ok(());
        }
        match addr {
            SocksAddr::Hostname(_) => Ok(()),
            SocksAddr::Ip(_) => {
                if self.addr_is_mapped(addr) {
                    Ok(())
                } else {
                    Err("SafeSocks forbids sending a literal address to the proxy")
                }
            }
        }
    }
}

/// SOCKS5 method code: no authentication required.
const METHOD_NO_AUTH: u8 = 0x00;
/// SOCKS5 method code: username/password (RFC 1929).
const METHOD_USERPASS: u8 = 0x02;

/// Pick the best mutually supported SOCKS5 auth method from the client's
/// offered list, breaking the no-auth/userpass tie according to
/// `prefer_no_auth`. Returns `None` if neither method was offered.
fn choose_method(offered: &[u8], prefer_no_auth: bool) -> Option<u8> {
    let has_no_auth = offered.contains(&METHOD_NO_AUTH);
    let has_userpass = offered.contains(&METHOD_USERPASS);
    match (has_no_auth, has_userpass) {
        (true, true) => Some(if prefer_no_auth {
            METHOD_NO_AUTH
        } else {
            METHOD_USERPASS
        }),
        (true, false) => Some(METHOD_NO_AUTH),
        (false, true) => Some(METHOD_USERPASS),
        (false, false) => None,
    }
}

/// Report whether `input`'s first byte looks like the start of an HTTP
/// request line (`GET`/`HEAD`/`POST`/`CONNECT`/`PUT`), rather than a SOCKS
/// version byte.
fn looks_like_http(input: &[u8]) -> bool {
    matches!(input[0], b'G' | b'H' | b'P' | b'C')
}

/// Report whether a hostname address exceeds the maximum a SOCKS message is
/// allowed to carry.
fn hostname_too_long(addr: &SocksAddr) -> bool {
    matches!(addr, SocksAddr::Hostname(h) if h.len() >= MAX_SOCKS_ADDR_LEN)
}

/// Translate a SOCKS4 command byte into a [`SocksCmd`].
fn socks4_command(byte: u8) -> Result<SocksCmd, Error> {
    match byte {
        0x01 => Ok(SocksCmd::CONNECT),
        0xF0 => Ok(SocksCmd::RESOLVE),
        _ => Err(Error::Malformed("unrecognized SOCKS4 command")),
    }
}

/// Translate a SOCKS5 command byte into a [`SocksCmd`].
fn socks5_command(byte: u8) -> Result<SocksCmd, Error> {
    match byte {
        0x01 => Ok(SocksCmd::CONNECT),
        0xF0 => Ok(SocksCmd::RESOLVE),
        0xF1 => Ok(SocksCmd::RESOLVE_PTR),
        _ => Err(Error::Malformed("unrecognized SOCKS5 command")),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn plain_handshake() -> SocksProxyHandshake {
        SocksProxyHandshake::new(HandshakeConfig::default())
    }

    #[test]
    fn socks4_connect_ip() {
        let mut hs = plain_handshake();
        // VER=4 CMD=1 PORT=0x0050 ADDR=93.184.216.34 USERID="" \0
        let mut msg = vec![0x04, 0x01, 0x00, 0x50, 93, 184, 216, 34];
        msg.push(0); // empty userid, NUL-terminated
        let action = hs.handshake(&msg).unwrap();
        match action {
            Action::Consumed { n, reply, request } => {
                assert_eq!(n, msg.len());
                assert!(reply.is_empty());
                let req = request.unwrap();
                assert_eq!(req.version, SocksVersion::V4);
                assert_eq!(req.command, SocksCmd::CONNECT);
                assert_eq!(
                    req.addr,
                    SocksAddr::Ip(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)))
                );
                assert_eq!(req.port, 80);
            }
            _ => panic!("expected Consumed"),
        }
    }

    #[test]
    fn socks4a_connect_hostname() {
        let mut hs = plain_handshake();
        let mut msg = vec![0x04, 0x01, 0x00, 0x50, 0, 0, 0, 1];
        msg.push(0); // empty userid
        msg.extend_from_slice(b"example.com");
        msg.push(0);
        let action = hs.handshake(&msg).unwrap();
        match action {
            Action::Consumed { n, request, .. } => {
                assert_eq!(n, msg.len());
                let req = request.unwrap();
                assert_eq!(req.version, SocksVersion::V4a);
                assert_eq!(req.addr, SocksAddr::Hostname("example.com".into()));
            }
            _ => panic!("expected Consumed"),
        }
    }

    #[test]
    fn socks4_needs_more() {
        let mut hs = plain_handshake();
        let msg = [0x04, 0x01, 0x00];
        match hs.handshake(&msg).unwrap() {
            Action::NeedMore(_) => {}
            _ => panic!("expected NeedMore"),
        }
    }

    #[test]
    fn socks5_greeting_prefers_userpass_by_default() {
        let mut hs = plain_handshake();
        let greeting = [0x05, 0x02, METHOD_NO_AUTH, METHOD_USERPASS];
        match hs.handshake(&greeting).unwrap() {
            Action::Consumed { n, reply, request } => {
                assert_eq!(n, 4);
                assert_eq!(reply, vec![0x05, METHOD_USERPASS]);
                assert!(request.is_none());
            }
            _ => panic!("expected Consumed"),
        }
    }

    #[test]
    fn socks5_greeting_honors_prefer_no_auth() {
        let mut hs = SocksProxyHandshake::new(HandshakeConfig {
            prefer_no_auth: true,
            ..HandshakeConfig::default()
        });
        let greeting = [0x05, 0x02, METHOD_NO_AUTH, METHOD_USERPASS];
        match hs.handshake(&greeting).unwrap() {
            Action::Consumed { reply, .. } => assert_eq!(reply, vec![0x05, METHOD_NO_AUTH]),
            _ => panic!("expected Consumed"),
        }
    }

    #[test]
    fn socks5_greeting_no_acceptable_method() {
        let mut hs = plain_handshake();
        let greeting = [0x05, 0x01, 0x03]; // only GSSAPI offered
        match hs.handshake(&greeting) {
            Err(Error::UnsafeSocks { reply, .. }) => assert_eq!(reply, vec![0x05, 0xFF]),
            other => panic!("expected UnsafeSocks, got {other:?}"),
        }
    }

    #[test]
    fn socks5_ipv6_request() {
        let mut hs = plain_handshake();
        hs.handshake(&[0x05, 0x01, METHOD_NO_AUTH]).unwrap();

        let mut msg = vec![0x05, 0x01, 0x00, 0x04];
        msg.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        msg.extend_from_slice(&443u16.to_be_bytes());
        match hs.handshake(&msg).unwrap() {
            Action::Consumed { n, request, .. } => {
                assert_eq!(n, msg.len());
                let req = request.unwrap();
                assert_eq!(req.addr, SocksAddr::Ip(IpAddr::V6(Ipv6Addr::LOCALHOST)));
                assert_eq!(req.port, 443);
            }
            _ => panic!("expected Consumed"),
        }
    }

    #[test]
    fn sniffs_http_as_wrong_protocol() {
        let mut hs = plain_handshake();
        let msg = b"GET / HTTP/1.1\r\n";
        match hs.handshake(msg) {
            Err(Error::WrongProtocol { reply }) => {
                assert_eq!(reply, reply::NOT_AN_HTTP_PROXY_MSG);
            }
            other => panic!("expected WrongProtocol, got {other:?}"),
        }
    }

    #[test]
    fn safe_socks_rejects_literal_ip() {
        let mut hs = SocksProxyHandshake::new(HandshakeConfig {
            safe_socks: true,
            ..HandshakeConfig::default()
        });
        let mut msg = vec![0x04, 0x01, 0x00, 0x50, 93, 184, 216, 34];
        msg.push(0);
        match hs.handshake(&msg) {
            Err(Error::UnsafeSocks { reply, .. }) => {
                assert_eq!(reply, reply::socks4_reject());
            }
            other => panic!("expected UnsafeSocks, got {other:?}"),
        }
    }
}
