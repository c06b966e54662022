#![doc = include_str!("../README.md")]
// @@ begin lint list maintained by maint/add_warning @@
#![allow(renamed_and_removed_lints)] // @@REMOVE_WHEN(ci_arti_stable)
#![allow(unknown_lints)] // @@REMOVE_WHEN(ci_arti_nightly)
#![warn(missing_docs)]
#![warn(noop_method_call)]
#![warn(unreachable_pub)]
#![warn(clippy::all)]
#![deny(clippy::cast_lossless)]
#![deny(clippy::checked_conversions)]
#![deny(clippy::fallible_impl_from)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::unwrap_used)]
//! <!-- @@ end lint list maintained by maint/add_warning @@ -->

mod control0;
mod err;
#[cfg(feature = "proxy-handshake")]
mod handshake;
mod reply;
mod types;

pub use control0::looks_like_control0_command;
pub use err::Error;
#[cfg(feature = "proxy-handshake")]
pub use handshake::{Action, AddressMapPredicate, HandshakeConfig, SocksProxyHandshake};
pub use reply::{
    socks4_reject, socks5_method_reply, socks5_reject, socks5_status, socks5_userpass_reply_ok,
    NOT_AN_HTTP_PROXY_MSG,
};
pub use types::{
    Request, SocksAddr, SocksCmd, SocksVersion, MAX_SOCKS_ADDR_LEN, MAX_SOCKS_MESSAGE_LEN,
    MAX_SOCKS_REPLY_LEN,
};
