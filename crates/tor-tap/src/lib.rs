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

mod dh;
mod err;
mod handshake;
mod kdf;

pub use dh::{Keypair, DH1024_LEN};
pub use err::Error;
pub use handshake::{
    client_create, client_handshake, server_handshake, ClientHandshake, ONIONSKIN_CHALLENGE_LEN,
    ONIONSKIN_REPLY_LEN,
};
