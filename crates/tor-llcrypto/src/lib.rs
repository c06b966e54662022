#![doc = include_str!("../README.md")]
//!
//! Functionality is split into three modules: [`pk`] (public-key
//! cryptography, both asymmetric encryption and signatures), [`cipher`]
//! (symmetric ciphers), and [`d`] (message digests). The [`rng`] module
//! has the random-number-generator facades ([`rng::strong_rand`] and
//! [`rng::WeakRng`], covering the two RNG surfaces the protocol layer
//! above this crate needs). Finally,
//! [`util`] has lower-level odds and ends, including constant-time byte
//! arrays.
//!
//! This crate only re-exports cryptography; it doesn't implement any
//! of it.  For the actual underlying implementations, see
//! [RustCrypto](https://github.com/RustCrypto) and
//! [`dalek-cryptography`](https://github.com/dalek-cryptography).
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

pub mod cipher;
pub mod d;
pub mod pk;
pub mod rng;
pub mod traits;
pub mod util;
