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
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]
#![deny(clippy::fallible_impl_from)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::unwrap_used)]
//! <!-- @@ end lint list maintained by maint/add_warning @@ -->

mod decode;
mod ids;
mod ls;

pub use decode::{LinkSpecDecodeError, RelayEndpoint, Strictness};
pub use ids::{RelayId, RelayIdRef, RelayIdType, RelayIdTypeIter};
pub use ls::{EncodedLinkSpec, LinkSpec, LinkSpecType};
