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

mod channel;
mod config;
mod err;
mod scheduler;
mod socket;

pub use channel::{ChannelId, ChannelState, KernelSnapshot, SchedulableChannel};
pub use config::{
    KistConfig, KIST_SCHED_RUN_INTERVAL_DEFAULT, KIST_SCHED_RUN_INTERVAL_MAX,
    KIST_SCHED_RUN_INTERVAL_MIN,
};
pub use err::Error;
pub use scheduler::{KistScheduler, RunOutcome, ScheduleAction};
pub use socket::{CELL_MAX_NETWORK_SIZE, TLS_PER_CELL_OVERHEAD};
