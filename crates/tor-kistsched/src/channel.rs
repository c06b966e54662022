//! The scheduler's view of a channel: a non-owning trait, not a concrete type.
//!
//! The scheduler never owns a channel's lifetime; that belongs to the
//! link-layer module that created it. A caller drives the scheduler by
//! handing it `&mut` access to its own channel objects for the duration of
//! one tick and is responsible for calling [`crate::KistScheduler::on_channel_free`]
//! when a channel goes away.

/// A stable identifier for a channel, used to key the scheduler's internal
/// tables instead of a pointer or reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

/// The state the scheduler has most recently assigned to a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChannelState {
    /// Not under active scheduling (no cells, not yet made pending again).
    Idle,
    /// Has no cells queued right now.
    WaitingForCells,
    /// Has cells queued but its socket has hit its per-tick write limit.
    WaitingToWrite,
    /// Has cells queued and its socket can still accept writes.
    Pending,
}

/// A snapshot of kernel-reported TCP state for one channel's socket.
///
/// `cwnd`, `unacked`, and `mss` come from `TCP_INFO`; `notsent` comes from
/// `SIOCOUTQNSD`. All four are in the units the kernel reports them in
/// (segments for `cwnd`/`unacked`, bytes for `mss`/`notsent`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct KernelSnapshot {
    /// Congestion window, in segments.
    pub cwnd: i64,
    /// Unacknowledged segments in flight.
    pub unacked: i64,
    /// Maximum segment size, in bytes.
    pub mss: i64,
    /// Bytes still sitting in the socket's send buffer, not yet sent.
    pub notsent: i64,
}

/// The scheduler's view of one channel.
///
/// Implemented by the link-layer type that owns the real connection; the
/// scheduler calls these methods at most once per channel per tick phase
/// and never concurrently with itself.
pub trait SchedulableChannel {
    /// This channel's stable identifier.
    fn id(&self) -> ChannelId;

    /// This channel's current scheduling priority. Higher values are
    /// served first; ties are broken in an unspecified but stable order.
    fn scheduler_priority(&self) -> u32;

    /// Query the kernel for this channel's socket state, or `None` if the
    /// kernel doesn't support the required queries (e.g. not Linux, or an
    /// older kernel missing the relevant `getsockopt`/`ioctl`).
    fn probe_socket(&self) -> Option<KernelSnapshot>;

    /// Number of bytes currently sitting in this channel's outbound buffer,
    /// not yet handed to the kernel.
    fn outbuf_len(&self) -> usize;

    /// Whether this channel's internal cell queue has anything left to
    /// flush into its outbuf.
    fn more_cells_queued(&self) -> bool;

    /// Flush one cell from this channel's internal queue into its outbuf,
    /// returning `true` if a cell was flushed.
    fn flush_one_cell(&mut self) -> bool;

    /// Write this channel's entire outbuf to the kernel.
    fn write_outbuf_to_kernel(&mut self);
}
