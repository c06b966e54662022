//! The KIST scheduling tick itself.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::channel::{ChannelId, ChannelState, SchedulableChannel};
use crate::config::KistConfig;
use crate::socket::{SocketInfo, OUTBUF_FLUSH_THRESHOLD_CELLS};

/// What a caller should do after asking the scheduler to [`KistScheduler::schedule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleAction {
    /// Nothing is pending; don't arm a timer.
    Noop,
    /// Run a tick immediately.
    RunNow,
    /// Arm a one-shot timer for this long, then run a tick.
    RunAfter(Duration),
}

/// The outcome of one [`KistScheduler::run`] call: the state each channel
/// that was pending at tick start ended up in.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Final scheduler state per channel touched this tick.
    pub states: HashMap<ChannelId, ChannelState>,
}

impl RunOutcome {
    /// Channels that should be reinserted into the caller's pending-channel
    /// list because KIST ran out of per-socket budget for them this tick.
    pub fn pending_again(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.states
            .iter()
            .filter(|(_, state)| **state == ChannelState::Pending)
            .map(|(id, _)| *id)
    }
}

/// A max-heap entry ordering channels by scheduler priority, breaking ties
/// by insertion order (earliest-pushed first) so that channels of equal
/// priority are served round-robin rather than one starving the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct QueueEntry {
    priority: u32,
    seq: u64,
    id: ChannelId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            // Reversed: a *smaller* sequence number (pushed earlier) should
            // sort as *greater* so the max-heap pops it first.
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The per-socket, kernel-informed fair scheduler.
///
/// A `KistScheduler` doesn't own channels; callers pass in a registry of
/// `&mut` channel objects (anything implementing [`SchedulableChannel`])
/// for the duration of each [`KistScheduler::run`] call.
pub struct KistScheduler {
    config: KistConfig,
    socket_table: HashMap<ChannelId, SocketInfo>,
    outbuf_table: HashSet<ChannelId>,
    kernel_unsupported: bool,
    last_run: Option<Instant>,
    /// Monotonic counter handing out each `QueueEntry`'s tie-break key.
    next_seq: u64,
}

impl KistScheduler {
    /// Build a new scheduler with the given configuration.
    pub fn new(config: KistConfig) -> Self {
        KistScheduler {
            config,
            socket_table: HashMap::new(),
            outbuf_table: HashSet::new(),
            kernel_unsupported: false,
            last_run: None,
            next_seq: 0,
        }
    }

    /// Hand out the next tie-break sequence number.
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        seq
    }

    /// Replace this scheduler's configuration, e.g. after `on_new_options`.
    pub fn reconfigure(&mut self, config: KistConfig) {
        self.config = config;
    }

    /// Drop any state held for `id`. Call this when a channel is destroyed.
    pub fn on_channel_free(&mut self, id: ChannelId) {
        self.socket_table.remove(&id);
        self.outbuf_table.remove(&id);
    }

    /// Release all scheduler state, e.g. when tearing down or switching
    /// away from the KIST scheduler entirely.
    pub fn free_all(&mut self) {
        self.socket_table.clear();
        self.outbuf_table.clear();
        self.last_run = None;
    }

    /// Decide whether to run a tick now, later, or not at all.
    pub fn schedule(&self, any_channel_pending: bool) -> ScheduleAction {
        if !any_channel_pending {
            return ScheduleAction::Noop;
        }
        let Some(last) = self.last_run else {
            return ScheduleAction::RunNow;
        };
        let interval = match self.config.effective_run_interval(None) {
            Some(d) => d,
            // A disabled-KIST config has no business calling `run`; treat
            // it as "always ready" so a misconfigured caller doesn't stall.
            None => return ScheduleAction::RunNow,
        };
        let elapsed = last.elapsed();
        if elapsed >= interval {
            ScheduleAction::RunNow
        } else {
            ScheduleAction::RunAfter(interval - elapsed)
        }
    }

    /// Run one scheduling tick over `pending`, a registry of every channel
    /// that has cells queued or is otherwise eligible to run this tick.
    ///
    /// Returns the final state of every channel that was touched. Channels
    /// left in [`ChannelState::Pending`] or [`ChannelState::WaitingToWrite`]
    /// should be re-added to the caller's pending-channel set for the next
    /// tick; the rest have gone idle.
    pub fn run<C: SchedulableChannel>(&mut self, pending: &mut HashMap<ChannelId, C>) -> RunOutcome {
        let factor = self.config.sock_buf_size_factor();

        let mut queue: BinaryHeap<QueueEntry> = BinaryHeap::with_capacity(pending.len());
        for (&id, chan) in pending.iter() {
            let info = self.socket_table.entry(id).or_default();
            let snapshot = chan.probe_socket();
            if snapshot.is_none() && !self.kernel_unsupported {
                tracing::warn!(
                    "KIST kernel probe unsupported; falling back to naive per-socket limits"
                );
                self.kernel_unsupported = true;
            }
            info.refresh(snapshot, factor);
            let priority = chan.scheduler_priority();
            let seq = self.next_seq();
            queue.push(QueueEntry { priority, seq, id });
        }

        let mut prev_chan: Option<ChannelId> = None;
        let mut outcome = RunOutcome::default();

        while let Some(QueueEntry { id, .. }) = queue.pop() {
            self.outbuf_table.insert(id);

            if let Some(prev_id) = prev_chan {
                if prev_id != id {
                    if let Some(prev) = pending.get_mut(&prev_id) {
                        if prev.outbuf_len() as i64
                            > OUTBUF_FLUSH_THRESHOLD_CELLS * crate::socket::CELL_MAX_NETWORK_SIZE
                        {
                            prev.write_outbuf_to_kernel();
                            self.outbuf_table.remove(&prev_id);
                        }
                    }
                }
            }
            prev_chan = Some(id);

            let can_write_before = self
                .socket_table
                .get(&id)
                .map(SocketInfo::can_write)
                .unwrap_or(false);

            let chan = pending
                .get_mut(&id)
                .expect("channel id present in queue but missing from registry");

            if can_write_before && chan.flush_one_cell() {
                if let Some(info) = self.socket_table.get_mut(&id) {
                    info.record_write(1);
                }
            }

            let more = chan.more_cells_queued();
            let can_write_after = self
                .socket_table
                .get(&id)
                .map(SocketInfo::can_write)
                .unwrap_or(false);

            let state = match (more, can_write_after) {
                (false, _) => ChannelState::WaitingForCells,
                (true, false) => ChannelState::WaitingToWrite,
                (true, true) => ChannelState::Pending,
            };
            outcome.states.insert(id, state);

            if state == ChannelState::Pending {
                let priority = pending[&id].scheduler_priority();
                let seq = self.next_seq();
                queue.push(QueueEntry { priority, seq, id });
            }
        }

        for id in self.outbuf_table.drain().collect::<Vec<_>>() {
            if let Some(chan) = pending.get_mut(&id) {
                chan.write_outbuf_to_kernel();
            }
        }

        self.last_run = Some(Instant::now());
        outcome
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct MockChannel {
        id: ChannelId,
        priority: u32,
        queued_cells: usize,
        outbuf_cells: usize,
        flushed_to_kernel: usize,
        limit_cells: Option<i64>,
    }

    impl MockChannel {
        fn new(id: u64, priority: u32, queued_cells: usize) -> Self {
            MockChannel {
                id: ChannelId(id),
                priority,
                queued_cells,
                outbuf_cells: 0,
                flushed_to_kernel: 0,
                limit_cells: None,
            }
        }

        fn with_limit(mut self, limit_cells: i64) -> Self {
            self.limit_cells = Some(limit_cells);
            self
        }
    }

    impl SchedulableChannel for MockChannel {
        fn id(&self) -> ChannelId {
            self.id
        }

        fn scheduler_priority(&self) -> u32 {
            self.priority
        }

        fn probe_socket(&self) -> Option<crate::channel::KernelSnapshot> {
            let limit_cells = self.limit_cells?;
            let cell_bytes = crate::socket::CELL_MAX_NETWORK_SIZE + crate::socket::TLS_PER_CELL_OVERHEAD;
            let limit_bytes = limit_cells * cell_bytes;
            // mss=1 and notsent=cwnd cancels the `extra_space` term, so
            // `limit` ends up exactly `limit_bytes` regardless of the
            // configured `sock_buf_size_factor`.
            Some(crate::channel::KernelSnapshot {
                cwnd: limit_bytes,
                unacked: 0,
                mss: 1,
                notsent: limit_bytes,
            })
        }

        fn outbuf_len(&self) -> usize {
            self.outbuf_cells * crate::socket::CELL_MAX_NETWORK_SIZE as usize
        }

        fn more_cells_queued(&self) -> bool {
            self.queued_cells > 0
        }

        fn flush_one_cell(&mut self) -> bool {
            if self.queued_cells == 0 {
                return false;
            }
            self.queued_cells -= 1;
            self.outbuf_cells += 1;
            true
        }

        fn write_outbuf_to_kernel(&mut self) {
            self.flushed_to_kernel += self.outbuf_cells;
            self.outbuf_cells = 0;
        }
    }

    #[test]
    fn schedule_is_noop_with_nothing_pending() {
        let sched = KistScheduler::new(KistConfig::default());
        assert_eq!(sched.schedule(false), ScheduleAction::Noop);
    }

    #[test]
    fn schedule_runs_immediately_on_first_call() {
        let sched = KistScheduler::new(KistConfig::default());
        assert_eq!(sched.schedule(true), ScheduleAction::RunNow);
    }

    #[test]
    fn equal_priority_channels_get_equal_service() {
        let mut sched = KistScheduler::new(KistConfig::default());
        let mut registry = HashMap::new();
        registry.insert(ChannelId(1), MockChannel::new(1, 10, 500));
        registry.insert(ChannelId(2), MockChannel::new(2, 10, 500));

        // Neither channel has a kernel-reported limit, so both drain fully
        // within one tick; the round-robin tie-break means the outbufs
        // they hand to the kernel (and so the order cells hit the wire)
        // stay within one cell of each other throughout.
        sched.run(&mut registry);

        let flushed_a = registry[&ChannelId(1)].flushed_to_kernel;
        let flushed_b = registry[&ChannelId(2)].flushed_to_kernel;
        assert_eq!(flushed_a, 500);
        assert_eq!(flushed_b, 500);
    }

    #[test]
    fn equal_priority_channels_alternate_when_rate_limited() {
        let mut sched = KistScheduler::new(KistConfig::default());
        let mut registry = HashMap::new();
        // A tight per-tick limit forces most pops to back off, so the
        // round-robin tie-break is what determines service order instead
        // of both channels draining in one pass.
        registry.insert(ChannelId(1), MockChannel::new(1, 10, 1000).with_limit(1));
        registry.insert(ChannelId(2), MockChannel::new(2, 10, 1000).with_limit(1));

        let outcome = sched.run(&mut registry);
        let sent_a = 1000 - registry[&ChannelId(1)].queued_cells;
        let sent_b = 1000 - registry[&ChannelId(2)].queued_cells;
        assert!((sent_a as i64 - sent_b as i64).abs() <= 1);
        assert_eq!(outcome.states[&ChannelId(1)], ChannelState::WaitingToWrite);
        assert_eq!(outcome.states[&ChannelId(2)], ChannelState::WaitingToWrite);
    }

    #[test]
    fn zero_limit_channel_backs_off_once_per_tick() {
        let mut sched = KistScheduler::new(KistConfig::default());
        let mut registry = HashMap::new();
        registry.insert(ChannelId(1), MockChannel::new(1, 10, 5).with_limit(0));

        let outcome = sched.run(&mut registry);
        assert_eq!(
            outcome.states.get(&ChannelId(1)),
            Some(&ChannelState::WaitingToWrite)
        );
        // No cells were flushed since the socket never had room.
        assert_eq!(registry[&ChannelId(1)].queued_cells, 5);
    }

    #[test]
    fn finished_channel_reports_waiting_for_cells() {
        let mut sched = KistScheduler::new(KistConfig::default());
        let mut registry = HashMap::new();
        registry.insert(ChannelId(1), MockChannel::new(1, 10, 1));

        let outcome = sched.run(&mut registry);
        assert_eq!(
            outcome.states.get(&ChannelId(1)),
            Some(&ChannelState::WaitingForCells)
        );
        assert_eq!(registry[&ChannelId(1)].queued_cells, 0);
    }

    #[test]
    fn on_channel_free_drops_state() {
        let mut sched = KistScheduler::new(KistConfig::default());
        let mut registry = HashMap::new();
        registry.insert(ChannelId(1), MockChannel::new(1, 10, 1));
        sched.run(&mut registry);
        assert!(sched.socket_table.contains_key(&ChannelId(1)));
        sched.on_channel_free(ChannelId(1));
        assert!(!sched.socket_table.contains_key(&ChannelId(1)));
    }
}
