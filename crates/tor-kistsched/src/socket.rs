//! Per-socket KIST limit bookkeeping.

use crate::channel::KernelSnapshot;

/// The on-wire size of one cell, cells plus TLS record overhead.
///
/// Tor's fixed-size link-layer cell is 514 bytes on the wire; this module
/// treats that as an opaque quantum, per spec.md's `Cell` glossary entry.
pub const CELL_MAX_NETWORK_SIZE: i64 = 514;
/// Per-cell TLS record overhead added on top of `CELL_MAX_NETWORK_SIZE`
/// when estimating how many bytes a flushed cell costs the kernel send
/// buffer.
pub const TLS_PER_CELL_OVERHEAD: i64 = 29;

/// How many cells' worth of data must sit in a channel's outbuf before the
/// scheduler forces an early flush to the kernel on channel switch.
pub const OUTBUF_FLUSH_THRESHOLD_CELLS: i64 = 8;

/// Per-socket state the scheduler maintains across one tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct SocketInfo {
    /// Last-probed congestion window.
    pub cwnd: i64,
    /// Last-probed unacknowledged segment count.
    pub unacked: i64,
    /// Last-probed maximum segment size.
    pub mss: i64,
    /// Last-probed not-yet-sent byte count.
    pub notsent: i64,
    /// This tick's computed write budget, in bytes.
    pub limit: i64,
    /// Bytes written to the kernel so far this tick.
    pub written: i64,
}

impl SocketInfo {
    /// Reset per-tick state and recompute `limit` from a fresh kernel
    /// snapshot, or degrade to "write until the socket blocks" if the
    /// kernel doesn't support the probe.
    pub fn refresh(&mut self, snapshot: Option<KernelSnapshot>, sock_buf_size_factor: f64) {
        self.written = 0;
        match snapshot {
            Some(snap) => {
                self.cwnd = snap.cwnd;
                self.unacked = snap.unacked;
                self.mss = snap.mss;
                self.notsent = snap.notsent;

                let tcp_space = ((self.cwnd - self.unacked) * self.mss).max(0);
                let target = (self.cwnd as f64 * self.mss as f64 * sock_buf_size_factor).round();
                let extra_space = (target as i64 - self.notsent).max(0);
                self.limit = tcp_space + extra_space;
            }
            None => {
                self.cwnd = 0;
                self.unacked = 0;
                self.mss = 0;
                self.notsent = 0;
                self.limit = i64::MAX;
            }
        }
    }

    /// Whether this socket can still accept a full cell's worth of writes
    /// this tick.
    pub fn can_write(&self) -> bool {
        (self.limit - self.written) / (CELL_MAX_NETWORK_SIZE + TLS_PER_CELL_OVERHEAD) > 0
    }

    /// Record that `cells` cells were just flushed to this socket's outbuf.
    pub fn record_write(&mut self, cells: i64) {
        self.written += cells * (CELL_MAX_NETWORK_SIZE + TLS_PER_CELL_OVERHEAD);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_limit_cannot_write() {
        let mut info = SocketInfo::default();
        info.refresh(
            Some(KernelSnapshot {
                cwnd: 0,
                unacked: 0,
                mss: 1460,
                notsent: 0,
            }),
            1.0,
        );
        assert_eq!(info.limit, 0);
        assert!(!info.can_write());
    }

    #[test]
    fn missing_probe_degrades_to_unbounded() {
        let mut info = SocketInfo::default();
        info.refresh(None, 1.0);
        assert_eq!(info.limit, i64::MAX);
        assert!(info.can_write());
    }

    #[test]
    fn healthy_socket_can_write() {
        let mut info = SocketInfo::default();
        info.refresh(
            Some(KernelSnapshot {
                cwnd: 10,
                unacked: 2,
                mss: 1460,
                notsent: 0,
            }),
            1.0,
        );
        assert!(info.limit > 0);
        assert!(info.can_write());
    }
}
