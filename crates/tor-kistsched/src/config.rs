//! Configuration tunables for the KIST scheduler.

use std::time::Duration;

use crate::err::Error;

/// Default `sched_run_interval`, in milliseconds, used when neither a local
/// option nor a consensus parameter supplies one.
pub const KIST_SCHED_RUN_INTERVAL_DEFAULT: i32 = 10;
/// Lowest `sched_run_interval` the consensus parameter is clamped to.
pub const KIST_SCHED_RUN_INTERVAL_MIN: i32 = 2;
/// Highest `sched_run_interval` the consensus parameter is clamped to.
pub const KIST_SCHED_RUN_INTERVAL_MAX: i32 = 100;

/// Configuration for a [`crate::KistScheduler`].
///
/// Mirrors the two options spec.md's "Configuration (core subset)" names
/// for KIST: `KISTSchedRunInterval` and `KISTSockBufSizeFactor`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KistConfig {
    /// `KISTSchedRunInterval` as configured locally. `0` defers to the
    /// consensus parameter; negative values disable KIST outright.
    sched_run_interval_ms: i32,
    /// `KISTSockBufSizeFactor`: how many extra congestion-windows of data
    /// may be parked in the kernel send buffer between ticks.
    sock_buf_size_factor: f64,
}

impl Default for KistConfig {
    fn default() -> Self {
        KistConfig {
            sched_run_interval_ms: 0,
            sock_buf_size_factor: 1.0,
        }
    }
}

impl KistConfig {
    /// Build a configuration from the raw option values, validating ranges.
    pub fn from_options(
        sched_run_interval_ms: i32,
        sock_buf_size_factor: f64,
    ) -> Result<Self, Error> {
        if !sock_buf_size_factor.is_finite() || sock_buf_size_factor < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "KISTSockBufSizeFactor must be a non-negative finite number, got {sock_buf_size_factor}"
            )));
        }
        Ok(KistConfig {
            sched_run_interval_ms,
            sock_buf_size_factor,
        })
    }

    /// The configured `sock_buf_size_factor`.
    pub fn sock_buf_size_factor(&self) -> f64 {
        self.sock_buf_size_factor
    }

    /// Resolve the effective run interval given an optional consensus
    /// parameter value, returning `None` if KIST should be disabled
    /// (falling back to a naive, non-KIST scheduler).
    pub fn effective_run_interval(&self, consensus_param: Option<i32>) -> Option<Duration> {
        let ms = if self.sched_run_interval_ms != 0 {
            self.sched_run_interval_ms
        } else {
            consensus_param
                .unwrap_or(KIST_SCHED_RUN_INTERVAL_DEFAULT)
                .clamp(KIST_SCHED_RUN_INTERVAL_MIN, KIST_SCHED_RUN_INTERVAL_MAX)
        };
        if ms <= 0 {
            None
        } else {
            Some(Duration::from_millis(ms as u64))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn local_override_wins_over_consensus() {
        let cfg = KistConfig::from_options(25, 1.0).unwrap();
        assert_eq!(
            cfg.effective_run_interval(Some(50)),
            Some(Duration::from_millis(25))
        );
    }

    #[test]
    fn negative_local_value_disables_kist() {
        let cfg = KistConfig::from_options(-1, 1.0).unwrap();
        assert_eq!(cfg.effective_run_interval(Some(50)), None);
    }

    #[test]
    fn unset_local_falls_back_to_clamped_consensus() {
        let cfg = KistConfig::from_options(0, 1.0).unwrap();
        assert_eq!(
            cfg.effective_run_interval(Some(1000)),
            Some(Duration::from_millis(KIST_SCHED_RUN_INTERVAL_MAX as u64))
        );
        assert_eq!(
            cfg.effective_run_interval(None),
            Some(Duration::from_millis(KIST_SCHED_RUN_INTERVAL_DEFAULT as u64))
        );
    }

    #[test]
    fn rejects_negative_buf_size_factor() {
        assert!(KistConfig::from_options(0, -0.5).is_err());
    }
}
