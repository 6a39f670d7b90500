//! Public and internal types for the signer API and pipeline.

use serde::Serialize;

use crate::utils::config::{QUEUE_CAPACITY, QUOTA_CAPACITY};

/// Lib-only options for [`sign_with_opts`](crate::sign_with_opts).
#[derive(Clone, Debug)]
pub struct SignerOpts {
    /// Maximum concurrent slow-digest calls, process-wide for this run. Clamped to at least 1.
    pub quota: usize,
    /// Capacity of each hand-off queue. Clamped to at least 1.
    pub queue_capacity: usize,
}

impl Default for SignerOpts {
    fn default() -> Self {
        Self {
            quota: QUOTA_CAPACITY,
            queue_capacity: QUEUE_CAPACITY,
        }
    }
}

impl From<&SignerOpts> for Opts {
    fn from(o: &SignerOpts) -> Self {
        Opts {
            quota: o.quota,
            queue_capacity: o.queue_capacity,
            ..Opts::default()
        }
    }
}

/// Full options (CLI). Use [`SignerOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Maximum concurrent slow-digest calls.
    pub quota: usize,
    /// Capacity of each hand-off queue.
    pub queue_capacity: usize,
    /// Simulated latency added to every fast-digest call, in milliseconds.
    pub fast_latency_ms: u64,
    /// Simulated latency added to every slow-digest call, in milliseconds.
    pub slow_latency_ms: u64,
    /// Fail the run if the slow digest is ever entered concurrently.
    pub exclusive: bool,
    /// Debug logging.
    pub verbose: bool,
    /// Print a JSON [`RunReport`] instead of the bare artifact.
    pub json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            quota: QUOTA_CAPACITY,
            queue_capacity: QUEUE_CAPACITY,
            fast_latency_ms: 0,
            slow_latency_ms: 0,
            exclusive: false,
            verbose: false,
            json: false,
        }
    }
}

impl Opts {
    pub fn effective_quota(&self) -> usize {
        self.quota.max(1)
    }

    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

/// Summary of one completed run.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    /// The combined artifact (sorted terminal results joined with `_`).
    pub artifact: String,
    /// Number of items the producer fed into the pipeline.
    pub items: usize,
    /// Quota capacity the run was configured with.
    pub quota: usize,
    /// Highest number of slow-digest calls observed in flight at once.
    pub peak_slow_calls: usize,
    pub elapsed_ms: u128,
}
