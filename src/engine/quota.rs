//! Counting semaphore guarding the rate-limited primitive.
//!
//! Slots are tokens in a bounded channel: acquiring sends a token (blocks while the channel is
//! full), releasing receives one back. The gate is an ordinary value shared through `Arc`, so each
//! run (and each test) can pick its own capacity.

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::cancel::CancelToken;
use crate::pipeline::PipelineError;
use crate::utils::config::CANCEL_POLL_INTERVAL;

pub struct QuotaGate {
    slots_tx: Sender<()>,
    slots_rx: Receiver<()>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Held while one rate-limited call runs. Dropping it frees the slot.
pub struct QuotaPermit<'a> {
    gate: &'a QuotaGate,
}

impl QuotaGate {
    /// Gate admitting at most `capacity` holders at once. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (slots_tx, slots_rx) = bounded(capacity);
        Self {
            slots_tx,
            slots_rx,
            capacity,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of permits held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of permits ever held at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Block until a slot is free or `cancel` fires.
    pub fn acquire(&self, cancel: &CancelToken) -> Result<QuotaPermit<'_>, PipelineError> {
        loop {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            match self.slots_tx.send_timeout((), CANCEL_POLL_INTERVAL) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(())) => continue,
                // Unreachable while self holds the receiver.
                Err(SendTimeoutError::Disconnected(())) => return Err(PipelineError::Cancelled),
            }
        }
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        Ok(QuotaPermit { gate: self })
    }

    /// Run `f` while holding a permit; the permit is released as soon as `f` returns.
    pub fn with_permit<T>(
        &self,
        cancel: &CancelToken,
        f: impl FnOnce() -> T,
    ) -> Result<T, PipelineError> {
        let _permit = self.acquire(cancel)?;
        Ok(f())
    }
}

impl Drop for QuotaPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::AcqRel);
        let _ = self.gate.slots_rx.try_recv();
    }
}
