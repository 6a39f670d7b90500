//! Bounded hand-off queues between stages.
//!
//! A queue is a bounded crossbeam channel. Closing it means dropping its last [`Outbound`]: the
//! consumer then drains whatever is buffered and sees end-of-stream. Because a stage owns its
//! outbound end by value, it can close it only once and can never send after closing.

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, bounded};

use crate::engine::CancelToken;
use crate::utils::config::CANCEL_POLL_INTERVAL;

use super::error_handler::PipelineError;

pub type Inbound = Receiver<String>;
pub type Outbound = Sender<String>;

/// New queue with room for `capacity` buffered items (at least 1).
pub fn queue(capacity: usize) -> (Outbound, Inbound) {
    bounded(capacity.max(1))
}

/// Next item, `Ok(None)` once the queue is closed and drained, or `Cancelled`.
pub fn recv_or_cancel<T>(rx: &Receiver<T>, cancel: &CancelToken) -> Result<Option<T>, PipelineError> {
    loop {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(item) => return Ok(Some(item)),
            Err(RecvTimeoutError::Disconnected) => return Ok(None),
            Err(RecvTimeoutError::Timeout) => continue,
        }
    }
}

/// Send `item`, waiting for room. Fails when cancelled or when the consumer has gone away.
pub fn send_or_cancel<T>(
    tx: &Sender<T>,
    mut item: T,
    cancel: &CancelToken,
    stage: &str,
) -> Result<(), PipelineError> {
    loop {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        match tx.send_timeout(item, CANCEL_POLL_INTERVAL) {
            Ok(()) => return Ok(()),
            Err(SendTimeoutError::Timeout(back)) => item = back,
            Err(SendTimeoutError::Disconnected(_)) => {
                return Err(PipelineError::DownstreamClosed {
                    stage: stage.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_close_drains_then_ends() {
        let (tx, rx) = queue(4);
        let cancel = CancelToken::new();
        tx.send("a".to_string()).unwrap();
        tx.send("b".to_string()).unwrap();
        drop(tx);
        assert_eq!(recv_or_cancel(&rx, &cancel).unwrap().as_deref(), Some("a"));
        assert_eq!(recv_or_cancel(&rx, &cancel).unwrap().as_deref(), Some("b"));
        assert_eq!(recv_or_cancel(&rx, &cancel).unwrap(), None);
    }

    #[test]
    fn test_blocked_send_unblocks_on_cancel() {
        let (tx, _rx) = queue(1);
        let cancel = CancelToken::new();
        tx.send("full".to_string()).unwrap();
        let c = cancel.clone();
        let h = thread::spawn(move || send_or_cancel(&tx, "more".to_string(), &c, "t"));
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        assert_eq!(h.join().unwrap(), Err(PipelineError::Cancelled));
    }

    #[test]
    fn test_send_to_dropped_consumer() {
        let (tx, rx) = queue(1);
        drop(rx);
        let err = send_or_cancel(&tx, "x".to_string(), &CancelToken::new(), "s").unwrap_err();
        assert!(matches!(err, PipelineError::DownstreamClosed { .. }));
    }
}
