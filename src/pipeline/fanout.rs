//! Per-item unbounded fan-out: one thread per inbound item, joined with a wait group.

use crossbeam_utils::sync::WaitGroup;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::engine::CancelToken;

use super::error_handler::PipelineError;
use super::queue::{Inbound, Outbound, recv_or_cancel, send_or_cancel};
use super::stage::{Stage, StageContext};

/// Work applied to one item by a [`FanoutRunner`]. Called concurrently for different items.
pub trait ItemWork: Send + Sync + 'static {
    fn process(&self, item: &str, cancel: &CancelToken) -> Result<String, PipelineError>;
}

/// Stage that processes every inbound item on its own thread, with no cap on items in flight.
/// Any limit on a sub-operation is the work's business (see the quota gate).
pub struct FanoutRunner<W> {
    name: String,
    work: Arc<W>,
}

impl<W: ItemWork> FanoutRunner<W> {
    pub fn new(name: impl Into<String>, work: W) -> Self {
        Self {
            name: name.into(),
            work: Arc::new(work),
        }
    }

    /// Spawn one worker for `item`. The worker holds clones of the outbound queue and of `wg`
    /// and drops both when done.
    fn spawn_item(
        &self,
        ctx: &StageContext,
        seq: usize,
        item: String,
        outbound: &Outbound,
        wg: &WaitGroup,
        emitted: &Arc<AtomicUsize>,
    ) -> Result<(), PipelineError> {
        let worker = format!("{}-{}", self.name, seq);
        let work = Arc::clone(&self.work);
        let ctx_w = ctx.clone();
        let tx = outbound.clone();
        let wg = wg.clone();
        let emitted = Arc::clone(emitted);
        let stage = self.name.clone();

        thread::Builder::new()
            .name(worker.clone())
            .spawn(move || {
                let sent = work
                    .process(&item, &ctx_w.cancel)
                    .and_then(|out| send_or_cancel(&tx, out, &ctx_w.cancel, &stage));
                match sent {
                    Ok(()) => {
                        emitted.fetch_add(1, Ordering::AcqRel);
                    }
                    Err(err) => ctx_w.fail(err),
                }
                drop(tx);
                drop(wg);
            })
            .map(|_| ())
            .map_err(|e| PipelineError::spawn(worker, &e))
    }
}

impl<W: ItemWork> Stage for FanoutRunner<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        ctx: &StageContext,
        inbound: Inbound,
        outbound: Outbound,
    ) -> Result<usize, PipelineError> {
        let wg = WaitGroup::new();
        let emitted = Arc::new(AtomicUsize::new(0));
        let mut launched = 0_usize;

        loop {
            let item = match recv_or_cancel(&inbound, &ctx.cancel) {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(err) => {
                    ctx.fail(err);
                    break;
                }
            };
            if let Err(err) = self.spawn_item(ctx, launched, item, &outbound, &wg, &emitted) {
                ctx.fail(err);
                break;
            }
            launched += 1;
        }
        debug!("{}: inbound closed after {} items, waiting for workers", self.name, launched);

        wg.wait();
        // Every worker clone is gone; this drop closes the queue.
        drop(outbound);

        let emitted = emitted.load(Ordering::Acquire);
        debug!("{}: emitted {}/{}, outbound closed", self.name, emitted, launched);
        // A worker that vanished without reporting (panic) would silently drop its item.
        if emitted != launched && !ctx.first_error.is_set() {
            let err = PipelineError::WorkerPanicked {
                worker: format!("{} worker", self.name),
            };
            ctx.fail(err.clone());
            return Err(err);
        }
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::queue::queue;
    use std::time::Duration;

    struct Upper;

    impl ItemWork for Upper {
        fn process(&self, item: &str, _cancel: &CancelToken) -> Result<String, PipelineError> {
            // Later items finish first.
            let delay = 30_u64.saturating_sub(item.len() as u64 * 10);
            thread::sleep(Duration::from_millis(delay));
            Ok(item.to_uppercase())
        }
    }

    struct Panics;

    impl ItemWork for Panics {
        fn process(&self, item: &str, _cancel: &CancelToken) -> Result<String, PipelineError> {
            if item == "bad" {
                panic!("worker blew up");
            }
            Ok(item.to_string())
        }
    }

    #[test]
    fn test_emits_one_result_per_item_then_closes() {
        let runner = FanoutRunner::new("upper", Upper);
        let ctx = StageContext::default();
        let (in_tx, in_rx) = queue(8);
        let (out_tx, out_rx) = queue(8);
        for s in ["a", "bb", "ccc"] {
            in_tx.send(s.to_string()).unwrap();
        }
        drop(in_tx);

        assert_eq!(runner.run(&ctx, in_rx, out_tx).unwrap(), 3);
        let mut got: Vec<String> = out_rx.iter().collect();
        got.sort();
        assert_eq!(got, vec!["A", "BB", "CCC"]);
    }

    #[test]
    fn test_panicking_worker_fails_stage() {
        let runner = FanoutRunner::new("panics", Panics);
        let ctx = StageContext::default();
        let (in_tx, in_rx) = queue(8);
        let (out_tx, out_rx) = queue(8);
        in_tx.send("ok".to_string()).unwrap();
        in_tx.send("bad".to_string()).unwrap();
        drop(in_tx);

        let res = runner.run(&ctx, in_rx, out_tx);
        assert!(matches!(res, Err(PipelineError::WorkerPanicked { .. })));
        assert!(ctx.cancel.is_cancelled());
        drop(out_rx);
    }
}
