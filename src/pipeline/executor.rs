use anyhow::Result;
use log::debug;
use std::thread::{self, JoinHandle};

use crate::engine::CancelToken;
use crate::utils::config::QUEUE_CAPACITY;

use super::error_handler::{PipelineError, check_for_first_error};
use super::queue::{Inbound, queue, send_or_cancel};
use super::stage::{Stage, StageContext};

const PRODUCER: &str = "producer";

/// Linear sequence of stages joined by bounded queues.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    queue_capacity: usize,
    cancel: CancelToken,
}

/// Handles returned by [`Pipeline::start`]: receive from `output_rx` until it closes, then
/// hand everything to [`collect_output`] (or join the handles yourself).
pub struct PipelineHandles {
    pub output_rx: Inbound,
    pub producer_handle: JoinHandle<usize>,
    pub stage_handles: Vec<(String, JoinHandle<Result<usize, PipelineError>>)>,
    pub ctx: StageContext,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            queue_capacity: QUEUE_CAPACITY,
            cancel: CancelToken::new(),
        }
    }

    /// Append a stage; stages run in insertion order.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Use an externally owned token (e.g. tripped by Ctrl+C) instead of a private one.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Allocate `stages + 1` queues, start the producer and one driver thread per stage.
    /// Stage `i` reads queue `i` and writes queue `i + 1`; queue 0 is fed by `items`.
    pub fn start<I>(self, items: I) -> Result<PipelineHandles>
    where
        I: IntoIterator + Send + 'static,
        I::Item: ToString,
    {
        let ctx = StageContext::new(self.cancel);
        let (producer_tx, mut next_rx) = queue(self.queue_capacity);

        let producer_ctx = ctx.clone();
        let producer_handle = thread::Builder::new()
            .name(PRODUCER.to_string())
            .spawn(move || {
                let mut count = 0_usize;
                for item in items {
                    if let Err(err) =
                        send_or_cancel(&producer_tx, item.to_string(), &producer_ctx.cancel, PRODUCER)
                    {
                        producer_ctx.fail(err);
                        break;
                    }
                    count += 1;
                }
                debug!("{}: sent {} items, closing", PRODUCER, count);
                drop(producer_tx);
                count
            })
            .map_err(|e| PipelineError::spawn(PRODUCER, &e))?;

        let mut stage_handles = Vec::with_capacity(self.stages.len());
        for stage in self.stages {
            let name = stage.name().to_string();
            let inbound = next_rx;
            let (outbound, rx) = queue(self.queue_capacity);
            next_rx = rx;

            let stage_ctx = ctx.clone();
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    debug!("{}: started", stage.name());
                    let res = stage.run(&stage_ctx, inbound, outbound);
                    if let Err(err) = &res {
                        stage_ctx.fail(err.clone());
                    }
                    res
                });
            match handle {
                Ok(h) => stage_handles.push((name, h)),
                Err(e) => {
                    // Already-started threads unwind through the cancel token.
                    ctx.fail(PipelineError::spawn(name, &e));
                    break;
                }
            }
        }

        Ok(PipelineHandles {
            output_rx: next_rx,
            producer_handle,
            stage_handles,
            ctx,
        })
    }

    /// Start, drain the last queue, join every thread. Fails if any stage failed or was cancelled.
    pub fn run<I>(self, items: I) -> Result<Vec<String>>
    where
        I: IntoIterator + Send + 'static,
        I::Item: ToString,
    {
        let (output, _) = collect_output(self.start(items)?)?;
        Ok(output)
    }
}

/// Drain `output_rx` until the last stage closes it, join producer and stages, then check the
/// recorded error. Returns (output, produced item count).
pub fn collect_output(handles: PipelineHandles) -> Result<(Vec<String>, usize)> {
    let PipelineHandles {
        output_rx,
        producer_handle,
        stage_handles,
        ctx,
    } = handles;

    let mut output = Vec::new();
    while let Ok(item) = output_rx.recv() {
        output.push(item);
    }
    debug!("consumer: output closed, {} values", output.len());

    let produced = match producer_handle.join() {
        Ok(n) => n,
        Err(_) => {
            ctx.fail(PipelineError::WorkerPanicked {
                worker: PRODUCER.to_string(),
            });
            0
        }
    };
    for (name, h) in stage_handles {
        match h.join() {
            Ok(Ok(emitted)) => debug!("{}: done, emitted {}", name, emitted),
            Ok(Err(err)) => debug!("{}: failed: {}", name, err),
            Err(_) => ctx.fail(PipelineError::WorkerPanicked { worker: name }),
        }
    }

    if ctx.cancel.is_cancelled() && !ctx.first_error.is_set() {
        ctx.first_error.record(PipelineError::Cancelled);
    }
    if let Err(err) = check_for_first_error(&ctx.first_error) {
        debug!("pipeline failed: {}", err);
        return Err(err);
    }
    Ok((output, produced))
}
