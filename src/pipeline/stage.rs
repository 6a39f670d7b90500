//! Stage contract and the context shared by all stages of one run.

use crate::engine::CancelToken;

use super::error_handler::{FirstError, PipelineError, fail_run};
use super::queue::{Inbound, Outbound};

/// Shared state of one run: cancellation and the first fatal error.
#[derive(Clone, Debug, Default)]
pub struct StageContext {
    pub cancel: CancelToken,
    pub first_error: FirstError,
}

impl StageContext {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            first_error: FirstError::default(),
        }
    }

    /// Record `err` as the run's failure and cancel everything still running.
    pub fn fail(&self, err: PipelineError) {
        fail_run(&self.first_error, &self.cancel, err);
    }
}

/// One step of a linear pipeline.
///
/// `run` reads `inbound` until it is closed and drained, does not return before every result
/// derived from an item it read has been sent on `outbound`, and closes `outbound` by dropping it
/// on the way out. Returns the number of items emitted.
pub trait Stage: Send {
    fn name(&self) -> &str;

    fn run(
        &self,
        ctx: &StageContext,
        inbound: Inbound,
        outbound: Outbound,
    ) -> Result<usize, PipelineError>;
}
