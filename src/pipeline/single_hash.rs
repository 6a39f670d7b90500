//! First stage: `fast(item) ~ fast(slow(item))`, the slow call gated by the quota.

use std::sync::Arc;
use std::thread;

use crate::engine::{CancelToken, DigestSet, HashPrimitive, QuotaGate};
use crate::utils::config::HashLayout;

use super::error_handler::PipelineError;
use super::fanout::{FanoutRunner, ItemWork};

pub const SINGLE_HASH_STAGE: &str = "single-hash";

pub struct SingleHash {
    digests: DigestSet,
    quota: Arc<QuotaGate>,
}

impl SingleHash {
    pub fn new(digests: DigestSet, quota: Arc<QuotaGate>) -> Self {
        Self { digests, quota }
    }

    /// Wrap in the fan-out runner, ready to be added to a pipeline.
    pub fn stage(digests: DigestSet, quota: Arc<QuotaGate>) -> FanoutRunner<Self> {
        FanoutRunner::new(SINGLE_HASH_STAGE, Self::new(digests, quota))
    }

    /// Right facet. The permit covers the slow call only, never the fast one that follows.
    fn slow_then_fast(&self, item: &str, cancel: &CancelToken) -> Result<String, PipelineError> {
        let slow = self
            .quota
            .with_permit(cancel, || call_digest(self.digests.slow.as_ref(), item))??;
        call_digest(self.digests.fast.as_ref(), &slow)
    }
}

impl ItemWork for SingleHash {
    fn process(&self, item: &str, cancel: &CancelToken) -> Result<String, PipelineError> {
        let (left, right) = thread::scope(|s| {
            let left = s.spawn(|| call_digest(self.digests.fast.as_ref(), item));
            let right = self.slow_then_fast(item, cancel);
            (left.join(), right)
        });
        let left = left.map_err(|_| PipelineError::WorkerPanicked {
            worker: format!("{SINGLE_HASH_STAGE} fast facet"),
        })??;
        let right = right?;
        Ok(format!("{left}{}{right}", HashLayout::FACET_SEPARATOR))
    }
}

/// Call an external primitive, mapping its failure into the pipeline taxonomy.
pub(crate) fn call_digest(h: &dyn HashPrimitive, input: &str) -> Result<String, PipelineError> {
    h.digest(input)
        .map_err(|e| PipelineError::external(h.name(), input, &e))
}
