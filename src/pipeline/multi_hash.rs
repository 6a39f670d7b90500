//! Second stage: K indexed sub-digests per item, concatenated in index order.

use std::thread;

use crate::engine::{CancelToken, DigestSet};
use crate::utils::config::HashLayout;

use super::error_handler::PipelineError;
use super::fanout::{FanoutRunner, ItemWork};
use super::single_hash::call_digest;

pub const MULTI_HASH_STAGE: &str = "multi-hash";

pub struct MultiHash {
    digests: DigestSet,
    width: usize,
}

impl MultiHash {
    pub fn new(digests: DigestSet) -> Self {
        Self::with_width(digests, HashLayout::MULTI_HASH_WIDTH)
    }

    pub fn with_width(digests: DigestSet, width: usize) -> Self {
        Self { digests, width }
    }

    pub fn stage(digests: DigestSet) -> FanoutRunner<Self> {
        FanoutRunner::new(MULTI_HASH_STAGE, Self::new(digests))
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl ItemWork for MultiHash {
    fn process(&self, item: &str, cancel: &CancelToken) -> Result<String, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let fast = self.digests.fast.as_ref();
        // Handles are joined in spawn order, so parts[i] is sub-digest i whatever finished first.
        let parts: Vec<Result<String, PipelineError>> = thread::scope(|s| {
            let handles: Vec<_> = (0..self.width)
                .map(|i| s.spawn(move || call_digest(fast, &format!("{i}{item}"))))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(i, h)| {
                    h.join().unwrap_or_else(|_| {
                        Err(PipelineError::WorkerPanicked {
                            worker: format!("{MULTI_HASH_STAGE} sub-digest {i}"),
                        })
                    })
                })
                .collect()
        });
        let parts = parts.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(parts.concat())
    }
}
