//! Signing runs: build the standard pipeline and turn its output into an artifact.

use anyhow::{Result, anyhow};
use log::debug;
use std::sync::Arc;
use std::time::Instant;

use crate::engine::{CancelToken, DigestSet, QuotaGate};
use crate::pipeline::{MultiHash, OrderedCombiner, Pipeline, SingleHash, collect_output};
use crate::{Opts, RunReport};

/// single-hash → multi-hash → combine, sharing one quota gate for the slow digest.
pub fn standard_pipeline(opts: &Opts, digests: &DigestSet, quota: &Arc<QuotaGate>) -> Pipeline {
    Pipeline::new()
        .queue_capacity(opts.effective_queue_capacity())
        .stage(SingleHash::stage(digests.clone(), Arc::clone(quota)))
        .stage(MultiHash::stage(digests.clone()))
        .stage(OrderedCombiner)
}

/// Run the standard pipeline over `items` and report the artifact and quota usage.
/// Fails (never returns a partial artifact) if any stage fails or `cancel` fires.
pub fn sign_items<I>(
    items: I,
    opts: &Opts,
    digests: DigestSet,
    cancel: CancelToken,
) -> Result<RunReport>
where
    I: IntoIterator + Send + 'static,
    I::Item: ToString,
{
    let start = Instant::now();
    let quota = Arc::new(QuotaGate::new(opts.effective_quota()));
    let pipeline = standard_pipeline(opts, &digests, &quota).cancel_token(cancel);
    debug!("stages: {}", pipeline.stage_names().join(" -> "));

    let (mut output, items) = collect_output(pipeline.start(items)?)?;
    if output.len() != 1 {
        return Err(anyhow!(
            "combiner produced {} values instead of exactly one",
            output.len()
        ));
    }
    let artifact = output.remove(0);

    let report = RunReport {
        artifact,
        items,
        quota: quota.capacity(),
        peak_slow_calls: quota.peak(),
        elapsed_ms: start.elapsed().as_millis(),
    };
    debug!(
        "signed {} items in {} ms (peak slow calls {}/{})",
        report.items, report.elapsed_ms, report.peak_slow_calls, report.quota
    );
    Ok(report)
}
