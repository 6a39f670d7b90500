//! Terminal stage: collect everything, sort, join into one artifact.

use log::debug;

use crate::utils::config::HashLayout;

use super::error_handler::PipelineError;
use super::queue::{Inbound, Outbound, recv_or_cancel, send_or_cancel};
use super::stage::{Stage, StageContext};

pub const COMBINE_STAGE: &str = "combine";

/// Sort `results` by byte order and join them with `_`. Empty input gives `""`.
pub fn combine_results(mut results: Vec<String>) -> String {
    results.sort_unstable();
    results.join(HashLayout::ARTIFACT_SEPARATOR)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OrderedCombiner;

impl Stage for OrderedCombiner {
    fn name(&self) -> &str {
        COMBINE_STAGE
    }

    fn run(
        &self,
        ctx: &StageContext,
        inbound: Inbound,
        outbound: Outbound,
    ) -> Result<usize, PipelineError> {
        let mut results = Vec::new();
        while let Some(item) = recv_or_cancel(&inbound, &ctx.cancel)? {
            results.push(item);
        }
        debug!("{}: inbound closed, combining {} results", COMBINE_STAGE, results.len());
        send_or_cancel(&outbound, combine_results(results), &ctx.cancel, COMBINE_STAGE)?;
        drop(outbound);
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::queue::queue;

    #[test]
    fn test_combine_sorts_lexicographically() {
        let got = combine_results(vec!["b".into(), "a10".into(), "a2".into()]);
        assert_eq!(got, "a10_a2_b");
    }

    #[test]
    fn test_combine_keeps_duplicates() {
        assert_eq!(combine_results(vec!["x".into(), "x".into()]), "x_x");
    }

    #[test]
    fn test_combine_empty() {
        assert_eq!(combine_results(Vec::new()), "");
    }

    #[test]
    fn test_combiner_stage_emits_exactly_one() {
        let ctx = StageContext::default();
        let (in_tx, in_rx) = queue(4);
        let (out_tx, out_rx) = queue(4);
        in_tx.send("2".into()).unwrap();
        in_tx.send("1".into()).unwrap();
        drop(in_tx);
        assert_eq!(OrderedCombiner.run(&ctx, in_rx, out_tx).unwrap(), 1);
        let out: Vec<String> = out_rx.iter().collect();
        assert_eq!(out, vec!["1_2".to_string()]);
    }
}
