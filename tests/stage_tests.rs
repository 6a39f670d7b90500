use signer::engine::{CancelToken, Crc32Digest, DigestSet, FnDigest, HashPrimitive, Md5Digest};
use signer::pipeline::{
    Inbound, ItemWork, MultiHash, OrderedCombiner, Outbound, Pipeline, PipelineError, Stage,
    StageContext, recv_or_cancel, send_or_cancel,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

const WIDTH: usize = 6;

/// Pass-through stage that counts what it forwards.
struct Forward {
    name: &'static str,
    seen: Arc<AtomicUsize>,
}

impl Stage for Forward {
    fn name(&self) -> &str {
        self.name
    }

    fn run(
        &self,
        ctx: &StageContext,
        inbound: Inbound,
        outbound: Outbound,
    ) -> Result<usize, PipelineError> {
        let mut n = 0;
        while let Some(item) = recv_or_cancel(&inbound, &ctx.cancel)? {
            send_or_cancel(&outbound, item, &ctx.cancel, self.name)?;
            n += 1;
        }
        self.seen.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }
}

/// Stage that fails on its first item.
struct Broken;

impl Stage for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn run(
        &self,
        ctx: &StageContext,
        inbound: Inbound,
        _outbound: Outbound,
    ) -> Result<usize, PipelineError> {
        match recv_or_cancel(&inbound, &ctx.cancel)? {
            Some(item) => Err(PipelineError::ExternalCallFailure {
                digest: "broken".into(),
                input: item,
                reason: "always fails".into(),
            }),
            None => Ok(0),
        }
    }
}

fn expected_multi(item: &str) -> String {
    (0..WIDTH)
        .map(|i| Crc32Digest.digest(&format!("{i}{item}")).unwrap())
        .collect()
}

// --- index order ---

#[test]
fn test_multi_hash_index_order_with_reversed_completion() {
    let finished = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = Arc::clone(&finished);
    // Sub-digest i sleeps (WIDTH - i) * 15 ms, so the last index completes first.
    let fast = FnDigest::new("crc32", move |s: &str| {
        let idx = s[..1].parse::<u64>().unwrap_or(0);
        thread::sleep(Duration::from_millis((WIDTH as u64 - idx) * 15));
        log.lock().unwrap().push(idx);
        Crc32Digest.digest(s)
    });
    let work = MultiHash::with_width(DigestSet::new(fast, Md5Digest), WIDTH);

    let item = "4108050209~502633748";
    let got = work.process(item, &CancelToken::new()).unwrap();
    assert_eq!(got, expected_multi(item));

    let order = finished.lock().unwrap().clone();
    assert_eq!(order.first(), Some(&(WIDTH as u64 - 1)));
    assert_eq!(order.last(), Some(&0));
}

#[test]
fn test_multi_hash_failure_in_one_index_fails_item() {
    let fast = FnDigest::new("crc32", |s: &str| {
        if s.starts_with('3') {
            anyhow::bail!("index 3 failed");
        }
        Crc32Digest.digest(s)
    });
    let work = MultiHash::new(DigestSet::new(fast, Md5Digest));
    let err = work.process("x", &CancelToken::new()).unwrap_err();
    assert!(matches!(err, PipelineError::ExternalCallFailure { ref input, .. } if input == "3x"));
}

// --- executor ---

#[test]
fn test_no_stages_passes_producer_through() {
    let out = Pipeline::new().run(vec!["a", "b"]).unwrap();
    assert_eq!(out, vec!["a", "b"]);
}

#[test]
fn test_stages_forward_every_item_through_tiny_queues() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let out = Pipeline::new()
        .queue_capacity(1)
        .stage(Forward {
            name: "first",
            seen: Arc::clone(&first),
        })
        .stage(Forward {
            name: "second",
            seen: Arc::clone(&second),
        })
        .run(0..500)
        .unwrap();
    assert_eq!(out.len(), 500);
    assert_eq!(out[0], "0");
    assert_eq!(first.load(Ordering::SeqCst), 500);
    assert_eq!(second.load(Ordering::SeqCst), 500);
}

#[test]
fn test_combiner_as_only_stage() {
    let out = Pipeline::new()
        .stage(OrderedCombiner)
        .run(vec!["b", "c", "a"])
        .unwrap();
    assert_eq!(out, vec!["a_b_c"]);
}

#[test]
fn test_combiner_with_no_input_emits_empty_string() {
    let out = Pipeline::new()
        .stage(OrderedCombiner)
        .run(Vec::<String>::new())
        .unwrap();
    assert_eq!(out, vec![String::new()]);
}

#[test]
fn test_failing_stage_unwinds_whole_pipeline() {
    let seen = Arc::new(AtomicUsize::new(0));
    let err = Pipeline::new()
        .queue_capacity(2)
        .stage(Forward {
            name: "before",
            seen: Arc::clone(&seen),
        })
        .stage(Broken)
        .stage(OrderedCombiner)
        .run(0..1000)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::ExternalCallFailure { .. })
    ));
}

#[test]
fn test_stage_names_in_order() {
    let p = Pipeline::new()
        .stage(MultiHash::stage(DigestSet::standard()))
        .stage(OrderedCombiner);
    assert_eq!(p.stage_names(), vec!["multi-hash", "combine"]);
}
