//! Signer: staged concurrent hashing pipeline with a rate-limited digest and a deterministic combiner

pub mod engine;
pub mod pipeline;
pub mod sign;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use engine::{CancelToken, DigestSet};

/// Result alias used by public signer API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Sign `items` with default options and the standard digests (CRC32 fast, MD5 slow).
///
/// Each item goes through single-hash, then multi-hash; the results are sorted and joined with
/// `_`. An empty input yields `""`.
pub fn sign<I>(items: I) -> Result<String>
where
    I: IntoIterator + Send + 'static,
    I::Item: ToString,
{
    sign_with_opts(items, &SignerOpts::default())
}

/// Like [`sign`], with explicit quota and queue sizing.
pub fn sign_with_opts<I>(items: I, opts: &SignerOpts) -> Result<String>
where
    I: IntoIterator + Send + 'static,
    I::Item: ToString,
{
    let opts = Opts::from(opts);
    let report = sign::sign_items(items, &opts, DigestSet::standard(), CancelToken::new())?;
    Ok(report.artifact)
}

/// Full entry point: caller-supplied digests and cancel token, returns a [`RunReport`].
///
/// ```ignore
/// let cancel = signer::engine::CancelToken::new();
/// let report = signer::sign_with_digests(vec!["0"], &Opts::default(), DigestSet::standard(), cancel)?;
/// assert_eq!(report.peak_slow_calls, 1);
/// ```
pub fn sign_with_digests<I>(
    items: I,
    opts: &Opts,
    digests: DigestSet,
    cancel: CancelToken,
) -> Result<RunReport>
where
    I: IntoIterator + Send + 'static,
    I::Item: ToString,
{
    sign::sign_items(items, opts, digests, cancel)
}
