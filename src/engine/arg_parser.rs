use clap::Parser;

/// Staged concurrent hashing pipeline.
#[derive(Clone, Parser)]
#[command(name = "signer")]
#[command(about = "Sign items through single-hash -> multi-hash -> combine; prints the combined artifact.")]
pub struct Cli {
    /// Items to sign. When omitted, one item per line is read from stdin.
    #[arg(value_name = "ITEMS")]
    pub items: Vec<String>,

    /// Maximum concurrent slow-digest (MD5) calls.
    #[arg(long, short = 'q', value_parser = clap::value_parser!(usize))]
    pub quota: Option<usize>,

    /// Capacity of each queue between stages.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub queue_capacity: Option<usize>,

    /// Simulated latency per fast-digest (CRC32) call, in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub fast_latency_ms: Option<u64>,

    /// Simulated latency per slow-digest (MD5) call, in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub slow_latency_ms: Option<u64>,

    /// Fail if the slow digest is ever entered concurrently.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub exclusive: Option<bool>,

    /// Print a JSON report (artifact, item count, peak slow calls, elapsed ms).
    #[arg(long, short = 'j', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
