//! Application configuration constants.
//! Tuning, separators and widths in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    /// Name of the optional per-directory config file (e.g. `.signer.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Queues ----

/// Capacity of every hand-off queue between stages (and before/after the pipeline).
pub const QUEUE_CAPACITY: usize = 100;

/// How long a blocked queue or quota operation waits before re-checking the cancel token.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

// ---- Rate limit ----

/// Default number of concurrent slow-digest calls allowed process-wide.
pub const QUOTA_CAPACITY: usize = 1;

// ---- Hash layout ----

/// Hash layout constants shared by the stages and the combiner.
pub struct HashLayout;

impl HashLayout {
    /// Number of indexed sub-digests computed per item by the multi-hash stage.
    pub const MULTI_HASH_WIDTH: usize = 6;
    /// Joins the two facets of a single-hash result (`fast~fast(slow)`).
    pub const FACET_SEPARATOR: &'static str = "~";
    /// Joins the sorted terminal results into the final artifact.
    pub const ARTIFACT_SEPARATOR: &'static str = "_";
}
