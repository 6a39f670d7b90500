//! Hash primitives consumed by the pipeline: a cheap freely concurrent digest (CRC32)
//! and a slow digest (MD5) that callers must gate through the quota.

use anyhow::{Result, bail};
use md5::{Digest as _, Md5};
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::Opts;

/// A black-box string digest. Implementations must be callable from many threads at once;
/// any concurrency restriction is enforced by the caller (see [`QuotaGate`](crate::engine::QuotaGate)).
pub trait HashPrimitive: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn digest(&self, input: &str) -> Result<String>;
}

/// CRC32 (IEEE) rendered as an unsigned decimal.
#[derive(Clone, Copy, Debug, Default)]
pub struct Crc32Digest;

impl HashPrimitive for Crc32Digest {
    fn name(&self) -> &str {
        "crc32"
    }

    fn digest(&self, input: &str) -> Result<String> {
        Ok(crc32fast::hash(input.as_bytes()).to_string())
    }
}

/// MD5 rendered as lowercase hex.
#[derive(Clone, Copy, Debug, Default)]
pub struct Md5Digest;

impl HashPrimitive for Md5Digest {
    fn name(&self) -> &str {
        "md5"
    }

    fn digest(&self, input: &str) -> Result<String> {
        let out = Md5::digest(input.as_bytes());
        let mut hex = String::with_capacity(out.len() * 2);
        for b in out.iter() {
            let _ = write!(hex, "{b:02x}");
        }
        Ok(hex)
    }
}

/// Adds a fixed latency before delegating. Used to reproduce the cost of a remote primitive.
pub struct Delayed<H> {
    inner: H,
    delay: Duration,
}

impl<H: HashPrimitive> Delayed<H> {
    pub fn new(inner: H, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl<H: HashPrimitive> HashPrimitive for Delayed<H> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn digest(&self, input: &str) -> Result<String> {
        std::thread::sleep(self.delay);
        self.inner.digest(input)
    }
}

/// Fails instead of computing when entered while another call is still in progress.
/// Wrap the slow primitive in this to turn a broken quota into a hard error ("overheat").
pub struct Exclusive<H> {
    inner: H,
    busy: AtomicBool,
}

impl<H: HashPrimitive> Exclusive<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            busy: AtomicBool::new(false),
        }
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<H: HashPrimitive> HashPrimitive for Exclusive<H> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn digest(&self, input: &str) -> Result<String> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            bail!("{} overheated: entered while another call was in flight", self.name());
        }
        let _guard = BusyGuard(&self.busy);
        self.inner.digest(input)
    }
}

/// Closure-backed primitive, handy for delay and failure injection.
pub struct FnDigest<F> {
    name: &'static str,
    f: F,
}

impl<F> FnDigest<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> HashPrimitive for FnDigest<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        self.name
    }

    fn digest(&self, input: &str) -> Result<String> {
        (self.f)(input)
    }
}

/// The two primitives a pipeline run uses.
#[derive(Clone)]
pub struct DigestSet {
    pub fast: Arc<dyn HashPrimitive>,
    pub slow: Arc<dyn HashPrimitive>,
}

impl DigestSet {
    pub fn new(fast: impl HashPrimitive + 'static, slow: impl HashPrimitive + 'static) -> Self {
        Self {
            fast: Arc::new(fast),
            slow: Arc::new(slow),
        }
    }

    /// CRC32 fast, MD5 slow, no simulated latency.
    pub fn standard() -> Self {
        Self::new(Crc32Digest, Md5Digest)
    }

    /// Standard primitives with the latency and exclusivity settings from `opts`.
    pub fn from_opts(opts: &Opts) -> Self {
        let fast: Arc<dyn HashPrimitive> = match opts.fast_latency_ms {
            0 => Arc::new(Crc32Digest),
            ms => Arc::new(Delayed::new(Crc32Digest, Duration::from_millis(ms))),
        };
        let slow: Arc<dyn HashPrimitive> = match (opts.slow_latency_ms, opts.exclusive) {
            (0, false) => Arc::new(Md5Digest),
            (0, true) => Arc::new(Exclusive::new(Md5Digest)),
            (ms, false) => Arc::new(Delayed::new(Md5Digest, Duration::from_millis(ms))),
            (ms, true) => Arc::new(Exclusive::new(Delayed::new(
                Md5Digest,
                Duration::from_millis(ms),
            ))),
        };
        Self { fast, slow }
    }
}

impl Default for DigestSet {
    fn default() -> Self {
        Self::standard()
    }
}
