//! Engine module: leaf primitives (digests, quota, cancellation) and CLI plumbing

pub mod arg_parser;
pub mod cancel;
pub mod cli;
pub mod hashing;
pub mod quota;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use cancel::CancelToken;
pub use cli::handle_run;
pub use hashing::{
    Crc32Digest, Delayed, DigestSet, Exclusive, FnDigest, HashPrimitive, Md5Digest,
};
pub use quota::{QuotaGate, QuotaPermit};
