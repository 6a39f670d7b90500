//! Pipeline components: queues, stage contract, fan-out runner, the hashing stages, combiner, executor.

pub mod combine;
pub mod error_handler;
pub mod executor;
pub mod fanout;
pub mod multi_hash;
pub mod queue;
pub mod single_hash;
pub mod stage;

pub use combine::{COMBINE_STAGE, OrderedCombiner, combine_results};
pub use error_handler::{FirstError, PipelineError, check_for_first_error, fail_run};
pub use executor::{Pipeline, PipelineHandles, collect_output};
pub use fanout::{FanoutRunner, ItemWork};
pub use multi_hash::{MULTI_HASH_STAGE, MultiHash};
pub use queue::{Inbound, Outbound, queue, recv_or_cancel, send_or_cancel};
pub use single_hash::{SINGLE_HASH_STAGE, SingleHash};
pub use stage::{Stage, StageContext};
