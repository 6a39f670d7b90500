use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::engine::CancelToken;

/// Fatal conditions of a pipeline run. Any of them fails the whole run; no partial artifact is returned.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{digest} failed on input {input:?}: {reason}")]
    ExternalCallFailure {
        digest: String,
        input: String,
        reason: String,
    },
    #[error("pipeline cancelled")]
    Cancelled,
    #[error("downstream queue of stage {stage} closed before all results were sent")]
    DownstreamClosed { stage: String },
    #[error("{worker} panicked")]
    WorkerPanicked { worker: String },
    #[error("could not spawn {worker}: {reason}")]
    Spawn { worker: String, reason: String },
}

impl PipelineError {
    pub fn external(digest: &str, input: &str, err: &anyhow::Error) -> Self {
        Self::ExternalCallFailure {
            digest: digest.to_string(),
            input: input.to_string(),
            reason: format!("{err:#}"),
        }
    }

    pub fn spawn(worker: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Spawn {
            worker: worker.into(),
            reason: err.to_string(),
        }
    }

    /// Errors that are a consequence of another failure (or of a cancel) rather than a cause.
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DownstreamClosed { .. })
    }
}

/// First fatal error of a run, shared by every stage and worker. First writer wins, except that
/// a root cause replaces a secondary error recorded while it was still propagating.
#[derive(Clone, Debug, Default)]
pub struct FirstError(Arc<Mutex<Option<PipelineError>>>);

impl FirstError {
    fn lock(&self) -> MutexGuard<'_, Option<PipelineError>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `err` unless a root cause is already stored.
    pub fn record(&self, err: PipelineError) {
        let mut slot = self.lock();
        let replace = match slot.as_ref() {
            None => true,
            Some(prev) => prev.is_secondary() && !err.is_secondary(),
        };
        if replace {
            log::debug!("first pipeline error: {}", err);
            *slot = Some(err);
        }
    }

    pub fn is_set(&self) -> bool {
        self.lock().is_some()
    }

    pub fn take(&self) -> Option<PipelineError> {
        self.lock().take()
    }
}

/// Record `err` as the run's failure (if first) and trip `cancel` so every blocked point unwinds.
pub fn fail_run(first_error: &FirstError, cancel: &CancelToken, err: PipelineError) {
    first_error.record(err);
    cancel.cancel();
}

/// Check the run result after joining every thread: the recorded error, if any, wins.
pub fn check_for_first_error(first_error: &FirstError) -> anyhow::Result<()> {
    match first_error.take() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_writer_wins() {
        let first = FirstError::default();
        let cancel = CancelToken::new();
        fail_run(
            &first,
            &cancel,
            PipelineError::WorkerPanicked {
                worker: "a".into(),
            },
        );
        fail_run(&first, &cancel, PipelineError::Cancelled);
        assert!(cancel.is_cancelled());
        assert_eq!(
            first.take(),
            Some(PipelineError::WorkerPanicked {
                worker: "a".into()
            })
        );
    }

    #[test]
    fn test_root_cause_replaces_downstream_closed() {
        let first = FirstError::default();
        first.record(PipelineError::DownstreamClosed {
            stage: "up".into(),
        });
        first.record(PipelineError::Spawn {
            worker: "w".into(),
            reason: "no threads".into(),
        });
        first.record(PipelineError::Cancelled);
        assert!(matches!(first.take(), Some(PipelineError::Spawn { .. })));
    }

    #[test]
    fn test_check_surfaces_typed_error() {
        let first = FirstError::default();
        assert!(check_for_first_error(&first).is_ok());
        first.record(PipelineError::Cancelled);
        let err = check_for_first_error(&first).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PipelineError>(),
            Some(&PipelineError::Cancelled)
        );
    }
}
