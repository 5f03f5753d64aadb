//! Error taxonomy of the pipeline.
//!
//! Everything fallible returns `SrmcResult`. The typed errors below travel inside the
//! `anyhow::Error` so a caller can tell a malformed model from an unsupported operator
//! set from a plain I/O failure. A compiler that ran but could not map the model is not
//! an error: see `compiler::CompileOutcome`.

use std::path::PathBuf;

pub use srmc_tflite::ParseError;

pub type SrmcResult<T> = anyhow::Result<T>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Operators not supported by the target runtime: {}", .0.join(", "))]
    UnsupportedOperators(Vec<String>),
    #[error("Unknown system configuration `{0}'")]
    UnknownSystemConfig(String),
    #[error("Invalid profile {path:?}: {reason}")]
    InvalidProfile { path: PathBuf, reason: String },
}

/// Broad classes used to pick a process exit status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Parse,
    UnsupportedOperator,
    Other,
}

impl ErrorClass {
    pub fn of(error: &anyhow::Error) -> ErrorClass {
        for cause in error.chain() {
            if cause.downcast_ref::<ParseError>().is_some() {
                return ErrorClass::Parse;
            }
            if let Some(PipelineError::UnsupportedOperators(_)) = cause.downcast_ref::<PipelineError>() {
                return ErrorClass::UnsupportedOperator;
            }
        }
        ErrorClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn classes_survive_context() {
        let e: anyhow::Error = PipelineError::UnsupportedOperators(vec!["AddFoo".into()]).into();
        let e = Err::<(), _>(e).context("Generating resolver").unwrap_err();
        assert_eq!(ErrorClass::of(&e), ErrorClass::UnsupportedOperator);
        assert!(e.root_cause().to_string().contains("AddFoo"));

        let e = srmc_tflite::extract_operators(b"junk").context("Reading model").unwrap_err();
        assert_eq!(ErrorClass::of(&e), ErrorClass::Parse);

        let e = fs_err::read("/definitely/not/here.tflite").map_err(anyhow::Error::from).unwrap_err();
        assert_eq!(ErrorClass::of(&e), ErrorClass::Other);
    }
}
