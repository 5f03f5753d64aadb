//! Read-only TFLite model introspection.
//!
//! This crate never runs a model. It decodes just enough of the flatbuffer container
//! to list the operators a model needs and the tensors it consumes and produces.

#[macro_use]
extern crate log;

mod builtin;
mod element_type;
mod model;
pub mod schema;
pub mod writer;

pub use crate::builtin::BuiltinOperator;
pub use crate::element_type::ElementType;
pub use crate::model::{OperatorCode, TensorInfo, TfliteModel, describe_io, extract_operators};

pub use anyhow;

pub type TfliteResult<T> = anyhow::Result<T>;

/// The byte buffer is not a well-formed TFLite model.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Not a valid TFLite flatbuffer: {0}")]
    Flatbuffer(#[from] flatbuffers::InvalidFlatbuffer),
    #[error("Malformed TFLite model: {0}")]
    Malformed(String),
}
