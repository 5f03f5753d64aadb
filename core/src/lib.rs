//! # srmc-core
//!
//! Turns a TFLite model into the artifacts an SR100 firmware build embeds: the model
//! compiled for the NPU, a minimal operator resolver, and optional test vectors.
//!
//! ```no_run
//! use srmc_core::prelude::*;
//!
//! # fn main() -> SrmcResult<()> {
//! let compiler = Compiler::new(SystemToolRunner, ProfileCatalog::builtin()?);
//! let fit = find_fit(&compiler, "model.tflite", MemoryLimits::default(), OptimizeGoal::Size)?;
//! println!("{}", fit.report);
//! # Ok(())
//! # }
//! ```
//!
//! The NPU compiler itself (Vela) is an external program: this crate only builds its
//! command line and reads back its log and summary report.

#[macro_use]
extern crate log;

pub mod catalog;
pub mod codegen;
pub mod compiler;
pub mod encode;
pub mod errors;
pub mod optimizer;
pub mod pipeline;
#[cfg(feature = "reference")]
pub mod reference;
pub mod report;
pub mod resolver;
pub mod summary;
pub mod tensor;
pub mod utils;

pub use srmc_tflite;

pub mod prelude {
    pub use crate::catalog::{ProfileCatalog, SystemConfig};
    pub use crate::compiler::{
        CompileMetrics, CompileOutcome, CompileResult, Compiler, CompilerConfig, OptimizeGoal,
        SystemToolRunner, ToolOutput, ToolRunner,
    };
    pub use crate::errors::{ErrorClass, ParseError, PipelineError, SrmcResult};
    pub use crate::optimizer::{FitResult, find_fit};
    pub use crate::pipeline::{CompileRequest, PipelineOutput, Stage, run_compile, run_compile_with};
    pub use crate::report::{MemoryLimits, MemoryTier, PerformanceReport};
    pub use crate::resolver::{ResolverSet, SupportedOperators, normalize};
    pub use srmc_tflite::{OperatorCode, TfliteModel};
}

pub mod internal {
    pub use crate::prelude::*;
    pub use anyhow::{Context, bail, ensure, format_err};
    pub use fs_err as fs;
    pub use std::path::{Path, PathBuf};
}
