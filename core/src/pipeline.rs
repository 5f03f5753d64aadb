//! The compile command, end to end: compile, check the fit, then generate the
//! requested artifacts from the compiled model.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use rand::SeedableRng;
use srmc_tflite::TensorInfo;

use crate::codegen::{Codegen, resolver_header_name};
use crate::compiler::{CompileResult, Compiler, CompilerConfig, ToolRunner, model_stem};
use crate::encode::write_binary;
use crate::internal::*;
use crate::report::{MemoryLimits, PerformanceReport};
use crate::resolver::{ResolverSet, SupportedOperators};
use crate::tensor::{TensorData, load_input};
use crate::utils::expand_wildcards;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Model source, resolver header, companion binary.
    Model,
    /// Test vectors: inputs, expected outputs and their source file.
    Inout,
}

impl FromStr for Stage {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> SrmcResult<Stage> {
        match s {
            "model" => Ok(Stage::Model),
            "inout" => Ok(Stage::Inout),
            _ => bail!("Unknown stage `{s}' (expected model or inout)"),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Model => "model",
            Stage::Inout => "inout",
        })
    }
}

#[derive(Clone, Debug)]
pub struct CompileRequest {
    pub model: PathBuf,
    /// Scratch directory, removed before returning, when `None`.
    pub output_dir: Option<PathBuf>,
    pub compiler: CompilerConfig,
    pub limits: MemoryLimits,
    pub namespace: String,
    pub model_file_out: String,
    pub stages: Vec<Stage>,
    /// Input value files (`.npy` or `.bin`), wildcards allowed.
    pub inputs: Vec<String>,
    /// Expected output files, instead of running the reference interpreter.
    pub expected: Vec<String>,
    /// Runtime header the resolver must be checked against.
    pub verify_against: Option<PathBuf>,
}

impl Default for CompileRequest {
    fn default() -> CompileRequest {
        CompileRequest {
            model: PathBuf::new(),
            output_dir: None,
            compiler: CompilerConfig::default(),
            limits: MemoryLimits::default(),
            namespace: "model".to_string(),
            model_file_out: "model".to_string(),
            stages: vec![Stage::Model],
            inputs: vec![],
            expected: vec![],
            verify_against: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub result: CompileResult,
    pub report: PerformanceReport,
    /// Mapped onto the NPU and within the memory limits.
    pub success: bool,
    /// Operators of the compiled model, when the model stage ran.
    pub resolver: Option<ResolverSet>,
    pub artifacts: Vec<PathBuf>,
}

pub fn run_compile<R: ToolRunner>(compiler: &Compiler<R>, request: &CompileRequest) -> SrmcResult<PipelineOutput> {
    run_compile_with(compiler, request, |_, _| Ok(()))
}

/// Like `run_compile`, handing the performance report and fit to `on_report` as soon as
/// the compile is evaluated, before operator verification or any artifact is written.
pub fn run_compile_with<R: ToolRunner>(
    compiler: &Compiler<R>,
    request: &CompileRequest,
    mut on_report: impl FnMut(&PerformanceReport, bool) -> SrmcResult<()>,
) -> SrmcResult<PipelineOutput> {
    let model_path = fs::canonicalize(&request.model)?;
    let original = TfliteModel::open(&model_path)?;

    // removed on drop, whatever the exit path
    let scratch;
    let out_dir: &Path = match &request.output_dir {
        Some(dir) => dir,
        None => {
            scratch = tempfile::Builder::new().prefix("srmc-compile").tempdir()?;
            scratch.path()
        }
    };

    let result = compiler.compile(&model_path, out_dir, &request.compiler)?;
    let report = PerformanceReport::new(&result, request.limits);
    on_report(&report, report.fits)?;
    let mut output =
        PipelineOutput { success: report.fits, result, report, resolver: None, artifacts: vec![] };
    if !output.result.outcome.is_mapped() {
        warn!("{:?} did not compile for the NPU, no artifact generated", request.model);
        return Ok(output);
    }

    let compiled_path = &output.result.compiled_model;
    let compiled = TfliteModel::open(compiled_path).context("Reading compiled model")?;
    let resolver = ResolverSet::build([&compiled.operators()?]);
    if let Some(header) = &request.verify_against {
        resolver
            .ensure_supported(&SupportedOperators::load(header)?)
            .with_context(|| format!("Verifying operators of {compiled_path:?} against {header:?}"))?;
    }

    let stages = request.stages.iter().copied().unique().collect::<Vec<_>>();
    let codegen = Codegen::new()?;
    for stage in stages {
        info!("Running {stage} stage");
        match stage {
            Stage::Model => {
                model_stage(&codegen, request, &model_path, &compiled, &resolver, out_dir, &mut output)?
            }
            Stage::Inout => inout_stage(&codegen, request, &original, &model_path, out_dir, &mut output)?,
        }
    }
    Ok(output)
}

fn model_stage(
    codegen: &Codegen,
    request: &CompileRequest,
    model_path: &Path,
    compiled: &TfliteModel,
    resolver: &ResolverSet,
    out_dir: &Path,
    output: &mut PipelineOutput,
) -> SrmcResult<()> {
    let compiled_path = &output.result.compiled_model;
    let file_name = model_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let license_header = codegen.license_header(&file_name)?;
    let arena_cache_size = request.compiler.arena_cache_size.unwrap_or(0);
    let model_source = codegen.model_source(
        &license_header,
        &request.namespace,
        compiled.as_bytes(),
        arena_cache_size,
        &output.result.system_config,
    )?;
    let compiled_name = compiled_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let resolver_header = codegen.resolver_header(&license_header, &request.namespace, &compiled_name, resolver)?;

    let header_path = out_dir.join(resolver_header_name(&request.namespace));
    fs::write(&header_path, &resolver_header)?;
    let source_path = out_dir.join(format!("{}.cc", request.model_file_out));
    fs::write(&source_path, model_source + &resolver_header)?;
    let bin_path = out_dir.join(format!("{}.bin", model_stem(model_path)?));
    write_binary(&bin_path, compiled.as_bytes())?;
    info!("Wrote {source_path:?}, {header_path:?} and {bin_path:?}");

    output.artifacts.extend([source_path, header_path, bin_path]);
    output.resolver = Some(resolver.clone());
    Ok(())
}

fn inout_stage(
    codegen: &Codegen,
    request: &CompileRequest,
    original: &TfliteModel,
    model_path: &Path,
    out_dir: &Path,
    output: &mut PipelineOutput,
) -> SrmcResult<()> {
    let original_ops = ResolverSet::build([&original.operators()?]);
    if let Some(op) = original_ops.npu_custom_op() {
        warn!("{op} found in the model, skipping expected output generation");
        return Ok(());
    }
    let (input_infos, output_infos) = original.io()?;

    let input_files = expand_wildcards(&request.inputs)?;
    let mut rng = rand::rngs::SmallRng::from_entropy();
    let mut inputs = vec![];
    for (ix, info) in input_infos.iter().enumerate() {
        let loaded = match input_files.get(ix) {
            Some(path) => load_input(path, info)?,
            None => None,
        };
        let data = match loaded {
            Some(data) => data,
            None => {
                info!("Generating random {} values for input {ix} ({:?})", info.element_type, info.name);
                TensorData::random(info.element_type, &info.shape, &mut rng)
                    .with_context(|| format!("Generating input {:?}", info.name))?
            }
        };
        inputs.push(data);
    }

    let outputs = if request.expected.is_empty() {
        expected_outputs(model_path, &inputs)?
    } else {
        let files = expand_wildcards(&request.expected)?;
        ensure!(
            files.len() == output_infos.len(),
            "Model has {} outputs, {} expected value files given",
            output_infos.len(),
            files.len()
        );
        files.iter().zip(&output_infos).map(|(path, info)| load_expected(path, info)).collect::<SrmcResult<_>>()?
    };

    for (ix, data) in inputs.iter().enumerate() {
        data.write_capture(out_dir, "input", ix)?;
    }
    for (ix, data) in outputs.iter().enumerate() {
        data.write_capture(out_dir, "output", ix)?;
    }
    let file_name = model_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let license_header = codegen.license_header(&file_name)?;
    let io_path = out_dir.join(format!("{}_io.cc", request.namespace));
    fs::write(&io_path, codegen.io_source(&license_header, &request.namespace, &inputs, &outputs)?)?;
    info!("Wrote {io_path:?}");
    output.artifacts.push(io_path);
    Ok(())
}

fn load_expected(path: &Path, info: &TensorInfo) -> SrmcResult<TensorData> {
    match load_input(path, info)? {
        Some(data) => Ok(data),
        None => bail!("{path:?} does not hold the {} values of output {:?}", info.len(), info.name),
    }
}

#[cfg(feature = "reference")]
fn expected_outputs(model: &Path, inputs: &[TensorData]) -> SrmcResult<Vec<TensorData>> {
    crate::reference::run_reference(model, inputs)
}

#[cfg(not(feature = "reference"))]
fn expected_outputs(_model: &Path, _inputs: &[TensorData]) -> SrmcResult<Vec<TensorData>> {
    bail!("Expected outputs need the `reference` feature or expected value files")
}
