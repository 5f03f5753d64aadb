//! Vela invocation.
//!
//! The compiler runs as an external process behind the `ToolRunner` seam. A run that
//! fails or that cannot map the model is data (`CompileOutcome`), not an error: only
//! failing to spawn the tool or to read and write files is.

use std::fmt;
use std::str::FromStr;

use crate::catalog::ProfileCatalog;
use crate::internal::*;
use crate::summary::{Summary, read_summary};

pub const VELA: &str = "vela";

/// Exit status and captured streams of an external program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Both streams, the way they are logged: stdout, a newline, stderr.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

pub trait ToolRunner {
    fn run(&self, program: &str, args: &[String]) -> SrmcResult<ToolOutput>;
}

impl<R: ToolRunner + ?Sized> ToolRunner for &R {
    fn run(&self, program: &str, args: &[String]) -> SrmcResult<ToolOutput> {
        (**self).run(program, args)
    }
}

/// Spawns the program for real and waits for it.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, program: &str, args: &[String]) -> SrmcResult<ToolOutput> {
        let mut cmd = std::process::Command::new(program);
        cmd.args(args);
        info!("Running {cmd:?}");
        let output = cmd.output().with_context(|| format!("Spawning `{program}'"))?;
        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub enum OptimizeGoal {
    Performance,
    #[default]
    Size,
}

impl fmt::Display for OptimizeGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for OptimizeGoal {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> SrmcResult<OptimizeGoal> {
        match s.to_ascii_lowercase().as_str() {
            "performance" => Ok(OptimizeGoal::Performance),
            "size" => Ok(OptimizeGoal::Size),
            _ => bail!("Unknown optimisation goal `{s}' (expected Performance or Size)"),
        }
    }
}

/// One compile's settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
    pub accelerator: String,
    pub goal: OptimizeGoal,
    /// Defaults to the last memory mode of the system configuration's profile.
    pub memory_mode: Option<String>,
    pub arena_cache_size: Option<u64>,
    pub system_config: String,
    pub verbose_cycle_estimate: bool,
    pub verbose_all: bool,
}

impl Default for CompilerConfig {
    fn default() -> CompilerConfig {
        CompilerConfig {
            accelerator: "ethos-u55-128".to_string(),
            goal: OptimizeGoal::Size,
            memory_mode: None,
            arena_cache_size: Some(1024000),
            system_config: "sr100_npu_400MHz_all_vmem".to_string(),
            verbose_cycle_estimate: false,
            verbose_all: false,
        }
    }
}

/// Figures read back from the summary report. Memory sizes are in bytes.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CompileMetrics {
    pub core_clock: f64,
    pub cycles_npu: u64,
    pub inferences_per_second: f64,
    pub inference_time: f64,
    pub off_chip_flash_memory_used: u64,
    pub sram_memory_used: u64,
    pub arena_cache_size: u64,
}

impl CompileMetrics {
    pub fn from_summary(summary: &Summary) -> SrmcResult<CompileMetrics> {
        let kib = |column: &str| -> SrmcResult<u64> { Ok((summary.number(column)? * 1024.0) as u64) };
        Ok(CompileMetrics {
            core_clock: summary.number("core_clock")?,
            cycles_npu: summary.number("cycles_npu")? as u64,
            inferences_per_second: summary.number("inferences_per_second")?,
            inference_time: summary.number("inference_time")?,
            off_chip_flash_memory_used: kib("off_chip_flash_memory_used")?,
            sram_memory_used: kib("sram_memory_used")?,
            arena_cache_size: kib("arena_cache_size")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CompileOutcome {
    Mapped(CompileMetrics),
    /// The tool ran but produced no usable estimate, e.g. a float model.
    Unmappable,
    /// The tool exited with a failure status.
    ToolError { status: Option<i32> },
}

impl CompileOutcome {
    /// NPU cycle estimate, 0 for any failed compile.
    pub fn cycles_npu(&self) -> u64 {
        match self {
            CompileOutcome::Mapped(m) => m.cycles_npu,
            _ => 0,
        }
    }

    pub fn metrics(&self) -> Option<&CompileMetrics> {
        match self {
            CompileOutcome::Mapped(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.metrics().is_some()
    }
}

#[derive(Clone, Debug)]
pub struct CompileResult {
    pub outcome: CompileOutcome,
    pub system_config: String,
    pub log: String,
    pub log_file: PathBuf,
    /// Where the tool writes the compiled model. Only meaningful when mapped.
    pub compiled_model: PathBuf,
    pub summary: Option<Summary>,
}

pub struct Compiler<R: ToolRunner = SystemToolRunner> {
    runner: R,
    catalog: ProfileCatalog,
    program: String,
}

impl<R: ToolRunner> Compiler<R> {
    pub fn new(runner: R, catalog: ProfileCatalog) -> Compiler<R> {
        Compiler { runner, catalog, program: VELA.to_string() }
    }

    pub fn with_program(self, program: impl Into<String>) -> Compiler<R> {
        Compiler { program: program.into(), ..self }
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn command_line(&self, model: &Path, out_dir: &Path, config: &CompilerConfig) -> SrmcResult<Vec<String>> {
        let system = self.catalog.get(&config.system_config)?;
        let memory_mode = match &config.memory_mode {
            Some(mode) => {
                ensure!(
                    self.catalog.memory_modes().contains(mode),
                    "Unknown memory mode `{}' (known: {})",
                    mode,
                    self.catalog.memory_modes().join(", ")
                );
                mode.as_str()
            }
            None => system.default_memory_mode(),
        };
        let mut args = vec![
            "--output-dir".to_string(),
            out_dir.display().to_string(),
            format!("--accelerator-config={}", config.accelerator),
            format!("--optimise={}", config.goal),
            format!("--config={}", system.ini_file.display()),
            format!("--memory-mode={memory_mode}"),
            format!("--system-config={}", config.system_config),
        ];
        if let Some(size) = config.arena_cache_size {
            args.push(format!("--arena-cache-size={size}"));
        }
        if config.verbose_cycle_estimate {
            args.push("--verbose-cycle-estimate".to_string());
        }
        if config.verbose_all {
            args.push("--verbose-all".to_string());
        }
        args.push(model.display().to_string());
        Ok(args)
    }

    pub fn compile(&self, model: &Path, out_dir: &Path, config: &CompilerConfig) -> SrmcResult<CompileResult> {
        let stem = model_stem(model)?;
        fs::create_dir_all(out_dir)?;
        let args = self.command_line(model, out_dir, config)?;
        info!("Compiling {:?} for {}", model, config.system_config);
        let output = self.runner.run(&self.program, &args)?;
        let log = output.combined();
        debug!("{} log:\n{}", self.program, log);
        let log_file = out_dir.join(format!("{stem}_vela.log"));
        fs::write(&log_file, &log)?;

        let mut summary = None;
        let outcome = if !output.success() {
            warn!("{} failed with status {:?}", self.program, output.status);
            CompileOutcome::ToolError { status: output.status }
        } else {
            let summary_file = out_dir.join(format!("{stem}_summary_{}.csv", config.system_config));
            summary = read_summary(&summary_file)?;
            match &summary {
                None => CompileOutcome::Unmappable,
                Some(s) => {
                    let metrics = CompileMetrics::from_summary(s)
                        .with_context(|| format!("Reading summary {summary_file:?}"))?;
                    if metrics.cycles_npu == 0 {
                        CompileOutcome::Unmappable
                    } else {
                        CompileOutcome::Mapped(metrics)
                    }
                }
            }
        };
        Ok(CompileResult {
            outcome,
            system_config: config.system_config.clone(),
            log,
            log_file,
            compiled_model: out_dir.join(format!("{stem}_vela.tflite")),
            summary,
        })
    }

    /// The tool's own version string.
    pub fn tool_version(&self) -> SrmcResult<String> {
        let output = self.runner.run(&self.program, &["--version".to_string()])?;
        ensure!(output.success(), "`{} --version' failed: {}", self.program, output.combined().trim());
        Ok(output.stdout.trim().to_string())
    }
}

pub(crate) fn model_stem(model: &Path) -> SrmcResult<String> {
    model
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("No file name in {model:?}"))
}
