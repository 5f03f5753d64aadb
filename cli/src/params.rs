use clap::{Args, Parser, Subcommand};
use srmc_core::compiler::VELA;
use srmc_core::internal::*;

#[derive(Parser, Debug)]
#[command(name = "srmc", version, about = "Compile TensorFlow Lite models for the SR100 NPU")]
pub struct Cli {
    /// Sets the level of verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub profiles: ProfileArgs,

    /// Compiler executable
    #[arg(long, global = true, default_value = VELA)]
    pub vela: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a model and generate its C++ sources
    Compile(CompileArgs),
    /// Find the memory placement fitting a model within the limits
    Optimize(OptimizeArgs),
    /// Generate the operator resolver header of one or more models
    Resolver(ResolverArgs),
    /// List the known system configurations and memory modes
    Modes,
    /// Print the compiler version
    ToolVersion,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    /// INI file declaring system configurations and memory modes
    #[arg(long, global = true)]
    pub system_config_ini_file: Option<PathBuf>,

    /// Directory of profile INI files
    #[arg(long, global = true)]
    pub profile_dir: Option<PathBuf>,
}

impl ProfileArgs {
    pub fn catalog(&self) -> SrmcResult<ProfileCatalog> {
        ProfileCatalog::locate(self.system_config_ini_file.as_deref(), self.profile_dir.as_deref())
    }
}

#[derive(Args, Debug, Clone)]
pub struct CompilerArgs {
    /// Accelerator configuration
    #[arg(long, default_value = "ethos-u55-128")]
    pub accel_config: String,

    /// Optimisation goal: Size or Performance
    #[arg(short = 'p', long, default_value = "Size")]
    pub optimize: OptimizeGoal,

    /// Memory mode, defaults to the last one of the system configuration's profile
    #[arg(long)]
    pub memory_mode: Option<String>,

    #[arg(long)]
    pub verbose_cycle_estimate: bool,

    /// Ask the compiler for all its diagnostics
    #[arg(long)]
    pub verbose_all: bool,
}

impl CompilerArgs {
    pub fn config(&self, system_config: &str, arena_cache_size: u64) -> CompilerConfig {
        CompilerConfig {
            accelerator: self.accel_config.clone(),
            goal: self.optimize,
            memory_mode: self.memory_mode.clone(),
            arena_cache_size: Some(arena_cache_size),
            system_config: system_config.to_string(),
            verbose_cycle_estimate: self.verbose_cycle_estimate,
            verbose_all: self.verbose_all,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LimitArgs {
    /// Bytes of vmem available to the model
    #[arg(long, default_value_t = 1536000)]
    pub vmem_size_limit: u64,

    /// Bytes of lpmem available to the model
    #[arg(long, default_value_t = 1536000)]
    pub lpmem_size_limit: u64,
}

impl LimitArgs {
    pub fn limits(&self) -> MemoryLimits {
        MemoryLimits { vmem: self.vmem_size_limit, lpmem: self.lpmem_size_limit }
    }
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Where artifacts are written. Without it, nothing is kept.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// C++ namespace of the generated sources
    #[arg(long, default_value = "model")]
    pub model_namespace: String,

    /// Name of the generated model source, without extension
    #[arg(short = 'n', long, default_value = "model")]
    pub model_file_out: String,

    /// Stages to run: model, inout
    #[arg(short, long, value_delimiter = ',', num_args = 1.., default_value = "model")]
    pub script: Vec<Stage>,

    /// Input value files (.npy or .bin), wildcards allowed
    #[arg(short, long, num_args = 1..)]
    pub input: Vec<String>,

    /// Expected output files, instead of running the reference interpreter
    #[arg(short, long, num_args = 1..)]
    pub expected: Vec<String>,

    /// Runtime resolver header the model operators are checked against
    #[arg(long)]
    pub verify_against: Option<PathBuf>,
}

impl OutputArgs {
    pub fn request(&self, model: &Path, compiler: CompilerConfig, limits: MemoryLimits) -> CompileRequest {
        CompileRequest {
            model: model.to_path_buf(),
            output_dir: self.output_dir.clone(),
            compiler,
            limits,
            namespace: self.model_namespace.clone(),
            model_file_out: self.model_file_out.clone(),
            stages: self.script.clone(),
            inputs: self.input.clone(),
            expected: self.expected.clone(),
            verify_against: self.verify_against.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// TensorFlow Lite model
    #[arg(short, long = "model-file")]
    pub model: PathBuf,

    #[arg(long, default_value = "sr100_npu_400MHz_all_vmem")]
    pub system_config: String,

    /// Bytes of arena cache
    #[arg(long, default_value_t = 1024000)]
    pub arena_cache_size: u64,

    #[command(flatten)]
    pub compiler: CompilerArgs,

    #[command(flatten)]
    pub limits: LimitArgs,

    #[command(flatten)]
    pub outputs: OutputArgs,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    /// TensorFlow Lite model
    #[arg(short, long = "model-file")]
    pub model: PathBuf,

    #[command(flatten)]
    pub compiler: CompilerArgs,

    #[command(flatten)]
    pub limits: LimitArgs,

    // artifacts are generated with the fitting configuration when an output directory is given
    #[command(flatten)]
    pub outputs: OutputArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResolverArgs {
    /// Models sharing the resolver, wildcards allowed
    #[arg(required = true)]
    pub models: Vec<String>,

    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = "model")]
    pub namespace: String,

    /// Runtime resolver header the operators are checked against
    #[arg(long)]
    pub verify_against: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["srmc", "compile", "-m", "kws.tflite"]).unwrap();
        let Command::Compile(args) = cli.command else { panic!() };
        let config = args.compiler.config(&args.system_config, args.arena_cache_size);
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(args.limits.limits(), MemoryLimits::default());
        let request = args.outputs.request(&args.model, config, args.limits.limits());
        assert_eq!(request.namespace, "model");
        assert_eq!(request.stages, vec![Stage::Model]);
        assert!(request.output_dir.is_none());
        assert_eq!(cli.vela, "vela");
    }

    #[test]
    fn stages_and_goal() {
        let cli = Cli::try_parse_from([
            "srmc", "-vv", "optimize", "-m", "kws.tflite", "-p", "performance", "-s", "model,inout",
            "-i", "a.npy", "b.npy",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Optimize(args) = cli.command else { panic!() };
        assert_eq!(args.compiler.optimize, OptimizeGoal::Performance);
        assert_eq!(args.outputs.script, vec![Stage::Model, Stage::Inout]);
        assert_eq!(args.outputs.input, vec!["a.npy", "b.npy"]);
    }

    #[test]
    fn bad_stage_is_rejected() {
        assert!(Cli::try_parse_from(["srmc", "compile", "-m", "m.tflite", "-s", "all"]).is_err());
    }
}
