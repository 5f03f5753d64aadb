use std::io::Write;

use srmc_core::internal::*;
use srmc_core::optimizer::find_fit_with;

use crate::params::{CompileArgs, OptimizeArgs};

pub fn handle<R: ToolRunner>(compiler: &Compiler<R>, args: &CompileArgs, out: &mut dyn Write) -> SrmcResult<bool> {
    let config = args.compiler.config(&args.system_config, args.arena_cache_size);
    let request = args.outputs.request(&args.model, config, args.limits.limits());
    // the report is printed before operator verification can fail
    let output = run_compile_with(compiler, &request, |report, fits| {
        print_report(out, &args.model, report, fits, args.json)
    })?;
    if args.outputs.output_dir.is_some() {
        for artifact in &output.artifacts {
            info!("Generated {artifact:?}");
        }
    }
    Ok(output.success)
}

/// Search the fitting placement, then generate artifacts with it when asked to.
pub fn optimize<R: ToolRunner>(
    compiler: &Compiler<R>,
    args: &OptimizeArgs,
    out: &mut dyn Write,
) -> SrmcResult<bool> {
    let model = fs::canonicalize(&args.model)?;
    // the model is opened first so a malformed one is reported as such
    TfliteModel::open(&model)?;
    let limits = args.limits.limits();
    let base = args.compiler.config(&CompilerConfig::default().system_config, 0);
    let fit = find_fit_with(compiler, &model, limits, &base)?;
    print_report(out, &args.model, &fit.report, fit.success, args.json)?;
    if !args.json {
        if let Some(placement) = &fit.placement {
            writeln!(
                out,
                "Weights in {}, {} bytes of arena cache, {} bytes of vmem headroom",
                placement.tier, placement.arena_cache_size, placement.headroom
            )?;
        }
    }
    if !fit.success || args.outputs.output_dir.is_none() {
        return Ok(fit.success);
    }
    let request = args.outputs.request(&model, fit.config.clone(), limits);
    let output = run_compile(compiler, &request)?;
    Ok(output.success)
}

fn print_report(
    out: &mut dyn Write,
    model: &Path,
    report: &PerformanceReport,
    success: bool,
    json: bool,
) -> SrmcResult<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        return Ok(());
    }
    if success {
        writeln!(out, "{} fits on {}:", model.display(), report.system_config)?;
    } else if report.cycles_npu == 0 {
        writeln!(out, "{} could not be mapped onto the NPU with {}:", model.display(), report.system_config)?;
    } else {
        writeln!(out, "{} does not fit within the memory limits with {}:", model.display(), report.system_config)?;
    }
    writeln!(out, "{report}")?;
    Ok(())
}
