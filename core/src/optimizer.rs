//! Memory-fit search.
//!
//! One probe compile measures the model, a placement is chosen from the measured
//! weight and cache sizes, and a final compile with that placement is checked against
//! the limits. Only the final compile decides success: the arena size can change the
//! compiler's scheduling, so the probe figures are not reused for the verdict.

use crate::compiler::{CompileOutcome, Compiler, CompilerConfig, OptimizeGoal, ToolRunner};
use crate::internal::*;
use crate::report::{MemoryLimits, MemoryTier, PerformanceReport};

/// Arena requested by the probe compile, big enough for the compiler to schedule freely.
pub const PROBE_ARENA_CACHE_SIZE: u64 = 3072000;

pub const ALL_VMEM: &str = "sr100_npu_400MHz_all_vmem";
pub const WEIGHTS_LPMEM: &str = "sr100_npu_400MHz_tensor_vmem_weights_lpmem";
pub const WEIGHTS_FLASH: &str = "sr100_npu_400MHz_tensor_vmem_weights_flash66MHz";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub system_config: &'static str,
    pub tier: MemoryTier,
    /// VMEM left over once the probe footprint is placed.
    pub headroom: u64,
    pub arena_cache_size: u64,
}

/// Choose where weights go from the probe footprint. Comparisons are inclusive.
pub fn plan_placement(weights: u64, cache: u64, limits: MemoryLimits, goal: OptimizeGoal) -> Placement {
    let total = weights + cache;
    let (system_config, tier, headroom) = if total <= limits.vmem {
        (ALL_VMEM, MemoryTier::Vmem, limits.vmem - total)
    } else if weights <= limits.lpmem {
        (WEIGHTS_LPMEM, MemoryTier::Lpmem, limits.vmem.saturating_sub(cache))
    } else {
        (WEIGHTS_FLASH, MemoryTier::Flash, limits.vmem.saturating_sub(cache))
    };
    let arena_cache_size = match goal {
        OptimizeGoal::Performance => cache + headroom,
        OptimizeGoal::Size => cache,
    };
    Placement { system_config, tier, headroom, arena_cache_size }
}

#[derive(Clone, Debug)]
pub struct FitResult {
    pub success: bool,
    pub report: PerformanceReport,
    /// Settings of the last compile, to rerun it for artifact generation.
    pub config: CompilerConfig,
    /// `None` when the probe compile did not map the model.
    pub placement: Option<Placement>,
}

pub fn find_fit<R: ToolRunner>(
    compiler: &Compiler<R>,
    model: impl AsRef<Path>,
    limits: MemoryLimits,
    goal: OptimizeGoal,
) -> SrmcResult<FitResult> {
    let base = CompilerConfig { goal, ..CompilerConfig::default() };
    find_fit_with(compiler, model.as_ref(), limits, &base)
}

/// Like `find_fit`, with accelerator, memory mode and verbosity taken from `base`.
pub fn find_fit_with<R: ToolRunner>(
    compiler: &Compiler<R>,
    model: &Path,
    limits: MemoryLimits,
    base: &CompilerConfig,
) -> SrmcResult<FitResult> {
    let scratch = tempfile::Builder::new().prefix("srmc-fit").tempdir()?;

    let probe_config = CompilerConfig {
        system_config: ALL_VMEM.to_string(),
        arena_cache_size: Some(PROBE_ARENA_CACHE_SIZE),
        goal: OptimizeGoal::Size,
        ..base.clone()
    };
    let probe = compiler.compile(model, scratch.path(), &probe_config)?;
    let CompileOutcome::Mapped(metrics) = &probe.outcome else {
        warn!("Probe compile of {model:?} did not map onto the NPU");
        let report = PerformanceReport::new(&probe, limits);
        return Ok(FitResult { success: false, report, config: probe_config, placement: None });
    };
    let weights = metrics.off_chip_flash_memory_used;
    let cache = metrics.sram_memory_used;
    let placement = plan_placement(weights, cache, limits, base.goal);
    info!(
        "Probe: weights {weights} bytes, cache {cache} bytes. Placing weights in {} ({}), arena {} bytes",
        placement.tier, placement.system_config, placement.arena_cache_size
    );

    let config = CompilerConfig {
        system_config: placement.system_config.to_string(),
        arena_cache_size: Some(placement.arena_cache_size),
        ..base.clone()
    };
    let result = compiler.compile(model, scratch.path(), &config)?;
    let report = PerformanceReport::new(&result, limits);
    if !report.fits {
        info!("{model:?} does not fit: {} bytes of vmem, {} bytes of lpmem", report.vmem_size, report.lpmem_size);
    }
    Ok(FitResult { success: report.fits, report, config, placement: Some(placement) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProfileCatalog;
    use crate::compiler::ToolOutput;
    use std::cell::RefCell;

    /// Reports a fixed footprint, echoing the requested arena size as the arena used.
    struct Footprint {
        weights: u64,
        cache: u64,
        cycles: u64,
        configs: RefCell<Vec<(String, u64)>>,
    }

    impl Footprint {
        fn new(weights: u64, cache: u64) -> Footprint {
            Footprint { weights, cache, cycles: 1000, configs: RefCell::default() }
        }
    }

    impl ToolRunner for Footprint {
        fn run(&self, _program: &str, args: &[String]) -> SrmcResult<ToolOutput> {
            let flag = |name: &str| args.iter().find_map(|a| a.strip_prefix(name)).unwrap().to_string();
            let config = flag("--system-config=");
            let arena: u64 = flag("--arena-cache-size=").parse()?;
            self.configs.borrow_mut().push((config.clone(), arena));
            let arena_used = if arena == PROBE_ARENA_CACHE_SIZE { self.cache } else { arena };
            let csv = format!(
                "core_clock,cycles_npu,inferences_per_second,inference_time,off_chip_flash_memory_used,sram_memory_used,arena_cache_size\n\
                 400000000.0,{},1.0,1.0,{},{},{}\n",
                self.cycles,
                self.weights as f64 / 1024.0,
                self.cache as f64 / 1024.0,
                arena_used as f64 / 1024.0,
            );
            let out_dir = Path::new(&args[1]);
            fs::write(out_dir.join(format!("model_summary_{config}.csv")), csv)?;
            Ok(ToolOutput { status: Some(0), ..ToolOutput::default() })
        }
    }

    fn search(fake: &Footprint, limits: MemoryLimits, goal: OptimizeGoal) -> FitResult {
        let _ = env_logger::Builder::from_env("SRMC_LOG").try_init();
        let compiler = Compiler::new(fake, ProfileCatalog::builtin().unwrap());
        find_fit(&compiler, "model.tflite", limits, goal).unwrap()
    }

    #[test]
    fn small_model_goes_all_vmem() {
        let fake = Footprint::new(600000, 200000);
        let fit = search(&fake, MemoryLimits { vmem: 1536000, lpmem: 1536000 }, OptimizeGoal::Size);
        assert!(fit.success);
        assert_eq!(fit.report.model_loc, MemoryTier::Vmem);
        assert_eq!(fit.report.vmem_size, 800000);
        assert_eq!(
            *fake.configs.borrow(),
            vec![(ALL_VMEM.to_string(), PROBE_ARENA_CACHE_SIZE), (ALL_VMEM.to_string(), 200000)]
        );
    }

    #[test]
    fn large_weights_go_to_flash() {
        let fake = Footprint::new(1536000, 100000);
        let fit = search(&fake, MemoryLimits { vmem: 536000, lpmem: 536000 }, OptimizeGoal::Size);
        assert_eq!(fit.placement.as_ref().unwrap().system_config, WEIGHTS_FLASH);
        assert_eq!(fit.report.model_loc, MemoryTier::Flash);
        assert_eq!(fit.report.flash_size, 1536000);
        assert!(fit.success);

        let fake = Footprint::new(1536000, 600000);
        let fit = search(&fake, MemoryLimits { vmem: 536000, lpmem: 536000 }, OptimizeGoal::Size);
        assert_eq!(fit.report.model_loc, MemoryTier::Flash);
        assert!(!fit.success);
    }

    #[test]
    fn weights_fitting_lpmem() {
        let fake = Footprint::new(1000000, 300000);
        let fit = search(&fake, MemoryLimits { vmem: 600000, lpmem: 1536000 }, OptimizeGoal::Size);
        assert_eq!(fit.report.model_loc, MemoryTier::Lpmem);
        assert_eq!((fit.report.vmem_size, fit.report.lpmem_size), (300000, 1000000));
        assert!(fit.success);
    }

    #[test]
    fn performance_takes_the_headroom() {
        let fake = Footprint::new(600000, 200000);
        let fit = search(&fake, MemoryLimits::default(), OptimizeGoal::Performance);
        assert_eq!(fit.placement.as_ref().unwrap().headroom, 736000);
        assert_eq!(fit.config.arena_cache_size, Some(936000));
        assert_eq!(fit.config.goal, OptimizeGoal::Performance);
        assert_eq!(fit.report.vmem_size, 1536000);
        assert!(fit.success);
    }

    #[test]
    fn unmapped_model_never_fits() {
        let fake = Footprint { cycles: 0, ..Footprint::new(10, 10) };
        let fit = search(&fake, MemoryLimits { vmem: u64::MAX, lpmem: u64::MAX }, OptimizeGoal::Size);
        assert!(!fit.success);
        assert!(fit.placement.is_none());
        assert_eq!(fake.configs.borrow().len(), 1);
    }

    #[test]
    fn placement_boundaries() {
        let limits = MemoryLimits { vmem: 800000, lpmem: 500000 };
        let p = plan_placement(600000, 200000, limits, OptimizeGoal::Performance);
        assert_eq!((p.tier, p.headroom, p.arena_cache_size), (MemoryTier::Vmem, 0, 200000));
        let p = plan_placement(500000, 300001, limits, OptimizeGoal::Size);
        assert_eq!((p.tier, p.headroom), (MemoryTier::Lpmem, 499999));
        let p = plan_placement(500001, 900000, limits, OptimizeGoal::Performance);
        assert_eq!((p.tier, p.headroom, p.arena_cache_size), (MemoryTier::Flash, 0, 900000));
    }
}
