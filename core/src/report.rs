use std::fmt;

use crate::compiler::{CompileOutcome, CompileResult};

/// Where a configuration keeps the model weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTier {
    Vmem,
    Lpmem,
    Flash,
}

impl MemoryTier {
    /// Weights placement of a system configuration, read off its name.
    pub fn of_system_config(name: &str) -> MemoryTier {
        if name.contains("weights_lpmem") {
            MemoryTier::Lpmem
        } else if name.contains("all_vmem") {
            MemoryTier::Vmem
        } else {
            MemoryTier::Flash
        }
    }
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemoryTier::Vmem => "vmem",
            MemoryTier::Lpmem => "lpmem",
            MemoryTier::Flash => "flash",
        };
        f.write_str(s)
    }
}

/// Capacity of the two constrained tiers, in bytes. Flash is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MemoryLimits {
    pub vmem: u64,
    pub lpmem: u64,
}

impl Default for MemoryLimits {
    fn default() -> MemoryLimits {
        MemoryLimits { vmem: 1536000, lpmem: 1536000 }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PerformanceReport {
    pub core_clock: u64,
    pub cycles_npu: u64,
    pub inferences_per_second: f64,
    pub inference_time: f64,
    pub weights_size: u64,
    pub arena_cache_size: u64,
    pub vmem_size: u64,
    pub lpmem_size: u64,
    pub flash_size: u64,
    pub vmem_size_limit: u64,
    pub lpmem_size_limit: u64,
    pub model_loc: MemoryTier,
    pub system_config: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vela_log: String,
    pub fits: bool,
}

impl PerformanceReport {
    /// Place the compiled sizes in the memory tiers and check them against `limits`.
    ///
    /// A compile that did not map the model never fits, and reports zero sizes.
    pub fn new(result: &CompileResult, limits: MemoryLimits) -> PerformanceReport {
        let model_loc = MemoryTier::of_system_config(&result.system_config);
        let mut report = PerformanceReport {
            core_clock: 0,
            cycles_npu: 0,
            inferences_per_second: 0.0,
            inference_time: 0.0,
            weights_size: 0,
            arena_cache_size: 0,
            vmem_size: 0,
            lpmem_size: 0,
            flash_size: 0,
            vmem_size_limit: limits.vmem,
            lpmem_size_limit: limits.lpmem,
            model_loc,
            system_config: result.system_config.clone(),
            vela_log: result.log.clone(),
            fits: false,
        };
        let CompileOutcome::Mapped(metrics) = &result.outcome else {
            return report;
        };
        report.core_clock = metrics.core_clock as u64;
        report.cycles_npu = metrics.cycles_npu;
        report.inferences_per_second = metrics.inferences_per_second;
        report.inference_time = metrics.inference_time;
        report.weights_size = metrics.off_chip_flash_memory_used;
        report.arena_cache_size = metrics.arena_cache_size;
        match model_loc {
            MemoryTier::Vmem => report.vmem_size = report.weights_size + report.arena_cache_size,
            MemoryTier::Lpmem => {
                report.vmem_size = report.arena_cache_size;
                report.lpmem_size = report.weights_size;
            }
            MemoryTier::Flash => {
                report.vmem_size = report.arena_cache_size;
                report.flash_size = report.weights_size;
            }
        }
        report.fits = report.vmem_size <= limits.vmem && report.lpmem_size <= limits.lpmem;
        report
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   core_clock = {}", self.core_clock)?;
        writeln!(f, "   cycles_npu = {}", self.cycles_npu)?;
        writeln!(f, "   inferences_per_sec = {}", self.inferences_per_second)?;
        writeln!(f, "   inference_time = {}", self.inference_time)?;
        writeln!(f, "   weights_size = {}", self.weights_size)?;
        writeln!(f, "   arena_cache_size = {}", self.arena_cache_size)?;
        writeln!(f, "   vmem_size = {}", self.vmem_size)?;
        writeln!(f, "   lpmem_size = {}", self.lpmem_size)?;
        writeln!(f, "   flash_size = {}", self.flash_size)?;
        writeln!(f, "   vmem_size_limit = {}", self.vmem_size_limit)?;
        writeln!(f, "   lpmem_size_limit = {}", self.lpmem_size_limit)?;
        writeln!(f, "   model_loc = {}", self.model_loc)?;
        writeln!(f, "   system_config = {}", self.system_config)?;
        write!(f, "   fits = {}", self.fits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileMetrics;

    fn result(system_config: &str, cycles: u64, flash: u64, arena: u64) -> CompileResult {
        CompileResult {
            outcome: if cycles == 0 {
                CompileOutcome::Unmappable
            } else {
                CompileOutcome::Mapped(CompileMetrics {
                    core_clock: 400e6,
                    cycles_npu: cycles,
                    inferences_per_second: 400e6 / cycles as f64,
                    inference_time: cycles as f64 / 400e6,
                    off_chip_flash_memory_used: flash,
                    sram_memory_used: arena,
                    arena_cache_size: arena,
                })
            },
            system_config: system_config.to_string(),
            log: String::new(),
            log_file: Default::default(),
            compiled_model: Default::default(),
            summary: None,
        }
    }

    #[test]
    fn tiers() {
        assert_eq!(MemoryTier::of_system_config("sr100_npu_400MHz_all_vmem"), MemoryTier::Vmem);
        assert_eq!(
            MemoryTier::of_system_config("sr100_npu_400MHz_tensor_vmem_weights_lpmem"),
            MemoryTier::Lpmem
        );
        assert_eq!(
            MemoryTier::of_system_config("sr100_npu_400MHz_tensor_vmem_weights_flash66MHz"),
            MemoryTier::Flash
        );
    }

    #[test]
    fn all_vmem_adds_up() {
        let r = PerformanceReport::new(&result("x_all_vmem", 1000, 600000, 200000), MemoryLimits::default());
        assert_eq!(r.vmem_size, 800000);
        assert_eq!((r.lpmem_size, r.flash_size), (0, 0));
        assert_eq!(r.core_clock, 400000000);
        assert!(r.fits);
    }

    #[test]
    fn limits_are_inclusive() {
        let limits = MemoryLimits { vmem: 800000, lpmem: 100 };
        assert!(PerformanceReport::new(&result("x_all_vmem", 1, 600000, 200000), limits).fits);
        let limits = MemoryLimits { vmem: 799999, lpmem: 100 };
        assert!(!PerformanceReport::new(&result("x_all_vmem", 1, 600000, 200000), limits).fits);
    }

    #[test]
    fn lpmem_and_flash_placements() {
        let limits = MemoryLimits { vmem: 300000, lpmem: 500000 };
        let r = PerformanceReport::new(&result("x_weights_lpmem", 1, 600000, 200000), limits);
        assert_eq!((r.vmem_size, r.lpmem_size, r.flash_size), (200000, 600000, 0));
        assert!(!r.fits);
        let r = PerformanceReport::new(&result("x_weights_flash66MHz", 1, 600000, 200000), limits);
        assert_eq!((r.vmem_size, r.lpmem_size, r.flash_size), (200000, 0, 600000));
        assert!(r.fits);
    }

    #[test]
    fn unmapped_never_fits() {
        let r = PerformanceReport::new(&result("x_all_vmem", 0, 0, 0), MemoryLimits::default());
        assert!(!r.fits);
        assert_eq!(r.cycles_npu, 0);
    }

    #[test]
    fn display_and_json() {
        let r = PerformanceReport::new(&result("x_all_vmem", 1000, 600000, 200000), MemoryLimits::default());
        let text = r.to_string();
        assert!(text.contains("vmem_size = 800000"));
        assert!(text.ends_with("fits = true"));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["model_loc"], "vmem");
        assert_eq!(json["vmem_size"], 800000);
        assert!(json.get("vela_log").is_none());
    }
}
