use std::io::Write;

use srmc_core::internal::*;

pub fn handle(catalog: &ProfileCatalog, out: &mut dyn Write) -> SrmcResult<bool> {
    writeln!(out, "System configurations:")?;
    for config in catalog.configs() {
        writeln!(
            out,
            "   {} ({}, default memory mode {})",
            config.name,
            config.ini_file.display(),
            config.default_memory_mode()
        )?;
    }
    writeln!(out, "Memory modes:")?;
    for mode in catalog.memory_modes() {
        writeln!(out, "   {mode}")?;
    }
    Ok(true)
}
