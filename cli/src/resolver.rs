use std::io::Write;

use itertools::Itertools;
use srmc_core::codegen::{Codegen, resolver_header_name};
use srmc_core::internal::*;
use srmc_core::utils::expand_wildcards;

use crate::params::ResolverArgs;

/// One resolver header registering the operators of every given model.
pub fn handle(args: &ResolverArgs, out: &mut dyn Write) -> SrmcResult<bool> {
    let models = expand_wildcards(&args.models)?;
    ensure!(!models.is_empty(), "No model matches {}", args.models.join(" "));
    let operators = ResolverSet::from_model_files(&models)?;
    if let Some(header) = &args.verify_against {
        operators
            .ensure_supported(&SupportedOperators::load(header)?)
            .with_context(|| format!("Verifying operators against {header:?}"))?;
    }

    let names = models
        .iter()
        .map(|m| m.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
        .join(", ");
    let codegen = Codegen::new()?;
    let license_header = codegen.license_header(&names)?;
    let text = codegen.resolver_header(&license_header, &args.namespace, &names, &operators)?;
    fs::create_dir_all(&args.output_dir)?;
    let path = args.output_dir.join(resolver_header_name(&args.namespace));
    fs::write(&path, text)?;
    info!("Wrote {path:?}");

    for op in operators.iter() {
        writeln!(out, "{op}")?;
    }
    Ok(true)
}
