//! Operator registration tokens.
//!
//! The embedded runtime registers kernels with one `Add<Op>()` call per operator.
//! This module derives those names from model operator tables, merges them across
//! models and checks them against what a runtime build declares.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use itertools::Itertools;
use srmc_tflite::OperatorCode;

use crate::errors::PipelineError;
use crate::internal::*;

/// Vendor qualifier carried by some custom codes, `TFLite_Detection_PostProcess`
/// being registered as `AddDetectionPostprocess`.
pub const VENDOR_PREFIX: &str = "TFLite";

/// Tokens of operators that only exist once a model went through an NPU compiler.
pub const NPU_CUSTOM_OP_PREFIXES: &[&str] = &["AddEthosU", "AddSynai"];

lazy_static::lazy_static! {
    static ref SUPPORTED_DECLARATION: regex::Regex =
        regex::Regex::new(r"TfLiteStatus Add(\w+)\(.*\);").unwrap();
}

/// Turn a raw operator name into its registration function name.
///
/// This is a one-way transform: `CONV_2D` gives `AddConv2D`, but feeding
/// `AddConv2D` back in gives `AddAddconv2d`.
pub fn normalize(raw_name: &str) -> String {
    let name = raw_name.replace(VENDOR_PREFIX, "");
    let mut token = String::from("Add");
    for part in name.split(['_', '-']) {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if first.is_alphabetic() && part.chars().count() > 1 => {
                token.extend(first.to_uppercase());
                token.push_str(&chars.as_str().to_lowercase());
            }
            _ => token.push_str(&part.to_uppercase()),
        }
    }
    token
}

/// Deduplicated, lexicographically ordered registration tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolverSet(BTreeSet<String>);

impl ResolverSet {
    /// Union of the normalized operator names of every model.
    pub fn build<'a>(models: impl IntoIterator<Item = &'a BTreeSet<OperatorCode>>) -> ResolverSet {
        ResolverSet(models.into_iter().flatten().map(|op| normalize(&op.name())).collect())
    }

    pub fn from_model_files(paths: &[impl AsRef<Path>]) -> SrmcResult<ResolverSet> {
        let mut tables = vec![];
        for path in paths {
            let path = path.as_ref();
            debug!("Reading operator table of {path:?}");
            let bytes = fs::read(path)?;
            tables.push(
                srmc_tflite::extract_operators(&bytes)
                    .with_context(|| format!("Reading operator table of {path:?}"))?,
            );
        }
        Ok(ResolverSet::build(&tables))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    /// Tokens absent from `supported`, in order. Empty when the runtime covers the set.
    pub fn verify(&self, supported: &SupportedOperators) -> Vec<String> {
        self.iter()
            .filter(|token| !supported.supports(token))
            .map(|token| token.to_string())
            .collect()
    }

    /// Like `verify`, but a non empty mismatch is an `UnsupportedOperators` error.
    pub fn ensure_supported(&self, supported: &SupportedOperators) -> SrmcResult<()> {
        let missing = self.verify(supported);
        if !missing.is_empty() {
            warn!("Unsupported operators: {}", missing.iter().join(", "));
            return Err(PipelineError::UnsupportedOperators(missing).into());
        }
        Ok(())
    }

    /// First token naming an operator produced by an NPU compiler.
    pub fn npu_custom_op(&self) -> Option<&str> {
        self.iter().find(|token| NPU_CUSTOM_OP_PREFIXES.iter().any(|p| token.starts_with(p)))
    }
}

/// Operator names a runtime build declares support for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SupportedOperators(HashSet<String>);

impl SupportedOperators {
    /// Every line shaped like `TfLiteStatus Add<Name>(...);` declares `<Name>`.
    pub fn parse(text: &str) -> SupportedOperators {
        SupportedOperators(
            text.lines()
                .filter_map(|line| SUPPORTED_DECLARATION.captures(line))
                .map(|c| c[1].to_string())
                .collect(),
        )
    }

    pub fn load(path: impl AsRef<Path>) -> SrmcResult<SupportedOperators> {
        let supported = SupportedOperators::parse(&fs::read_to_string(path.as_ref())?);
        debug!("{} operators declared in {:?}", supported.0.len(), path.as_ref());
        Ok(supported)
    }

    pub fn supports(&self, token: &str) -> bool {
        self.0.contains(token.strip_prefix("Add").unwrap_or(token))
    }
}
