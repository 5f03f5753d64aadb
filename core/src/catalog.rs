//! Compiler profile catalog.
//!
//! Vela reads its system configurations and memory modes from INI files. The pipeline
//! only needs their names and the file declaring them, so the catalog is loaded once
//! by scanning section headers, and checked at load time.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use tempfile::TempDir;

use crate::errors::PipelineError;
use crate::internal::*;

/// Environment variable naming a directory of profile files.
pub const PROFILE_DIR_ENV: &str = "SRMC_PROFILE_DIR";

const BUILTIN_PROFILE_NAME: &str = "sr100.ini";
const BUILTIN_PROFILE: &str = include_str!("../config/sr100.ini");

lazy_static::lazy_static! {
    static ref SYSTEM_CONFIG_SECTION: Regex = Regex::new(r"\[System_Config\.([^\]]+)\]").unwrap();
    static ref MEMORY_MODE_SECTION: Regex = Regex::new(r"\[Memory_Mode\.([^\]]+)\]").unwrap();
}

/// A named system configuration and the profile file declaring it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemConfig {
    pub name: String,
    pub ini_file: PathBuf,
    /// Memory modes of the same file, in declaration order.
    pub memory_modes: Vec<String>,
}

impl SystemConfig {
    pub fn default_memory_mode(&self) -> &str {
        // load() refuses files without memory modes
        self.memory_modes.last().map(|s| s.as_str()).unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProfileCatalog {
    configs: BTreeMap<String, SystemConfig>,
    memory_modes: Vec<String>,
    // keeps the materialized built-in profile alive
    _scratch: Option<Arc<TempDir>>,
}

impl ProfileCatalog {
    /// Pick the profile source: explicit INI file, then explicit directory, then the
    /// directory named by `SRMC_PROFILE_DIR`, then the built-in SR100 profile.
    pub fn locate(ini_file: Option<&Path>, profile_dir: Option<&Path>) -> SrmcResult<ProfileCatalog> {
        if let Some(ini) = ini_file {
            return ProfileCatalog::load_files(&[ini]);
        }
        if let Some(dir) = profile_dir {
            return ProfileCatalog::load_dir(dir);
        }
        if let Some(dir) = std::env::var_os(PROFILE_DIR_ENV) {
            debug!("Using profiles from ${PROFILE_DIR_ENV}={dir:?}");
            return ProfileCatalog::load_dir(Path::new(&dir));
        }
        ProfileCatalog::builtin()
    }

    /// The SR100 profile shipped with the crate, written to a scratch directory so the
    /// compiler can read it.
    pub fn builtin() -> SrmcResult<ProfileCatalog> {
        let scratch = tempfile::Builder::new().prefix("srmc-profiles").tempdir()?;
        let path = scratch.path().join(BUILTIN_PROFILE_NAME);
        fs::write(&path, BUILTIN_PROFILE)?;
        let mut catalog = ProfileCatalog::load_files(&[&path])?;
        catalog._scratch = Some(Arc::new(scratch));
        Ok(catalog)
    }

    /// Every `*.ini` file under `dir`, in path order.
    pub fn load_dir(dir: &Path) -> SrmcResult<ProfileCatalog> {
        let mut files = vec![];
        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Scanning profile directory {dir:?}"))?;
            if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "ini") {
                files.push(entry.into_path());
            }
        }
        if files.is_empty() {
            bail!("No profile (*.ini) found in {:?}", dir);
        }
        ProfileCatalog::load_files(&files)
    }

    pub fn load_files(files: &[impl AsRef<Path>]) -> SrmcResult<ProfileCatalog> {
        let mut catalog = ProfileCatalog::default();
        for file in files {
            let file = file.as_ref();
            let text = fs::read_to_string(file)?;
            catalog.add_profile(file, &text)?;
        }
        Ok(catalog)
    }

    fn add_profile(&mut self, path: &Path, text: &str) -> SrmcResult<()> {
        let (configs, modes) = scan_sections(text);
        trace!("{path:?}: configs {configs:?}, memory modes {modes:?}");
        if !configs.is_empty() && modes.is_empty() {
            return Err(PipelineError::InvalidProfile {
                path: path.to_owned(),
                reason: "system configurations declared without any memory mode".into(),
            }
            .into());
        }
        for name in configs {
            if let Some(previous) = self.configs.get(&name) {
                return Err(PipelineError::InvalidProfile {
                    path: path.to_owned(),
                    reason: format!(
                        "system configuration `{name}' already declared in {:?}",
                        previous.ini_file
                    ),
                }
                .into());
            }
            let config =
                SystemConfig { name: name.clone(), ini_file: path.to_owned(), memory_modes: modes.clone() };
            self.configs.insert(name, config);
        }
        for mode in modes {
            if !self.memory_modes.contains(&mode) {
                self.memory_modes.push(mode);
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> SrmcResult<&SystemConfig> {
        self.configs.get(name).ok_or_else(|| PipelineError::UnknownSystemConfig(name.to_string()).into())
    }

    pub fn configs(&self) -> impl Iterator<Item = &SystemConfig> {
        self.configs.values()
    }

    /// Every memory mode of the catalog, first declaration order, no duplicates.
    pub fn memory_modes(&self) -> &[String] {
        &self.memory_modes
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

fn scan_sections(text: &str) -> (Vec<String>, Vec<String>) {
    let mut configs = vec![];
    let mut modes = vec![];
    for line in text.lines() {
        if let Some(c) = SYSTEM_CONFIG_SECTION.captures(line) {
            configs.push(c[1].to_string());
        }
        if let Some(c) = MEMORY_MODE_SECTION.captures(line) {
            modes.push(c[1].to_string());
        }
    }
    (configs, modes)
}
