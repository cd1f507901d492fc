//! Data validation utilities.

use std::collections::BTreeMap;
use std::path::Path;

use econ_core::catalog::Catalog;
use econ_core::config::EconomyConfig;

use crate::error::ToolError;

/// What a successful validation found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSummary {
    /// Number of definitions in the catalog.
    pub producibles: usize,
    /// Definition count per kind, keyed by kind name.
    pub by_kind: BTreeMap<String, usize>,
    /// Whether a config file was checked as well.
    pub config_checked: bool,
}

fn read_file(path: &Path) -> Result<String, ToolError> {
    if !path.exists() {
        return Err(ToolError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Load and validate a RON catalog file.
///
/// # Errors
///
/// Returns an error if the file is missing, does not parse, or fails
/// cross-reference validation.
pub fn load_catalog(path: &Path) -> Result<Catalog, ToolError> {
    let contents = read_file(path)?;
    let catalog = Catalog::from_ron_str(&contents, &path.display().to_string())?;
    tracing::debug!(path = %path.display(), producibles = catalog.len(), "Catalog loaded");
    Ok(catalog)
}

/// Load a RON economy config file.
///
/// # Errors
///
/// Returns an error if the file is missing or does not parse.
pub fn load_config(path: &Path) -> Result<EconomyConfig, ToolError> {
    let contents = read_file(path)?;
    Ok(EconomyConfig::from_ron_str(
        &contents,
        &path.display().to_string(),
    )?)
}

/// Validate a catalog file and, optionally, a config against it.
///
/// # Errors
///
/// Returns the first problem found.
pub fn validate_files(
    catalog_path: &Path,
    config_path: Option<&Path>,
) -> Result<ValidationSummary, ToolError> {
    let catalog = load_catalog(catalog_path)?;

    if let Some(config_path) = config_path {
        let config = load_config(config_path)?;
        config.ensure_valid(&catalog)?;
    }

    let mut by_kind = BTreeMap::new();
    for definition in catalog.iter() {
        *by_kind.entry(format!("{:?}", definition.kind)).or_insert(0) += 1;
    }

    Ok(ValidationSummary {
        producibles: catalog.len(),
        by_kind,
        config_checked: config_path.is_some(),
    })
}
