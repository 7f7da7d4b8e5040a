//! # Fixtures Module
//!
//! ## Purpose
//! Manages the JSON fixture files the catalog is built from and loads their
//! raw records. The dataset ships as three JSON arrays (molecules, sources,
//! telescopes); where those files live is kept in a small persisted
//! configuration so alternative dataset versions can be swapped in without
//! touching code.
//!
//! The config and the loaded records are explicit values handed to the
//! caller. Nothing here is a global: whoever builds the [`Catalog`] owns it.
//!
//! [`Catalog`]: crate::catalog::Catalog

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::catalog::{MoleculeRecord, SourceRecord, TelescopeRecord};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File '{0}' does not exist")]
    Missing(String),
    #[error("Failed to read '{file}': {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },
    #[error("Failed to parse '{file}': {source}")]
    Json {
        file: String,
        source: serde_json::Error,
    },
}

/// Fixture file paths for the three entity kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub molecules: String,
    pub sources: String,
    pub telescopes: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            molecules: "data/molecules.json".to_string(),
            sources: "data/sources.json".to_string(),
            telescopes: "data/telescopes.json".to_string(),
        }
    }
}

/// Loads and persists the fixture-path configuration. A missing or invalid
/// config file falls back to the defaults rather than failing.
#[derive(Debug, Clone)]
pub struct DatasetManager {
    config: DatasetConfig,
    config_file: String,
}

impl DatasetManager {
    pub fn new() -> Self {
        Self::with_config_file("dataset_config.json")
    }

    pub fn with_config_file(config_file: &str) -> Self {
        let config = Self::load_config(config_file).unwrap_or_default();
        Self {
            config,
            config_file: config_file.to_string(),
        }
    }

    fn load_config(config_file: &str) -> Result<DatasetConfig, LoadError> {
        if !Path::new(config_file).exists() {
            return Ok(DatasetConfig::default());
        }
        let content = fs::read_to_string(config_file).map_err(|source| LoadError::Io {
            file: config_file.to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| LoadError::Json {
            file: config_file.to_string(),
            source,
        })
    }

    pub fn save_config(&self) -> Result<(), LoadError> {
        #[cfg(test)]
        {
            // Don't touch the real config file from tests.
            return Ok(());
        }

        #[cfg(not(test))]
        {
            let content = serde_json::to_string_pretty(&self.config).map_err(|source| {
                LoadError::Json {
                    file: self.config_file.clone(),
                    source,
                }
            })?;
            fs::write(&self.config_file, content).map_err(|source| LoadError::Io {
                file: self.config_file.clone(),
                source,
            })
        }
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn molecules_path(&self) -> &str {
        &self.config.molecules
    }

    pub fn sources_path(&self) -> &str {
        &self.config.sources
    }

    pub fn telescopes_path(&self) -> &str {
        &self.config.telescopes
    }

    /// Points the molecule fixtures at another file. The file must exist;
    /// the configuration is saved on success.
    pub fn set_molecules(&mut self, path: &str) -> Result<(), LoadError> {
        Self::require_exists(path)?;
        self.config.molecules = path.to_string();
        self.save_config()
    }

    pub fn set_sources(&mut self, path: &str) -> Result<(), LoadError> {
        Self::require_exists(path)?;
        self.config.sources = path.to_string();
        self.save_config()
    }

    pub fn set_telescopes(&mut self, path: &str) -> Result<(), LoadError> {
        Self::require_exists(path)?;
        self.config.telescopes = path.to_string();
        self.save_config()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), LoadError> {
        self.config = DatasetConfig::default();
        self.save_config()
    }

    fn require_exists(path: &str) -> Result<(), LoadError> {
        if Path::new(path).exists() {
            Ok(())
        } else {
            Err(LoadError::Missing(path.to_string()))
        }
    }
}

impl Default for DatasetManager {
    fn default() -> Self {
        Self::new()
    }
}

fn load_records<T: DeserializeOwned>(file_name: &str) -> Result<Vec<T>, LoadError> {
    let path = Path::new(file_name);
    if !path.exists() {
        return Err(LoadError::Missing(file_name.to_string()));
    }
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        file: file_name.to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Json {
        file: file_name.to_string(),
        source,
    })
}

/// Loads molecule records and reports obvious data problems.
pub fn load_molecule_records(file_name: &str) -> Result<Vec<MoleculeRecord>, LoadError> {
    let records: Vec<MoleculeRecord> = load_records(file_name)?;
    if records.is_empty() {
        warn!("Molecule fixture '{}' is empty", file_name);
    }
    for record in &records {
        if record.formula.is_empty() {
            warn!("Molecule '{}' has an empty formula", record.label);
        }
        if record.year.is_none() {
            warn!("Molecule '{}' has no discovery year", record.label);
        }
    }
    info!(
        "Loaded {} molecule records from '{}'",
        records.len(),
        file_name
    );
    Ok(records)
}

pub fn load_source_records(file_name: &str) -> Result<Vec<SourceRecord>, LoadError> {
    let records: Vec<SourceRecord> = load_records(file_name)?;
    if records.is_empty() {
        warn!("Source fixture '{}' is empty", file_name);
    }
    info!(
        "Loaded {} source records from '{}'",
        records.len(),
        file_name
    );
    Ok(records)
}

pub fn load_telescope_records(file_name: &str) -> Result<Vec<TelescopeRecord>, LoadError> {
    let records: Vec<TelescopeRecord> = load_records(file_name)?;
    if records.is_empty() {
        warn!("Telescope fixture '{}' is empty", file_name);
    }
    info!(
        "Loaded {} telescope records from '{}'",
        records.len(),
        file_name
    );
    Ok(records)
}

/// Loads all three record sets named by the configuration.
pub fn load_dataset(
    config: &DatasetConfig,
) -> Result<(Vec<MoleculeRecord>, Vec<SourceRecord>, Vec<TelescopeRecord>), LoadError> {
    Ok((
        load_molecule_records(&config.molecules)?,
        load_source_records(&config.sources)?,
        load_telescope_records(&config.telescopes)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let manager = DatasetManager::with_config_file("no_such_config.json");
        assert_eq!(manager.molecules_path(), "data/molecules.json");
        assert_eq!(manager.sources_path(), "data/sources.json");
        assert_eq!(manager.telescopes_path(), "data/telescopes.json");
    }

    #[test]
    fn test_config_round_trip() {
        let mut config_file = NamedTempFile::new().unwrap();
        let config = DatasetConfig {
            molecules: "m.json".to_string(),
            sources: "s.json".to_string(),
            telescopes: "t.json".to_string(),
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        config_file.write_all(json.as_bytes()).unwrap();

        let manager = DatasetManager::with_config_file(config_file.path().to_str().unwrap());
        assert_eq!(manager.molecules_path(), "m.json");
        assert_eq!(manager.telescopes_path(), "t.json");
    }

    #[test]
    fn test_set_paths_validates_existence() {
        let mut manager = DatasetManager::with_config_file("no_such_config.json");
        assert!(matches!(
            manager.set_molecules("definitely_not_here.json"),
            Err(LoadError::Missing(_))
        ));

        let mut fixture = NamedTempFile::new().unwrap();
        fixture.write_all(b"[]").unwrap();
        let path = fixture.path().to_str().unwrap().to_string();
        manager.set_molecules(&path).unwrap();
        assert_eq!(manager.molecules_path(), path);
    }

    #[test]
    fn test_load_molecule_records() {
        let mut fixture = NamedTempFile::new().unwrap();
        fixture
            .write_all(
                br#"[
                    {
                        "label": "H2O",
                        "name": "water",
                        "formula": "H2O",
                        "year": 1969,
                        "sources": ["Sgr B2"],
                        "wavelengths": ["cm"]
                    }
                ]"#,
            )
            .unwrap();

        let records = load_molecule_records(fixture.path().to_str().unwrap()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "H2O");
        assert_eq!(records[0].year, Some(1969));
        assert_eq!(records[0].sources, vec!["Sgr B2"]);
        assert!(!records[0].cyclic);
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let mut fixture = NamedTempFile::new().unwrap();
        fixture.write_all(b"{ not json ]").unwrap();
        assert!(matches!(
            load_molecule_records(fixture.path().to_str().unwrap()),
            Err(LoadError::Json { .. })
        ));
        assert!(matches!(
            load_source_records("missing_sources.json"),
            Err(LoadError::Missing(_))
        ));
    }
}
