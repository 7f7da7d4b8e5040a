//! # Catalog Module
//!
//! ## Purpose
//! In-memory data model for the molecule catalog: molecules, the astronomical
//! sources they were detected in, the telescopes that detected them, and the
//! six electromagnetic wavelength bands. Many-to-many links are explicit
//! association tables resolved eagerly at build time; nothing is lazy and
//! nothing mutates after [`Catalog::build`] returns.
//!
//! ## Lifecycle
//! The whole dataset is built once from raw fixture records and treated as
//! immutable for the rest of the session. A rebuild drops every entity and
//! relation and recreates them from scratch; rows are never patched in place.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::chimie::{self, Composition, ParseError};

/// The six wavelength bands of the catalog, in spectral order.
pub const WAVEBANDS: [&str; 6] = ["sub-mm", "mm", "cm", "IR", "Vis", "UV"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Molecule '{label}' has an unparseable formula: {source}")]
    BadFormula { label: String, source: ParseError },
    #[error("Duplicate {kind} '{key}'")]
    DuplicateKey { kind: &'static str, key: String },
}

/// Raw molecule record as stored in the JSON fixtures. Cross-references to
/// sources, telescopes and wavelengths are by name; the loader resolves them
/// into associations once, at build time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoleculeRecord {
    pub label: String,
    pub name: String,
    pub formula: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub cyclic: bool,
    #[serde(default)]
    pub fullerene: bool,
    #[serde(default)]
    pub polyaromatic: bool,
    #[serde(default, rename = "A")]
    pub a: Option<f64>,
    #[serde(default, rename = "B")]
    pub b: Option<f64>,
    #[serde(default, rename = "C")]
    pub c: Option<f64>,
    #[serde(default)]
    pub mua: Option<f64>,
    #[serde(default)]
    pub mub: Option<f64>,
    #[serde(default)]
    pub muc: Option<f64>,
    #[serde(default)]
    pub ice: bool,
    #[serde(default)]
    pub ppd: bool,
    #[serde(default)]
    pub exgal: bool,
    #[serde(default)]
    pub exo: bool,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub telescopes: Vec<String>,
    #[serde(default)]
    pub wavelengths: Vec<String>,
    #[serde(default)]
    pub isos: Option<String>,
    #[serde(default)]
    pub ppd_isos: Option<String>,
    #[serde(default)]
    pub ism_ref: Option<String>,
    #[serde(default)]
    pub lab_ref: Option<String>,
    #[serde(default)]
    pub ice_ref: Option<String>,
    #[serde(default)]
    pub ice_lab_ref: Option<String>,
    #[serde(default)]
    pub ppd_ref: Option<String>,
    #[serde(default)]
    pub ppd_lab_ref: Option<String>,
    #[serde(default)]
    pub ppd_isos_ref: Option<String>,
    #[serde(default)]
    pub exgal_ref: Option<String>,
    #[serde(default)]
    pub exgal_lab_ref: Option<String>,
    #[serde(default)]
    pub exgal_sources: Option<String>,
    #[serde(default)]
    pub exo_ref: Option<String>,
    #[serde(default)]
    pub exo_lab_ref: Option<String>,
    #[serde(default)]
    pub isos_ref: Option<String>,
    #[serde(default)]
    pub isos_lab_ref: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRecord {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub ra: Option<String>,
    #[serde(default)]
    pub dec: Option<String>,
    #[serde(default)]
    pub exgal: bool,
    #[serde(default)]
    pub exo: bool,
    #[serde(default)]
    pub simbad_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelescopeRecord {
    pub name: String,
    pub nick: String,
    pub kind: String,
    #[serde(default)]
    pub wavelengths: Vec<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub diameter: Option<f64>,
    #[serde(default)]
    pub built: Option<i32>,
    #[serde(default)]
    pub decommissioned: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A molecule in the catalog. The `label` disambiguates stereoisomers that
/// share a name or formula, so it is the unique key, not the name. The
/// charge flags (`neutral`/`cation`/`anion`), `radical`, `mass` and `kappa`
/// are derived at build time from the formula and rotational constants.
#[derive(Debug, Clone)]
pub struct Molecule {
    pub id: usize,
    pub label: String,
    pub name: String,
    pub formula: String,
    pub year: Option<i32>,
    pub neutral: bool,
    pub cation: bool,
    pub anion: bool,
    pub radical: bool,
    pub cyclic: bool,
    pub fullerene: bool,
    pub polyaromatic: bool,
    pub mass: f64,
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub c: Option<f64>,
    pub mua: Option<f64>,
    pub mub: Option<f64>,
    pub muc: Option<f64>,
    pub kappa: Option<f64>,
    pub ice: bool,
    pub ppd: bool,
    pub exgal: bool,
    pub exo: bool,
    pub isos: Option<String>,
    pub ppd_isos: Option<String>,
    pub ism_ref: Option<String>,
    pub lab_ref: Option<String>,
    pub ice_ref: Option<String>,
    pub ice_lab_ref: Option<String>,
    pub ppd_ref: Option<String>,
    pub ppd_lab_ref: Option<String>,
    pub ppd_isos_ref: Option<String>,
    pub exgal_ref: Option<String>,
    pub exgal_lab_ref: Option<String>,
    pub exgal_sources: Option<String>,
    pub exo_ref: Option<String>,
    pub exo_lab_ref: Option<String>,
    pub isos_ref: Option<String>,
    pub isos_lab_ref: Option<String>,
    pub notes: Option<String>,
    composition: Composition,
}

impl Molecule {
    /// Parsed atomic composition of the formula.
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn charge(&self) -> i32 {
        self.composition.charge()
    }

    pub fn natoms(&self) -> u32 {
        self.composition.natoms()
    }

    pub fn nelectrons(&self) -> i64 {
        self.composition.nelectrons()
    }

    pub fn unsaturation(&self) -> Option<f64> {
        self.composition.unsaturation()
    }
}

#[derive(Debug, Clone)]
pub struct Source {
    pub id: usize,
    pub name: String,
    pub kind: String,
    pub ra: Option<String>,
    pub dec: Option<String>,
    pub exgal: bool,
    pub exo: bool,
    pub simbad_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Telescope {
    pub id: usize,
    pub name: String,
    pub nick: String,
    pub kind: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub diameter: Option<f64>,
    pub built: Option<i32>,
    pub decommissioned: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Wavelength {
    pub id: usize,
    pub name: &'static str,
}

/// Payload-free many-to-many association table: the (left, right) id pairs
/// plus eagerly built id-to-ids indexes in both directions.
#[derive(Debug, Clone, Default)]
pub struct Assoc {
    pairs: Vec<(usize, usize)>,
    by_left: Vec<Vec<usize>>,
    by_right: Vec<Vec<usize>>,
}

impl Assoc {
    fn new(nleft: usize, nright: usize) -> Self {
        Self {
            pairs: Vec::new(),
            by_left: vec![Vec::new(); nleft],
            by_right: vec![Vec::new(); nright],
        }
    }

    // Repeated links are dropped so that joins can never yield duplicate rows.
    fn link(&mut self, left: usize, right: usize) {
        if self.by_left[left].contains(&right) {
            return;
        }
        self.pairs.push((left, right));
        self.by_left[left].push(right);
        self.by_right[right].push(left);
    }

    pub fn rights_of(&self, left: usize) -> &[usize] {
        &self.by_left[left]
    }

    pub fn lefts_of(&self, right: usize) -> &[usize] {
        &self.by_right[right]
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }
}

/// The loaded, read-only dataset. An explicit handle, constructed once and
/// passed to the query and display layers; there is no ambient global store.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub molecules: Vec<Molecule>,
    pub sources: Vec<Source>,
    pub telescopes: Vec<Telescope>,
    pub wavelengths: Vec<Wavelength>,
    mol_sources: Assoc,
    mol_telescopes: Assoc,
    mol_wavelengths: Assoc,
    tel_wavelengths: Assoc,
}

impl Catalog {
    /// Builds the catalog from raw fixture records.
    ///
    /// Every unique key (molecule label, source name, telescope name and
    /// nick) is checked, every formula is parsed (an unparseable formula
    /// fails the whole build), and name cross-references are resolved into
    /// association tables. A reference to an unknown name is logged and
    /// skipped, matching how the dataset has always been assembled.
    pub fn build(
        molecule_records: Vec<MoleculeRecord>,
        source_records: Vec<SourceRecord>,
        telescope_records: Vec<TelescopeRecord>,
    ) -> Result<Self, CatalogError> {
        let wavelengths: Vec<Wavelength> = WAVEBANDS
            .iter()
            .enumerate()
            .map(|(id, &name)| Wavelength { id, name })
            .collect();
        let wave_ids: HashMap<&str, usize> =
            WAVEBANDS.iter().enumerate().map(|(i, &w)| (w, i)).collect();

        let mut sources = Vec::with_capacity(source_records.len());
        let mut source_ids: HashMap<String, usize> = HashMap::new();
        for record in source_records {
            if source_ids.contains_key(&record.name) {
                return Err(CatalogError::DuplicateKey {
                    kind: "source name",
                    key: record.name,
                });
            }
            let id = sources.len();
            source_ids.insert(record.name.clone(), id);
            sources.push(Source {
                id,
                name: record.name,
                kind: record.kind,
                ra: record.ra,
                dec: record.dec,
                exgal: record.exgal,
                exo: record.exo,
                simbad_url: record.simbad_url,
            });
        }

        let mut telescopes = Vec::with_capacity(telescope_records.len());
        let mut telescope_names: HashMap<String, usize> = HashMap::new();
        let mut telescope_nicks: HashMap<String, usize> = HashMap::new();
        let mut tel_wavelengths = Assoc::new(telescope_records.len(), WAVEBANDS.len());
        for record in telescope_records {
            if telescope_names.contains_key(&record.name) {
                return Err(CatalogError::DuplicateKey {
                    kind: "telescope name",
                    key: record.name,
                });
            }
            if telescope_nicks.contains_key(&record.nick) {
                return Err(CatalogError::DuplicateKey {
                    kind: "telescope nick",
                    key: record.nick,
                });
            }
            let id = telescopes.len();
            telescope_names.insert(record.name.clone(), id);
            telescope_nicks.insert(record.nick.clone(), id);
            for wave in &record.wavelengths {
                match wave_ids.get(wave.as_str()) {
                    Some(&wid) => tel_wavelengths.link(id, wid),
                    None => warn!(
                        "Telescope '{}' lists unknown wavelength band '{}'",
                        record.name, wave
                    ),
                }
            }
            telescopes.push(Telescope {
                id,
                name: record.name,
                nick: record.nick,
                kind: record.kind,
                latitude: record.latitude,
                longitude: record.longitude,
                diameter: record.diameter,
                built: record.built,
                decommissioned: record.decommissioned,
                notes: record.notes,
            });
        }

        let mut molecules = Vec::with_capacity(molecule_records.len());
        let mut labels: HashMap<String, usize> = HashMap::new();
        let mut mol_sources = Assoc::new(molecule_records.len(), sources.len());
        let mut mol_telescopes = Assoc::new(molecule_records.len(), telescopes.len());
        let mut mol_wavelengths = Assoc::new(molecule_records.len(), WAVEBANDS.len());
        for record in molecule_records {
            if labels.contains_key(&record.label) {
                return Err(CatalogError::DuplicateKey {
                    kind: "molecule label",
                    key: record.label,
                });
            }
            let composition =
                chimie::composition(&record.formula).map_err(|source| CatalogError::BadFormula {
                    label: record.label.clone(),
                    source,
                })?;

            let id = molecules.len();
            labels.insert(record.label.clone(), id);

            for name in &record.sources {
                match source_ids.get(name) {
                    Some(&sid) => mol_sources.link(id, sid),
                    None => warn!("Molecule '{}' lists unknown source '{}'", record.label, name),
                }
            }
            for name in &record.telescopes {
                match telescope_names
                    .get(name)
                    .or_else(|| telescope_nicks.get(name))
                {
                    Some(&tid) => mol_telescopes.link(id, tid),
                    None => warn!(
                        "Molecule '{}' lists unknown telescope '{}'",
                        record.label, name
                    ),
                }
            }
            for wave in &record.wavelengths {
                match wave_ids.get(wave.as_str()) {
                    Some(&wid) => mol_wavelengths.link(id, wid),
                    None => warn!(
                        "Molecule '{}' lists unknown wavelength band '{}'",
                        record.label, wave
                    ),
                }
            }

            let charge = composition.charge();
            molecules.push(Molecule {
                id,
                neutral: charge == 0,
                cation: charge > 0,
                anion: charge < 0,
                radical: composition.is_radical(),
                mass: composition.mass(),
                kappa: chimie::kappa(record.a, record.b, record.c),
                label: record.label,
                name: record.name,
                formula: record.formula,
                year: record.year,
                cyclic: record.cyclic,
                fullerene: record.fullerene,
                polyaromatic: record.polyaromatic,
                a: record.a,
                b: record.b,
                c: record.c,
                mua: record.mua,
                mub: record.mub,
                muc: record.muc,
                ice: record.ice,
                ppd: record.ppd,
                exgal: record.exgal,
                exo: record.exo,
                isos: record.isos,
                ppd_isos: record.ppd_isos,
                ism_ref: record.ism_ref,
                lab_ref: record.lab_ref,
                ice_ref: record.ice_ref,
                ice_lab_ref: record.ice_lab_ref,
                ppd_ref: record.ppd_ref,
                ppd_lab_ref: record.ppd_lab_ref,
                ppd_isos_ref: record.ppd_isos_ref,
                exgal_ref: record.exgal_ref,
                exgal_lab_ref: record.exgal_lab_ref,
                exgal_sources: record.exgal_sources,
                exo_ref: record.exo_ref,
                exo_lab_ref: record.exo_lab_ref,
                isos_ref: record.isos_ref,
                isos_lab_ref: record.isos_lab_ref,
                notes: record.notes,
                composition,
            });
        }

        Ok(Self {
            molecules,
            sources,
            telescopes,
            wavelengths,
            mol_sources,
            mol_telescopes,
            mol_wavelengths,
            tel_wavelengths,
        })
    }

    /// Drops the whole dataset and recreates it from fresh records. There is
    /// no incremental upsert: a rebuild with changed fixtures must not carry
    /// stale rows forward.
    pub fn rebuild(
        &mut self,
        molecule_records: Vec<MoleculeRecord>,
        source_records: Vec<SourceRecord>,
        telescope_records: Vec<TelescopeRecord>,
    ) -> Result<(), CatalogError> {
        *self = Self::build(molecule_records, source_records, telescope_records)?;
        Ok(())
    }

    pub fn sources_of(&self, molecule: &Molecule) -> Vec<&Source> {
        self.mol_sources
            .rights_of(molecule.id)
            .iter()
            .map(|&id| &self.sources[id])
            .collect()
    }

    pub fn telescopes_of(&self, molecule: &Molecule) -> Vec<&Telescope> {
        self.mol_telescopes
            .rights_of(molecule.id)
            .iter()
            .map(|&id| &self.telescopes[id])
            .collect()
    }

    pub fn wavelengths_of(&self, molecule: &Molecule) -> Vec<&Wavelength> {
        self.mol_wavelengths
            .rights_of(molecule.id)
            .iter()
            .map(|&id| &self.wavelengths[id])
            .collect()
    }

    pub fn telescope_wavelengths(&self, telescope: &Telescope) -> Vec<&Wavelength> {
        self.tel_wavelengths
            .rights_of(telescope.id)
            .iter()
            .map(|&id| &self.wavelengths[id])
            .collect()
    }

    /// Number of molecules detected in a source. Computed from the
    /// association table, never stored, so it cannot go stale.
    pub fn source_detects(&self, source: &Source) -> usize {
        self.mol_sources.lefts_of(source.id).len()
    }

    /// Number of molecules detected by a telescope.
    pub fn telescope_detects(&self, telescope: &Telescope) -> usize {
        self.mol_telescopes.lefts_of(telescope.id).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_records() -> (Vec<MoleculeRecord>, Vec<SourceRecord>, Vec<TelescopeRecord>) {
        let sources = vec![
            SourceRecord {
                name: "TMC-1".to_string(),
                kind: "Dark Cloud".to_string(),
                ..Default::default()
            },
            SourceRecord {
                name: "Sgr B2".to_string(),
                kind: "SFR".to_string(),
                ..Default::default()
            },
        ];
        let telescopes = vec![TelescopeRecord {
            name: "NRAO 36-ft Telescope".to_string(),
            nick: "NRAO 36-ft".to_string(),
            kind: "Single Dish".to_string(),
            wavelengths: vec!["mm".to_string()],
            diameter: Some(11.0),
            built: Some(1967),
            ..Default::default()
        }];
        let molecules = vec![
            MoleculeRecord {
                label: "CO".to_string(),
                name: "carbon monoxide".to_string(),
                formula: "CO".to_string(),
                year: Some(1970),
                sources: vec!["Sgr B2".to_string()],
                telescopes: vec!["NRAO 36-ft".to_string()],
                wavelengths: vec!["mm".to_string()],
                b: Some(57635.968),
                ..Default::default()
            },
            MoleculeRecord {
                label: "CH+".to_string(),
                name: "methylidyne cation".to_string(),
                formula: "CH+".to_string(),
                year: Some(1941),
                sources: vec!["TMC-1".to_string(), "Sgr B2".to_string()],
                wavelengths: vec!["Vis".to_string()],
                ..Default::default()
            },
        ];
        (molecules, sources, telescopes)
    }

    #[test]
    fn test_build_resolves_associations() {
        let (m, s, t) = sample_records();
        let catalog = Catalog::build(m, s, t).unwrap();

        let co = &catalog.molecules[0];
        assert_eq!(catalog.sources_of(co)[0].name, "Sgr B2");
        assert_eq!(catalog.telescopes_of(co)[0].nick, "NRAO 36-ft");
        assert_eq!(catalog.wavelengths_of(co)[0].name, "mm");

        let scope = &catalog.telescopes[0];
        assert_eq!(catalog.telescope_wavelengths(scope)[0].name, "mm");
        assert_eq!(catalog.telescope_detects(scope), 1);

        let sgr = &catalog.sources[1];
        assert_eq!(catalog.source_detects(sgr), 2);
    }

    #[test]
    fn test_charge_flags_are_exclusive_and_exhaustive() {
        let (m, s, t) = sample_records();
        let catalog = Catalog::build(m, s, t).unwrap();
        for mol in &catalog.molecules {
            let set = [mol.neutral, mol.cation, mol.anion]
                .iter()
                .filter(|&&f| f)
                .count();
            assert_eq!(set, 1, "molecule {} has {} charge flags", mol.label, set);
            match mol.charge() {
                0 => assert!(mol.neutral),
                c if c > 0 => assert!(mol.cation),
                _ => assert!(mol.anion),
            }
        }
    }

    #[test]
    fn test_derived_properties_at_build() {
        let (m, s, t) = sample_records();
        let catalog = Catalog::build(m, s, t).unwrap();

        let co = &catalog.molecules[0];
        assert_relative_eq!(co.mass, 28.010, epsilon = 1e-3);
        assert!(!co.radical);
        // B known, A and C absent: the sentinel.
        assert_eq!(co.kappa, Some(-1.0));

        let ch_plus = &catalog.molecules[1];
        assert!(ch_plus.cation);
        assert!(!ch_plus.radical);
        assert_eq!(ch_plus.kappa, None);
        assert_eq!(ch_plus.natoms(), 2);
        assert_eq!(ch_plus.nelectrons(), 6);
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let (mut m, s, t) = sample_records();
        m.push(m[0].clone());
        assert!(matches!(
            Catalog::build(m, s, t),
            Err(CatalogError::DuplicateKey { kind: "molecule label", .. })
        ));
    }

    #[test]
    fn test_bad_formula_fails_whole_build() {
        let (mut m, s, t) = sample_records();
        m[0].formula = "C+H+".to_string();
        assert!(matches!(
            Catalog::build(m, s, t),
            Err(CatalogError::BadFormula { .. })
        ));
    }

    #[test]
    fn test_unknown_reference_is_skipped() {
        let (mut m, s, t) = sample_records();
        m[0].sources.push("No Such Cloud".to_string());
        let catalog = Catalog::build(m, s, t).unwrap();
        assert_eq!(catalog.sources_of(&catalog.molecules[0]).len(), 1);
    }

    #[test]
    fn test_rebuild_drops_old_rows() {
        let (m, s, t) = sample_records();
        let mut catalog = Catalog::build(m, s.clone(), t.clone()).unwrap();
        assert_eq!(catalog.molecules.len(), 2);

        let fresh = vec![MoleculeRecord {
            label: "H2O".to_string(),
            name: "water".to_string(),
            formula: "H2O".to_string(),
            year: Some(1969),
            ..Default::default()
        }];
        catalog.rebuild(fresh, s, t).unwrap();
        assert_eq!(catalog.molecules.len(), 1);
        assert_eq!(catalog.molecules[0].label, "H2O");
    }

    #[test]
    fn test_duplicate_association_links_collapse() {
        let (mut m, s, t) = sample_records();
        m[0].sources = vec!["Sgr B2".to_string(), "Sgr B2".to_string()];
        let catalog = Catalog::build(m, s, t).unwrap();
        assert_eq!(catalog.sources_of(&catalog.molecules[0]).len(), 1);
        assert_eq!(catalog.source_detects(&catalog.sources[1]), 2);
    }
}
