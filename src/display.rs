//! Terminal rendering of query results with `prettytable`. One table shape
//! per entity kind, plus a two-column summary grid used when a search comes
//! back with a single hit. Pure formatting, no chemistry and no filtering.

use prettytable::{Table, row};
use std::fmt::Display;

use crate::catalog::{Catalog, Molecule, Source, Telescope};
use crate::chimie;

fn opt<T: Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "N/A".to_string(),
    }
}

fn commas(names: impl IntoIterator<Item = String>) -> String {
    let joined: Vec<String> = names.into_iter().collect();
    if joined.is_empty() {
        "N/A".to_string()
    } else {
        joined.join(", ")
    }
}

// Falls back to the raw string for a formula that will not partition; every
// formula in a built catalog already parsed, so this only matters for echoing
// user input.
fn fancy_formula(formula: &str) -> String {
    chimie::formula_to_unicode(formula).unwrap_or_else(|_| formula.to_string())
}

fn kind_of(molecule: &Molecule) -> String {
    let flags = [
        ("neutral", molecule.neutral),
        ("cation", molecule.cation),
        ("anion", molecule.anion),
        ("radical", molecule.radical),
        ("cyclic", molecule.cyclic),
        ("fullerene", molecule.fullerene),
        ("polyaromatic", molecule.polyaromatic),
    ];
    flags
        .iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn tabulate_molecules(catalog: &Catalog, molecules: &[&Molecule]) -> Table {
    let mut table = Table::new();
    table.add_row(row![
        "Name (Formula)",
        "Year",
        "Source(s)",
        "Telescope(s)",
        "Wavelength(s)",
        "Mass (a.m.u.)",
        "A, B, C (MHz)",
        "\u{3BA}",
    ]);
    for molecule in molecules {
        table.add_row(row![
            format!("{}\n{}", molecule.name, fancy_formula(&molecule.formula)),
            opt(&molecule.year),
            commas(catalog.sources_of(molecule).iter().map(|s| s.name.clone())),
            commas(
                catalog
                    .telescopes_of(molecule)
                    .iter()
                    .map(|t| t.nick.clone())
            ),
            commas(
                catalog
                    .wavelengths_of(molecule)
                    .iter()
                    .map(|w| w.name.to_string())
            ),
            format!("{:.3}", molecule.mass),
            format!(
                "{}, {}, {}",
                opt(&molecule.a),
                opt(&molecule.b),
                opt(&molecule.c)
            ),
            opt(&molecule.kappa),
        ]);
    }
    table
}

pub fn summarize_molecule(catalog: &Catalog, molecule: &Molecule) -> Table {
    let mut grid = Table::new();
    grid.add_row(row!["Name", molecule.name]);
    grid.add_row(row!["Formula", fancy_formula(&molecule.formula)]);
    grid.add_row(row!["Type", kind_of(molecule)]);
    grid.add_row(row!["Discovery year", opt(&molecule.year)]);
    grid.add_row(row![
        "Detected in",
        commas(catalog.sources_of(molecule).iter().map(|s| s.name.clone()))
    ]);
    grid.add_row(row![
        "Detected by",
        commas(
            catalog
                .telescopes_of(molecule)
                .iter()
                .map(|t| t.name.clone())
        )
    ]);
    grid.add_row(row![
        "Wavelength(s)",
        commas(
            catalog
                .wavelengths_of(molecule)
                .iter()
                .map(|w| w.name.to_string())
        )
    ]);
    grid.add_row(row!["Mass (a.m.u.)", format!("{:.3}", molecule.mass)]);
    grid.add_row(row!["Atoms", molecule.natoms()]);
    grid.add_row(row!["Electrons", molecule.nelectrons()]);
    grid.add_row(row!["Unsaturation", opt(&molecule.unsaturation())]);
    grid.add_row(row![
        "A, B, C (MHz)",
        format!(
            "{}, {}, {}",
            opt(&molecule.a),
            opt(&molecule.b),
            opt(&molecule.c)
        )
    ]);
    grid.add_row(row!["\u{3BA}", opt(&molecule.kappa)]);
    grid.add_row(row![
        "Environments",
        commas(
            [
                ("ices", molecule.ice),
                ("protoplanetary disks", molecule.ppd),
                ("extragalactic", molecule.exgal),
                ("exoplanets", molecule.exo),
            ]
            .iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name.to_string())
        )
    ]);
    grid.add_row(row!["Notes", opt(&molecule.notes)]);
    grid
}

pub fn tabulate_sources(catalog: &Catalog, sources: &[&Source]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["Name", "Type", "RA", "Dec", "Detections", "SIMBAD"]);
    for source in sources {
        table.add_row(row![
            source.name,
            source.kind,
            opt(&source.ra),
            opt(&source.dec),
            catalog.source_detects(source),
            opt(&source.simbad_url),
        ]);
    }
    table
}

pub fn summarize_source(catalog: &Catalog, source: &Source) -> Table {
    let mut grid = Table::new();
    grid.add_row(row!["Name", source.name]);
    grid.add_row(row!["Type", source.kind]);
    grid.add_row(row!["RA", opt(&source.ra)]);
    grid.add_row(row!["Dec", opt(&source.dec)]);
    grid.add_row(row!["Detections", catalog.source_detects(source)]);
    grid.add_row(row!["SIMBAD", opt(&source.simbad_url)]);
    grid
}

pub fn tabulate_telescopes(catalog: &Catalog, telescopes: &[&Telescope]) -> Table {
    let mut table = Table::new();
    table.add_row(row![
        "Name",
        "Nick",
        "Type",
        "Wavelength(s)",
        "Diameter (m)",
        "Built",
        "Decommissioned",
        "Detections",
    ]);
    for telescope in telescopes {
        table.add_row(row![
            telescope.name,
            telescope.nick,
            telescope.kind,
            commas(
                catalog
                    .telescope_wavelengths(telescope)
                    .iter()
                    .map(|w| w.name.to_string())
            ),
            opt(&telescope.diameter),
            opt(&telescope.built),
            opt(&telescope.decommissioned),
            catalog.telescope_detects(telescope),
        ]);
    }
    table
}

pub fn summarize_telescope(catalog: &Catalog, telescope: &Telescope) -> Table {
    let mut grid = Table::new();
    grid.add_row(row!["Name", telescope.name]);
    grid.add_row(row!["Nick", telescope.nick]);
    grid.add_row(row!["Type", telescope.kind]);
    grid.add_row(row![
        "Wavelength(s)",
        commas(
            catalog
                .telescope_wavelengths(telescope)
                .iter()
                .map(|w| w.name.to_string())
        )
    ]);
    grid.add_row(row!["Latitude", opt(&telescope.latitude)]);
    grid.add_row(row!["Longitude", opt(&telescope.longitude)]);
    grid.add_row(row!["Diameter (m)", opt(&telescope.diameter)]);
    grid.add_row(row!["Built", opt(&telescope.built)]);
    grid.add_row(row!["Decommissioned", opt(&telescope.decommissioned)]);
    grid.add_row(row!["Detections", catalog.telescope_detects(telescope)]);
    grid.add_row(row!["Notes", opt(&telescope.notes)]);
    grid
}
