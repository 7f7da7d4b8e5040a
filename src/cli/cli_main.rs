//! Interactive terminal menu. Thin plumbing: the prompts collect optional
//! filter criteria, the search module does the work and the display module
//! renders whatever comes back.

use prettytable::{Table, row};
use std::io::{self, Write};

use crate::catalog::Catalog;
use crate::chimie;
use crate::display::{
    summarize_molecule, summarize_source, summarize_telescope, tabulate_molecules,
    tabulate_sources, tabulate_telescopes,
};
use crate::search::{
    MoleculeQuery, SourceQuery, TelescopeQuery, search_molecules, search_sources,
    search_telescopes,
};

pub fn run_interactive_menu(catalog: &Catalog) {
    loop {
        show_main_menu(catalog);
        let choice = get_user_input();

        match choice.trim() {
            "1" => molecules_menu(catalog),
            "2" => sources_menu(catalog),
            "3" => telescopes_menu(catalog),
            "4" => formula_menu(),
            "0" => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid choice. Please try again."),
        }
    }
}

fn show_main_menu(catalog: &Catalog) {
    println!(
        "\x1b[34m\n{} space molecules, {} sources and {} telescopes in your terminal\n\x1b[0m",
        catalog.molecules.len(),
        catalog.sources.len(),
        catalog.telescopes.len()
    );
    println!("\x1b[33m1. Search molecules\x1b[0m");
    println!("\x1b[33m2. Search sources\x1b[0m");
    println!("\x1b[33m3. Search telescopes\x1b[0m");
    println!("\x1b[33m4. Formula properties\x1b[0m");
    println!("\x1b[33m0. Exit\x1b[0m");
    print!("\x1b[36mEnter your choice: \x1b[0m");
    let _ = io::stdout().flush();
}

fn get_user_input() -> String {
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        input.clear();
    }
    input
}

// Empty answer means "no criterion".
fn prompt(label: &str) -> Option<String> {
    print!("\x1b[36m{} (blank to skip): \x1b[0m", label);
    let _ = io::stdout().flush();
    let answer = get_user_input().trim().to_string();
    if answer.is_empty() { None } else { Some(answer) }
}

fn prompt_flag(label: &str) -> Option<bool> {
    match prompt(&format!("{} [y/n]", label)) {
        Some(answer) => match answer.to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(true),
            "n" | "no" => Some(false),
            _ => {
                println!("Unrecognized answer '{}', skipping this flag.", answer);
                None
            }
        },
        None => None,
    }
}

// One value means exact match, two mean an inclusive range.
fn prompt_bounds<N: std::str::FromStr>(label: &str) -> Option<Vec<N>> {
    let answer = prompt(&format!("{} (one value, or 'low high')", label))?;
    let mut values = Vec::new();
    for token in answer.split_whitespace() {
        match token.parse() {
            Ok(value) => values.push(value),
            Err(_) => {
                println!("'{}' is not a number, skipping this filter.", token);
                return None;
            }
        }
    }
    Some(values)
}

fn molecules_menu(catalog: &Catalog) {
    println!("\x1b[34m\nSearch molecules\x1b[0m");
    let query = MoleculeQuery {
        name: prompt("Name"),
        formula: prompt("Formula"),
        year: prompt_bounds("Discovery year"),
        mass: prompt_bounds("Mass in a.m.u."),
        source: prompt("Source"),
        telescope: prompt("Telescope"),
        wavelength: prompt("Wavelength band"),
        neutral: prompt_flag("Neutral"),
        cation: prompt_flag("Cation"),
        anion: prompt_flag("Anion"),
        radical: prompt_flag("Radical"),
        cyclic: prompt_flag("Cyclic"),
        fullerene: prompt_flag("Fullerene"),
        polyaromatic: prompt_flag("Polyaromatic"),
        ice: prompt_flag("Seen in ices"),
        ppd: prompt_flag("Seen in protoplanetary disks"),
        exgal: prompt_flag("Seen extragalactic"),
        exo: prompt_flag("Seen in exoplanet atmospheres"),
        like: prompt_flag("Substring matching").unwrap_or(false),
    };

    match search_molecules(catalog, &query) {
        Ok(results) if results.is_empty() => print_nothing(),
        Ok(results) if results.len() == 1 => {
            summarize_molecule(catalog, results[0]).printstd();
        }
        Ok(results) => tabulate_molecules(catalog, &results).printstd(),
        Err(e) => println!("\x1b[31m{}\x1b[0m", e),
    }
}

fn sources_menu(catalog: &Catalog) {
    println!("\x1b[34m\nSearch sources\x1b[0m");
    let query = SourceQuery {
        name: prompt("Name"),
        kind: prompt("Kind"),
        detects: prompt_bounds("Number of detections"),
        exgal: prompt_flag("Extragalactic"),
        exo: prompt_flag("Exoplanet"),
        like: prompt_flag("Substring matching").unwrap_or(false),
    };

    match search_sources(catalog, &query) {
        Ok(results) if results.is_empty() => print_nothing(),
        Ok(results) if results.len() == 1 => {
            summarize_source(catalog, results[0]).printstd();
        }
        Ok(results) => tabulate_sources(catalog, &results).printstd(),
        Err(e) => println!("\x1b[31m{}\x1b[0m", e),
    }
}

fn telescopes_menu(catalog: &Catalog) {
    println!("\x1b[34m\nSearch telescopes\x1b[0m");
    let query = TelescopeQuery {
        name: prompt("Name or nick"),
        kind: prompt("Kind"),
        wavelength: prompt("Wavelength band"),
        diameter: prompt_bounds("Diameter in meters"),
        built: prompt_bounds("Year built"),
        decommissioned: prompt_bounds("Year decommissioned"),
        detects: prompt_bounds("Number of detections"),
        like: prompt_flag("Substring matching").unwrap_or(false),
    };

    match search_telescopes(catalog, &query) {
        Ok(results) if results.is_empty() => print_nothing(),
        Ok(results) if results.len() == 1 => {
            summarize_telescope(catalog, results[0]).printstd();
        }
        Ok(results) => tabulate_telescopes(catalog, &results).printstd(),
        Err(e) => println!("\x1b[31m{}\x1b[0m", e),
    }
}

fn formula_menu() {
    let Some(formula) = prompt("Formula") else {
        return;
    };

    match chimie::composition(&formula) {
        Ok(composition) => {
            let mut grid = Table::new();
            grid.add_row(row![
                "Formula",
                chimie::formula_to_unicode(&formula).unwrap_or_else(|_| formula.clone())
            ]);
            grid.add_row(row![
                "Composition",
                composition
                    .by_symbol()
                    .iter()
                    .map(|(symbol, count)| format!("{symbol}:{count}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            ]);
            grid.add_row(row!["Mass (a.m.u.)", format!("{:.4}", composition.mass())]);
            grid.add_row(row!["Charge", composition.charge()]);
            grid.add_row(row!["Atoms", composition.natoms()]);
            grid.add_row(row!["Electrons", composition.nelectrons()]);
            grid.add_row(row![
                "Radical",
                if composition.is_radical() { "yes" } else { "no" }
            ]);
            grid.add_row(row![
                "Unsaturation",
                match composition.unsaturation() {
                    Some(value) => value.to_string(),
                    None => "N/A".to_string(),
                }
            ]);
            grid.printstd();
        }
        Err(e) => println!("\x1b[31m{}\x1b[0m", e),
    }
}

fn print_nothing() {
    println!("Nothing to show. Maybe try again with substring matching?");
}
