//! # Search Module
//!
//! ## Purpose
//! Query/filter engine over a loaded [`Catalog`]. Each entity kind has a
//! parameter struct of optional criteria; supplying none returns the whole
//! collection in its default order. Criteria combine with logical AND, and
//! every string criterion in a call switches to substring mode together when
//! the `like` flag is set.
//!
//! Internally every supplied criterion becomes a tagged [`Matcher`] variant
//! (text, numeric range, boolean flag), and one generic routine applies the
//! whole set to each record. Association criteria (a molecule's sources,
//! telescopes, wavelengths) match when *any* associated record satisfies the
//! predicate. Text comparison is ASCII-case-insensitive, like the SQL `LIKE`
//! the catalog's earlier incarnation was built on.

use std::cmp::Reverse;
use thiserror::Error;

use crate::catalog::{Catalog, Molecule, Source, Telescope};
use crate::chimie;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("A range filter takes at most two bounds, got {0}")]
    TooManyBounds(usize),
}

/// Optional criteria for a molecule search.
#[derive(Debug, Clone, Default)]
pub struct MoleculeQuery {
    pub like: bool,
    pub name: Option<String>,
    pub formula: Option<String>,
    pub year: Option<Vec<i32>>,
    pub mass: Option<Vec<f64>>,
    pub source: Option<String>,
    pub telescope: Option<String>,
    pub wavelength: Option<String>,
    pub neutral: Option<bool>,
    pub cation: Option<bool>,
    pub anion: Option<bool>,
    pub radical: Option<bool>,
    pub cyclic: Option<bool>,
    pub fullerene: Option<bool>,
    pub polyaromatic: Option<bool>,
    pub ice: Option<bool>,
    pub ppd: Option<bool>,
    pub exgal: Option<bool>,
    pub exo: Option<bool>,
}

/// Optional criteria for a source search.
#[derive(Debug, Clone, Default)]
pub struct SourceQuery {
    pub like: bool,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub detects: Option<Vec<i64>>,
    pub exgal: Option<bool>,
    pub exo: Option<bool>,
}

/// Optional criteria for a telescope search.
#[derive(Debug, Clone, Default)]
pub struct TelescopeQuery {
    pub like: bool,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub wavelength: Option<String>,
    pub diameter: Option<Vec<f64>>,
    pub built: Option<Vec<i64>>,
    pub decommissioned: Option<Vec<i64>>,
    pub detects: Option<Vec<i64>>,
}

// One supplied criterion, tagged by comparison semantics and carrying its
// field accessor. Text accessors return every candidate value (a name plus a
// nick, or all associated names) and match when any of them does.
enum Matcher<'a, T> {
    Text {
        get: Box<dyn Fn(&T) -> Vec<String> + 'a>,
        term: String,
    },
    Range {
        get: Box<dyn Fn(&T) -> Option<f64> + 'a>,
        lo: f64,
        hi: f64,
    },
    Flag {
        get: Box<dyn Fn(&T) -> bool + 'a>,
        want: bool,
    },
}

impl<T> Matcher<'_, T> {
    fn matches(&self, like: bool, item: &T) -> bool {
        match self {
            Matcher::Text { get, term } => get(item).iter().any(|v| text_match(like, term, v)),
            Matcher::Range { get, lo, hi } => {
                get(item).is_some_and(|v| v >= *lo && v <= *hi)
            }
            Matcher::Flag { get, want } => get(item) == *want,
        }
    }
}

fn text_match(like: bool, term: &str, value: &str) -> bool {
    if like {
        value
            .to_ascii_lowercase()
            .contains(&term.to_ascii_lowercase())
    } else {
        value.eq_ignore_ascii_case(term)
    }
}

// Zero bounds impose no constraint (the matcher is not built at all), one
// bound is an exact-value match, two are inclusive limits. More than two is
// a caller error. A record whose field is absent never satisfies a bounded
// range.
fn range_bounds(values: &[f64]) -> Result<Option<(f64, f64)>, FilterError> {
    match values {
        [] => Ok(None),
        [v] => Ok(Some((*v, *v))),
        [lo, hi] => Ok(Some((*lo, *hi))),
        more => Err(FilterError::TooManyBounds(more.len())),
    }
}

fn push_range<'a, T>(
    matchers: &mut Vec<Matcher<'a, T>>,
    values: &Option<Vec<f64>>,
    get: impl Fn(&T) -> Option<f64> + 'a,
) -> Result<(), FilterError> {
    if let Some(values) = values {
        if let Some((lo, hi)) = range_bounds(values)? {
            matchers.push(Matcher::Range {
                get: Box::new(get),
                lo,
                hi,
            });
        }
    }
    Ok(())
}

fn push_flag<'a, T>(
    matchers: &mut Vec<Matcher<'a, T>>,
    value: Option<bool>,
    get: impl Fn(&T) -> bool + 'a,
) {
    if let Some(want) = value {
        matchers.push(Matcher::Flag {
            get: Box::new(get),
            want,
        });
    }
}

fn push_text<'a, T>(
    matchers: &mut Vec<Matcher<'a, T>>,
    term: &Option<String>,
    get: impl Fn(&T) -> Vec<String> + 'a,
) {
    if let Some(term) = term {
        matchers.push(Matcher::Text {
            get: Box::new(get),
            term: term.clone(),
        });
    }
}

fn apply<'c, T>(items: &'c [T], matchers: &[Matcher<'_, T>], like: bool) -> Vec<&'c T> {
    items
        .iter()
        .filter(|item| matchers.iter().all(|m| m.matches(like, item)))
        .collect()
}

fn to_f64s<N: Copy + Into<f64>>(values: &Option<Vec<N>>) -> Option<Vec<f64>> {
    values
        .as_ref()
        .map(|v| v.iter().map(|&n| n.into()).collect())
}

fn to_f64s_i64(values: &Option<Vec<i64>>) -> Option<Vec<f64>> {
    values
        .as_ref()
        .map(|v| v.iter().map(|&n| n as f64).collect())
}

/// Searches molecules. Results are ordered by discovery year ascending;
/// molecules with no recorded year sort last, and ties keep storage order.
pub fn search_molecules<'c>(
    catalog: &'c Catalog,
    query: &MoleculeQuery,
) -> Result<Vec<&'c Molecule>, FilterError> {
    let mut matchers: Vec<Matcher<Molecule>> = Vec::new();

    push_text(&mut matchers, &query.name, |m: &Molecule| {
        vec![m.name.clone()]
    });
    push_text(&mut matchers, &query.formula, |m: &Molecule| {
        vec![m.formula.clone()]
    });
    push_text(&mut matchers, &query.source, |m: &Molecule| {
        catalog
            .sources_of(m)
            .iter()
            .map(|s| s.name.clone())
            .collect()
    });
    push_text(&mut matchers, &query.telescope, |m: &Molecule| {
        catalog
            .telescopes_of(m)
            .iter()
            .flat_map(|t| [t.name.clone(), t.nick.clone()])
            .collect()
    });
    push_text(&mut matchers, &query.wavelength, |m: &Molecule| {
        catalog
            .wavelengths_of(m)
            .iter()
            .map(|w| w.name.to_string())
            .collect()
    });

    push_range(&mut matchers, &to_f64s(&query.year), |m: &Molecule| {
        m.year.map(f64::from)
    })?;
    // The mass criterion is a derived property: the chemistry engine computes
    // it from the formula for each candidate record.
    push_range(&mut matchers, &query.mass, |m: &Molecule| {
        chimie::molecular_mass(&m.formula).ok()
    })?;

    push_flag(&mut matchers, query.neutral, |m: &Molecule| m.neutral);
    push_flag(&mut matchers, query.cation, |m: &Molecule| m.cation);
    push_flag(&mut matchers, query.anion, |m: &Molecule| m.anion);
    push_flag(&mut matchers, query.radical, |m: &Molecule| m.radical);
    push_flag(&mut matchers, query.cyclic, |m: &Molecule| m.cyclic);
    push_flag(&mut matchers, query.fullerene, |m: &Molecule| m.fullerene);
    push_flag(&mut matchers, query.polyaromatic, |m: &Molecule| {
        m.polyaromatic
    });
    push_flag(&mut matchers, query.ice, |m: &Molecule| m.ice);
    push_flag(&mut matchers, query.ppd, |m: &Molecule| m.ppd);
    push_flag(&mut matchers, query.exgal, |m: &Molecule| m.exgal);
    push_flag(&mut matchers, query.exo, |m: &Molecule| m.exo);

    let mut results = apply(&catalog.molecules, &matchers, query.like);
    results.sort_by_key(|m| (m.year.is_none(), m.year));
    Ok(results)
}

/// Searches sources, ordered by detection count descending (stable).
pub fn search_sources<'c>(
    catalog: &'c Catalog,
    query: &SourceQuery,
) -> Result<Vec<&'c Source>, FilterError> {
    let mut matchers: Vec<Matcher<Source>> = Vec::new();

    push_text(&mut matchers, &query.name, |s: &Source| {
        vec![s.name.clone()]
    });
    push_text(&mut matchers, &query.kind, |s: &Source| {
        vec![s.kind.clone()]
    });
    push_range(&mut matchers, &to_f64s_i64(&query.detects), |s: &Source| {
        Some(catalog.source_detects(s) as f64)
    })?;
    push_flag(&mut matchers, query.exgal, |s: &Source| s.exgal);
    push_flag(&mut matchers, query.exo, |s: &Source| s.exo);

    let mut results = apply(&catalog.sources, &matchers, query.like);
    results.sort_by_key(|s| Reverse(catalog.source_detects(s)));
    Ok(results)
}

/// Searches telescopes, ordered by detection count descending (stable). The
/// name criterion matches either the full name or the nick.
pub fn search_telescopes<'c>(
    catalog: &'c Catalog,
    query: &TelescopeQuery,
) -> Result<Vec<&'c Telescope>, FilterError> {
    let mut matchers: Vec<Matcher<Telescope>> = Vec::new();

    push_text(&mut matchers, &query.name, |t: &Telescope| {
        vec![t.name.clone(), t.nick.clone()]
    });
    push_text(&mut matchers, &query.kind, |t: &Telescope| {
        vec![t.kind.clone()]
    });
    push_text(&mut matchers, &query.wavelength, |t: &Telescope| {
        catalog
            .telescope_wavelengths(t)
            .iter()
            .map(|w| w.name.to_string())
            .collect()
    });

    push_range(&mut matchers, &query.diameter, |t: &Telescope| t.diameter)?;
    push_range(&mut matchers, &to_f64s_i64(&query.built), |t: &Telescope| {
        t.built.map(f64::from)
    })?;
    push_range(
        &mut matchers,
        &to_f64s_i64(&query.decommissioned),
        |t: &Telescope| t.decommissioned.map(f64::from),
    )?;
    push_range(
        &mut matchers,
        &to_f64s_i64(&query.detects),
        |t: &Telescope| Some(catalog.telescope_detects(t) as f64),
    )?;

    let mut results = apply(&catalog.telescopes, &matchers, query.like);
    results.sort_by_key(|t| Reverse(catalog.telescope_detects(t)));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MoleculeRecord, SourceRecord, TelescopeRecord};

    fn catalog() -> Catalog {
        let sources = vec![
            SourceRecord {
                name: "TMC-1".to_string(),
                kind: "Dark Cloud".to_string(),
                ..Default::default()
            },
            SourceRecord {
                name: "IRC+10216".to_string(),
                kind: "Carbon Star".to_string(),
                ..Default::default()
            },
            SourceRecord {
                name: "Sgr B2".to_string(),
                kind: "SFR".to_string(),
                ..Default::default()
            },
        ];
        let telescopes = vec![
            TelescopeRecord {
                name: "NRAO 36-ft Telescope".to_string(),
                nick: "NRAO 36-ft".to_string(),
                kind: "Single Dish".to_string(),
                wavelengths: vec!["mm".to_string()],
                diameter: Some(11.0),
                built: Some(1967),
                decommissioned: Some(1984),
                ..Default::default()
            },
            TelescopeRecord {
                name: "Green Bank Telescope".to_string(),
                nick: "GBT".to_string(),
                kind: "Single Dish".to_string(),
                wavelengths: vec!["cm".to_string(), "mm".to_string()],
                diameter: Some(100.0),
                built: Some(2004),
                ..Default::default()
            },
            TelescopeRecord {
                name: "Hubble Space Telescope".to_string(),
                nick: "Hubble".to_string(),
                kind: "Space".to_string(),
                wavelengths: vec!["IR".to_string(), "Vis".to_string(), "UV".to_string()],
                diameter: Some(2.4),
                built: Some(1990),
                ..Default::default()
            },
        ];
        let molecules = vec![
            MoleculeRecord {
                label: "CH".to_string(),
                name: "methylidyne".to_string(),
                formula: "CH".to_string(),
                year: Some(1937),
                sources: vec!["TMC-1".to_string()],
                wavelengths: vec!["Vis".to_string()],
                ..Default::default()
            },
            MoleculeRecord {
                label: "CO".to_string(),
                name: "carbon monoxide".to_string(),
                formula: "CO".to_string(),
                year: Some(1970),
                sources: vec!["Sgr B2".to_string()],
                telescopes: vec!["NRAO 36-ft".to_string()],
                wavelengths: vec!["mm".to_string()],
                ..Default::default()
            },
            MoleculeRecord {
                label: "C3N".to_string(),
                name: "cyanoethynyl radical".to_string(),
                formula: "C3N".to_string(),
                year: Some(1977),
                sources: vec!["IRC+10216".to_string(), "TMC-1".to_string()],
                telescopes: vec!["NRAO 36-ft".to_string()],
                wavelengths: vec!["mm".to_string()],
                ..Default::default()
            },
            MoleculeRecord {
                label: "C6H-".to_string(),
                name: "hexatriynyl anion".to_string(),
                formula: "C6H-".to_string(),
                year: Some(2006),
                sources: vec!["TMC-1".to_string(), "IRC+10216".to_string()],
                telescopes: vec!["GBT".to_string()],
                wavelengths: vec!["cm".to_string()],
                ..Default::default()
            },
            MoleculeRecord {
                label: "CH+".to_string(),
                name: "methylidyne cation".to_string(),
                formula: "CH+".to_string(),
                year: Some(1941),
                wavelengths: vec!["Vis".to_string()],
                ..Default::default()
            },
        ];
        Catalog::build(molecules, sources, telescopes).unwrap()
    }

    #[test]
    fn test_no_criteria_returns_everything_by_year() {
        let catalog = catalog();
        let all = search_molecules(&catalog, &MoleculeQuery::default()).unwrap();
        assert_eq!(all.len(), 5);
        let years: Vec<_> = all.iter().map(|m| m.year.unwrap()).collect();
        assert_eq!(years, vec![1937, 1941, 1970, 1977, 2006]);
    }

    #[test]
    fn test_exact_year_and_year_range() {
        let catalog = catalog();

        let exact = search_molecules(
            &catalog,
            &MoleculeQuery {
                year: Some(vec![1970]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].label, "CO");

        let range = search_molecules(
            &catalog,
            &MoleculeQuery {
                year: Some(vec![1940, 1980]),
                ..Default::default()
            },
        )
        .unwrap();
        let labels: Vec<_> = range.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["CH+", "CO", "C3N"]);
    }

    #[test]
    fn test_empty_range_vector_imposes_nothing() {
        let catalog = catalog();
        let all = search_molecules(
            &catalog,
            &MoleculeQuery {
                year: Some(vec![]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_three_bounds_is_a_caller_error() {
        let catalog = catalog();
        let result = search_molecules(
            &catalog,
            &MoleculeQuery {
                year: Some(vec![1, 2, 3]),
                ..Default::default()
            },
        );
        assert_eq!(result.unwrap_err(), FilterError::TooManyBounds(3));
    }

    #[test]
    fn test_any_associated_source_matches() {
        let catalog = catalog();
        let hits = search_molecules(
            &catalog,
            &MoleculeQuery {
                source: Some("TMC-1".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let labels: Vec<_> = hits.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["CH", "C3N", "C6H-"]);
    }

    #[test]
    fn test_like_substring_mode() {
        let catalog = catalog();
        let hits = search_molecules(
            &catalog,
            &MoleculeQuery {
                like: true,
                source: Some("TMC".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(hits.len(), 3);

        // Exact mode must not match the fragment.
        let none = search_molecules(
            &catalog,
            &MoleculeQuery {
                source: Some("TMC".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_telescope_criterion_matches_name_or_nick() {
        let catalog = catalog();
        for term in ["NRAO 36-ft", "NRAO 36-ft Telescope"] {
            let hits = search_molecules(
                &catalog,
                &MoleculeQuery {
                    telescope: Some(term.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
            let labels: Vec<_> = hits.iter().map(|m| m.label.as_str()).collect();
            assert_eq!(labels, vec!["CO", "C3N"], "term {term:?}");
        }
    }

    #[test]
    fn test_flag_filters() {
        let catalog = catalog();
        let anions = search_molecules(
            &catalog,
            &MoleculeQuery {
                anion: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(anions.len(), 1);
        assert_eq!(anions[0].label, "C6H-");

        let radicals = search_molecules(
            &catalog,
            &MoleculeQuery {
                radical: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        let labels: Vec<_> = radicals.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["CH", "C3N"]);
    }

    #[test]
    fn test_mass_range_filter() {
        let catalog = catalog();
        // CO is 28.010 a.m.u.; CH, CH+ are ~13; C3N ~50; C6H- ~73.
        let hits = search_molecules(
            &catalog,
            &MoleculeQuery {
                mass: Some(vec![20.0, 30.0]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, "CO");
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let catalog = catalog();
        let hits = search_molecules(
            &catalog,
            &MoleculeQuery {
                name: Some("unobtainium".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_sources_ordered_by_detects() {
        let catalog = catalog();
        let all = search_sources(&catalog, &SourceQuery::default()).unwrap();
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        // TMC-1 has 3 detections, IRC+10216 2, Sgr B2 1.
        assert_eq!(names, vec!["TMC-1", "IRC+10216", "Sgr B2"]);

        let busy = search_sources(
            &catalog,
            &SourceQuery {
                detects: Some(vec![2, 3]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(busy.len(), 2);
    }

    #[test]
    fn test_telescope_ranges_skip_absent_fields() {
        let catalog = catalog();
        // Only the NRAO 36-ft has a decommissioned year; the bounded range
        // must not match telescopes where the field is absent.
        let hits = search_telescopes(
            &catalog,
            &TelescopeQuery {
                decommissioned: Some(vec![1900, 2100]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].nick, "NRAO 36-ft");
    }

    #[test]
    fn test_telescope_name_or_nick_and_wavelength() {
        let catalog = catalog();
        let by_nick = search_telescopes(
            &catalog,
            &TelescopeQuery {
                name: Some("GBT".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_nick.len(), 1);
        assert_eq!(by_nick[0].name, "Green Bank Telescope");

        let mm = search_telescopes(
            &catalog,
            &TelescopeQuery {
                wavelength: Some("mm".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(mm.len(), 2);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let catalog = catalog();
        let hits = search_molecules(
            &catalog,
            &MoleculeQuery {
                name: Some("Carbon Monoxide".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, "CO");
    }

    #[test]
    fn test_criteria_combine_with_and() {
        let catalog = catalog();
        let hits = search_molecules(
            &catalog,
            &MoleculeQuery {
                source: Some("TMC-1".to_string()),
                radical: Some(true),
                year: Some(vec![1970, 1980]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, "C3N");
    }
}
