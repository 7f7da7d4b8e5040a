//! Chemical formula parser and derived-property calculator.
//!
//! Parses a molecular formula string (optionally carrying a structural prefix
//! like `c-` for cyclic, nested parenthesized groups with repeat counts, and a
//! trailing charge annotation like `+` or `-2`) into an atomic composition and
//! a net charge. From the composition it derives the molecular mass, atom and
//! electron counts, radical parity and the degree of unsaturation. Ray's
//! asymmetry parameter is computed here too, from the rotational constants
//! stored alongside each molecule.
//!
//! Parsing is all-or-nothing: a formula that does not match the grammar is
//! rejected with a [`ParseError`], never coerced into a partial composition.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

// Rest mass of the electron in atomic mass units.
pub const ELECTRON_MASS: f64 = 5.489e-4;

// Structural prefixes stripped before parsing: cyclic, linear, iso, normal.
pub const STRUCTURAL_PREFIXES: [&str; 4] = ["c-", "l-", "i-", "n-"];

pub struct Element {
    pub symbol: &'static str,
    pub mass: f64,
}

// IUPAC standard atomic weights, indexed by atomic number minus one. The
// trailing Uu* placeholders keep the table aligned with older formula data.
pub const ELEMENTS: &[Element] = &[
    Element { symbol: "H", mass: 1.008 },
    Element { symbol: "He", mass: 4.002602 },
    Element { symbol: "Li", mass: 6.94 },
    Element { symbol: "Be", mass: 9.0121831 },
    Element { symbol: "B", mass: 10.81 },
    Element { symbol: "C", mass: 12.011 },
    Element { symbol: "N", mass: 14.007 },
    Element { symbol: "O", mass: 15.999 },
    Element { symbol: "F", mass: 18.998403163 },
    Element { symbol: "Ne", mass: 20.1797 },
    Element { symbol: "Na", mass: 22.98976928 },
    Element { symbol: "Mg", mass: 24.305 },
    Element { symbol: "Al", mass: 26.9815385 },
    Element { symbol: "Si", mass: 28.085 },
    Element { symbol: "P", mass: 30.973761998 },
    Element { symbol: "S", mass: 32.06 },
    Element { symbol: "Cl", mass: 35.45 },
    Element { symbol: "Ar", mass: 39.948 },
    Element { symbol: "K", mass: 39.0983 },
    Element { symbol: "Ca", mass: 40.078 },
    Element { symbol: "Sc", mass: 44.955908 },
    Element { symbol: "Ti", mass: 47.867 },
    Element { symbol: "V", mass: 50.9415 },
    Element { symbol: "Cr", mass: 51.9961 },
    Element { symbol: "Mn", mass: 54.938044 },
    Element { symbol: "Fe", mass: 55.845 },
    Element { symbol: "Co", mass: 58.933194 },
    Element { symbol: "Ni", mass: 58.6934 },
    Element { symbol: "Cu", mass: 63.546 },
    Element { symbol: "Zn", mass: 65.38 },
    Element { symbol: "Ga", mass: 69.723 },
    Element { symbol: "Ge", mass: 72.630 },
    Element { symbol: "As", mass: 74.921595 },
    Element { symbol: "Se", mass: 78.971 },
    Element { symbol: "Br", mass: 79.904 },
    Element { symbol: "Kr", mass: 83.798 },
    Element { symbol: "Rb", mass: 85.4678 },
    Element { symbol: "Sr", mass: 87.62 },
    Element { symbol: "Y", mass: 88.90584 },
    Element { symbol: "Zr", mass: 91.224 },
    Element { symbol: "Nb", mass: 92.90637 },
    Element { symbol: "Mo", mass: 95.95 },
    Element { symbol: "Tc", mass: 98.0 },
    Element { symbol: "Ru", mass: 101.07 },
    Element { symbol: "Rh", mass: 102.90550 },
    Element { symbol: "Pd", mass: 106.42 },
    Element { symbol: "Ag", mass: 107.8682 },
    Element { symbol: "Cd", mass: 112.414 },
    Element { symbol: "In", mass: 114.818 },
    Element { symbol: "Sn", mass: 118.710 },
    Element { symbol: "Sb", mass: 121.760 },
    Element { symbol: "Te", mass: 127.60 },
    Element { symbol: "I", mass: 126.90447 },
    Element { symbol: "Xe", mass: 131.293 },
    Element { symbol: "Cs", mass: 132.90545196 },
    Element { symbol: "Ba", mass: 137.327 },
    Element { symbol: "La", mass: 138.90547 },
    Element { symbol: "Ce", mass: 140.116 },
    Element { symbol: "Pr", mass: 140.90766 },
    Element { symbol: "Nd", mass: 144.242 },
    Element { symbol: "Pm", mass: 145.0 },
    Element { symbol: "Sm", mass: 150.36 },
    Element { symbol: "Eu", mass: 151.964 },
    Element { symbol: "Gd", mass: 157.25 },
    Element { symbol: "Tb", mass: 158.92535 },
    Element { symbol: "Dy", mass: 162.500 },
    Element { symbol: "Ho", mass: 164.93033 },
    Element { symbol: "Er", mass: 167.259 },
    Element { symbol: "Tm", mass: 168.93422 },
    Element { symbol: "Yb", mass: 173.045 },
    Element { symbol: "Lu", mass: 174.9668 },
    Element { symbol: "Hf", mass: 178.49 },
    Element { symbol: "Ta", mass: 180.94788 },
    Element { symbol: "W", mass: 183.84 },
    Element { symbol: "Re", mass: 186.207 },
    Element { symbol: "Os", mass: 190.23 },
    Element { symbol: "Ir", mass: 192.217 },
    Element { symbol: "Pt", mass: 195.084 },
    Element { symbol: "Au", mass: 196.966569 },
    Element { symbol: "Hg", mass: 200.592 },
    Element { symbol: "Tl", mass: 204.38 },
    Element { symbol: "Pb", mass: 207.2 },
    Element { symbol: "Bi", mass: 208.98040 },
    Element { symbol: "Po", mass: 209.0 },
    Element { symbol: "At", mass: 210.0 },
    Element { symbol: "Rn", mass: 222.0 },
    Element { symbol: "Fr", mass: 223.0 },
    Element { symbol: "Ra", mass: 226.0 },
    Element { symbol: "Ac", mass: 227.0 },
    Element { symbol: "Th", mass: 232.0377 },
    Element { symbol: "Pa", mass: 231.03588 },
    Element { symbol: "U", mass: 238.02891 },
    Element { symbol: "Np", mass: 237.0 },
    Element { symbol: "Pu", mass: 244.0 },
    Element { symbol: "Am", mass: 243.0 },
    Element { symbol: "Cm", mass: 247.0 },
    Element { symbol: "Bk", mass: 247.0 },
    Element { symbol: "Cf", mass: 251.0 },
    Element { symbol: "Es", mass: 252.0 },
    Element { symbol: "Fm", mass: 257.0 },
    Element { symbol: "Md", mass: 258.0 },
    Element { symbol: "No", mass: 259.0 },
    Element { symbol: "Lr", mass: 266.0 },
    Element { symbol: "Rf", mass: 267.0 },
    Element { symbol: "Db", mass: 268.0 },
    Element { symbol: "Sg", mass: 269.0 },
    Element { symbol: "Bh", mass: 270.0 },
    Element { symbol: "Hs", mass: 269.0 },
    Element { symbol: "Mt", mass: 278.0 },
    Element { symbol: "Ds", mass: 281.0 },
    Element { symbol: "Rg", mass: 282.0 },
    Element { symbol: "Cn", mass: 285.0 },
    Element { symbol: "Uut", mass: 286.0 },
    Element { symbol: "Fl", mass: 289.0 },
    Element { symbol: "Uup", mass: 289.0 },
    Element { symbol: "Lv", mass: 293.0 },
    Element { symbol: "Uus", mass: 294.0 },
    Element { symbol: "Uuo", mass: 294.0 },
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Cannot have more than one charge sign in the formula '{0}'")]
    MultipleChargeSigns(String),
    #[error("Unknown element symbol at '{0}'")]
    UnknownSymbol(String),
    #[error("Unbalanced parentheses in formula '{0}'")]
    UnbalancedParens(String),
    #[error("Empty stoichiometric section in formula '{0}'")]
    EmptyFormula(String),
    #[error("Malformed charge token '{0}'")]
    MalformedCharge(String),
    #[error("Atom count out of range in formula '{0}'")]
    CountOverflow(String),
}

/// Atomic composition of a formula: atom counts keyed by atomic number, plus
/// the net charge kept apart from the element entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Composition {
    counts: BTreeMap<usize, u32>,
    charge: i32,
}

impl Composition {
    /// Atom count for the element with the given atomic number.
    pub fn count(&self, z: usize) -> u32 {
        self.counts.get(&z).copied().unwrap_or(0)
    }

    /// Net charge, 0 when the formula carried no charge annotation.
    pub fn charge(&self) -> i32 {
        self.charge
    }

    /// Counts keyed by element symbol, in atomic-number order. This is the
    /// display form; the charge entry is excluded.
    pub fn by_symbol(&self) -> BTreeMap<&'static str, u32> {
        self.counts
            .iter()
            .map(|(&z, &n)| (ELEMENTS[z - 1].symbol, n))
            .collect()
    }

    /// Molecular mass in a.m.u. Cations lose an electron mass per unit of
    /// charge, anions gain one.
    pub fn mass(&self) -> f64 {
        let atoms: f64 = self
            .counts
            .iter()
            .map(|(&z, &n)| ELEMENTS[z - 1].mass * n as f64)
            .sum();
        atoms - self.charge as f64 * ELECTRON_MASS
    }

    /// Total number of atoms.
    pub fn natoms(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Total number of electrons: protons summed over all atoms, minus the
    /// net charge.
    pub fn nelectrons(&self) -> i64 {
        let protons: i64 = self.counts.iter().map(|(&z, &n)| z as i64 * n as i64).sum();
        protons - self.charge as i64
    }

    /// A molecule with an odd electron count is a radical.
    pub fn is_radical(&self) -> bool {
        self.nelectrons() % 2 != 0
    }

    /// Degree of unsaturation, `1 + (2C - H + N - Cl - F) / 2`. Defined only
    /// for element sets within {C, H, O, N, F, Cl, Br, I, At, Te}; for any
    /// other element the notion does not apply and `None` is returned.
    pub fn unsaturation(&self) -> Option<f64> {
        const ALLOWED: [usize; 10] = [6, 1, 8, 7, 9, 17, 35, 53, 85, 52];
        if !self.counts.keys().all(|z| ALLOWED.contains(z)) {
            return None;
        }
        let n = |z: usize| self.count(z) as f64;
        Some(1.0 + 0.5 * (2.0 * n(6) - n(1) + n(7) - n(17) - n(9)))
    }
}

/// Ray's asymmetry parameter, `(2B - A - C) / (A - C)`, with absent constants
/// read as zero. Two special cases are kept from the source data: when none
/// of A, B, C are known there is no value at all, and when only B is known
/// the stored sentinel is -1 rather than the (degenerate) formula result.
pub fn kappa(a: Option<f64>, b: Option<f64>, c: Option<f64>) -> Option<f64> {
    if a.is_none() && b.is_none() && c.is_none() {
        return None;
    }
    if a.is_none() && c.is_none() {
        return Some(-1.0);
    }
    let (a, b, c) = (
        a.unwrap_or(0.0),
        b.unwrap_or(0.0),
        c.unwrap_or(0.0),
    );
    Some((2.0 * b - a - c) / (a - c))
}

fn symbol_index() -> &'static BTreeMap<&'static str, usize> {
    static INDEX: OnceLock<BTreeMap<&'static str, usize>> = OnceLock::new();
    INDEX.get_or_init(|| {
        ELEMENTS
            .iter()
            .enumerate()
            .map(|(i, e)| (e.symbol, i + 1))
            .collect()
    })
}

fn charge_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([+-])(\d*)$").expect("charge regex is valid"))
}

/// Splits a formula into its structural prefix, stoichiometric section and
/// charge annotation. The prefix and charge parts may be empty. At most one
/// `+` or `-` character may appear in the whole formula.
pub fn partition_formula(formula: &str) -> Result<(&'static str, &str, &str), ParseError> {
    let mut rest = formula.trim();
    let mut prefix: &'static str = "";
    for p in STRUCTURAL_PREFIXES {
        if let Some(stripped) = rest.strip_prefix(p) {
            prefix = p;
            rest = stripped;
            break;
        }
    }

    let signs = rest.chars().filter(|c| *c == '+' || *c == '-').count();
    if signs > 1 {
        return Err(ParseError::MultipleChargeSigns(formula.to_string()));
    }
    if let Some(at) = rest.find(['+', '-']) {
        let (stoich, charge) = rest.split_at(at);
        Ok((prefix, stoich, charge))
    } else {
        Ok((prefix, rest, ""))
    }
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    // Greedy longest match against the periodic-table symbols, three bytes
    // down to one, so that "Cl" is never read as carbon followed by junk.
    fn element(&mut self) -> Result<usize, ParseError> {
        let index = symbol_index();
        for len in (1..=3).rev() {
            let end = self.pos + len;
            if end > self.bytes.len() || !self.src.is_char_boundary(end) {
                continue;
            }
            let candidate = &self.src[self.pos..end];
            if let Some(&z) = index.get(candidate) {
                self.pos += len;
                return Ok(z);
            }
        }
        Err(ParseError::UnknownSymbol(self.src[self.pos..].to_string()))
    }

    // Integer repeat count, defaulting to 1 when absent. A digit run that
    // does not fit in u32 is rejected, never coerced.
    fn repeat(&mut self) -> Result<u32, ParseError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(1);
        }
        self.src[start..self.pos]
            .parse()
            .map_err(|_| ParseError::CountOverflow(self.src.to_string()))
    }

    fn accumulate(
        &self,
        counts: &mut BTreeMap<usize, u32>,
        z: usize,
        n: u32,
    ) -> Result<(), ParseError> {
        let entry = counts.entry(z).or_insert(0);
        *entry = entry
            .checked_add(n)
            .ok_or_else(|| ParseError::CountOverflow(self.src.to_string()))?;
        Ok(())
    }

    // formula := term+ ; term := (element | '(' formula ')') integer?
    // Group counts are multiplied through before being merged upward, and
    // repeated element occurrences sum into a single entry.
    fn terms(&mut self, depth: usize) -> Result<BTreeMap<usize, u32>, ParseError> {
        let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
        loop {
            match self.peek() {
                None => break,
                Some(b'(') => {
                    self.pos += 1;
                    let inner = self.terms(depth + 1)?;
                    if self.peek() != Some(b')') {
                        return Err(ParseError::UnbalancedParens(self.src.to_string()));
                    }
                    self.pos += 1;
                    let mult = self.repeat()?;
                    for (z, n) in inner {
                        let scaled = n
                            .checked_mul(mult)
                            .ok_or_else(|| ParseError::CountOverflow(self.src.to_string()))?;
                        self.accumulate(&mut counts, z, scaled)?;
                    }
                }
                Some(b')') => {
                    if depth == 0 {
                        return Err(ParseError::UnbalancedParens(self.src.to_string()));
                    }
                    break;
                }
                Some(_) => {
                    let z = self.element()?;
                    let mult = self.repeat()?;
                    self.accumulate(&mut counts, z, mult)?;
                }
            }
        }
        Ok(counts)
    }
}

/// Parses a molecular formula into its atomic composition.
///
/// ```
/// use spacemol::chimie::composition;
///
/// let water = composition("H2O").unwrap();
/// assert_eq!(water.count(1), 2);
/// assert_eq!(water.count(8), 1);
/// assert_eq!(water.charge(), 0);
/// ```
pub fn composition(formula: &str) -> Result<Composition, ParseError> {
    let (_, stoich, charge_str) = partition_formula(formula)?;
    if stoich.is_empty() {
        return Err(ParseError::EmptyFormula(formula.to_string()));
    }

    let mut scanner = Scanner::new(stoich);
    let counts = scanner.terms(0)?;

    let charge = if charge_str.is_empty() {
        0
    } else {
        let caps = charge_regex()
            .captures(charge_str)
            .ok_or_else(|| ParseError::MalformedCharge(charge_str.to_string()))?;
        let magnitude: i32 = match &caps[2] {
            "" => 1,
            digits => digits
                .parse()
                .map_err(|_| ParseError::MalformedCharge(charge_str.to_string()))?,
        };
        if &caps[1] == "-" { -magnitude } else { magnitude }
    };

    Ok(Composition { counts, charge })
}

/// Molecular mass of a formula, in a.m.u.
pub fn molecular_mass(formula: &str) -> Result<f64, ParseError> {
    Ok(composition(formula)?.mass())
}

const SUBSCRIPTS: [(&str, &str); 10] = [
    ("0", "\u{2080}"),
    ("1", "\u{2081}"),
    ("2", "\u{2082}"),
    ("3", "\u{2083}"),
    ("4", "\u{2084}"),
    ("5", "\u{2085}"),
    ("6", "\u{2086}"),
    ("7", "\u{2087}"),
    ("8", "\u{2088}"),
    ("9", "\u{2089}"),
];

const SUPERSCRIPTS: [(&str, &str); 12] = [
    ("+", "\u{207A}"),
    ("-", "\u{207B}"),
    ("0", "\u{2070}"),
    ("1", "\u{B9}"),
    ("2", "\u{B2}"),
    ("3", "\u{B3}"),
    ("4", "\u{2074}"),
    ("5", "\u{2075}"),
    ("6", "\u{2076}"),
    ("7", "\u{2077}"),
    ("8", "\u{2078}"),
    ("9", "\u{2079}"),
];

/// Pretty form of a formula for terminal display: stoichiometric digits as
/// unicode subscripts, the charge annotation as superscripts. Pure string
/// substitution, no chemistry involved.
pub fn formula_to_unicode(formula: &str) -> Result<String, ParseError> {
    let (prefix, stoich, charge) = partition_formula(formula)?;
    let mut stoich = stoich.to_string();
    for (plain, fancy) in SUBSCRIPTS {
        stoich = stoich.replace(plain, fancy);
    }
    let mut charge = charge.to_string();
    for (plain, fancy) in SUPERSCRIPTS {
        charge = charge.replace(plain, fancy);
    }
    Ok(format!("{prefix}{stoich}{charge}"))
}
