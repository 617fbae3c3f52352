//! Mass calculator and fragment-ion constructor (§4.6): thin external collaborators that
//! exercise the data model without adding parsing/serialization logic of their own.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{Context, ProFormaError, ProFormaErrorKind};
use crate::modification::Modification;
use crate::residue::Residue;
use crate::residue_table::{H, O};

/// Monoisotopic mass of a proton, used to convert a neutral mass to m/z.
pub const PROTON: f64 = crate::residue_table::PROTON;

/// A table callers may supply to resolve a modification's mass from its `primary_value` (e.g. a
/// named-modification lookup) when the modification's own `ModificationValue::mass` is absent.
pub type ModificationMassTable<'a> = dyn Fn(&str) -> Option<f64> + 'a;

/// Sum the monoisotopic mass of `residues` and every attached modification, adding `n_term` and
/// `c_term` scalar offsets and, when `with_water` is set, `2H + O` (§4.6's `calculateMass`
/// contract). Fails with `MissingMass` if any modification lacks both an explicit mass and a
/// `mod_table` entry.
pub fn calculate_mass(
    residues: &[Residue],
    mod_table: Option<&ModificationMassTable<'_>>,
    n_term: f64,
    c_term: f64,
    with_water: bool,
) -> Result<f64, ProFormaError> {
    let mut total = n_term + c_term;
    for residue in residues {
        total += residue.mass.0;
        for modification in &residue.mods {
            total += modification_mass(modification, mod_table)?;
        }
    }
    if with_water {
        total += 2.0 * H + O;
    }
    Ok(total)
}

/// As [`calculate_mass`], but also folds in the chain-scoped modifications from a
/// [`crate::sequence::Sequence`]'s positional map (terminal, labile, unknown-position, and
/// global modifications), which `residues` alone does not carry.
pub fn calculate_sequence_mass(
    sequence: &crate::sequence::Sequence,
    mod_table: Option<&ModificationMassTable<'_>>,
    with_water: bool,
) -> Result<f64, ProFormaError> {
    let mut total = calculate_mass(&sequence.residues, mod_table, 0.0, 0.0, with_water)?;
    for (key, modifications) in &sequence.mods {
        if *key >= 0 {
            continue; // already summed via residues[*key].mods above
        }
        for modification in modifications {
            total += modification_mass(modification, mod_table)?;
        }
    }
    for global in &sequence.global_mods {
        total += modification_mass(&global.modification, mod_table)?;
    }
    Ok(total)
}

fn modification_mass(
    modification: &Modification,
    mod_table: Option<&ModificationMassTable<'_>>,
) -> Result<f64, ProFormaError> {
    if let Some(mass) = modification.mod_value.mass {
        return Ok(mass.0);
    }
    if let Some(table) = mod_table {
        if let Some(mass) = table(&modification.mod_value.primary_value) {
            return Ok(mass);
        }
    }
    Err(ProFormaError::new(
        ProFormaErrorKind::MissingMass,
        format!(
            "no mass known for modification `{}` and no override table entry was found",
            modification.mod_value.primary_value
        ),
        Context::none(),
    ))
}

/// Which terminus-typed fragment a [`Fragment`] represents (§4.6's `"by" | "ax" | "cz"`
/// transition pairs).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentTerminal {
    /// N-terminal `a` ion.
    A,
    /// N-terminal `b` ion.
    B,
    /// N-terminal `c` ion.
    C,
    /// C-terminal `x` ion.
    X,
    /// C-terminal `y` ion.
    Y,
    /// C-terminal `z` ion.
    Z,
}

/// One fragment of a peptide backbone cleavage: a contiguous prefix or suffix of residues,
/// typed by which ion series it belongs to and numbered from its own terminus.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// The ion series this fragment belongs to.
    pub terminal: FragmentTerminal,
    /// The 1-based fragment number, counted from this fragment's own terminus.
    pub number: usize,
    /// The residues making up this fragment, in chain order.
    pub residues: Vec<Residue>,
}

/// Generate every `(left, right)` backbone-cleavage fragment pair for `residues`, typed per the
/// requested `transition` (`"by"`, `"ax"`, or `"cz"`). For `i` in `[1, n)`, `left` is the prefix
/// `[0, i)` and `right` is the suffix `[i, n)`, numbered `i` and `n - i` respectively (§4.6).
pub fn fragment_pairs(
    residues: &[Residue],
    transition: &str,
) -> Result<Vec<(Fragment, Fragment)>, ProFormaError> {
    let (left_kind, right_kind) = match transition {
        "by" => (FragmentTerminal::B, FragmentTerminal::Y),
        "ax" => (FragmentTerminal::A, FragmentTerminal::X),
        "cz" => (FragmentTerminal::C, FragmentTerminal::Z),
        other => {
            return Err(ProFormaError::new(
                ProFormaErrorKind::MalformedModifier,
                format!("`{other}` is not a recognized fragment transition (expected by/ax/cz)"),
                Context::none(),
            ))
        }
    };
    let n = residues.len();
    let mut pairs = Vec::with_capacity(n.saturating_sub(1));
    for i in 1..n {
        let left = Fragment {
            terminal: left_kind,
            number: i,
            residues: residues[..i].to_vec(),
        };
        let right = Fragment {
            terminal: right_kind,
            number: n - i,
            residues: residues[i..].to_vec(),
        };
        pairs.push((left, right));
    }
    Ok(pairs)
}

/// The mass-to-charge ratio of a neutral `mass` when it carries `charge` protons:
/// `(mass + charge * proton) / charge` (§4.6).
pub fn mass_to_charge(mass: f64, charge: i64) -> OrderedFloat<f64> {
    OrderedFloat((mass + charge as f64 * PROTON) / charge as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Sequence;

    #[test]
    fn sums_residue_and_modification_mass() {
        let (sequence, _) = Sequence::from_proforma("PEP[+79.966]TIDE").unwrap();
        let mass = calculate_mass(&sequence.residues, None, 0.0, 0.0, false).unwrap();
        let expected: f64 = "PEPTIDE".chars().map(|c| crate::residue_table::residue_mass(c).unwrap()).sum::<f64>() + 79.966;
        assert!((mass - expected).abs() < 1e-9);
    }

    #[test]
    fn adds_water_when_requested() {
        let (sequence, _) = Sequence::from_proforma("AA").unwrap();
        let dry = calculate_mass(&sequence.residues, None, 0.0, 0.0, false).unwrap();
        let wet = calculate_mass(&sequence.residues, None, 0.0, 0.0, true).unwrap();
        assert!((wet - dry - (2.0 * H + O)).abs() < 1e-9);
    }

    #[test]
    fn missing_mass_without_table_is_fatal() {
        let (sequence, _) = Sequence::from_proforma("PEP[Phospho]TIDE").unwrap();
        let err = calculate_mass(&sequence.residues, None, 0.0, 0.0, false).unwrap_err();
        assert_eq!(err.kind(), ProFormaErrorKind::MissingMass);
    }

    #[test]
    fn mod_table_resolves_named_modification() {
        let (sequence, _) = Sequence::from_proforma("PEP[Phospho]TIDE").unwrap();
        let table: &ModificationMassTable<'_> =
            &|name: &str| (name == "Phospho").then_some(79.966_331);
        let mass = calculate_mass(&sequence.residues, Some(table), 0.0, 0.0, false).unwrap();
        assert!(mass > 0.0);
    }

    #[test]
    fn sequence_mass_includes_terminal_mods() {
        let table: &ModificationMassTable<'_> = &|name: &str| match name {
            "Acetyl" => Some(42.010_565),
            "Amidated" => Some(-0.984_016),
            _ => None,
        };
        let (sequence, _) = Sequence::from_proforma("[Acetyl]-PEPTIDE-[Amidated]").unwrap();
        let mass = calculate_sequence_mass(&sequence, Some(table), false).unwrap();
        let residues_only = calculate_mass(&sequence.residues, None, 0.0, 0.0, false).unwrap();
        assert!((mass - residues_only - 42.010_565 + 0.984_016).abs() < 1e-6);
    }

    #[test]
    fn by_fragment_pairs_split_every_bond() {
        let (sequence, _) = Sequence::from_proforma("PEPTIDE").unwrap();
        let pairs = fragment_pairs(&sequence.residues, "by").unwrap();
        assert_eq!(pairs.len(), 6);
        let (first_left, first_right) = &pairs[0];
        assert_eq!(first_left.number, 1);
        assert_eq!(first_left.residues.len(), 1);
        assert_eq!(first_right.number, 6);
        assert_eq!(first_right.residues.len(), 6);
    }

    #[test]
    fn unknown_transition_is_fatal() {
        let (sequence, _) = Sequence::from_proforma("PEPTIDE").unwrap();
        let err = fragment_pairs(&sequence.residues, "zz").unwrap_err();
        assert_eq!(err.kind(), ProFormaErrorKind::MalformedModifier);
    }

    #[test]
    fn mz_matches_proton_weighted_formula() {
        let mz = mass_to_charge(1000.0, 2);
        assert!((mz.0 - (1000.0 + 2.0 * PROTON) / 2.0).abs() < 1e-9);
    }
}
