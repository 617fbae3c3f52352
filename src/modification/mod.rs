//! The modification entity (§3 `Modification`, `GlobalModification`) and its placement kind,
//! wrapping a [`ModificationValue`] with structural information the parser derived about where
//! and how the modification attaches.

mod parse;
mod pipe_value;
mod value;

pub use parse::parse_modification_value;
pub use pipe_value::{PipeValue, PipeValueKind};
pub use value::ModificationValue;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// The outer placement of a [`Modification`], independent of its pipe-value classification
/// (§3 `ModificationKind`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationKind {
    /// A fixed site modification (plain `[body]`).
    Static,
    /// A site modification inside an open range.
    Variable,
    /// An N-terminal or C-terminal modification.
    Terminal,
    /// An ambiguous site modification (`{body}` or `#label`-suffixed).
    Ambiguous,
    /// A crosslink definition or reference (`#XLid`).
    Crosslink,
    /// A branch definition or reference (`#BRANCH`).
    Branch,
    /// A modification on the gap residue `X`.
    Gap,
    /// A labile modification (`{Glycan:...}`).
    Labile,
    /// An unknown-position modification.
    UnknownPosition,
    /// A global modification (`<...>`).
    Global,
}

/// A modification attached to a residue, terminus, or chain-scoped position (§3 `Modification`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    /// The parsed bracket interior.
    pub mod_value: ModificationValue,
    /// The outer placement kind.
    pub kind: ModificationKind,
    /// True when this modification is a labile block.
    pub labile: bool,
    /// 0-based ordinal of this labile modification among the chain's labile modifications.
    pub labile_number: Option<usize>,
    /// True when this modification applies to a contiguous span of residues.
    pub in_range: bool,
    /// Inclusive start of the range, when `in_range`.
    pub range_start: Option<usize>,
    /// Inclusive end of the range, when `in_range`.
    pub range_end: Option<usize>,
    /// Mirrored from `mod_value.localization_score()`.
    pub localization_score: Option<OrderedFloat<f64>>,
    /// Mirrored from `mod_value.ambiguity_group()`.
    pub ambiguity_group: Option<String>,
    /// Mirrored from `mod_value.crosslink_id()`.
    pub crosslink_id: Option<String>,
    /// Mirrored from `mod_value.is_crosslink_ref()`.
    pub is_crosslink_ref: bool,
    /// Mirrored from `mod_value.is_branch()`.
    pub is_branch: bool,
    /// Mirrored from `mod_value.is_branch_ref()`.
    pub is_branch_ref: bool,
    /// Mirrored from `mod_value.is_ambiguity_ref()`.
    pub is_ambiguity_ref: bool,
}

impl Modification {
    /// Build a `Modification` of the given outer `kind`, mirroring the convenience fields off
    /// `mod_value` (§3 invariant).
    pub fn new(mod_value: ModificationValue, kind: ModificationKind) -> Self {
        let localization_score = mod_value.localization_score();
        let ambiguity_group = mod_value.ambiguity_group().map(str::to_string);
        let crosslink_id = mod_value.crosslink_id().map(str::to_string);
        let is_crosslink_ref = mod_value.is_crosslink_ref();
        let is_branch = mod_value.is_branch();
        let is_branch_ref = mod_value.is_branch_ref();
        let is_ambiguity_ref = mod_value.is_ambiguity_ref();
        Self {
            mod_value,
            kind,
            labile: false,
            labile_number: None,
            in_range: false,
            range_start: None,
            range_end: None,
            localization_score,
            ambiguity_group,
            crosslink_id,
            is_crosslink_ref,
            is_branch,
            is_branch_ref,
            is_ambiguity_ref,
        }
    }

    /// Derive the outer [`ModificationKind`] that a freshly parsed [`ModificationValue`] implies,
    /// absent any range/gap context (§4.1's crosslink/branch/ambiguity-group fast paths are
    /// equivalent to reading these derived flags off the primary pipe value).
    pub(crate) fn kind_from_value(mod_value: &ModificationValue) -> ModificationKind {
        if mod_value.is_crosslink_ref() || mod_value.crosslink_id().is_some() {
            ModificationKind::Crosslink
        } else if mod_value.is_branch() || mod_value.is_branch_ref() {
            ModificationKind::Branch
        } else if mod_value.is_ambiguity_ref() || mod_value.ambiguity_group().is_some() {
            ModificationKind::Ambiguous
        } else {
            ModificationKind::Static
        }
    }

    /// Mark this modification as spanning the inclusive residue range `[start, end]`.
    pub fn with_range(mut self, start: usize, end: usize) -> Self {
        self.in_range = true;
        self.range_start = Some(start);
        self.range_end = Some(end);
        self.kind = ModificationKind::Variable;
        self
    }

    /// Mark this modification as a labile block with the given chain-scoped ordinal.
    pub fn with_labile(mut self, number: usize) -> Self {
        self.labile = true;
        self.labile_number = Some(number);
        self.kind = ModificationKind::Labile;
        self
    }
}

/// What a [`GlobalModification`] applies to (§3).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalModType {
    /// An isotope label applied to the whole chain.
    Isotope,
    /// A modification fixed to every occurrence of specific residues.
    Fixed,
}

/// A global modification, `<...>` at the front of a chain (§3 `GlobalModification`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GlobalModification {
    /// The wrapped modification (always `kind = Global`).
    pub modification: Modification,
    /// The residue codes this global modification targets; non-empty when `Fixed`.
    pub target_residues: Option<Vec<char>>,
    /// Whether this is an isotope label or a fixed-target modification.
    pub global_mod_type: GlobalModType,
}

impl GlobalModification {
    /// Build a fixed global modification targeting `target_residues` (must be non-empty,
    /// per the §3 invariant `fixed implies target_residues non-empty`).
    pub fn fixed(mod_value: ModificationValue, target_residues: Vec<char>) -> Self {
        debug_assert!(!target_residues.is_empty());
        Self {
            modification: Modification::new(mod_value, ModificationKind::Global),
            target_residues: Some(target_residues),
            global_mod_type: GlobalModType::Fixed,
        }
    }

    /// Build an isotope global modification applying to the whole chain.
    pub fn isotope(mod_value: ModificationValue) -> Self {
        Self {
            modification: Modification::new(mod_value, ModificationKind::Global),
            target_residues: None,
            global_mod_type: GlobalModType::Isotope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_value_defaults_to_static() {
        let mv = parse_modification_value("Phospho", &mut Vec::new());
        assert_eq!(Modification::kind_from_value(&mv), ModificationKind::Static);
    }

    #[test]
    fn kind_from_value_detects_crosslink() {
        let mv = parse_modification_value("XLMOD:02001#XL1", &mut Vec::new());
        assert_eq!(
            Modification::kind_from_value(&mv),
            ModificationKind::Crosslink
        );
    }

    #[test]
    fn fixed_global_modification_invariant() {
        let mv = parse_modification_value("Carbamidomethyl", &mut Vec::new());
        let global = GlobalModification::fixed(mv, vec!['C']);
        assert_eq!(global.global_mod_type, GlobalModType::Fixed);
        assert_eq!(global.target_residues, Some(vec!['C']));
    }
}
