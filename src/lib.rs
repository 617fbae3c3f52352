#![doc = include_str!("../README.md")]

mod helper_functions;

/// Errors, recoverable warnings, and source-position context for a ProForma parse.
pub mod error;
/// Syntactic molecular formula validator (§4.3).
pub mod formula;
/// Syntactic glycan composition validator (§4.3).
pub mod glycan;
/// Mass calculator and fragment-ion constructor (§4.6), specified as thin external
/// collaborators over the data model.
pub mod mass;
/// The modification value sub-grammar, modification entity, and global modifications (§3, §4.2).
pub mod modification;
/// The six-phase `ProFormaParser` (§4.1).
pub mod parser;
/// The residue (amino acid) entity (§3).
pub mod residue;
/// Fixed residue mass, elemental, and monosaccharide constant tables (§6).
pub mod residue_table;
/// The `Sequence` (peptidoform) entity, the multi-chain/chimeric assembler, and the canonical
/// serializer (§4.4, §4.5).
pub mod sequence;

/// A subset of the types most commonly needed to parse, inspect, and serialize a peptidoform;
/// importing this is a good starting point for working with the crate.
pub mod prelude {
    pub use crate::error::{ParseResult, ProFormaError, ProFormaErrorKind};
    pub use crate::mass::{calculate_mass, calculate_sequence_mass, fragment_pairs, mass_to_charge};
    pub use crate::modification::{
        GlobalModType, GlobalModification, Modification, ModificationKind, ModificationValue,
        PipeValue, PipeValueKind,
    };
    pub use crate::residue::Residue;
    pub use crate::sequence::Sequence;
}
