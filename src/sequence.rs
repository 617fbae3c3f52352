//! The `Sequence` (peptidoform) entity, the `from_proforma` assembler (§4.5), and the
//! canonical-text serializer (§4.4). Grounded on the teacher's bracket-aware `//`/`+` splitters
//! (`mzcore/src/sequence/peptidoform/parse.rs`) and its `Display`-as-serializer idiom (its
//! `parse_test!` macro calls `.to_string()` to round-trip).

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Context, ParseResult, ProFormaError, ProFormaErrorKind};
use crate::helper_functions::{split_outside_brackets, split_str_outside_brackets};
use crate::modification::{GlobalModType, GlobalModification, Modification, ModificationKind};
use crate::parser::{self, SequenceAmbiguity, KEY_C_TERM, KEY_LABILE, KEY_N_TERM, KEY_UNKNOWN_POSITION};
use crate::residue::Residue;

/// A fully assembled peptidoform: a residue chain with its attached modifications, optional
/// charge and ionic species, and (for the first peptidoform/chain of a set) its siblings (§3
/// `Sequence (Peptidoform)`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// The residues of this chain, in order; each carries its own site modifications.
    pub residues: Vec<Residue>,
    /// The full positional modification map: positive keys mirror `residues[i].mods` for
    /// convenience, negative sentinel keys (`KEY_N_TERM`, `KEY_C_TERM`, `KEY_LABILE`,
    /// `KEY_UNKNOWN_POSITION`) carry chain-scoped modifications.
    pub mods: BTreeMap<i64, Vec<Modification>>,
    /// Global modifications (`<...>`), in input order.
    pub global_mods: Vec<GlobalModification>,
    /// Sequence ambiguities (`(?...)`), in input order.
    pub sequence_ambiguities: Vec<SequenceAmbiguity>,
    /// The charge state, if a `/N` suffix was present.
    pub charge: Option<i64>,
    /// The ionic species adduct, if a `[...]` immediately followed the charge suffix.
    pub ionic_species: Option<String>,
    /// For a chimeric input, the other peptidoforms of the set (this field is populated only on
    /// the first peptidoform; see [`Sequence::peptidoforms_including_self`]).
    pub peptidoforms: Vec<Sequence>,
    /// For a multi-chain input, the other chains of the set (populated only on the first chain;
    /// see [`Sequence::chains_including_self`]).
    pub chains: Vec<Sequence>,
    /// True iff this input used the `//` multi-chain separator.
    pub is_multi_chain: bool,
}

impl Sequence {
    /// Parse a full ProForma string: split chains (`//`), then chimeric peptidoforms (`+`) within
    /// each chain, strip trailing charge/ionic species, parse each remaining piece, and link
    /// siblings onto the first peptidoform/chain (§4.5).
    pub fn from_proforma(input: &str) -> ParseResult<Self> {
        let mut warnings = Vec::new();
        let chain_texts = split_str_outside_brackets(input, "//");
        let mut chains = Vec::with_capacity(chain_texts.len());
        for chain_text in chain_texts {
            match Self::parse_chain_text(chain_text) {
                Ok((sequence, mut w)) => {
                    warnings.append(&mut w);
                    chains.push(sequence);
                }
                Err(errors) => return Err(errors),
            }
        }
        let is_multi_chain = chains.len() > 1;
        let mut chains_iter = chains.into_iter();
        let mut first = chains_iter.next().expect("at least one chain piece");
        first.chains = chains_iter.collect();
        first.is_multi_chain = is_multi_chain;
        Ok((first, warnings))
    }

    /// Parse one `//`-delimited chain: split on top-level `+` into chimeric peptidoforms, parse
    /// each, and link the rest onto the first as `peptidoforms`.
    fn parse_chain_text(chain_text: &str) -> ParseResult<Self> {
        let mut warnings = Vec::new();
        let pieces = split_outside_brackets(chain_text, '+');
        let mut peptidoforms = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match Self::parse_peptidoform_text(piece) {
                Ok((sequence, mut w)) => {
                    warnings.append(&mut w);
                    peptidoforms.push(sequence);
                }
                Err(errors) => return Err(errors),
            }
        }
        let mut iter = peptidoforms.into_iter();
        let mut first = iter.next().expect("at least one peptidoform piece");
        first.peptidoforms = iter.collect();
        Ok((first, warnings))
    }

    /// Parse a single peptidoform: strip the trailing `/charge[ionic]` suffix, parse the
    /// remainder with [`parser::parse_chain`], and assemble residues and modifications.
    fn parse_peptidoform_text(text: &str) -> ParseResult<Self> {
        let (remainder, charge, ionic_species) = strip_charge_and_ionic(text);
        let (chain, warnings) = parser::parse_chain(remainder)?;

        let mut residues = Vec::with_capacity(chain.base_sequence.chars().count());
        for (index, code) in chain.base_sequence.chars().enumerate() {
            let Some(residue) = Residue::new(code, index) else {
                return Err(vec![ProFormaError::new(
                    ProFormaErrorKind::UnknownResidue,
                    format!("`{code}` is not a known residue code"),
                    Context::position(&chain.base_sequence, index),
                )]);
            };
            residues.push(residue);
        }

        let mut mods: BTreeMap<i64, Vec<Modification>> = BTreeMap::new();
        for (key, rcs) in &chain.mods {
            let owned: Vec<Modification> = rcs.iter().map(|rc| (**rc).clone()).collect();
            if *key >= 0 {
                if let Some(residue) = residues.get_mut(*key as usize) {
                    residue.mods = owned.clone();
                }
            }
            mods.insert(*key, owned);
        }

        Ok((
            Self {
                residues,
                mods,
                global_mods: chain.global_mods,
                sequence_ambiguities: chain.sequence_ambiguities,
                charge,
                ionic_species,
                peptidoforms: Vec::new(),
                chains: Vec::new(),
                is_multi_chain: false,
            },
            warnings,
        ))
    }

    /// This peptidoform followed by its siblings, honoring §3's "self is the first" convention
    /// without a self-referential structure.
    pub fn peptidoforms_including_self(&self) -> impl Iterator<Item = &Sequence> {
        std::iter::once(self).chain(self.peptidoforms.iter())
    }

    /// This chain followed by its sibling chains, honoring §3's "self is the first" convention.
    pub fn chains_including_self(&self) -> impl Iterator<Item = &Sequence> {
        std::iter::once(self).chain(self.chains.iter())
    }

    /// The bare residue-code string, with no decoration (§8 "stripped string" property).
    pub fn to_stripped_string(&self) -> String {
        self.residues.iter().map(|r| r.code).collect()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_chain(f, self)?;
        for chain in &self.chains {
            write!(f, "//")?;
            write_chain(f, chain)?;
        }
        Ok(())
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, first: &Sequence) -> fmt::Result {
    write_peptidoform(f, first)?;
    for peptidoform in &first.peptidoforms {
        write!(f, "+")?;
        write_peptidoform(f, peptidoform)?;
    }
    Ok(())
}

fn write_peptidoform(f: &mut fmt::Formatter<'_>, seq: &Sequence) -> fmt::Result {
    for global in &seq.global_mods {
        let body = body_of(&global.modification);
        match global.global_mod_type {
            GlobalModType::Fixed => {
                let targets = global
                    .target_residues
                    .as_ref()
                    .map(|t| t.iter().join(","))
                    .unwrap_or_default();
                write!(f, "<[{body}]@{targets}>")?;
            }
            GlobalModType::Isotope => write!(f, "<{body}>")?,
        }
    }

    if let Some(unknowns) = seq.mods.get(&KEY_UNKNOWN_POSITION) {
        if !unknowns.is_empty() {
            let mut groups: Vec<(String, usize)> = Vec::new();
            for modification in unknowns {
                let body = body_of(modification);
                if let Some(entry) = groups.iter_mut().find(|(b, _)| *b == body) {
                    entry.1 += 1;
                } else {
                    groups.push((body, 1));
                }
            }
            for (body, count) in &groups {
                if *count > 1 {
                    write!(f, "[{body}]^{count}")?;
                } else {
                    write!(f, "[{body}]")?;
                }
            }
            write!(f, "?")?;
        }
    }

    if let Some(labile) = seq.mods.get(&KEY_LABILE) {
        for modification in labile {
            write!(f, "{{{}}}", body_of(modification))?;
        }
    }

    if let Some(n_term) = seq.mods.get(&KEY_N_TERM) {
        if !n_term.is_empty() {
            for modification in n_term {
                write!(f, "[{}]", body_of(modification))?;
            }
            write!(f, "-")?;
        }
    }

    let range_events = collect_range_events(seq);
    for (index, residue) in seq.residues.iter().enumerate() {
        if let Some(ambiguity) = seq
            .sequence_ambiguities
            .iter()
            .find(|a| a.position == index)
        {
            write!(f, "(?{})", ambiguity.value)?;
        }
        for (start, _, _) in &range_events {
            if *start == index {
                write!(f, "(")?;
            }
        }
        write!(f, "{}", residue.code)?;
        for modification in &residue.mods {
            if modification.in_range {
                continue;
            }
            write_wrapped(f, modification)?;
        }
        for (_, end, body) in range_events.iter().rev() {
            if *end == index {
                write!(f, ")[{body}]")?;
            }
        }
    }

    if let Some(c_term) = seq.mods.get(&KEY_C_TERM) {
        if !c_term.is_empty() {
            write!(f, "-")?;
            for modification in c_term {
                write!(f, "[{}]", body_of(modification))?;
            }
        }
    }

    if let Some(charge) = seq.charge {
        write!(f, "/{charge}")?;
        if let Some(ionic) = &seq.ionic_species {
            write!(f, "[{ionic}]")?;
        }
    }

    Ok(())
}

fn write_wrapped(f: &mut fmt::Formatter<'_>, modification: &Modification) -> fmt::Result {
    let body = body_of(modification);
    if modification.kind == ModificationKind::Ambiguous && modification.ambiguity_group.is_none() {
        write!(f, "{{{body}}}")
    } else {
        write!(f, "[{body}]")
    }
}

/// Collect the distinct range modifications in this peptidoform, in order of first appearance,
/// deduped by value equality (shared `(start, end, body)` identity, per §5's "reconcile by the
/// tuple" fallback for an owned, non-`Rc` representation).
fn collect_range_events(seq: &Sequence) -> Vec<(usize, usize, String)> {
    let mut events: Vec<(usize, usize, String)> = Vec::new();
    for residue in &seq.residues {
        for modification in &residue.mods {
            if !modification.in_range {
                continue;
            }
            let (Some(start), Some(end)) = (modification.range_start, modification.range_end)
            else {
                continue;
            };
            let body = body_of(modification);
            if !events
                .iter()
                .any(|(s, e, b)| *s == start && *e == end && b == &body)
            {
                events.push((start, end, body));
            }
        }
    }
    events
}

/// Build the canonical pipe-joined body text of one modification's `ModificationValue` (§4.4's
/// pipe-body emission rule): one piece per pipe value, deduplicated by string identity,
/// preserving first occurrence, joined with `|`.
fn body_of(modification: &Modification) -> String {
    let mut pieces: Vec<String> = Vec::new();
    for pipe_value in &modification.mod_value.pipe_values {
        let piece = emit_pipe_value(pipe_value);
        if !pieces.contains(&piece) {
            pieces.push(piece);
        }
    }
    pieces.join("|")
}

fn emit_pipe_value(pipe_value: &crate::modification::PipeValue) -> String {
    let mut piece = String::new();
    if let Some(prefix) = &pipe_value.mass_prefix {
        piece.push_str(prefix);
        piece.push(':');
    } else if let Some(source) = &pipe_value.source {
        piece.push_str(source);
        piece.push(':');
    }

    if let Some(text) = pipe_value
        .mass_text
        .as_deref()
        .or(pipe_value.observed_mass_text.as_deref())
    {
        piece.push_str(&normalize_mass_text(text));
    } else if !pipe_value.value.is_empty() {
        piece.push_str(&pipe_value.value);
    }

    if let Some(id) = &pipe_value.crosslink_id {
        piece.push('#');
        piece.push_str(id);
    } else if pipe_value.is_branch || pipe_value.is_branch_ref {
        piece.push_str("#BRANCH");
    } else if let Some(group) = &pipe_value.ambiguity_group {
        piece.push('#');
        piece.push_str(group);
        if let Some(score) = pipe_value.localization_score {
            piece.push_str(&format!("({:.2})", score.0));
        }
    }
    piece
}

/// Open Question (a): numeric masses round-trip with their original digit text, except a
/// redundant trailing `.0` is dropped (`-10.0` -> `-10`).
fn normalize_mass_text(text: &str) -> String {
    text.strip_suffix(".0").unwrap_or(text).to_string()
}

/// Strip a trailing `/signedInt[ionic]` suffix off a peptidoform's text (§4.5 step 3). The
/// ionic-species bracket is only recognized when a valid charge immediately precedes it.
fn strip_charge_and_ionic(text: &str) -> (&str, Option<i64>, Option<String>) {
    let (after_ionic, ionic) = strip_trailing_bracket(text);
    let (after_charge, charge) = strip_trailing_charge(after_ionic);
    if charge.is_some() {
        (after_charge, charge, ionic)
    } else {
        (text, None, None)
    }
}

fn strip_trailing_bracket(text: &str) -> (&str, Option<String>) {
    if !text.ends_with(']') {
        return (text, None);
    }
    let bytes = text.as_bytes();
    let close = text.len() - 1;
    let mut depth = 1i32;
    let mut pos = close;
    while pos > 0 {
        pos -= 1;
        match bytes[pos] {
            b']' => depth += 1,
            b'[' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return (text, None);
    }
    let interior = &text[pos + 1..close];
    (&text[..pos], Some(interior.to_string()))
}

fn strip_trailing_charge(text: &str) -> (&str, Option<i64>) {
    let bytes = text.as_bytes();
    let mut digits_start = text.len();
    while digits_start > 0 && bytes[digits_start - 1].is_ascii_digit() {
        digits_start -= 1;
    }
    if digits_start == text.len() {
        return (text, None);
    }
    let mut sign_start = digits_start;
    if sign_start > 0 && (bytes[sign_start - 1] == b'+' || bytes[sign_start - 1] == b'-') {
        sign_start -= 1;
    }
    if sign_start > 0 && bytes[sign_start - 1] == b'/' {
        if let Ok(charge) = text[sign_start..].parse::<i64>() {
            return (&text[..sign_start - 1], Some(charge));
        }
    }
    (text, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(input: &str) {
        let (sequence, warnings) = Sequence::from_proforma(input).unwrap();
        assert!(warnings.is_empty(), "unexpected warnings for {input:?}: {warnings:?}");
        assert_eq!(sequence.to_string(), input);
    }

    #[test]
    fn plain_site_modification_round_trips() {
        round_trip("PEP[Phospho]TIDE");
    }

    #[test]
    fn mass_shift_round_trips() {
        round_trip("PEP[+79.966]TIDE");
    }

    #[test]
    fn terminal_modifications_round_trip() {
        round_trip("[Acetyl]-PEPTIDE-[Amidated]");
    }

    #[test]
    fn global_fixed_modification_round_trips() {
        round_trip("<Carbamidomethyl@C>PEPCTIDE");
    }

    #[test]
    fn unknown_position_multiplicity_round_trips() {
        round_trip("[Phospho]^2?EMEVNESPEK");
    }

    #[test]
    fn range_modification_round_trips() {
        round_trip("PRT(ESFRMS)[+19.0523]ISK");
    }

    #[test]
    fn crosslink_across_chains_round_trips() {
        round_trip("SEK[XLMOD:02001#XL1]UENCE//EMEVTK[#XL1]SESPEK");
    }

    #[test]
    fn pipe_source_and_mass_round_trips() {
        round_trip("ELVIS[U:Phospho|+79.966331]K");
    }

    #[test]
    fn chimeric_with_charges_round_trips() {
        round_trip("PEPTIDE/2+ANOTHER/3");
    }

    #[test]
    fn gap_residue_round_trips() {
        round_trip("RTAAX[+367.0537]WT");
    }

    #[test]
    fn stripped_string_is_bare_residues() {
        let (sequence, _) = Sequence::from_proforma("PEP[Phospho]TIDE").unwrap();
        assert_eq!(sequence.to_stripped_string(), "PEPTIDE");
    }

    #[test]
    fn positional_attachment() {
        let (sequence, _) = Sequence::from_proforma("PEP[Phospho]TIDE").unwrap();
        assert_eq!(sequence.residues[2].mods.len(), 1);
        assert_eq!(sequence.residues[2].mods[0].mod_value.primary_value, "Phospho");
    }

    #[test]
    fn range_coverage_property() {
        let (sequence, _) = Sequence::from_proforma("PRT(ESFRMS)[+19.0523]ISK").unwrap();
        for i in 3..=8 {
            let modification = &sequence.residues[i].mods[0];
            assert!(modification.in_range);
            assert_eq!(modification.range_start, Some(3));
            assert_eq!(modification.range_end, Some(8));
        }
    }

    #[test]
    fn unknown_residue_is_fatal() {
        let err = Sequence::from_proforma("PEPZIDE").unwrap_err();
        assert_eq!(err[0].kind(), ProFormaErrorKind::UnknownResidue);
    }

    #[test]
    fn charge_and_ionic_species_parsed() {
        let (sequence, _) = Sequence::from_proforma("PEPTIDE/2[+Na]").unwrap();
        assert_eq!(sequence.charge, Some(2));
        assert_eq!(sequence.ionic_species.as_deref(), Some("+Na"));
        assert_eq!(sequence.to_string(), "PEPTIDE/2[+Na]");
    }

    #[test]
    fn negative_charge_round_trips() {
        round_trip("PEPTIDE/-1");
    }

    #[test]
    fn ambiguous_curly_site_round_trips() {
        round_trip("EM{Oxidation}EVEESPEK");
    }

    #[test]
    fn ambiguity_group_round_trips() {
        round_trip("EM[Oxidation]EVT[#g1]S[#g1]ES[Phospho#g1]PEK");
    }

    #[test]
    fn ambiguity_group_with_score_round_trips() {
        round_trip("EM[Oxidation]EVT[#g1(0.01)]S[#g1(0.09)]ES[Phospho#g1(0.90)]PEK");
    }

    #[test]
    fn labile_glycan_round_trips() {
        round_trip("{Glycan:Hex}EM[Oxidation]EVNES[Phospho]PEK[iTRAQ4plex]");
    }

    #[test]
    fn sequence_ambiguity_round_trips() {
        round_trip("(?AC)PEPTIDE");
    }

    #[test]
    fn multi_chain_links_siblings() {
        let (sequence, _) = Sequence::from_proforma("AA//BB//CC").unwrap();
        assert!(sequence.is_multi_chain);
        assert_eq!(sequence.chains.len(), 2);
        let all: Vec<String> = sequence
            .chains_including_self()
            .map(Sequence::to_stripped_string)
            .collect();
        assert_eq!(all, vec!["AA", "BB", "CC"]);
    }

    #[test]
    fn chimeric_links_siblings() {
        let (sequence, _) = Sequence::from_proforma("AA+BB").unwrap();
        assert_eq!(sequence.peptidoforms.len(), 1);
        let all: Vec<String> = sequence
            .peptidoforms_including_self()
            .map(Sequence::to_stripped_string)
            .collect();
        assert_eq!(all, vec!["AA", "BB"]);
    }

    #[test]
    fn mass_prefix_round_trips() {
        round_trip("PEP[MASS:79.966]TIDE");
    }

    #[test]
    fn observed_mass_round_trips() {
        round_trip("EM[U:+15.995]EVEES[Obs:+79.978]PEK");
    }

    #[test]
    fn trailing_zero_mass_is_normalized() {
        let (sequence, _) = Sequence::from_proforma("PEP[-10.0]TIDE").unwrap();
        assert_eq!(sequence.to_string(), "PEP[-10]TIDE");
    }
}
