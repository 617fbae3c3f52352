//! `ProFormaParser` (§4.1): the six fixed phases that turn one chain's ProForma text into a
//! base sequence, a positional modification map, global modifications, and sequence
//! ambiguities. Grounded on the teacher's phased algorithm
//! (`mzcore/src/sequence/peptidoform/parse.rs`), simplified off its generic type-state
//! machinery onto the flat model in §3.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Context, ParseResult, ProFormaError, ProFormaErrorKind};
use crate::helper_functions::end_of_enclosure;
use crate::modification::{parse_modification_value, GlobalModification, Modification, ModificationKind};

/// A sequence ambiguity: an alternative-residue placeholder `(?value)` sitting before a
/// position (§3 `SequenceAmbiguity`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SequenceAmbiguity {
    /// The alternative residues, as written.
    pub value: String,
    /// The 0-based index of the residue this ambiguity sits before.
    pub position: usize,
}

/// Sentinel keys used in the positional modification map (§3).
pub const KEY_N_TERM: i64 = -1;
pub const KEY_C_TERM: i64 = -2;
pub const KEY_LABILE: i64 = -3;
pub const KEY_UNKNOWN_POSITION: i64 = -4;

/// The output of parsing one chain's ProForma text (§4.1's public contract).
#[derive(Debug, Clone, Default)]
pub struct ParsedChain {
    /// The residue codes, in order, stripped of all decoration.
    pub base_sequence: String,
    /// Modifications keyed by residue index, or by the sentinel keys above.
    pub mods: BTreeMap<i64, Vec<Rc<Modification>>>,
    /// Global modifications (`<...>`), in input order.
    pub global_mods: Vec<GlobalModification>,
    /// Sequence ambiguities (`(?...)`), in input order.
    pub sequence_ambiguities: Vec<SequenceAmbiguity>,
}

static MASS_SHIFT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]\d+(\.\d+)?$").unwrap());

/// Parse one chain's ProForma text into base sequence, positional mods, global mods, and
/// sequence ambiguities. Chimeric (`+`) and multi-chain (`//`) splitting happens in
/// `crate::sequence` before this is called.
pub fn parse_chain(input: &str) -> ParseResult<ParsedChain> {
    let mut warnings = Vec::new();
    let mut chain = ParsedChain::default();
    let mut rest = input;

    rest = parse_global_mods(rest, &mut chain, &mut warnings)?;
    rest = parse_unknown_position_mods(rest, &mut chain, &mut warnings);
    rest = parse_labile_mods(rest, &mut chain, &mut warnings)?;
    rest = parse_n_terminal(rest, &mut chain, &mut warnings)?;
    rest = parse_c_terminal(rest, &mut chain, &mut warnings)?;
    parse_main_walk(rest, &mut chain, &mut warnings)?;

    Ok((chain, warnings))
}

fn fatal(kind: ProFormaErrorKind, message: impl std::string::ToString, context: Context) -> Vec<ProFormaError> {
    vec![ProFormaError::new(kind, message, context)]
}

/// Phase 1: global modifications `<...>`.
fn parse_global_mods<'a>(
    mut rest: &'a str,
    chain: &mut ParsedChain,
    warnings: &mut Vec<ProFormaError>,
) -> Result<&'a str, Vec<ProFormaError>> {
    while let Some(stripped) = rest.strip_prefix('<') {
        let Some(end) = end_of_enclosure(rest, 1, b'<', b'>') else {
            return Err(fatal(
                ProFormaErrorKind::UnclosedAngle,
                "a global modification `<...>` was never closed",
                Context::show(rest),
            ));
        };
        let interior = &stripped[..end - 1];
        if let Some(at) = interior.find('@') {
            let (mod_part, targets_part) = (&interior[..at], &interior[at + 1..]);
            let mod_part = mod_part
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .unwrap_or(mod_part);
            let targets: Vec<char> = targets_part
                .split(',')
                .filter_map(|t| t.trim().chars().next())
                .collect();
            let mv = parse_modification_value(mod_part, warnings);
            chain.global_mods.push(GlobalModification::fixed(mv, targets));
        } else {
            let mv = parse_modification_value(interior, warnings);
            chain.global_mods.push(GlobalModification::isotope(mv));
        }
        rest = &rest[end + 1..];
    }
    Ok(rest)
}

/// Phase 2: unknown-position modifications, `[body]^N?...[body]?`.
fn parse_unknown_position_mods<'a>(
    rest: &'a str,
    chain: &mut ParsedChain,
    warnings: &mut Vec<ProFormaError>,
) -> &'a str {
    if !rest.contains('?') {
        return rest;
    }
    let mut index = 0usize;
    let mut collected: Vec<(String, usize)> = Vec::new();
    loop {
        if rest[index..].as_bytes().first() != Some(&b'[') {
            break;
        }
        let Some(end) = end_of_enclosure(rest, index + 1, b'[', b']') else {
            break;
        };
        let interior = rest[index + 1..end].to_string();
        index = end + 1;
        let mut multiplicity = 1usize;
        if rest[index..].as_bytes().first() == Some(&b'^') {
            let digits: String = rest[index + 1..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if !digits.is_empty() {
                multiplicity = digits.parse().unwrap_or(1);
                index += 1 + digits.len();
            }
        }
        collected.push((interior, multiplicity));
    }
    if rest[index..].as_bytes().first() == Some(&b'?') {
        for (interior, multiplicity) in collected {
            for _ in 0..multiplicity {
                let mv = parse_modification_value(&interior, warnings);
                let modification = Rc::new(Modification::new(mv, ModificationKind::UnknownPosition));
                chain
                    .mods
                    .entry(KEY_UNKNOWN_POSITION)
                    .or_default()
                    .push(modification);
            }
        }
        &rest[index + 1..]
    } else {
        rest
    }
}

/// Phase 3: labile modifications, `{Glycan:body}`.
fn parse_labile_mods<'a>(
    mut rest: &'a str,
    chain: &mut ParsedChain,
    warnings: &mut Vec<ProFormaError>,
) -> Result<&'a str, Vec<ProFormaError>> {
    let mut ordinal = 0usize;
    while rest.starts_with('{') {
        let Some(end) = end_of_enclosure(rest, 1, b'{', b'}') else {
            return Err(fatal(
                ProFormaErrorKind::UnclosedCurly,
                "a labile modification `{...}` was never closed",
                Context::show(rest),
            ));
        };
        let interior = &rest[1..end];
        if !interior.starts_with("Glycan:") {
            return Err(fatal(
                ProFormaErrorKind::MalformedLabile,
                "a labile modification block must begin with `Glycan:`",
                Context::show(interior),
            ));
        }
        let mv = parse_modification_value(interior, warnings);
        let modification = Rc::new(Modification::new(mv, ModificationKind::Static).with_labile(ordinal));
        chain.mods.entry(KEY_LABILE).or_default().push(modification);
        ordinal += 1;
        rest = &rest[end + 1..];
    }
    Ok(rest)
}

/// Phase 4: N-terminal modifications, `[body][body]...-`.
fn parse_n_terminal<'a>(
    rest: &'a str,
    chain: &mut ParsedChain,
    warnings: &mut Vec<ProFormaError>,
) -> Result<&'a str, Vec<ProFormaError>> {
    if !rest.starts_with('[') {
        return Ok(rest);
    }
    let Some(dash) = find_depth0_dash_forward(rest) else {
        return Ok(rest);
    };
    let prefix = &rest[..dash];
    let mut index = 0usize;
    let mut mods = Vec::new();
    while index < prefix.len() {
        if prefix.as_bytes()[index] != b'[' {
            break;
        }
        let Some(end) = end_of_enclosure(prefix, index + 1, b'[', b']') else {
            return Err(fatal(
                ProFormaErrorKind::UnclosedSquare,
                "an N-terminal modification `[...]` was never closed",
                Context::show(prefix),
            ));
        };
        let mv = parse_modification_value(&prefix[index + 1..end], warnings);
        mods.push(Rc::new(Modification::new(mv, ModificationKind::Terminal)));
        index = end + 1;
    }
    if index != prefix.len() {
        // The leading brackets were not a contiguous N-terminal run; leave untouched for the
        // main walk to handle (e.g. a misidentified site modification).
        return Ok(rest);
    }
    chain.mods.entry(KEY_N_TERM).or_default().extend(mods);
    Ok(&rest[dash + 1..])
}

/// Find the first `-` at bracket depth 0, scanning `[`/`]` left to right.
fn find_depth0_dash_forward(text: &str) -> Option<usize> {
    let mut depth: i32 = 0;
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth -= 1,
            b'-' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Phase 5: C-terminal modifications, `-[body][body]...`.
fn parse_c_terminal<'a>(
    rest: &'a str,
    chain: &mut ParsedChain,
    warnings: &mut Vec<ProFormaError>,
) -> Result<&'a str, Vec<ProFormaError>> {
    let Some(dash) = find_depth0_dash_backward(rest) else {
        return Ok(rest);
    };
    let suffix = &rest[dash + 1..];
    let mut index = 0usize;
    let mut mods = Vec::new();
    while index < suffix.len() {
        if suffix.as_bytes()[index] != b'[' {
            return Ok(rest);
        }
        let Some(end) = end_of_enclosure(suffix, index + 1, b'[', b']') else {
            return Err(fatal(
                ProFormaErrorKind::UnclosedSquare,
                "a C-terminal modification `[...]` was never closed",
                Context::show(suffix),
            ));
        };
        let mv = parse_modification_value(&suffix[index + 1..end], warnings);
        mods.push(Rc::new(Modification::new(mv, ModificationKind::Terminal)));
        index = end + 1;
    }
    if index != suffix.len() || mods.is_empty() {
        return Ok(rest);
    }
    chain.mods.entry(KEY_C_TERM).or_default().extend(mods);
    Ok(&rest[..dash])
}

/// Find the last `-` at bracket depth 0, scanning right to left; `]` opens and `[` closes.
fn find_depth0_dash_backward(text: &str) -> Option<usize> {
    let mut depth: i32 = 0;
    for (i, b) in text.bytes().enumerate().rev() {
        match b {
            b']' => depth += 1,
            b'[' => depth -= 1,
            b'-' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Phase 6: the main left-to-right residue walk.
fn parse_main_walk(
    rest: &str,
    chain: &mut ParsedChain,
    warnings: &mut Vec<ProFormaError>,
) -> Result<(), Vec<ProFormaError>> {
    let mut base_sequence = String::new();
    let mut range_stack: Vec<usize> = Vec::new();
    let mut gap_armed = false;
    let mut index = 0usize;

    while index < rest.len() {
        let byte = rest.as_bytes()[index];
        match byte {
            b'(' if rest[index..].starts_with("(?") => {
                let Some(end) = end_of_enclosure(rest, index + 2, b'(', b')') else {
                    return Err(fatal(
                        ProFormaErrorKind::UnclosedParen,
                        "a sequence ambiguity `(?...)` was never closed",
                        Context::show(&rest[index..]),
                    ));
                };
                chain.sequence_ambiguities.push(SequenceAmbiguity {
                    value: rest[index + 2..end].to_string(),
                    position: base_sequence.chars().count(),
                });
                index = end + 1;
            }
            b'(' => {
                range_stack.push(base_sequence.chars().count());
                index += 1;
            }
            b')' => {
                let Some(start) = range_stack.pop() else {
                    return Err(fatal(
                        ProFormaErrorKind::UnmatchedCloseParen,
                        "a `)` had no matching open `(`",
                        Context::position(rest, index),
                    ));
                };
                let current_len = base_sequence.chars().count();
                if current_len == 0 {
                    return Err(fatal(
                        ProFormaErrorKind::UnmatchedCloseParen,
                        "a range closed before any residue was read",
                        Context::position(rest, index),
                    ));
                }
                let end_pos = current_len - 1;
                index += 1;
                let mut range_mods = Vec::new();
                while rest[index..].as_bytes().first() == Some(&b'[') {
                    let Some(close) = end_of_enclosure(rest, index + 1, b'[', b']') else {
                        return Err(fatal(
                            ProFormaErrorKind::UnclosedSquare,
                            "a range modification `[...]` was never closed",
                            Context::show(&rest[index..]),
                        ));
                    };
                    let mv = parse_modification_value(&rest[index + 1..close], warnings);
                    let modification = Rc::new(
                        Modification::new(mv, ModificationKind::Static).with_range(start, end_pos),
                    );
                    range_mods.push(modification);
                    index = close + 1;
                }
                for modification in range_mods {
                    for position in start..=end_pos {
                        chain
                            .mods
                            .entry(position as i64)
                            .or_default()
                            .push(Rc::clone(&modification));
                    }
                }
            }
            b'[' => {
                let Some(end) = end_of_enclosure(rest, index + 1, b'[', b']') else {
                    return Err(fatal(
                        ProFormaErrorKind::UnclosedSquare,
                        "a modification `[...]` was never closed",
                        Context::show(&rest[index..]),
                    ));
                };
                let interior = &rest[index + 1..end];
                let mv = parse_modification_value(interior, warnings);
                let mut kind = Modification::kind_from_value(&mv);
                if kind == ModificationKind::Static {
                    if gap_armed {
                        kind = ModificationKind::Gap;
                    } else if !range_stack.is_empty() && MASS_SHIFT_RE.is_match(interior) {
                        kind = ModificationKind::Variable;
                    }
                }
                gap_armed = false;
                let current_len = base_sequence.chars().count();
                if current_len == 0 {
                    return Err(fatal(
                        ProFormaErrorKind::UnclosedSquare,
                        "a site modification appeared before any residue",
                        Context::show(&rest[index..]),
                    ));
                }
                let modification = Rc::new(Modification::new(mv, kind));
                chain
                    .mods
                    .entry((current_len - 1) as i64)
                    .or_default()
                    .push(modification);
                index = end + 1;
            }
            b'{' => {
                let Some(end) = end_of_enclosure(rest, index + 1, b'{', b'}') else {
                    return Err(fatal(
                        ProFormaErrorKind::UnclosedCurly,
                        "an ambiguous site modification `{...}` was never closed",
                        Context::show(&rest[index..]),
                    ));
                };
                let mv = parse_modification_value(&rest[index + 1..end], warnings);
                let current_len = base_sequence.chars().count();
                if current_len == 0 {
                    return Err(fatal(
                        ProFormaErrorKind::UnclosedCurly,
                        "an ambiguous site modification appeared before any residue",
                        Context::show(&rest[index..]),
                    ));
                }
                let modification = Rc::new(Modification::new(mv, ModificationKind::Ambiguous));
                chain
                    .mods
                    .entry((current_len - 1) as i64)
                    .or_default()
                    .push(modification);
                index = end + 1;
            }
            _ => {
                let ch_len = rest[index..].chars().next().map(char::len_utf8).unwrap_or(1);
                let ch = rest[index..index + ch_len].chars().next().unwrap_or('\0');
                base_sequence.push(ch);
                gap_armed = ch.eq_ignore_ascii_case(&'X') && rest[index + ch_len..].starts_with('[');
                index += ch_len;
            }
        }
    }

    if !range_stack.is_empty() {
        return Err(fatal(
            ProFormaErrorKind::UnclosedParen,
            "a range `(...)` was never closed",
            Context::show(rest),
        ));
    }
    chain.base_sequence = base_sequence;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_site_modification() {
        let (chain, warnings) = parse_chain("PEP[Phospho]TIDE").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(chain.base_sequence, "PEPTIDE");
        let mods = &chain.mods[&2];
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].mod_value.primary_value, "Phospho");
    }

    #[test]
    fn mass_shift_site_modification() {
        let (chain, _) = parse_chain("PEP[+79.966]TIDE").unwrap();
        let mods = &chain.mods[&2];
        assert_eq!(mods[0].mod_value.mass.unwrap().0, 79.966);
    }

    #[test]
    fn terminal_modifications() {
        let (chain, _) = parse_chain("[Acetyl]-PEPTIDE-[Amidated]").unwrap();
        assert_eq!(chain.base_sequence, "PEPTIDE");
        assert_eq!(chain.mods[&KEY_N_TERM][0].mod_value.primary_value, "Acetyl");
        assert_eq!(chain.mods[&KEY_C_TERM][0].mod_value.primary_value, "Amidated");
    }

    #[test]
    fn global_fixed_modification() {
        let (chain, _) = parse_chain("<Carbamidomethyl@C>PEPCTIDE").unwrap();
        assert_eq!(chain.base_sequence, "PEPCTIDE");
        assert_eq!(chain.global_mods.len(), 1);
        assert_eq!(chain.global_mods[0].target_residues, Some(vec!['C']));
    }

    #[test]
    fn unknown_position_multiplicity() {
        let (chain, _) = parse_chain("[Phospho]^2?EMEVNESPEK").unwrap();
        assert_eq!(chain.base_sequence, "EMEVNESPEK");
        assert_eq!(chain.mods[&KEY_UNKNOWN_POSITION].len(), 2);
    }

    #[test]
    fn range_modification_covers_every_residue() {
        let (chain, _) = parse_chain("PRT(ESFRMS)[+19.0523]ISK").unwrap();
        assert_eq!(chain.base_sequence, "PRTESFRMSISK");
        for i in 3..=8 {
            let key = i as i64;
            assert!(chain.mods[&key][0].in_range);
            assert_eq!(chain.mods[&key][0].range_start, Some(3));
            assert_eq!(chain.mods[&key][0].range_end, Some(8));
        }
    }

    #[test]
    fn crosslink_definition_and_reference() {
        let (chain, _) = parse_chain("SEK[XLMOD:02001#XL1]UENCE").unwrap();
        let mods = &chain.mods[&2];
        assert_eq!(mods[0].kind, ModificationKind::Crosslink);
        assert_eq!(mods[0].crosslink_id.as_deref(), Some("XL1"));
        assert!(!mods[0].is_crosslink_ref);
    }

    #[test]
    fn gap_residue() {
        let (chain, _) = parse_chain("RTAAX[+367.0537]WT").unwrap();
        assert_eq!(chain.base_sequence, "RTAAXWT");
        let mods = &chain.mods[&4];
        assert_eq!(mods[0].kind, ModificationKind::Gap);
    }

    #[test]
    fn sequence_ambiguity() {
        let (chain, _) = parse_chain("(?AC)PEPTIDE").unwrap();
        assert_eq!(chain.base_sequence, "ACPEPTIDE");
        assert_eq!(chain.sequence_ambiguities[0].value, "AC");
        assert_eq!(chain.sequence_ambiguities[0].position, 0);
    }

    #[test]
    fn unclosed_square_is_fatal() {
        let err = parse_chain("PEP[Phospho").unwrap_err();
        assert_eq!(err[0].kind(), ProFormaErrorKind::UnclosedSquare);
    }

    #[test]
    fn malformed_labile_is_fatal() {
        let err = parse_chain("{NotAGlycan}PEPTIDE").unwrap_err();
        assert_eq!(err[0].kind(), ProFormaErrorKind::MalformedLabile);
    }

    #[test]
    fn malformed_observed_mass_is_recoverable() {
        let (chain, warnings) = parse_chain("PEP[Obs:abc]TIDE").unwrap();
        assert_eq!(chain.base_sequence, "PEPTIDE");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind(), ProFormaErrorKind::MalformedModifier);
        let mods = &chain.mods[&2];
        assert_eq!(mods[0].mod_value.primary_value, "Obs:abc");
    }
}
