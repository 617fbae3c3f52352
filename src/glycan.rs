//! Syntactic glycan composition validator (§4.3). Pure accept/reject, no monosaccharide mass
//! database — grounded on the teacher's greedy-longest-match monosaccharide scan
//! (`mzcore/src/glycan/lists.rs`'s naming scheme), narrowed to the ten fixed names in §6.

use crate::residue_table::MONOSACCHARIDES;

/// Whether `text` is a syntactically valid glycan composition: a sequence of monosaccharide
/// names from the canonical set, each optionally followed by `(digits)`, with no other
/// characters. Operates on a whitespace-stripped copy.
pub fn is_valid_glycan(text: &str) -> bool {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if stripped.is_empty() {
        return false;
    }
    let bytes = stripped.as_bytes();
    let mut index = 0usize;
    while index < bytes.len() {
        let Some(name) = longest_monosaccharide_match(&stripped[index..]) else {
            return false;
        };
        index += name.len();
        index += consume_count(&stripped[index..]);
    }
    true
}

/// Find the longest monosaccharide name from the canonical set that prefixes `text`.
fn longest_monosaccharide_match(text: &str) -> Option<&'static str> {
    MONOSACCHARIDES
        .iter()
        .filter(|name| text.starts_with(**name))
        .max_by_key(|name| name.len())
        .copied()
}

/// Consume an optional `(digits)` count suffix, returning its byte length (0 if absent or
/// malformed).
fn consume_count(text: &str) -> usize {
    if !text.starts_with('(') {
        return 0;
    }
    let Some(close) = text.find(')') else {
        return 0;
    };
    let digits = &text[1..close];
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        close + 1
    } else {
        0
    }
}
