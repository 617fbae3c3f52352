//! Pipe-value classification: priority-ordered rule dispatch over a single modification bracket's
//! interior (§4.2), grounded on the teacher's `MOD_REGEX`/`parse_single_modification`
//! (`mzcore/src/sequence/peptidoform/parse_modification.rs`).

use std::sync::LazyLock;

use regex::Regex;

use super::pipe_value::{PipeValue, PipeValueKind};
use super::value::ModificationValue;
use crate::error::{Context, ProFormaError, ProFormaErrorKind};
use crate::formula;
use crate::glycan;
use crate::helper_functions::{next_number, str_starts_with};

/// Sources recognized as a `SOURCE:` prefix, per §3. `MASS` is handled separately (rule e):
/// it is not itself a member of the known-sources set, and a `MASS:` pipe value carries no
/// `source`.
const KNOWN_SOURCES: &[&str] = &[
    "Unimod", "U", "PSI-MOD", "M", "RESID", "R", "XL-MOD", "X", "XLMOD", "GNO", "G", "MOD", "Obs",
    "Formula", "Glycan", "Info", "INFO", "XL",
];

/// The `#label(score)` suffix grammar, shared by the ambiguity-group, crosslink, and branch
/// suffix forms once the crosslink/branch spellings have been ruled out.
static SUFFIX_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9A-Za-z]+)(?:\((\d+(?:\.\d+)?)\))?$").unwrap());

fn is_known_source(candidate: &str) -> Option<&'static str> {
    KNOWN_SOURCES
        .iter()
        .find(|s| s.eq_ignore_ascii_case(candidate))
        .copied()
}

/// Parse the interior of a single `[...]`/`{...}` bracket into a [`ModificationValue`].
/// Splits on `|`; the first component is the primary, the rest are pipe components (§4.2.1).
/// Any pipe component whose sub-grammar fails to parse (e.g. non-numeric text after `Obs:`) is
/// demoted to a plain `Synonym` and a recoverable `MalformedModifier` warning is pushed onto
/// `warnings` (§7's recoverable-vs-fatal split).
pub fn parse_modification_value(
    interior: &str,
    warnings: &mut Vec<ProFormaError>,
) -> ModificationValue {
    let pipe_values = interior
        .split('|')
        .map(|component| classify_pipe_component(component.trim(), warnings))
        .collect();
    ModificationValue::new(pipe_values)
}

/// Classify one pipe-separated component, in priority order a-g (§4.2.2).
pub(crate) fn classify_pipe_component(raw: &str, warnings: &mut Vec<ProFormaError>) -> PipeValue {
    let (body_part, suffix_part) = match raw.as_bytes().iter().position(|b| *b == b'#') {
        Some(idx) => (&raw[..idx], Some(&raw[idx + 1..])),
        None => (raw, None),
    };

    let mut value = PipeValue::synonym(raw, body_part);

    // Rules a-c: #BRANCH, #XL..., #label(score).
    if let Some(suffix) = suffix_part {
        if suffix == "BRANCH" {
            value.add_kind(PipeValueKind::Branch);
            if body_part.is_empty() {
                value.is_branch_ref = true;
            } else {
                value.is_branch = true;
            }
        } else if str_starts_with::<false>(suffix, "XL") {
            value.add_kind(PipeValueKind::Crosslink);
            value.crosslink_id = Some(suffix.to_string());
            value.is_crosslink_ref = body_part.is_empty();
        } else if let Some(caps) = SUFFIX_LABEL_RE.captures(suffix) {
            value.add_kind(PipeValueKind::Ambiguity);
            value.ambiguity_group = Some(caps[1].to_string());
            value.localization_score = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .map(ordered_float::OrderedFloat);
            value.is_ambiguity_ref = body_part.is_empty();
        }
    }

    if !body_part.is_empty() {
        classify_body(body_part, &mut value, warnings);
    } else if suffix_part.is_none() {
        // Empty component (e.g. a stray `||`): remains a bare empty synonym.
        value.value = String::new();
    }

    value
}

/// Rules d-g: classify `body_part` (the text before any `#...` suffix) for source prefixes,
/// `MASS:` annotations, and bare mass shifts, layering results onto `value`.
fn classify_body(body_part: &str, value: &mut PipeValue, warnings: &mut Vec<ProFormaError>) {
    if str_starts_with::<true>(body_part, "mass:") {
        let rest = &body_part[5..];
        value.add_kind(PipeValueKind::Mass);
        value.value = rest.to_string();
        value.mass_prefix = Some(body_part[..4].to_string());
        if !set_mass(value, rest) {
            demote_to_synonym(value, warnings);
        }
        return;
    }

    if let Some(colon) = body_part.find(':') {
        let prefix = &body_part[..colon];
        let rest = &body_part[colon + 1..];
        if let Some(source) = is_known_source(prefix) {
            value.source = Some(body_part[..colon].to_string());
            classify_known_source(source, rest, value, warnings);
            return;
        }
    }

    // Rule f: a bare +/- mass shift.
    if (body_part.starts_with('+') || body_part.starts_with('-'))
        && body_part.chars().any(|c| c.is_ascii_digit())
    {
        value.add_kind(PipeValueKind::Mass);
        value.value = body_part.to_string();
        if !set_mass(value, body_part) {
            demote_to_synonym(value, warnings);
        }
        return;
    }

    // Rule g: a plain synonym.
    value.add_kind(PipeValueKind::Synonym);
    value.value = body_part.to_string();
}

fn classify_known_source(
    source: &str,
    rest: &str,
    value: &mut PipeValue,
    warnings: &mut Vec<ProFormaError>,
) {
    match source.to_ascii_uppercase().as_str() {
        "INFO" => {
            value.add_kind(PipeValueKind::InfoTag);
            value.value = rest.to_string();
        }
        "OBS" => {
            value.add_kind(PipeValueKind::ObservedMass);
            value.value = rest.to_string();
            value.observed_mass_text = Some(rest.to_string());
            match rest.parse::<f64>() {
                Ok(number) => value.observed_mass = Some(ordered_float::OrderedFloat(number)),
                Err(_) => demote_to_synonym(value, warnings),
            }
        }
        "GLYCAN" => {
            value.add_kind(PipeValueKind::Glycan);
            value.value = rest.to_string();
            value.is_valid_glycan = Some(glycan::is_valid_glycan(rest));
        }
        "GNO" | "G" => {
            value.add_kind(PipeValueKind::Gap);
            value.value = rest.to_string();
            value.is_valid_glycan = Some(true);
        }
        "FORMULA" => {
            value.add_kind(PipeValueKind::Formula);
            value.value = rest.to_string();
            value.is_valid_formula = Some(formula::is_valid_formula(rest));
        }
        "XL" | "XLMOD" | "XL-MOD" | "X" => {
            if let Some(hash) = rest.find('#') {
                let (head, tail) = (&rest[..hash], &rest[hash + 1..]);
                if str_starts_with::<false>(tail, "XL") {
                    value.crosslink_id = Some(tail.to_string());
                    value.add_kind(PipeValueKind::Crosslink);
                    value.value = head.to_string();
                    return;
                }
            }
            value.add_kind(PipeValueKind::Synonym);
            value.value = rest.to_string();
        }
        _ => {
            value.add_kind(PipeValueKind::Synonym);
            value.value = rest.to_string();
        }
    }
}

/// Try to parse `text` as the signed mass backing a `Mass`/`MASS:` pipe value. Returns `false`
/// (leaving `value` untouched) if `text` is not a valid number, so the caller can demote.
fn set_mass(value: &mut PipeValue, text: &str) -> bool {
    if let Some((_, _, Ok(number))) = next_number::<true, true, f64>(text) {
        value.mass = Some(ordered_float::OrderedFloat(number));
        value.mass_text = Some(text.to_string());
        true
    } else {
        false
    }
}

/// Demote a pipe value whose body sub-grammar failed to parse back to a bare `Synonym`,
/// preserving its original `raw` text verbatim (so round-trip serialization still emits the
/// original characters) and recording a recoverable `MalformedModifier` warning (§7).
fn demote_to_synonym(value: &mut PipeValue, warnings: &mut Vec<ProFormaError>) {
    let raw = value.raw.clone();
    warnings.push(ProFormaError::new(
        ProFormaErrorKind::MalformedModifier,
        format!("`{raw}` could not be parsed as its declared kind; treating it as a synonym"),
        Context::show(&raw),
    ));
    *value = PipeValue::synonym(&raw, &raw);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Classify one component with a throwaway warnings sink, for tests that don't care about
    /// the recoverable-warning channel.
    fn classify(raw: &str) -> PipeValue {
        classify_pipe_component(raw, &mut Vec::new())
    }

    #[test]
    fn plain_synonym() {
        let pv = classify("Phospho");
        assert_eq!(pv.kind, PipeValueKind::Synonym);
        assert_eq!(pv.value, "Phospho");
        assert!(pv.source.is_none());
    }

    #[test]
    fn bare_mass_shift() {
        let pv = classify("+79.966");
        assert_eq!(pv.kind, PipeValueKind::Mass);
        assert_eq!(pv.mass.unwrap().0, 79.966);
        assert_eq!(pv.mass_text.as_deref(), Some("+79.966"));
    }

    #[test]
    fn source_synonym() {
        let pv = classify("U:Phospho");
        assert_eq!(pv.kind, PipeValueKind::Synonym);
        assert_eq!(pv.source.as_deref(), Some("U"));
        assert_eq!(pv.value, "Phospho");
    }

    #[test]
    fn observed_mass_not_bare_mass() {
        let pv = classify("Obs:+79.978");
        assert_eq!(pv.kind, PipeValueKind::ObservedMass);
        assert_eq!(pv.observed_mass.unwrap().0, 79.978);
    }

    #[test]
    fn malformed_observed_mass_demotes_to_synonym_with_warning() {
        let mut warnings = Vec::new();
        let pv = classify_pipe_component("Obs:abc", &mut warnings);
        assert_eq!(pv.kind, PipeValueKind::Synonym);
        assert_eq!(pv.assigned_kinds, vec![PipeValueKind::Synonym]);
        assert_eq!(pv.value, "Obs:abc");
        assert!(pv.source.is_none());
        assert!(pv.observed_mass.is_none());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind(), ProFormaErrorKind::MalformedModifier);
    }

    #[test]
    fn malformed_mass_prefix_demotes_to_synonym_with_warning() {
        let mut warnings = Vec::new();
        let pv = classify_pipe_component("MASS:abc", &mut warnings);
        assert_eq!(pv.kind, PipeValueKind::Synonym);
        assert_eq!(pv.value, "MASS:abc");
        assert!(pv.mass.is_none());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind(), ProFormaErrorKind::MalformedModifier);
    }

    #[test]
    fn crosslink_definition() {
        let pv = classify("XLMOD:02001#XL1");
        assert_eq!(pv.kind, PipeValueKind::Crosslink);
        assert_eq!(pv.crosslink_id.as_deref(), Some("XL1"));
        assert!(!pv.is_crosslink_ref);
        assert_eq!(pv.source.as_deref(), Some("XLMOD"));
        assert_eq!(pv.value, "02001");
    }

    #[test]
    fn crosslink_reference() {
        let pv = classify("#XL1");
        assert_eq!(pv.kind, PipeValueKind::Crosslink);
        assert!(pv.is_crosslink_ref);
        assert_eq!(pv.crosslink_id.as_deref(), Some("XL1"));
    }

    #[test]
    fn branch_definition_and_reference() {
        let def = classify("MOD:00093#BRANCH");
        assert!(def.is_branch);
        assert!(!def.is_branch_ref);
        let reference = classify("#BRANCH");
        assert!(reference.is_branch_ref);
    }

    #[test]
    fn ambiguity_group_with_score() {
        let pv = classify("Phospho#g1(0.99)");
        assert_eq!(pv.kind, PipeValueKind::Ambiguity);
        assert_eq!(pv.ambiguity_group.as_deref(), Some("g1"));
        assert_eq!(pv.localization_score.unwrap().0, 0.99);
        assert!(!pv.is_ambiguity_ref);
    }

    #[test]
    fn ambiguity_reference_without_score() {
        let pv = classify("#g1");
        assert!(pv.is_ambiguity_ref);
        assert!(pv.localization_score.is_none());
    }

    #[test]
    fn full_modification_value() {
        let mv = parse_modification_value("U:Phospho|+79.966331", &mut Vec::new());
        assert_eq!(mv.primary_value, "Phospho");
        assert_eq!(mv.source.as_deref(), Some("U"));
        assert_eq!(mv.mass.unwrap().0, 79.966331);
        assert_eq!(mv.pipe_values.len(), 2);
    }
}
