use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::pipe_value::{PipeValue, PipeValueKind};

/// The parsed interior of a single modification bracket: an ordered list of pipe-separated
/// interpretations, plus the derived primary identifier, source, and mass (§3, §4.2).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModificationValue {
    /// Canonical textual identifier of the modification: the primary pipe value's body, with
    /// any source prefix and `#...` suffix already stripped.
    pub primary_value: String,
    /// The source declared by the primary pipe value, if any.
    pub source: Option<String>,
    /// The first mass found across all pipe values, if any.
    pub mass: Option<OrderedFloat<f64>>,
    /// Original signed-number text backing `mass`, preserved for round-trip precision.
    pub mass_text: Option<String>,
    /// All pipe values, in input order, primary first.
    pub pipe_values: Vec<PipeValue>,
}

impl ModificationValue {
    pub(crate) fn new(pipe_values: Vec<PipeValue>) -> Self {
        let primary_value = pipe_values
            .first()
            .map(|p| p.value.clone())
            .unwrap_or_default();
        let source = pipe_values.first().and_then(|p| p.source.clone());
        let (mass, mass_text) = pipe_values
            .iter()
            .find(|p| p.assigned_kinds.contains(&PipeValueKind::Mass))
            .map(|p| (p.mass, p.mass_text.clone()))
            .unwrap_or((None, None));
        Self {
            primary_value,
            source,
            mass,
            mass_text,
            pipe_values,
        }
    }

    /// All `INFO`/`Info` pipe values' payloads.
    pub fn info_tags(&self) -> Vec<&str> {
        self.pipe_values
            .iter()
            .filter(|p| p.assigned_kinds.contains(&PipeValueKind::InfoTag))
            .map(|p| p.value.as_str())
            .collect()
    }

    /// All pipe values classified as plain synonyms.
    pub fn synonyms(&self) -> Vec<&str> {
        self.pipe_values
            .iter()
            .filter(|p| p.assigned_kinds.contains(&PipeValueKind::Synonym))
            .map(|p| p.value.as_str())
            .collect()
    }

    /// The observed mass, if any pipe value declared one under source `Obs`.
    pub fn observed_mass(&self) -> Option<OrderedFloat<f64>> {
        self.pipe_values.iter().find_map(|p| p.observed_mass)
    }

    /// The ambiguity-group label, if any pipe value carried one.
    pub fn ambiguity_group(&self) -> Option<&str> {
        self.pipe_values
            .iter()
            .find_map(|p| p.ambiguity_group.as_deref())
    }

    /// True iff any pipe value is an ambiguity-group reference (no body before `#label`).
    pub fn is_ambiguity_ref(&self) -> bool {
        self.pipe_values.iter().any(|p| p.is_ambiguity_ref)
    }

    /// True iff any pipe value is a crosslink reference (`#XL...` with no body).
    pub fn is_crosslink_ref(&self) -> bool {
        self.pipe_values.iter().any(|p| p.is_crosslink_ref)
    }

    /// True iff any pipe value is a branch reference (bare `#BRANCH`, no body).
    pub fn is_branch_ref(&self) -> bool {
        self.pipe_values.iter().any(|p| p.is_branch_ref)
    }

    /// True iff any pipe value is a branch definition (`body#BRANCH`).
    pub fn is_branch(&self) -> bool {
        self.pipe_values.iter().any(|p| p.is_branch)
    }

    /// The crosslink id, if any pipe value carried one.
    pub fn crosslink_id(&self) -> Option<&str> {
        self.pipe_values
            .iter()
            .find_map(|p| p.crosslink_id.as_deref())
    }

    /// The first localization score on any ambiguity pipe value.
    pub fn localization_score(&self) -> Option<OrderedFloat<f64>> {
        self.pipe_values.iter().find_map(|p| p.localization_score)
    }
}
