use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// The primary classification of a single pipe-separated interpretation within a modification
/// body. A [`PipeValue`] may carry several of these labels in `assigned_kinds`; `kind` holds the
/// first one that matched during classification.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeValueKind {
    /// A plain named synonym, optionally with a known source.
    Synonym,
    /// An `INFO:`/`Info:` free-text payload.
    InfoTag,
    /// A `+N`/`-N` mass shift, or a `MASS:N` annotation.
    Mass,
    /// An `Obs:`/`OBS:` observed mass.
    ObservedMass,
    /// A `#XL...` crosslink definition or reference.
    Crosslink,
    /// A `#BRANCH` branch definition or reference.
    Branch,
    /// A `#label(score)` ambiguity-group marker.
    Ambiguity,
    /// A `Glycan:`/`GLYCAN:` composition.
    Glycan,
    /// A `GNO:`/`G:` gap annotation (carries `is_valid_glycan = true`).
    Gap,
    /// A `Formula:`/`FORMULA:` molecular formula.
    Formula,
}

/// One `|`-delimited interpretation within a modification body (§3 `PipeValue`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PipeValue {
    /// The original bracket-interior fragment this pipe value was parsed from.
    pub raw: String,
    /// The text payload after stripping any source prefix and `#...` suffix.
    pub value: String,
    /// The primary classification.
    pub kind: PipeValueKind,
    /// Every label that applied during classification, in the order they were recognized.
    pub assigned_kinds: Vec<PipeValueKind>,
    /// The source prefix, verbatim as written, if any (`Unimod`, `U`, `PSI-MOD`, ...).
    pub source: Option<String>,
    /// The signed mass, when this pipe value is a mass shift or `MASS:` annotation.
    pub mass: Option<OrderedFloat<f64>>,
    /// The original signed-number text for `mass`, preserved verbatim for round-trip fidelity.
    pub mass_text: Option<String>,
    /// The original-case `MASS`/`Mass`/... prefix text, present iff this pipe value was written
    /// as `MASS:body` rather than a bare `+N`/`-N` shift. Not a member of the known-sources set
    /// (§3), so kept separately from `source` to preserve it across serialization.
    pub mass_prefix: Option<String>,
    /// The observed mass, set only under source `Obs`/`OBS`.
    pub observed_mass: Option<OrderedFloat<f64>>,
    /// The original signed-number text for `observed_mass`.
    pub observed_mass_text: Option<String>,
    /// The crosslink id, present iff a `#XL...` suffix was found.
    pub crosslink_id: Option<String>,
    /// True iff this pipe value began with `#XL...` and carried no body (a reference).
    pub is_crosslink_ref: bool,
    /// True iff a `#BRANCH` suffix (with a body) was found.
    pub is_branch: bool,
    /// True iff a bare `#BRANCH` (no body) was found.
    pub is_branch_ref: bool,
    /// The ambiguity-group label, present iff a non-crosslink, non-branch `#...` suffix was
    /// found.
    pub ambiguity_group: Option<String>,
    /// The localization score parsed from `(score)` following the ambiguity label.
    pub localization_score: Option<OrderedFloat<f64>>,
    /// True iff the pipe value had no body before its `#label` suffix.
    pub is_ambiguity_ref: bool,
    /// Set under source `Glycan`/`GLYCAN` (or `GNO`/`G`): whether the syntactic validator
    /// accepted the composition.
    pub is_valid_glycan: Option<bool>,
    /// Set under source `Formula`/`FORMULA`: whether the syntactic validator accepted the
    /// formula.
    pub is_valid_formula: Option<bool>,
}

impl PipeValue {
    /// A bare synonym pipe value carrying only raw/value text, used as the base that
    /// classification rules refine.
    pub(crate) fn synonym(raw: &str, value: &str) -> Self {
        Self {
            raw: raw.to_string(),
            value: value.to_string(),
            kind: PipeValueKind::Synonym,
            assigned_kinds: vec![PipeValueKind::Synonym],
            source: None,
            mass: None,
            mass_text: None,
            mass_prefix: None,
            observed_mass: None,
            observed_mass_text: None,
            crosslink_id: None,
            is_crosslink_ref: false,
            is_branch: false,
            is_branch_ref: false,
            ambiguity_group: None,
            localization_score: None,
            is_ambiguity_ref: false,
            is_valid_glycan: None,
            is_valid_formula: None,
        }
    }

    pub(crate) fn add_kind(&mut self, kind: PipeValueKind) {
        if self.assigned_kinds == [PipeValueKind::Synonym] {
            self.assigned_kinds.clear();
        }
        if !self.assigned_kinds.contains(&kind) {
            self.assigned_kinds.push(kind);
        }
        self.kind = self.assigned_kinds[0];
    }
}
