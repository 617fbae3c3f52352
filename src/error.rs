use serde::{Deserialize, Serialize};
use std::fmt;

/// Context pointing at the offending slice of a ProForma input, for diagnostics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// No context can be given.
    None,
    /// The full input is shown without a specific highlighted position.
    Show {
        /// The text to show.
        text: String,
    },
    /// A specific position in the input is highlighted.
    Highlight {
        /// The full input text.
        text: String,
        /// Byte offset of the highlighted span.
        offset: usize,
        /// Byte length of the highlighted span.
        length: usize,
    },
}

impl Context {
    /// Create a context when no position information is available.
    pub const fn none() -> Self {
        Self::None
    }

    /// Create a context that shows the full input without a highlight.
    pub fn show(text: impl std::string::ToString) -> Self {
        Self::Show {
            text: text.to_string(),
        }
    }

    /// Create a context that highlights a byte span within the input.
    pub fn highlight(text: impl std::string::ToString, offset: usize, length: usize) -> Self {
        Self::Highlight {
            text: text.to_string(),
            offset,
            length,
        }
    }

    /// Create a context highlighting a single byte position.
    pub fn position(text: impl std::string::ToString, offset: usize) -> Self {
        Self::Highlight {
            text: text.to_string(),
            offset,
            length: 1,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Show { text } => write!(f, "\n  ╷\n  │ {text}\n  ╵"),
            Self::Highlight {
                text,
                offset,
                length,
            } => {
                write!(
                    f,
                    "\n  ╷\n  │ {text}\n  · {}{}\n  ╵",
                    " ".repeat(*offset),
                    "‾".repeat((*length).max(1))
                )
            }
        }
    }
}

/// The distinct kinds of error this crate can raise while parsing or serializing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProFormaErrorKind {
    /// A `<` was never closed by a matching `>`.
    UnclosedAngle,
    /// A `[` was never closed by a matching `]`.
    UnclosedSquare,
    /// A `{` was never closed by a matching `}`.
    UnclosedCurly,
    /// A `(` was never closed by a matching `)`.
    UnclosedParen,
    /// A `)` appeared with no matching open `(`.
    UnmatchedCloseParen,
    /// A labile modification block did not begin with `Glycan:`.
    MalformedLabile,
    /// A residue code has no entry in the residue table and no explicit mass.
    UnknownResidue,
    /// Mass calculation encountered a residue or modification lacking mass.
    MissingMass,
    /// A glycan composition failed the syntactic validator.
    InvalidGlycan,
    /// A molecular formula failed the syntactic validator.
    InvalidFormula,
    /// A pipe value's sub-grammar could not be parsed and was demoted to a synonym.
    MalformedModifier,
}

impl ProFormaErrorKind {
    /// A short, human title for this kind, used as the error's default headline.
    pub const fn title(self) -> &'static str {
        match self {
            Self::UnclosedAngle => "Unclosed global modification",
            Self::UnclosedSquare => "Unclosed modification",
            Self::UnclosedCurly => "Unclosed labile or ambiguous modification",
            Self::UnclosedParen => "Unclosed range",
            Self::UnmatchedCloseParen => "Unmatched closing parenthesis",
            Self::MalformedLabile => "Malformed labile modification",
            Self::UnknownResidue => "Unknown residue",
            Self::MissingMass => "Missing mass",
            Self::InvalidGlycan => "Invalid glycan composition",
            Self::InvalidFormula => "Invalid molecular formula",
            Self::MalformedModifier => "Malformed modifier",
        }
    }
}

/// An error, or recoverable warning, produced while parsing or serializing a peptidoform.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProFormaError {
    kind: ProFormaErrorKind,
    long_description: String,
    context: Context,
}

impl ProFormaError {
    /// Create a new error of the given kind, with an explanatory message and context.
    pub fn new(
        kind: ProFormaErrorKind,
        long_description: impl std::string::ToString,
        context: Context,
    ) -> Self {
        Self {
            kind,
            long_description: long_description.to_string(),
            context,
        }
    }

    /// The kind of this error.
    pub const fn kind(&self) -> ProFormaErrorKind {
        self.kind
    }

    /// The explanatory long description.
    pub fn long_description(&self) -> &str {
        &self.long_description
    }

    /// The context pointing at the offending input.
    pub const fn context(&self) -> &Context {
        &self.context
    }
}

impl fmt::Display for ProFormaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}{}",
            self.kind.title(),
            self.long_description,
            self.context
        )
    }
}

impl std::error::Error for ProFormaError {}

/// The result of a parse: on success the value plus any recoverable warnings, on failure the
/// fatal structural errors that aborted the parse.
pub type ParseResult<T> = Result<(T, Vec<ProFormaError>), Vec<ProFormaError>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_empty_error() {
        let a = ProFormaError::new(ProFormaErrorKind::MalformedLabile, "test", Context::none());
        assert_eq!(format!("{a}"), "Malformed labile modification: test");
    }

    #[test]
    fn create_highlighted_error() {
        let a = ProFormaError::new(
            ProFormaErrorKind::UnclosedSquare,
            "missing ]",
            Context::highlight("PEP[Phospho", 3, 9),
        );
        let rendered = format!("{a}");
        assert!(rendered.contains("PEP[Phospho"));
        assert!(rendered.contains("missing ]"));
    }
}
