use thiserror::Error;

use crate::token::Token;

/// Failure reported by a rule action or a grammar's parse hook; surfaced
/// verbatim as [`ParseError::Rule`].
pub type RuleError = Box<dyn std::error::Error + Send + Sync>;

/// Why a parse failed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The recognizer got stuck on this token: no rule can consume it at the
    /// position it occupies. The position can be recovered by counting the
    /// tokens already consumed.
    #[error("unexpected token: {0:?}")]
    UnexpectedToken(Box<dyn Token>),

    /// Input ran out with the grammar still expecting more.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// The recognizer accepted but no derivation could be rebuilt from the
    /// chart. Indicates an internal inconsistency rather than bad input.
    #[error("failed to match")]
    FailedMatch,

    /// Reserved. Ambiguous inputs currently resolve silently to the
    /// earliest-declared, shortest-match derivation.
    #[error("ambiguous parse")]
    AmbiguousParse,

    /// A rule action or parse hook rejected its input.
    #[error("{0}")]
    Rule(RuleError),
}
