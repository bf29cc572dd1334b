use thiserror::Error;

/// Errors reported by user-supplied callbacks while declaring a machine or
/// constructing a token.
pub type SpecError = Box<dyn std::error::Error + Send + Sync>;

/// Error produced when a token constructor rejects its matched text.
///
/// Once a [`Stream`](super::Stream) yields a `LexError` it is permanently
/// finished; no further tokens are produced.
#[derive(Debug, Error)]
#[error("cannot build token at byte {at}: {source}")]
pub struct LexError {
    /// Byte offset of the offending token in the input.
    pub at: usize,
    #[source]
    pub source: SpecError,
}
