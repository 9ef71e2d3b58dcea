use thiserror::Error;

/// Structural failure of a snapshot line. Per-field problems never produce
/// one of these; malformed fragments are skipped instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("snapshot payload opens with '{{' but never closes")]
    UnclosedBrace,
    #[error("snapshot payload closes with '}}' but never opens")]
    UnopenedBrace,
    #[error("snapshot payload contains a nested block at byte {offset}")]
    NestedBlock { offset: usize },
    #[error("snapshot payload contains a control character at byte {offset}")]
    ControlCharacter { offset: usize },
}
