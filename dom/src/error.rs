use thiserror::Error;

/// Failure to parse a markup string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unexpected end of markup in tag starting at byte {offset}")]
    UnexpectedEof { offset: usize },
    #[error("invalid tag name at byte {offset}")]
    InvalidTagName { offset: usize },
    #[error("invalid attribute at byte {offset}")]
    InvalidAttribute { offset: usize },
    #[error("unterminated comment starting at byte {offset}")]
    UnterminatedComment { offset: usize },
}
