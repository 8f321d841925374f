use thiserror::Error;

/// Why a region of the stylesheet produced no scope.
///
/// These never fail a parse; they are collected as `SkippedRegion`s so the
/// rest of the file still yields scopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Block opened at {pos} is never closed")]
    UnclosedBlock { pos: usize },

    #[error("Unexpected '}}' at {pos}")]
    UnexpectedCloseBrace { pos: usize },

    #[error("Unreadable input at {pos}")]
    LexerError { pos: usize },

    #[error("Selector '{selector}' at {pos} already has a scope")]
    DuplicateSelector { pos: usize, selector: String },
}

impl ParseError {
    pub fn unclosed_block(pos: usize) -> Self {
        Self::UnclosedBlock { pos }
    }

    pub fn unexpected_close_brace(pos: usize) -> Self {
        Self::UnexpectedCloseBrace { pos }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    pub fn duplicate_selector(pos: usize, selector: impl Into<String>) -> Self {
        Self::DuplicateSelector {
            pos,
            selector: selector.into(),
        }
    }

    pub fn pos(&self) -> usize {
        match self {
            Self::UnclosedBlock { pos }
            | Self::UnexpectedCloseBrace { pos }
            | Self::LexerError { pos }
            | Self::DuplicateSelector { pos, .. } => *pos,
        }
    }
}
