//! # Stylesync Parser
//!
//! Turns stylesheet text (CSS, LESS, SCSS) into a `SelectorIndex`: selector
//! text → the byte range of the rule it heads. Parsing is best-effort; regions
//! that cannot be resolved are reported as skipped and never fail the pass.

pub mod error;
pub mod index;
pub mod parser;
pub mod tokenizer;

pub use error::ParseError;
pub use index::{Scope, SelectorIndex, SkippedRegion, SourceRange};
pub use parser::{parse_scopes, ParseOutput, ScopeParser};
pub use tokenizer::{tokenize, Lexeme, Token};

/// Parse stylesheet text into a selector index
pub fn parse(text: &str) -> SelectorIndex {
    SelectorIndex::parse(text)
}
