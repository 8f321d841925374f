//! # Selector Index
//!
//! Maps selector text to the source range of its rule block. Rebuilt from
//! scratch on every re-parse; selectors are keyed by their literal text, so
//! `.a>.b` and `.a > .b` are different keys even though they match the same
//! elements.

use crate::error::ParseError;
use crate::parser::parse_scopes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open byte range `[start, end)` in the stylesheet text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A selector and the block it heads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub selector: String,
    pub range: SourceRange,
}

impl Scope {
    pub fn new(selector: impl Into<String>, range: SourceRange) -> Self {
        Self {
            selector: selector.into(),
            range,
        }
    }
}

/// A region that produced no scope, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRegion {
    pub range: SourceRange,
    pub reason: ParseError,
}

#[derive(Debug, Clone, Copy)]
struct LineInfo {
    start: usize,
    /// First non-blank byte of the line, or `start` for blank lines
    anchor: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SelectorIndex {
    scopes: IndexMap<String, Scope>,
    lines: Vec<LineInfo>,
    skipped: Vec<SkippedRegion>,
}

impl SelectorIndex {
    /// Parse stylesheet text. Never fails: unparsable regions are skipped.
    pub fn parse(text: &str) -> Self {
        let output = parse_scopes(text);

        let scopes = output
            .scopes
            .into_iter()
            .map(|scope| (scope.selector.clone(), scope))
            .collect();

        Self {
            scopes,
            lines: line_table(text),
            skipped: output.skipped,
        }
    }

    /// Build an index from already-known scopes (no line information)
    pub fn from_scopes(scopes: impl IntoIterator<Item = Scope>) -> Self {
        let mut index = Self::default();
        for scope in scopes {
            index.scopes.entry(scope.selector.clone()).or_insert(scope);
        }
        index
    }

    pub fn get(&self, selector: &str) -> Option<&Scope> {
        self.scopes.get(selector)
    }

    pub fn range_of(&self, selector: &str) -> Option<SourceRange> {
        self.scopes.get(selector).map(|scope| scope.range)
    }

    /// Scopes in source order
    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.values()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn skipped(&self) -> &[SkippedRegion] {
        &self.skipped
    }

    /// Innermost scope containing a byte offset
    pub fn scope_at_offset(&self, offset: usize) -> Option<&Scope> {
        self.scopes
            .values()
            .filter(|scope| scope.range.contains(offset))
            .max_by_key(|scope| scope.range.start)
    }

    /// Selector of the innermost scope enclosing a 0-based line, judged at
    /// the line's first non-blank character
    pub fn token_at(&self, line: usize) -> Option<&str> {
        let info = self.lines.get(line)?;
        self.scope_at_offset(info.anchor)
            .map(|scope| scope.selector.as_str())
    }

    /// 0-based line containing `offset`
    pub fn line_of(&self, offset: usize) -> usize {
        match self.lines.binary_search_by_key(&offset, |line| line.start) {
            Ok(line) => line,
            Err(insert_at) => insert_at.saturating_sub(1),
        }
    }
}

fn line_table(text: &str) -> Vec<LineInfo> {
    let mut lines = Vec::new();
    let mut start = 0;

    for line in text.split('\n') {
        let leading = line.len() - line.trim_start_matches([' ', '\t', '\r']).len();
        let anchor = if leading == line.len() { start } else { start + leading };
        lines.push(LineInfo { start, anchor });
        start += line.len() + 1;
    }

    lines
}
