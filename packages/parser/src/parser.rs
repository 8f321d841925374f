use crate::error::ParseError;
use crate::index::{Scope, SkippedRegion, SourceRange};
use crate::tokenizer::{tokenize, Lexeme, Token};
use std::collections::HashSet;

/// Result of one scope-extraction pass
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    /// Scopes ordered by where their selector starts
    pub scopes: Vec<Scope>,
    pub skipped: Vec<SkippedRegion>,
}

/// A `{` that has not been closed yet
struct OpenBlock {
    selector: Option<String>,
    start: usize,
    /// False inside blocks whose bodies are not rules (keyframes, nested properties)
    emit_children: bool,
}

/// Extracts rule scopes from stylesheet text.
///
/// Works on brace structure only: the tokens between the previous statement
/// boundary (`;`, `{`, `}`) and a `{` form the block's prelude. Preludes that
/// cannot be trusted are recorded as skipped regions and yield no scope; the
/// block structure is still followed so everything after them parses.
pub struct ScopeParser<'src> {
    source: &'src str,
    tokens: Vec<Lexeme>,
}

impl<'src> ScopeParser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
        }
    }

    pub fn parse(self) -> ParseOutput {
        let mut output = ParseOutput::default();
        let mut stack: Vec<OpenBlock> = Vec::new();
        let mut prelude: Vec<&Lexeme> = Vec::new();
        let mut claimed: HashSet<String> = HashSet::new();
        let mut paren_depth = 0usize;

        for lexeme in &self.tokens {
            let (token, span) = lexeme;
            match token {
                Ok(Token::LParen) => {
                    paren_depth += 1;
                    prelude.push(lexeme);
                }
                Ok(Token::RParen) => {
                    paren_depth = paren_depth.saturating_sub(1);
                    prelude.push(lexeme);
                }
                // LESS mixin arguments may be separated by `;`
                Ok(Token::Semicolon) if paren_depth == 0 => prelude.clear(),
                Ok(Token::LBrace) => {
                    let parent_emits = stack.last().map_or(true, |block| block.emit_children);
                    let block = self.open_block(
                        &prelude,
                        span.start,
                        parent_emits,
                        &mut claimed,
                        &mut output.skipped,
                    );
                    stack.push(block);
                    prelude.clear();
                    paren_depth = 0;
                }
                Ok(Token::RBrace) => {
                    prelude.clear();
                    paren_depth = 0;
                    match stack.pop() {
                        Some(OpenBlock {
                            selector: Some(selector),
                            start,
                            ..
                        }) => output.scopes.push(Scope {
                            selector,
                            range: SourceRange::new(start, span.end),
                        }),
                        Some(_) => {}
                        None => skip(
                            &mut output.skipped,
                            SourceRange::new(span.start, span.end),
                            ParseError::unexpected_close_brace(span.start),
                        ),
                    }
                }
                _ => prelude.push(lexeme),
            }
        }

        for block in stack {
            skip(
                &mut output.skipped,
                SourceRange::new(block.start, self.source.len()),
                ParseError::unclosed_block(block.start),
            );
        }

        output.scopes.sort_by_key(|scope| scope.range.start);
        output
    }

    fn open_block(
        &self,
        prelude: &[&Lexeme],
        brace_pos: usize,
        parent_emits: bool,
        claimed: &mut HashSet<String>,
        skipped: &mut Vec<SkippedRegion>,
    ) -> OpenBlock {
        let Some((first_token, first_span)) = prelude.first().copied() else {
            // Anonymous block, e.g. a stray `{ ... }`
            return OpenBlock {
                selector: None,
                start: brace_pos,
                emit_children: parent_emits,
            };
        };
        let start = first_span.start;

        if let Some((_, bad_span)) = prelude.iter().copied().find(|(token, _)| token.is_err()) {
            skip(
                skipped,
                SourceRange::new(start, brace_pos),
                ParseError::lexer_error(bad_span.start),
            );
            return OpenBlock {
                selector: None,
                start,
                emit_children: parent_emits,
            };
        }

        if *first_token == Ok(Token::AtKeyword) {
            // @media, @supports and friends hold rules; @keyframes holds
            // percentages that must not become scopes
            let name = &self.source[first_span.clone()];
            return OpenBlock {
                selector: None,
                start,
                emit_children: parent_emits && !name.ends_with("keyframes"),
            };
        }

        let selector = self.selector_text(prelude);

        // SCSS nested properties: `font: { family: serif; }`
        if selector.ends_with(':') {
            return OpenBlock {
                selector: None,
                start,
                emit_children: false,
            };
        }

        if !parent_emits {
            return OpenBlock {
                selector: None,
                start,
                emit_children: false,
            };
        }

        if !claimed.insert(selector.clone()) {
            skip(
                skipped,
                SourceRange::new(start, brace_pos),
                ParseError::duplicate_selector(start, selector),
            );
            return OpenBlock {
                selector: None,
                start,
                emit_children: true,
            };
        }

        OpenBlock {
            selector: Some(selector),
            start,
            emit_children: true,
        }
    }

    /// Prelude text as written, with every run of whitespace or comments
    /// between tokens collapsed to one space
    fn selector_text(&self, prelude: &[&Lexeme]) -> String {
        let mut text = String::new();
        let mut previous_end: Option<usize> = None;

        for (_, span) in prelude {
            if let Some(end) = previous_end {
                if span.start > end {
                    text.push(' ');
                }
            }
            text.push_str(&self.source[span.clone()]);
            previous_end = Some(span.end);
        }

        text
    }
}

fn skip(skipped: &mut Vec<SkippedRegion>, range: SourceRange, reason: ParseError) {
    tracing::debug!(
        start = range.start,
        end = range.end,
        reason = %reason,
        "Skipped stylesheet region"
    );
    skipped.push(SkippedRegion { range, reason });
}

/// Extract every resolvable scope from `source`
pub fn parse_scopes(source: &str) -> ParseOutput {
    ScopeParser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors(output: &ParseOutput) -> Vec<&str> {
        output.scopes.iter().map(|s| s.selector.as_str()).collect()
    }

    #[test]
    fn test_flat_rules() {
        let source = ".header { color: red; }\n.footer { margin: 0 }";
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".header", ".footer"]);
        assert_eq!(output.scopes[0].range, SourceRange::new(0, 23));
        let footer = output.scopes[1].range;
        assert_eq!(&source[footer.start..footer.end], ".footer { margin: 0 }");
        assert!(output.skipped.is_empty());
    }

    #[test]
    fn test_nested_less_rules() {
        let source = r#"
.card {
    padding: 4px;
    .title {
        font-weight: bold;
    }
    &:hover { opacity: 0.5; }
}
"#;
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".card", ".title", "&:hover"]);
        let card = &output.scopes[0];
        let title = &output.scopes[1];
        assert!(card.range.start < title.range.start);
        assert!(card.range.end > title.range.end);
    }

    #[test]
    fn test_selector_whitespace_collapsed() {
        let source = ".a,\n    .b   >   .c /* why */ { }";
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".a, .b > .c"]);
    }

    #[test]
    fn test_starred_comments_around_rules() {
        let source = "/** Header styles **/\n.header { color: red; }\n/*****/\n.footer { }\n";
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".header", ".footer"]);
        let header = output.scopes[0].range;
        assert_eq!(&source[header.start..header.end], ".header { color: red; }");
        assert!(output.skipped.is_empty());
    }

    #[test]
    fn test_comment_between_selector_and_brace() {
        let source = ".card /** card root **/ { }\n.nav /* it's { odd } */ { }";
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".card", ".nav"]);
        assert!(output.skipped.is_empty());
    }

    #[test]
    fn test_at_rules_do_not_emit_scopes() {
        let source = r#"
@media (max-width: 600px) {
    .header { display: none; }
}
@keyframes pulse {
    from { opacity: 0; }
    50% { opacity: 1; }
}
@font-face { font-family: Inter; }
"#;
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".header"]);
    }

    #[test]
    fn test_mixin_arguments_with_semicolons() {
        let source = ".mixin(@a; @b) { width: @a; }\n.box { .mixin(1px; 2px); }";
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".mixin(@a; @b)", ".box"]);
    }

    #[test]
    fn test_scss_nested_properties_skipped() {
        let source = ".text { font: { family: serif; size: 12px; } }";
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".text"]);
    }

    #[test]
    fn test_stray_close_brace_is_skipped() {
        let source = "} .after { }";
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".after"]);
        assert_eq!(output.skipped.len(), 1);
        assert!(matches!(
            output.skipped[0].reason,
            ParseError::UnexpectedCloseBrace { pos: 0 }
        ));
    }

    #[test]
    fn test_unclosed_block_is_skipped() {
        let source = ".ok { }\n.broken { color: red;";
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".ok"]);
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].range.end, source.len());
    }

    #[test]
    fn test_lexer_error_skips_only_that_rule() {
        let source = ".a[title=\"oops\n] { }\n.b { }";
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".b"]);
        assert!(output
            .skipped
            .iter()
            .any(|region| matches!(region.reason, ParseError::LexerError { .. })));
    }

    #[test]
    fn test_duplicate_selector_keeps_first() {
        let source = ".a { }\n.a { color: red; }";
        let output = parse_scopes(source);

        assert_eq!(output.scopes.len(), 1);
        assert_eq!(output.scopes[0].range, SourceRange::new(0, 6));
        assert!(matches!(
            &output.skipped[0].reason,
            ParseError::DuplicateSelector { selector, .. } if selector == ".a"
        ));
    }

    #[test]
    fn test_textual_variants_are_distinct() {
        let source = ".a>.b { }\n.a > .b { }";
        let output = parse_scopes(source);

        assert_eq!(selectors(&output), vec![".a>.b", ".a > .b"]);
    }
}
