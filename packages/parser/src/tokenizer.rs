use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Token types for CSS and its nested dialects (LESS, SCSS).
///
/// Only the structure needed to find rule blocks is tokenized; everything
/// else (selectors, property values) lands in `Text` runs and is sliced back
/// out of the source by span.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
pub enum Token {
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(";")]
    Semicolon,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#)]
    String,

    // url() bodies may contain `//`, which would otherwise start a comment
    #[regex(r"url\([^)]*\)")]
    Url,

    #[regex(r"@[a-zA-Z_-][a-zA-Z0-9_-]*")]
    AtKeyword,

    // LESS `@{name}` and SCSS `#{$name}`
    #[regex(r"[@#]\{[^}]*\}")]
    Interpolation,

    #[token("@")]
    At,

    #[token("#")]
    Hash,

    #[token("/")]
    Slash,

    #[regex(r#"[^ \t\r\n\f{};"'()/@#]+"#)]
    Text,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Semicolon => write!(f, ";"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::String => write!(f, "string"),
            Token::Url => write!(f, "url"),
            Token::AtKeyword => write!(f, "at-keyword"),
            Token::Interpolation => write!(f, "interpolation"),
            Token::At => write!(f, "@"),
            Token::Hash => write!(f, "#"),
            Token::Slash => write!(f, "/"),
            Token::Text => write!(f, "text"),
        }
    }
}

/// A token (or an unlexable run) with its byte range in the source
pub type Lexeme = (Result<Token, ()>, Range<usize>);

/// Tokenize a stylesheet. Unlexable input (an unterminated string, say) is
/// kept as an `Err` entry so the parser can skip the region it belongs to.
pub fn tokenize(source: &str) -> Vec<Lexeme> {
    Token::lexer(source).spanned().collect()
}
