//! Token vocabulary for CHTL source.
//!
//! Lexing happens in two layers. [`RawToken`] is the logos-derived scanner;
//! it only knows about lexical shapes. The tokenizer then classifies raw
//! shapes into [`TokenKind`]s (keywords, bracketed block keywords, `@` type
//! tags) so the parser never has to re-inspect lexeme text.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `.box` as a class selector beats `.` + ident)
//! 2. For equal length matches, the explicit `priority` decides
//!
//! Our ordering ensures:
//! - `10px` matches a single [`RawToken::Number`], not `Number` + `Ident`
//! - `&:hover` matches [`RawToken::ContextRef`], not `&` + `:` + `hover`
//! - `[Template]` matches [`RawToken::BracketWord`], not `[` + ident + `]`
//!
//! Dotted and slashed words (`a.png`, `ui.forms`, `img/a.png`) lex as an
//! identifier followed by `.name`/`/` pieces; values are read back from the
//! source span, and namespace paths join adjacent class-selector tokens.

use std::fmt;

use logos::{Lexer, Logos};
use thiserror::Error;

use super::span::Span;

/// Lexical failure categories. The default variant is what logos reports
/// for bytes no rule matches.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("unterminated block keyword")]
    UnterminatedBracket,
}

/// Shape-level token produced by the logos scanner.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\n\r\f\x{FEFF}]+")]
pub(crate) enum RawToken {
    // ── Comments ─────────────────────────────────────────────────────

    /// `// ...` up to end of line.
    #[regex(r"//[^\n]*")]
    LineComment,

    /// `/* ... */`, possibly spanning lines.
    #[token("/*", block_comment)]
    BlockComment,

    /// `-- ...` up to end of line. Only a comment at line start.
    #[regex(r"--[^\n]*")]
    GeneratorComment,

    // ── Literals ─────────────────────────────────────────────────────

    /// Quoted string with its escapes already processed.
    #[token("\"", |lex| quoted(lex, '"'))]
    #[token("'", |lex| quoted(lex, '\''))]
    #[token("`", |lex| quoted(lex, '`'))]
    String(String),

    /// Number with an optional unit suffix: `10`, `0.5`, `10px`, `50%`.
    #[regex(r"[0-9]+(\.[0-9]+)?[A-Za-z%]*", priority = 4)]
    Number,

    /// Identifier. Non-ASCII letters are accepted anywhere.
    #[regex(r"[A-Za-z_\x{80}-\x{10FFFF}][A-Za-z0-9_\-\x{80}-\x{10FFFF}]*", priority = 3)]
    Ident,

    // ── Compound tokens ──────────────────────────────────────────────

    /// `[Template]`, `[Custom]`, ... or any other bracketed word.
    #[regex(r"\[[A-Za-z][A-Za-z0-9_]*\]")]
    BracketWord,

    /// A block keyword missing its closing bracket.
    #[regex(r"\[(Template|Custom|Origin|Import|Namespace|Configuration|Info|Export|Name|OriginType)")]
    UnclosedBracketWord,

    /// `@Style`, `@Element`, `@Html`, ...
    #[regex(r"@[A-Za-z_][A-Za-z0-9_]*")]
    AtWord,

    /// `.name`
    #[regex(r"\.[A-Za-z_][A-Za-z0-9_\-]*")]
    ClassSelector,

    /// `#name`
    #[regex(r"#[A-Za-z_][A-Za-z0-9_\-]*")]
    IdSelector,

    /// `&`, `&:hover`, `&::before`
    #[regex(r"&(::?[A-Za-z][A-Za-z0-9_\-]*)?")]
    ContextRef,

    // ── Single-character punctuation ─────────────────────────────────

    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("=")]
    Equals,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    /// Any other operator-like character, passed through verbatim.
    #[regex(r"[$?|^~!%+*/<>#@\\\-]", |lex| lex.slice().chars().next())]
    Symbol(char),
}

/// Consume a quoted string body after its opening quote.
fn quoted(lex: &mut Lexer<RawToken>, quote: char) -> Result<String, LexErrorKind> {
    let rest = lex.remainder();
    let mut value = String::new();
    let mut chars = rest.char_indices();
    let mut closed_at = None;
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                }),
                None => break,
            },
            c if c == quote => {
                closed_at = Some(i + c.len_utf8());
                break;
            }
            c => value.push(c),
        }
    }
    match closed_at {
        Some(len) => {
            lex.bump(len);
            Ok(value)
        }
        None => {
            lex.bump(rest.len());
            Err(LexErrorKind::UnterminatedString)
        }
    }
}

/// Consume a block comment body after `/*`.
fn block_comment(lex: &mut Lexer<RawToken>) -> Result<(), LexErrorKind> {
    let rest = lex.remainder();
    match rest.find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            Ok(())
        }
        None => {
            lex.bump(rest.len());
            Err(LexErrorKind::UnterminatedComment)
        }
    }
}

// ---------------------------------------------------------------------------
// Classified tokens
// ---------------------------------------------------------------------------

/// Bracketed block keywords: `[Template]`, `[Custom]`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKeyword {
    Template,
    Custom,
    Origin,
    Import,
    Namespace,
    Configuration,
    Info,
    Export,
    Name,
    OriginType,
}

impl BlockKeyword {
    /// Look up the word between the brackets.
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "Template" => Self::Template,
            "Custom" => Self::Custom,
            "Origin" => Self::Origin,
            "Import" => Self::Import,
            "Namespace" => Self::Namespace,
            "Configuration" => Self::Configuration,
            "Info" => Self::Info,
            "Export" => Self::Export,
            "Name" => Self::Name,
            "OriginType" => Self::OriginType,
            _ => return None,
        })
    }
}

/// `@`-prefixed type tags. Unknown tags are kept for origin types such as
/// `@Vue`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AtType {
    Style,
    Element,
    Var,
    Html,
    JavaScript,
    Chtl,
    CJmod,
    Config,
    Custom(String),
}

impl AtType {
    /// Classify the word after `@`.
    pub fn from_word(word: &str) -> Self {
        match word {
            "Style" => Self::Style,
            "Element" => Self::Element,
            "Var" => Self::Var,
            "Html" => Self::Html,
            "JavaScript" => Self::JavaScript,
            "Chtl" => Self::Chtl,
            "CJmod" => Self::CJmod,
            "Config" => Self::Config,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for AtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Self::Style => "Style",
            Self::Element => "Element",
            Self::Var => "Var",
            Self::Html => "Html",
            Self::JavaScript => "JavaScript",
            Self::Chtl => "Chtl",
            Self::CJmod => "CJmod",
            Self::Config => "Config",
            Self::Custom(word) => word,
        };
        write!(f, "@{word}")
    }
}

/// Reserved words. They are still accepted wherever a plain name is
/// expected (e.g. the CSS property `top`), see [`Token::is_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Text,
    Style,
    Script,
    Inherit,
    Delete,
    Insert,
    After,
    Before,
    Replace,
    At,
    Top,
    Bottom,
    From,
    As,
    Except,
    Use,
    Html5,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "text" => Self::Text,
            "style" => Self::Style,
            "script" => Self::Script,
            "inherit" => Self::Inherit,
            "delete" => Self::Delete,
            "insert" => Self::Insert,
            "after" => Self::After,
            "before" => Self::Before,
            "replace" => Self::Replace,
            "at" => Self::At,
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            "from" => Self::From,
            "as" => Self::As,
            "except" => Self::Except,
            "use" => Self::Use,
            "html5" => Self::Html5,
            _ => return None,
        })
    }
}

/// Which comment syntax produced a comment token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
    /// `--` comments survive into the HTML output.
    Generator,
}

/// Classified token kinds consumed by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword(Keyword),
    Block(BlockKeyword),
    /// A bracketed word that is not a block keyword, e.g. `[i]`.
    BracketWord,
    At(AtType),
    /// Quoted string; carries the unescaped value.
    String(String),
    Number,
    ClassSelector,
    IdSelector,
    ContextRef,
    Comment(CommentKind),
    /// Verbatim body of an `[Origin]` block, between its braces.
    RawText,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    Semicolon,
    Colon,
    Equals,
    Comma,
    Dot,
    Symbol(char),
    Eof,
}

/// A classified token with its exact source text and position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// Identifiers and keywords both serve as names (tags, properties,
    /// definition names).
    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword(_))
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// `:` and `=` are interchangeable wherever a key/value pair appears.
    pub fn is_assign(&self) -> bool {
        matches!(self.kind, TokenKind::Colon | TokenKind::Equals)
    }

    /// Selector name without its `.`/`#` prefix.
    pub fn selector_name(&self) -> &str {
        match self.kind {
            TokenKind::ClassSelector | TokenKind::IdSelector => &self.text[1..],
            _ => &self.text,
        }
    }
}
