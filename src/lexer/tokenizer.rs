//! Turns CHTL source into a classified token stream.

use logos::Logos;
use thiserror::Error;
use tracing::{debug, warn};

use super::span::{LineIndex, Span};
use super::token::{
    AtType, BlockKeyword, CommentKind, Keyword, LexErrorKind, RawToken, Token, TokenKind,
};

/// A fatal lexical error with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub line: u32,
    pub column: u32,
}

/// Output of a successful tokenization.
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    /// Tokens in source order, always terminated by [`TokenKind::Eof`].
    pub tokens: Vec<Token>,
    /// Characters that matched no rule and were skipped.
    pub warnings: Vec<String>,
}

/// Tokenizer over a single source string.
pub struct Lexer<'a> {
    source: &'a str,
    lines: LineIndex<'a>,
    tokens: Vec<Token>,
    warnings: Vec<String>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            lines: LineIndex::new(source),
            tokens: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Tokenize the whole source.
    ///
    /// Unterminated strings, block comments and block keywords abort with a
    /// [`LexError`]; stray characters are skipped with a warning.
    pub fn tokenize(mut self) -> Result<Lexed, LexError> {
        self.lex_range(0, self.source.len())?;
        let end = self.source.len();
        let eof = Token::new(TokenKind::Eof, "", self.lines.span(end, end));
        self.tokens.push(eof);
        debug!(
            tokens = self.tokens.len(),
            warnings = self.warnings.len(),
            "tokenized source"
        );
        Ok(Lexed {
            tokens: self.tokens,
            warnings: self.warnings,
        })
    }

    fn lex_range(&mut self, start: usize, end: usize) -> Result<(), LexError> {
        let source = self.source;
        let mut raw = RawToken::lexer(&source[start..end]);
        while let Some(result) = raw.next() {
            let range = raw.span();
            let (lo, hi) = (start + range.start, start + range.end);
            match result {
                Ok(RawToken::GeneratorComment) if !self.lines.starts_line(lo) => {
                    // Mid-line `--` is two minus signs; rescan the rest of the line.
                    self.push(TokenKind::Symbol('-'), lo, lo + 1);
                    self.push(TokenKind::Symbol('-'), lo + 1, lo + 2);
                    self.lex_range(lo + 2, hi)?;
                }
                Ok(RawToken::LeftBrace) if self.opens_origin_body() => {
                    self.push(TokenKind::LeftBrace, lo, hi);
                    // Origin bodies are foreign code; only brace depth matters.
                    if let Some(close) = closing_brace(&source[hi..end]) {
                        let body_end = hi + close;
                        self.push(TokenKind::RawText, hi, body_end);
                        self.push(TokenKind::RightBrace, body_end, body_end + 1);
                        raw.bump(body_end + 1 - hi);
                    }
                }
                Ok(RawToken::UnclosedBracketWord) => {
                    return Err(self.error(LexErrorKind::UnterminatedBracket, lo));
                }
                Ok(token) => {
                    let kind = self.classify(token, lo, hi);
                    self.push(kind, lo, hi);
                }
                Err(LexErrorKind::UnexpectedCharacter) => {
                    let (line, column) = self.lines.position(lo);
                    let text = &source[lo..hi];
                    warn!(line, column, text, "skipping unexpected character");
                    self.warnings.push(format!(
                        "line {line}, column {column}: skipped unexpected character {text:?}"
                    ));
                }
                Err(kind) => return Err(self.error(kind, lo)),
            }
        }
        Ok(())
    }

    fn classify(&self, token: RawToken, lo: usize, hi: usize) -> TokenKind {
        let text = &self.source[lo..hi];
        match token {
            RawToken::LineComment => TokenKind::Comment(CommentKind::Line),
            RawToken::BlockComment => TokenKind::Comment(CommentKind::Block),
            RawToken::GeneratorComment => TokenKind::Comment(CommentKind::Generator),
            RawToken::String(value) => TokenKind::String(value),
            RawToken::Number => TokenKind::Number,
            RawToken::Ident => match Keyword::from_word(text) {
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier,
            },
            RawToken::BracketWord => match BlockKeyword::from_word(&text[1..text.len() - 1]) {
                Some(block) => TokenKind::Block(block),
                None => TokenKind::BracketWord,
            },
            // Filtered out by `lex_range` before classification.
            RawToken::UnclosedBracketWord => TokenKind::BracketWord,
            RawToken::AtWord => TokenKind::At(AtType::from_word(&text[1..])),
            RawToken::ClassSelector => TokenKind::ClassSelector,
            RawToken::IdSelector => TokenKind::IdSelector,
            RawToken::ContextRef => TokenKind::ContextRef,
            RawToken::LeftBrace => TokenKind::LeftBrace,
            RawToken::RightBrace => TokenKind::RightBrace,
            RawToken::LeftBracket => TokenKind::LeftBracket,
            RawToken::RightBracket => TokenKind::RightBracket,
            RawToken::LeftParen => TokenKind::LeftParen,
            RawToken::RightParen => TokenKind::RightParen,
            RawToken::Semicolon => TokenKind::Semicolon,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Equals => TokenKind::Equals,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Symbol(c) => TokenKind::Symbol(c),
        }
    }

    /// Whether the tokens so far end in `[Origin] @Type` or
    /// `[Origin] @Type name`.
    fn opens_origin_body(&self) -> bool {
        let tail: Vec<&TokenKind> = self.tokens.iter().rev().take(3).map(|t| &t.kind).collect();
        match tail.as_slice() {
            [TokenKind::At(_), TokenKind::Block(BlockKeyword::Origin), ..] => true,
            [TokenKind::Identifier | TokenKind::Keyword(_), TokenKind::At(_), TokenKind::Block(BlockKeyword::Origin)] => true,
            _ => false,
        }
    }

    fn push(&mut self, kind: TokenKind, lo: usize, hi: usize) {
        let span: Span = self.lines.span(lo, hi);
        self.tokens.push(Token::new(kind, &self.source[lo..hi], span));
    }

    fn error(&self, kind: LexErrorKind, offset: usize) -> LexError {
        let (line, column) = self.lines.position(offset);
        LexError { kind, line, column }
    }
}

/// Byte offset of the `}` closing a body whose `{` was just consumed.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(offset),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Tokenize `source`, dropping lexer warnings.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize().map(|lexed| lexed.tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn texts(input: &str) -> Vec<String> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_element_block() {
        assert_eq!(
            kinds("div { }"),
            vec![
                TokenKind::Identifier,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("  \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("text style script inherit delete insert"),
            vec![
                TokenKind::Keyword(Keyword::Text),
                TokenKind::Keyword(Keyword::Style),
                TokenKind::Keyword(Keyword::Script),
                TokenKind::Keyword(Keyword::Inherit),
                TokenKind::Keyword(Keyword::Delete),
                TokenKind::Keyword(Keyword::Insert),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_block_keywords() {
        assert_eq!(
            kinds("[Template] [Custom] [Origin] [Namespace] [Configuration]"),
            vec![
                TokenKind::Block(BlockKeyword::Template),
                TokenKind::Block(BlockKeyword::Custom),
                TokenKind::Block(BlockKeyword::Origin),
                TokenKind::Block(BlockKeyword::Namespace),
                TokenKind::Block(BlockKeyword::Configuration),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_bracket_word_is_generic() {
        assert_eq!(
            kinds("[Widget]"),
            vec![TokenKind::BracketWord, TokenKind::Eof]
        );
    }

    #[test]
    fn test_at_types() {
        assert_eq!(
            kinds("@Style @Element @Var @Vue"),
            vec![
                TokenKind::At(AtType::Style),
                TokenKind::At(AtType::Element),
                TokenKind::At(AtType::Var),
                TokenKind::At(AtType::Custom("Vue".into())),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_selectors_and_context() {
        assert_eq!(
            kinds(".box #main & &:hover"),
            vec![
                TokenKind::ClassSelector,
                TokenKind::IdSelector,
                TokenKind::ContextRef,
                TokenKind::ContextRef,
                TokenKind::Eof,
            ]
        );
        assert_eq!(texts("&::before"), vec!["&::before"]);
    }

    #[test]
    fn test_numbers_with_units() {
        assert_eq!(texts("10px 0.5 50% 3"), vec!["10px", "0.5", "50%", "3"]);
        assert!(kinds("10px")[0] == TokenKind::Number);
    }

    #[test]
    fn test_dotted_words_split_into_selector_pieces() {
        assert_eq!(
            kinds("a.png"),
            vec![TokenKind::Identifier, TokenKind::ClassSelector, TokenKind::Eof]
        );
        assert_eq!(texts("ui.forms"), vec!["ui", ".forms"]);
        assert_eq!(texts("x.y.z;"), vec!["x", ".y", ".z", ";"]);
        assert_eq!(texts("img/a.png"), vec!["img", "/", "a", ".png"]);
    }

    #[test]
    fn test_dotted_words_are_not_skipped() {
        let lexed = Lexer::new("from ui.forms;").tokenize().unwrap();
        assert!(lexed.warnings.is_empty(), "{:?}", lexed.warnings);
        assert_eq!(lexed.tokens.len(), 5);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#""a\n\"b\"" 'c\'d'"#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("a\n\"b\"".into()));
        assert_eq!(tokens[1].kind, TokenKind::String("c'd".into()));
    }

    #[test]
    fn test_comment_kinds() {
        assert_eq!(
            kinds("// line\n/* block */\n-- generated"),
            vec![
                TokenKind::Comment(CommentKind::Line),
                TokenKind::Comment(CommentKind::Block),
                TokenKind::Comment(CommentKind::Generator),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_mid_line_double_dash_is_not_a_comment() {
        assert_eq!(
            kinds("a -- b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Symbol('-'),
                TokenKind::Symbol('-'),
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_assignment_punctuation() {
        let tokens = tokenize("id: a; class = b;").unwrap();
        assert!(tokens[1].is_assign());
        assert!(tokens[5].is_assign());
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("div {\n  span { }\n}").unwrap();
        let span = &tokens[2];
        assert_eq!(span.text, "span");
        assert_eq!((span.span.line, span.span.column), (2, 3));
        assert_eq!(span.span.start, 8);
    }

    #[test]
    fn test_non_ascii_identifier() {
        assert_eq!(texts("标题 { }"), vec!["标题", "{", "}"]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("div { text { \"open } }").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!((err.line, err.column), (1, 14));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = tokenize("div\n/* never closed").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unterminated_block_keyword() {
        let err = tokenize("[Template @Style A {}").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedBracket);
    }

    #[test]
    fn test_unexpected_character_is_skipped_with_warning() {
        let lexed = Lexer::new("div \u{7} { }").tokenize().unwrap();
        assert_eq!(lexed.tokens.len(), 4);
        assert_eq!(lexed.warnings.len(), 1);
    }

    #[test]
    fn test_symbols_pass_through() {
        assert_eq!(
            kinds("+ * >"),
            vec![
                TokenKind::Symbol('+'),
                TokenKind::Symbol('*'),
                TokenKind::Symbol('>'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_origin_body_is_verbatim() {
        let tokens = tokenize("[Origin] @Html intro { <p>don't {x}</p> } div { }").unwrap();
        let raw = tokens.iter().find(|t| t.kind == TokenKind::RawText).unwrap();
        assert_eq!(raw.text, " <p>don't {x}</p> ");
        assert_eq!(
            tokens.iter().filter(|t| t.kind == TokenKind::RightBrace).count(),
            2
        );
    }

    #[test]
    fn test_origin_reference_has_no_raw_body() {
        let tokens = tokenize("[Origin] @Html intro; div { }").unwrap();
        assert!(tokens.iter().all(|t| t.kind != TokenKind::RawText));
    }
}
