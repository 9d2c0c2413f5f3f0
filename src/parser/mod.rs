//! Recursive descent CHTL parser.
//!
//! Consumes the token stream from [`crate::lexer`] and builds an [`Ast`],
//! registering every template, custom, origin and configuration it meets
//! into the [`GlobalMap`] as it goes.
//!
//! Errors abort the current top-level item only: the parser records the
//! error, skips to the next `;` or closing `}` at the item's nesting level,
//! and carries on. The first error becomes the primary error of the
//! [`ParseResult`]; later ones are reported as warnings.

mod definition;
mod directive;
mod element;
mod script;
mod specialization;
mod style;

use thiserror::Error;
use tracing::{debug, warn};

use crate::ast::{Ast, Node, NodeId, Value, VarRef};
use crate::lexer::{BlockKeyword, CommentKind, Keyword, Span, Token, TokenKind};
use crate::symbols::GlobalMap;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Categories of parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnexpectedToken,
    UnexpectedEof,
    /// A `use` statement after other content.
    UseNotFirst,
    /// A definition body that its kind does not allow, e.g. `delete` in a
    /// `[Template]`.
    InvalidDefinition,
    /// Elements, namespaces or usage bodies nested past
    /// [`ParseOptions::max_depth`].
    NestingTooDeep,
}

/// A parse error with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    fn at(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }
}

/// Default limit on nested blocks. Deeper input is rejected with
/// [`ParseErrorKind::NestingTooDeep`] instead of exhausting the stack.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Parser switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Warn about element names that are not standard HTML tags.
    pub strict: bool,
    /// Deepest allowed nesting of elements, namespaces and usage bodies.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl ParseOptions {
    /// Set strict mode (builder).
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the nesting limit (builder).
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Everything a parse produces.
pub struct ParseResult {
    pub ast: Ast,
    pub success: bool,
    /// The first error, when `success` is false.
    pub error: Option<ParseError>,
    pub warnings: Vec<String>,
}

impl ParseResult {
    pub fn root(&self) -> NodeId {
        self.ast.root()
    }
}

/// Parse a token stream produced from `source`.
pub fn parse(source: &str, tokens: Vec<Token>, map: &mut GlobalMap) -> ParseResult {
    parse_with(source, tokens, map, ParseOptions::default())
}

/// Parse with explicit options.
pub fn parse_with(
    source: &str,
    tokens: Vec<Token>,
    map: &mut GlobalMap,
    options: ParseOptions,
) -> ParseResult {
    Parser::new(source, tokens, map, options).run()
}

type PResult<T> = Result<T, ParseError>;

// ---------------------------------------------------------------------------
// Parser state
// ---------------------------------------------------------------------------

/// Recursive descent parser state.
pub(crate) struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    cursor: usize,
    map: &'a mut GlobalMap,
    ast: Ast,
    options: ParseOptions,
    errors: Vec<ParseError>,
    warnings: Vec<String>,
    /// `use @Config Name;` targets, activated once every block is known.
    pending_configs: Vec<(String, Span)>,
    /// Whether a statement other than `use` has been seen.
    seen_content: bool,
    /// Blocks currently open around the cursor.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(
        source: &'a str,
        tokens: Vec<Token>,
        map: &'a mut GlobalMap,
        options: ParseOptions,
    ) -> Self {
        // Ordinary comments carry no meaning; script and origin bodies are
        // sliced from the source, so they keep them anyway.
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| {
                !matches!(
                    t.kind,
                    TokenKind::Comment(CommentKind::Line | CommentKind::Block)
                )
            })
            .collect();
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = source.len();
            let span = tokens
                .last()
                .map_or(Span::new(end, end, 1, 1), |t| Span::new(end, end, t.span.line, t.span.column));
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }
        Self {
            source,
            tokens,
            cursor: 0,
            map,
            ast: Ast::new(),
            options,
            errors: Vec::new(),
            warnings: Vec::new(),
            pending_configs: Vec::new(),
            seen_content: false,
            depth: 0,
        }
    }

    fn run(mut self) -> ParseResult {
        let root = self.ast.root();
        while !self.is_eof() {
            let start = self.cursor;
            if let Err(error) = self.parse_top_level_item(root) {
                warn!(line = error.line, column = error.column, "{}", error.message);
                self.errors.push(error);
                self.synchronize(start);
            }
        }
        self.finish()
    }

    fn finish(mut self) -> ParseResult {
        // Brace-less namespaces stay open until the end of the file.
        while self.map.exit_namespace().is_some() {}

        for (name, span) in std::mem::take(&mut self.pending_configs) {
            if !self.map.activate_configuration(&name) {
                self.warn(span, format!("unknown configuration '{name}' in use statement"));
            }
        }

        let success = self.errors.is_empty();
        let mut errors = self.errors.into_iter();
        let error = errors.next();
        let mut warnings = self.warnings;
        warnings.extend(errors.map(|e| e.to_string()));
        debug!(
            nodes = self.ast.len(),
            success,
            warnings = warnings.len(),
            "parsed document"
        );
        ParseResult {
            ast: self.ast,
            success,
            error,
            warnings,
        }
    }

    /// Skip past the item that failed. Tokens the failed production already
    /// consumed are replayed to learn how deep inside braces it stopped.
    fn synchronize(&mut self, start: usize) {
        let mut depth: i32 = 0;
        for token in &self.tokens[start..self.cursor] {
            match token.kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth -= 1,
                _ => {}
            }
        }
        if self.cursor > start && depth <= 0 {
            let last = &self.tokens[self.cursor - 1].kind;
            if matches!(last, TokenKind::Semicolon | TokenKind::RightBrace) {
                return;
            }
        }
        while !self.is_eof() {
            let kind = self.advance().kind;
            match kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    depth -= 1;
                    if depth <= 0 {
                        return;
                    }
                }
                TokenKind::Semicolon if depth <= 0 => return,
                _ => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Top level
    // -----------------------------------------------------------------------

    /// Parse one item at document or namespace level, attaching it to
    /// `parent`.
    fn parse_top_level_item(&mut self, parent: NodeId) -> PResult<()> {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::Keyword(Keyword::Use) => return self.parse_use(parent),
            TokenKind::Comment(CommentKind::Generator) => {
                self.parse_generator_comment(parent);
                return Ok(());
            }
            TokenKind::Semicolon => {
                self.advance();
                return Ok(());
            }
            _ => {}
        }
        self.seen_content = true;

        match &tok.kind {
            TokenKind::Block(BlockKeyword::Template | BlockKeyword::Custom) => {
                self.parse_definition(parent)
            }
            TokenKind::Block(BlockKeyword::Origin) => self.parse_origin(parent),
            TokenKind::Block(BlockKeyword::Import) => self.parse_import(parent),
            TokenKind::Block(BlockKeyword::Namespace) => self.parse_namespace(parent),
            TokenKind::Block(BlockKeyword::Configuration) => self.parse_configuration(parent),
            TokenKind::Block(_) => self.skip_unsupported_block(),
            TokenKind::Keyword(Keyword::Style) if self.next_is(&TokenKind::LeftBrace) => {
                let block = self.parse_style_block()?;
                self.insert_block(parent, crate::ast::NodeKind::Style(block), tok.span);
                Ok(())
            }
            TokenKind::Keyword(Keyword::Script) if self.next_is(&TokenKind::LeftBrace) => {
                let block = self.parse_script_block()?;
                self.insert_block(parent, crate::ast::NodeKind::Script(block), tok.span);
                Ok(())
            }
            TokenKind::Keyword(Keyword::Text) if self.next_is(&TokenKind::LeftBrace) => {
                let node = self.parse_text_block()?;
                self.ast.insert_child(parent, node);
                Ok(())
            }
            TokenKind::At(_) => self.parse_usage_node(Some(parent)).map(|_| ()),
            _ if tok.is_name() && self.next_is(&TokenKind::LeftBrace) => {
                self.parse_element(Some(parent)).map(|_| ())
            }
            _ => Err(self.unexpected("an element, definition or directive")),
        }
    }

    /// `[Info]`, `[Export]` and stray `[Name]`/`[OriginType]` blocks carry
    /// module metadata that a single-file compile has no use for.
    fn skip_unsupported_block(&mut self) -> PResult<()> {
        let tok = self.advance();
        self.warn(tok.span, format!("ignoring {} block", tok.text));
        if self.check(&TokenKind::LeftBrace) {
            let close = self.matching_brace(self.cursor)?;
            self.cursor = close + 1;
        }
        self.eat(&TokenKind::Semicolon);
        Ok(())
    }

    fn insert_block(&mut self, parent: NodeId, kind: crate::ast::NodeKind, span: Span) {
        let node = Node::new(kind)
            .with_namespace(self.map.current_namespace())
            .with_span(span);
        self.ast.insert_child(parent, node);
    }

    fn parse_generator_comment(&mut self, parent: NodeId) {
        let tok = self.advance();
        let content = tok.text.trim_start_matches('-').trim();
        self.ast
            .insert_child(parent, Node::comment(content).with_span(tok.span));
    }

    // -----------------------------------------------------------------------
    // Token cursor helpers
    // -----------------------------------------------------------------------

    fn is_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// The current token. Past the end this keeps returning `Eof`.
    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.cursor + n).min(last)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_keyword(keyword)
    }

    fn next_is(&self, kind: &TokenKind) -> bool {
        &self.peek_nth(1).kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Expect an identifier or keyword used as a name.
    fn expect_name(&mut self, what: &str) -> PResult<Token> {
        if self.peek().is_name() {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Error describing the current token as not being `what`.
    fn unexpected(&self, what: &str) -> ParseError {
        let tok = self.peek();
        if tok.kind == TokenKind::Eof {
            ParseError::at(
                ParseErrorKind::UnexpectedEof,
                tok.span,
                format!("unexpected end of input, expected {what}"),
            )
        } else {
            ParseError::at(
                ParseErrorKind::UnexpectedToken,
                tok.span,
                format!("expected {what}, found '{}'", tok.text),
            )
        }
    }

    fn warn(&mut self, span: Span, message: impl Into<String>) {
        let message = message.into();
        warn!(line = span.line, column = span.column, "{message}");
        self.warnings
            .push(format!("line {}, column {}: {message}", span.line, span.column));
    }

    /// Whether the token at `index` starts right where the previous one ends.
    fn adjacent_at(&self, index: usize) -> bool {
        index > 0
            && index < self.tokens.len()
            && self.tokens[index].span.start == self.tokens[index - 1].span.end
    }

    /// Run `production` one nesting level deeper, failing once the
    /// configured limit is reached.
    fn nested<T>(&mut self, production: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= self.options.max_depth {
            return Err(ParseError::at(
                ParseErrorKind::NestingTooDeep,
                self.peek().span,
                format!("blocks nested deeper than {} levels", self.options.max_depth),
            ));
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    /// Index of the `}` matching the `{` at `open`.
    fn matching_brace(&self, open: usize) -> PResult<usize> {
        let mut depth = 0usize;
        for (index, tok) in self.tokens.iter().enumerate().skip(open) {
            match tok.kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(index);
                    }
                }
                _ => {}
            }
        }
        let span = self.tokens.get(open).map_or_else(Span::default, |t| t.span);
        Err(ParseError::at(
            ParseErrorKind::UnexpectedEof,
            span,
            "unclosed '{'",
        ))
    }

    /// Source text between the end of token `from` and the start of token
    /// `to`.
    fn between(&self, from: usize, to: usize) -> &'a str {
        let source = self.source;
        let start = self.tokens[from].span.end;
        let end = self.tokens[to].span.start.max(start);
        &source[start..end]
    }

    /// Source text from the start of token `from` to the end of token `to`.
    fn spanning(&self, from: usize, to: usize) -> &'a str {
        let source = self.source;
        let start = self.tokens[from].span.start;
        let end = self.tokens[to].span.end.max(start);
        &source[start..end]
    }

    // -----------------------------------------------------------------------
    // Shared productions
    // -----------------------------------------------------------------------

    /// A dotted namespace path. `ui.forms` lexes as `ui` followed by the
    /// adjacent class-selector token `.forms`.
    fn parse_namespace_path(&mut self) -> PResult<String> {
        let mut path = self.expect_name("a namespace name")?.text;
        while self.check(&TokenKind::ClassSelector) && self.adjacent_at(self.cursor) {
            path.push_str(&self.advance().text);
        }
        Ok(path)
    }

    /// A definition name, optionally qualified: `Box` or `ui::Box`.
    fn parse_definition_name(&mut self) -> PResult<String> {
        let mut name = self.parse_namespace_path()?;
        while self.check(&TokenKind::Colon)
            && self.peek_nth(1).kind == TokenKind::Colon
            && self.peek_nth(2).is_name()
        {
            self.advance();
            self.advance();
            name.push_str("::");
            name.push_str(&self.advance().text);
        }
        Ok(name)
    }

    /// `[N]` after a tag name.
    fn parse_index(&mut self) -> PResult<usize> {
        self.expect(&TokenKind::LeftBracket, "'['")?;
        let tok = self.peek().clone();
        let index = match tok.kind {
            TokenKind::Number => tok.text.parse::<usize>().ok(),
            _ => None,
        };
        let Some(index) = index else {
            return Err(self.unexpected("an element index"));
        };
        self.advance();
        self.expect(&TokenKind::RightBracket, "']'")?;
        Ok(index)
    }

    /// Recognize `Group(name)` or `Group(name = value)` at token `index`,
    /// without consuming anything. Returns the reference and the index just
    /// past its `)`.
    fn var_ref_at(&self, index: usize) -> Option<(VarRef, usize)> {
        let group = self.tokens.get(index)?;
        if group.kind != TokenKind::Identifier {
            return None;
        }
        if self.tokens.get(index + 1)?.kind != TokenKind::LeftParen || !self.adjacent_at(index + 1)
        {
            return None;
        }
        let name = self.tokens.get(index + 2)?;
        if !name.is_name() {
            return None;
        }
        let after = self.tokens.get(index + 3)?;
        let (override_value, close) = match after.kind {
            TokenKind::RightParen => (None, index + 3),
            TokenKind::Colon | TokenKind::Equals => {
                let mut depth = 0usize;
                let mut close = None;
                for (i, tok) in self.tokens.iter().enumerate().skip(index + 4) {
                    match tok.kind {
                        TokenKind::LeftParen => depth += 1,
                        TokenKind::RightParen if depth == 0 => {
                            close = Some(i);
                            break;
                        }
                        TokenKind::RightParen => depth -= 1,
                        TokenKind::Semicolon
                        | TokenKind::LeftBrace
                        | TokenKind::RightBrace
                        | TokenKind::Eof => return None,
                        _ => {}
                    }
                }
                let close = close?;
                if close == index + 4 {
                    return None;
                }
                let value = match &self.tokens[index + 4].kind {
                    TokenKind::String(s) if close == index + 5 => s.clone(),
                    _ => self.spanning(index + 4, close - 1).trim().to_string(),
                };
                (Some(value), close)
            }
            _ => return None,
        };
        let var = VarRef {
            group: group.text.clone(),
            name: name.text.clone(),
            override_value,
            scope: self.map.current_namespace().to_string(),
            raw: self.spanning(index, close).to_string(),
        };
        Some((var, close + 1))
    }

    /// A property or attribute value running up to `;` or `}`.
    ///
    /// With `line_ends` set, a token on a later line than the first one
    /// also ends the value, so unquoted attribute values need no `;`.
    fn parse_value(&mut self, line_ends: bool) -> PResult<Value> {
        let first = self.cursor;
        let first_line = self.peek().span.line;
        let mut value = Value::default();
        let mut segment: Option<usize> = None;
        loop {
            let tok = self.peek();
            if matches!(
                tok.kind,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
            ) {
                break;
            }
            if line_ends && self.cursor > first && tok.span.line > first_line {
                break;
            }
            if let Some((var, next)) = self.var_ref_at(self.cursor) {
                if let Some(seg) = segment.take() {
                    value.push_text(self.between_tokens(seg, self.cursor));
                }
                value.push_var(var);
                self.cursor = next;
                continue;
            }
            if segment.is_none() {
                segment = Some(self.cursor);
            }
            self.advance();
        }
        if let Some(seg) = segment {
            value.push_text(self.spanning(seg, self.cursor - 1));
        }
        if self.cursor == first {
            return Err(self.unexpected("a value"));
        }
        Ok(value)
    }

    /// Source text from the start of token `from` up to the start of token
    /// `to`.
    fn between_tokens(&self, from: usize, to: usize) -> &'a str {
        let source = self.source;
        let start = self.tokens[from].span.start;
        let end = self.tokens[to].span.start.max(start);
        &source[start..end]
    }

    /// A literal value: the unescaped text of a lone string, otherwise the
    /// source text up to `;` or `}`.
    fn parse_literal(&mut self, line_ends: bool) -> PResult<String> {
        if let TokenKind::String(s) = &self.peek().kind {
            if matches!(
                self.peek_nth(1).kind,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
            ) || (line_ends && self.peek_nth(1).span.line > self.peek().span.line)
            {
                let s = s.clone();
                self.advance();
                return Ok(s);
            }
        }
        let start = self.cursor;
        let first_line = self.peek().span.line;
        while !matches!(
            self.peek().kind,
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
        ) {
            if line_ends && self.cursor > start && self.peek().span.line > first_line {
                break;
            }
            self.advance();
        }
        if self.cursor == start {
            return Err(self.unexpected("a value"));
        }
        Ok(self.spanning(start, self.cursor - 1).trim().to_string())
    }
}
