//! `style { ... }` blocks: properties, selector rules, `@Style` usages and
//! verbatim at-rules.

use super::{PResult, Parser};
use crate::ast::{
    DefinitionType, Property, Selector, SelectorComponent, StyleBlock, StyleItem, StyleRule,
};
use crate::lexer::{AtType, BlockKeyword, CommentKind, TokenKind};

impl Parser<'_> {
    /// Parse `style { ... }` with the cursor on `style`.
    pub(super) fn parse_style_block(&mut self) -> PResult<StyleBlock> {
        self.advance();
        self.expect(&TokenKind::LeftBrace, "'{' after style")?;
        let items = self.parse_style_items(true)?;
        self.expect(&TokenKind::RightBrace, "'}' to close style block")?;
        Ok(StyleBlock { items })
    }

    fn parse_style_items(&mut self, allow_rules: bool) -> PResult<Vec<StyleItem>> {
        let mut items = Vec::new();
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::RightBrace | TokenKind::Eof => break,
                TokenKind::Semicolon | TokenKind::Comment(CommentKind::Generator) => {
                    self.advance();
                }
                TokenKind::At(AtType::Style)
                | TokenKind::Block(BlockKeyword::Template | BlockKeyword::Custom) => {
                    let usage = self.parse_usage(Some(DefinitionType::Style))?;
                    items.push(StyleItem::Usage(usage));
                }
                TokenKind::At(AtType::Custom(_)) => items.push(StyleItem::Raw(self.parse_at_rule()?)),
                _ if !self.rule_ahead() && self.starts_property() => {
                    items.push(StyleItem::Property(self.parse_property()?));
                }
                _ if allow_rules && self.rule_ahead() => {
                    items.push(StyleItem::Rule(self.parse_rule()?));
                }
                _ => return Err(self.unexpected("a property or selector rule")),
            }
        }
        Ok(items)
    }

    /// Whether a `{` comes before the next `;` or `}`: the statement is a
    /// selector rule rather than a property.
    fn rule_ahead(&self) -> bool {
        for tok in &self.tokens[self.cursor..] {
            match tok.kind {
                TokenKind::LeftBrace => return true,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn starts_property(&self) -> bool {
        self.peek().is_name() || self.check(&TokenKind::Symbol('-'))
    }

    /// A property name such as `color` or `-webkit-appearance`: adjacent
    /// tokens up to the `:` or `=`.
    pub(super) fn parse_property_name(&mut self) -> PResult<String> {
        if !self.starts_property() {
            return Err(self.unexpected("a property name"));
        }
        let start = self.cursor;
        self.advance();
        while self.adjacent_at(self.cursor)
            && (self.peek().is_name() || self.check(&TokenKind::Symbol('-')))
        {
            self.advance();
        }
        Ok(self.spanning(start, self.cursor - 1).to_string())
    }

    /// `name: value;`
    fn parse_property(&mut self) -> PResult<Property> {
        let name = self.parse_property_name()?;
        if !self.peek().is_assign() {
            return Err(self.unexpected("':' after property name"));
        }
        self.advance();
        let value = self.parse_value(false)?;
        self.eat(&TokenKind::Semicolon);
        Ok(Property::new(name, value))
    }

    /// `selector { properties }`
    fn parse_rule(&mut self) -> PResult<StyleRule> {
        let selector = self.parse_selector()?;
        self.expect(&TokenKind::LeftBrace, "'{' after selector")?;
        let items = self.parse_style_items(false)?;
        self.expect(&TokenKind::RightBrace, "'}' to close rule")?;
        Ok(StyleRule { selector, items })
    }

    /// Tokens up to `{`, split into class, id and context components.
    /// Whitespace between tokens is kept as a single space.
    fn parse_selector(&mut self) -> PResult<Selector> {
        let mut selector = Selector::new();
        let start = self.cursor;
        while !self.check(&TokenKind::LeftBrace) && !self.is_eof() {
            if self.cursor > start && !self.adjacent_at(self.cursor) {
                selector.push(SelectorComponent::Raw(" ".into()));
            }
            let tok = self.advance();
            let component = match tok.kind {
                TokenKind::ClassSelector => SelectorComponent::Class(tok.selector_name().to_string()),
                TokenKind::IdSelector => SelectorComponent::Id(tok.selector_name().to_string()),
                TokenKind::ContextRef => SelectorComponent::Context(tok.text[1..].to_string()),
                TokenKind::String(_) => {
                    SelectorComponent::Raw(self.spanning(self.cursor - 1, self.cursor - 1).to_string())
                }
                _ => SelectorComponent::Raw(tok.text),
            };
            selector.push(component);
        }
        if self.cursor == start {
            return Err(self.unexpected("a selector"));
        }
        Ok(selector)
    }

    /// `@media ... { ... }` or `@import ...;`, kept verbatim.
    fn parse_at_rule(&mut self) -> PResult<String> {
        let start = self.cursor;
        loop {
            match self.peek().kind {
                TokenKind::Semicolon => {
                    self.advance();
                    break;
                }
                TokenKind::LeftBrace => {
                    let close = self.matching_brace(self.cursor)?;
                    self.cursor = close + 1;
                    break;
                }
                TokenKind::RightBrace | TokenKind::Eof => {
                    if self.cursor == start {
                        return Err(self.unexpected("an at-rule"));
                    }
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
        Ok(self.spanning(start, self.cursor - 1).to_string())
    }
}
