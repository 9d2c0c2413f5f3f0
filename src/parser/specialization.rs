//! `delete` and `insert` operations, and the `{ ... }` body of a usage.

use indexmap::IndexMap;

use super::{PResult, Parser};
use crate::ast::{
    DefinitionType, InsertContent, InsertPosition, Node, NodeId, Specialization, Target, Usage,
    Value,
};
use crate::lexer::{BlockKeyword, CommentKind, Keyword, TokenKind};

impl Parser<'_> {
    /// Fills and specializations after a usage: `@Style S { color: red; delete border; }`.
    pub(super) fn parse_usage_body(&mut self, usage: &mut Usage) -> PResult<()> {
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::RightBrace | TokenKind::Eof => return Ok(()),
                TokenKind::Semicolon | TokenKind::Comment(CommentKind::Generator) => {
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Delete) => {
                    let ops = self.parse_delete()?;
                    usage.specializations.extend(ops);
                }
                TokenKind::Keyword(Keyword::Insert) => {
                    let op = self.parse_insert(usage.ty)?;
                    usage.specializations.push(op);
                }
                _ if usage.ty != DefinitionType::Element => {
                    let name = self.parse_property_name()?;
                    if !self.peek().is_assign() {
                        return Err(self.unexpected("':' after property name"));
                    }
                    self.advance();
                    let value = self.parse_value(false)?;
                    self.eat(&TokenKind::Semicolon);
                    usage.fills.insert(name, value);
                }
                _ => return Err(self.unexpected("'delete' or 'insert'")),
            }
        }
    }

    /// `delete a, b, div[1], @Style Base;`
    ///
    /// Consecutive plain names are grouped into one property deletion.
    pub(super) fn parse_delete(&mut self) -> PResult<Vec<Specialization>> {
        self.advance();
        let mut ops = Vec::new();
        let mut names = Vec::new();
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::At(_) | TokenKind::Block(BlockKeyword::Template | BlockKeyword::Custom) => {
                    if matches!(tok.kind, TokenKind::Block(_)) {
                        self.advance();
                    }
                    let ty = self.parse_definition_type()?;
                    let name = self.parse_definition_name()?;
                    if !names.is_empty() {
                        ops.push(Specialization::DeleteProperty(std::mem::take(&mut names)));
                    }
                    ops.push(Specialization::DeleteInheritance { ty, name });
                }
                _ if tok.is_name() || self.check(&TokenKind::Symbol('-')) => {
                    let name = self.parse_property_name()?;
                    if self.check(&TokenKind::LeftBracket) {
                        let index = self.parse_index()?;
                        if !names.is_empty() {
                            ops.push(Specialization::DeleteProperty(std::mem::take(&mut names)));
                        }
                        ops.push(Specialization::DeleteElement(Target::indexed(name, index)));
                    } else {
                        names.push(name);
                    }
                }
                _ => return Err(self.unexpected("a property, element or definition to delete")),
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        if !names.is_empty() {
            ops.push(Specialization::DeleteProperty(names));
        }
        if !self.check(&TokenKind::RightBrace) {
            self.expect(&TokenKind::Semicolon, "';' after delete")?;
        }
        Ok(ops)
    }

    /// `insert after div[0] { ... }`, `insert at top { ... }`, ...
    pub(super) fn parse_insert(&mut self, ty: DefinitionType) -> PResult<Specialization> {
        self.advance();
        let tok = self.peek().clone();
        let position = match &tok.kind {
            TokenKind::Keyword(Keyword::After) => {
                self.advance();
                InsertPosition::After(self.parse_target()?)
            }
            TokenKind::Keyword(Keyword::Before) => {
                self.advance();
                InsertPosition::Before(self.parse_target()?)
            }
            TokenKind::Keyword(Keyword::Replace) => {
                self.advance();
                InsertPosition::Replace(self.parse_target()?)
            }
            TokenKind::Keyword(Keyword::At) => {
                self.advance();
                if self.check_keyword(Keyword::Top) {
                    self.advance();
                    InsertPosition::AtTop
                } else if self.check_keyword(Keyword::Bottom) {
                    self.advance();
                    InsertPosition::AtBottom
                } else {
                    return Err(self.unexpected("'top' or 'bottom'"));
                }
            }
            _ => return Err(self.unexpected("after, before, replace or at")),
        };
        self.expect(&TokenKind::LeftBrace, "'{' to open insert body")?;
        let content = match ty {
            DefinitionType::Element => InsertContent::Elements(self.parse_insert_elements()?),
            DefinitionType::Style | DefinitionType::Var => {
                InsertContent::Properties(self.parse_insert_properties()?)
            }
        };
        self.expect(&TokenKind::RightBrace, "'}' to close insert body")?;
        self.eat(&TokenKind::Semicolon);
        Ok(Specialization::Insert { position, content })
    }

    /// `div`, `div[1]` or a property name.
    fn parse_target(&mut self) -> PResult<Target> {
        let name = self.parse_property_name()?;
        if self.check(&TokenKind::LeftBracket) {
            let index = self.parse_index()?;
            Ok(Target::indexed(name, index))
        } else {
            Ok(Target::new(name))
        }
    }

    fn parse_insert_elements(&mut self) -> PResult<Vec<NodeId>> {
        let mut nodes = Vec::new();
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::RightBrace | TokenKind::Eof => return Ok(nodes),
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Comment(CommentKind::Generator) => {
                    self.advance();
                    let content = tok.text.trim_start_matches('-').trim();
                    nodes.push(
                        self.ast
                            .insert_detached(Node::comment(content).with_span(tok.span)),
                    );
                }
                TokenKind::Keyword(Keyword::Text) if self.next_is(&TokenKind::LeftBrace) => {
                    let node = self.parse_text_block()?;
                    nodes.push(self.ast.insert_detached(node));
                }
                TokenKind::At(_) | TokenKind::Block(BlockKeyword::Template | BlockKeyword::Custom) => {
                    nodes.push(self.parse_usage_node(None)?);
                }
                TokenKind::Block(BlockKeyword::Origin) => nodes.push(self.parse_origin_detached()?),
                _ if tok.is_name() && self.next_is(&TokenKind::LeftBrace) => {
                    nodes.push(self.parse_element(None)?);
                }
                _ => return Err(self.unexpected("an element to insert")),
            }
        }
    }

    fn parse_insert_properties(&mut self) -> PResult<IndexMap<String, Value>> {
        let mut properties = IndexMap::new();
        loop {
            match self.peek().kind {
                TokenKind::RightBrace | TokenKind::Eof => return Ok(properties),
                TokenKind::Semicolon => {
                    self.advance();
                }
                _ => {
                    let name = self.parse_property_name()?;
                    if !self.peek().is_assign() {
                        return Err(self.unexpected("':' after property name"));
                    }
                    self.advance();
                    let value = self.parse_value(false)?;
                    self.eat(&TokenKind::Semicolon);
                    properties.insert(name, value);
                }
            }
        }
    }
}
