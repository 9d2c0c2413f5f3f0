//! Elements, attributes, text blocks and the items allowed in an element
//! body.

use tracing::trace;

use super::{PResult, Parser};
use crate::ast::html::is_known_tag;
use crate::ast::{Node, NodeId, NodeKind};
use crate::lexer::{BlockKeyword, CommentKind, Keyword, TokenKind};

impl Parser<'_> {
    /// `tag { body }`. With `parent` set the element is attached there,
    /// otherwise it is left detached for a definition to own.
    pub(super) fn parse_element(&mut self, parent: Option<NodeId>) -> PResult<NodeId> {
        self.nested(|parser| parser.parse_element_body(parent))
    }

    fn parse_element_body(&mut self, parent: Option<NodeId>) -> PResult<NodeId> {
        let name = self.expect_name("an element name")?;
        if self.options.strict && !is_known_tag(&name.text) {
            self.warn(name.span, format!("unknown element '{}'", name.text));
        }
        let node = Node::element(&name.text)
            .with_namespace(self.map.current_namespace())
            .with_span(name.span);
        let id = match parent {
            Some(parent) => self.ast.insert_child(parent, node),
            None => self.ast.insert_detached(node),
        };
        self.expect(&TokenKind::LeftBrace, "'{' after element name")?;
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            self.parse_element_item(id)?;
        }
        self.expect(&TokenKind::RightBrace, "'}' to close element")?;
        trace!(tag = %name.text, line = name.span.line, "element");
        Ok(id)
    }

    fn parse_element_item(&mut self, element: NodeId) -> PResult<()> {
        let span = self.peek().span;
        let is_name = self.peek().is_name();
        match self.peek().kind {
            TokenKind::Semicolon => {
                self.advance();
            }
            TokenKind::Comment(CommentKind::Generator) => self.parse_generator_comment(element),
            TokenKind::Keyword(Keyword::Text) if self.next_is(&TokenKind::LeftBrace) => {
                let node = self.parse_text_block()?;
                self.ast.insert_child(element, node);
            }
            TokenKind::Keyword(Keyword::Text) if self.peek_nth(1).is_assign() => {
                self.advance();
                self.advance();
                let content = self.parse_literal(true)?;
                self.eat(&TokenKind::Semicolon);
                self.ast
                    .insert_child(element, Node::text(content).with_span(span));
            }
            TokenKind::Keyword(Keyword::Style) if self.next_is(&TokenKind::LeftBrace) => {
                let block = self.parse_style_block()?;
                self.insert_block(element, NodeKind::Style(block), span);
            }
            TokenKind::Keyword(Keyword::Script) if self.next_is(&TokenKind::LeftBrace) => {
                let block = self.parse_script_block()?;
                self.insert_block(element, NodeKind::Script(block), span);
            }
            TokenKind::Keyword(Keyword::Except) => self.parse_constraint(element)?,
            TokenKind::Block(BlockKeyword::Origin) => self.parse_origin(element)?,
            TokenKind::At(_) | TokenKind::Block(BlockKeyword::Template | BlockKeyword::Custom) => {
                self.parse_usage_node(Some(element))?;
            }
            _ if is_name && self.peek_nth(1).is_assign() => self.parse_attribute(element)?,
            _ if is_name && self.next_is(&TokenKind::LeftBrace) => {
                self.parse_element(Some(element))?;
            }
            _ => return Err(self.unexpected("an attribute, element or block")),
        }
        Ok(())
    }

    /// `name: value;` or `name = value;`. The `;` may be left out when the
    /// next item starts on a new line.
    fn parse_attribute(&mut self, element: NodeId) -> PResult<()> {
        let name = self.advance();
        self.advance();
        let value = self.parse_literal(true)?;
        self.eat(&TokenKind::Semicolon);
        if let Some(node) = self.ast.get_mut(element) {
            node.attributes.insert(name.text, value);
        }
        Ok(())
    }

    /// `text { ... }`. A lone string yields its unescaped value; anything
    /// else is taken verbatim from the source.
    pub(super) fn parse_text_block(&mut self) -> PResult<Node> {
        let keyword = self.advance();
        let open = self.cursor;
        let close = self.matching_brace(open)?;
        let content = match &self.tokens[open + 1].kind {
            TokenKind::String(s) if close == open + 2 => s.clone(),
            _ => self.between(open, close).trim().to_string(),
        };
        self.cursor = close + 1;
        Ok(Node::text(content)
            .with_namespace(self.map.current_namespace())
            .with_span(keyword.span))
    }
}
