//! `[Template]` / `[Custom]` definitions and their usages.

use tracing::debug;

use super::{PResult, ParseError, ParseErrorKind, Parser};
use crate::ast::{
    DefinitionKind, DefinitionType, Node, NodeId, NodeKind, Usage,
};
use crate::lexer::{BlockKeyword, CommentKind, Keyword, Token, TokenKind};
use crate::symbols::{Definition, DefinitionKey, Inheritance, QualifiedName};

impl Parser<'_> {
    /// `[Template] @Type Name { ... }` or `[Custom] @Type Name { ... }`.
    ///
    /// The body is stored in the global map; the tree only keeps a marker
    /// node so the definition's position in the document is known.
    pub(super) fn parse_definition(&mut self, parent: NodeId) -> PResult<()> {
        let keyword = self.advance();
        let kind = match keyword.kind {
            TokenKind::Block(BlockKeyword::Custom) => DefinitionKind::Custom,
            _ => DefinitionKind::Template,
        };
        let ty = self.parse_definition_type()?;
        let name = self.expect_name("a definition name")?;
        self.expect(&TokenKind::LeftBrace, "'{' to open definition body")?;

        let key = DefinitionKey::new(
            kind,
            ty,
            QualifiedName::new(self.map.current_namespace(), &name.text),
        );
        let mut definition = Definition::new(key, keyword.span);
        match ty {
            DefinitionType::Element => self.parse_element_definition_body(&mut definition)?,
            DefinitionType::Style | DefinitionType::Var => {
                self.parse_property_definition_body(&mut definition)?
            }
        }
        self.expect(&TokenKind::RightBrace, "'}' to close definition body")?;

        let marker = match kind {
            DefinitionKind::Template => NodeKind::TemplateDef(ty),
            DefinitionKind::Custom => NodeKind::CustomDef(ty),
        };
        let node = Node::new(marker)
            .with_name(&name.text)
            .with_namespace(self.map.current_namespace())
            .with_span(keyword.span);
        self.ast.insert_child(parent, node);

        debug!(
            definition = %definition.key,
            properties = definition.properties.len(),
            elements = definition.elements.len(),
            "registered definition"
        );
        let key = definition.key.clone();
        if !self.map.register(definition) {
            self.warn(name.span, format!("duplicate definition {key}; keeping the first"));
        }
        Ok(())
    }

    /// `@Style`, `@Element` or `@Var`.
    pub(super) fn parse_definition_type(&mut self) -> PResult<DefinitionType> {
        let tok = self.peek().clone();
        let TokenKind::At(at) = &tok.kind else {
            return Err(self.unexpected("@Style, @Element or @Var"));
        };
        let Some(ty) = DefinitionType::from_at(at) else {
            return Err(ParseError::at(
                ParseErrorKind::InvalidDefinition,
                tok.span,
                format!("{} cannot be used as a definition type", tok.text),
            ));
        };
        self.advance();
        Ok(ty)
    }

    fn require_custom(&self, definition: &Definition, tok: &Token) -> PResult<()> {
        if definition.is_custom() {
            Ok(())
        } else {
            Err(ParseError::at(
                ParseErrorKind::InvalidDefinition,
                tok.span,
                format!("'{}' is only allowed in [Custom] definitions", tok.text),
            ))
        }
    }

    /// Body of a `@Style` or `@Var` definition.
    fn parse_property_definition_body(&mut self, definition: &mut Definition) -> PResult<()> {
        let ty = definition.ty();
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::RightBrace | TokenKind::Eof => return Ok(()),
                TokenKind::Semicolon | TokenKind::Comment(CommentKind::Generator) => {
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Inherit) => {
                    self.advance();
                    let parent = self.parse_usage(Some(ty))?;
                    definition.inherits.push(Inheritance {
                        parent,
                        explicit: true,
                    });
                }
                TokenKind::At(_) | TokenKind::Block(BlockKeyword::Template | BlockKeyword::Custom) => {
                    let parent = self.parse_usage(Some(ty))?;
                    definition.inherits.push(Inheritance {
                        parent,
                        explicit: false,
                    });
                }
                TokenKind::Keyword(Keyword::Delete) => {
                    self.require_custom(definition, &tok)?;
                    let ops = self.parse_delete()?;
                    definition.specializations.extend(ops);
                }
                TokenKind::Keyword(Keyword::Insert) => {
                    self.require_custom(definition, &tok)?;
                    let op = self.parse_insert(ty)?;
                    definition.specializations.push(op);
                }
                _ => {
                    let name = self.parse_property_name()?;
                    if self.peek().is_assign() {
                        self.advance();
                        let value = self.parse_value(false)?;
                        self.eat(&TokenKind::Semicolon);
                        definition.properties.insert(name, value);
                    } else {
                        // `color, border;` declares properties the usage
                        // site has to fill.
                        if ty != DefinitionType::Style {
                            return Err(self.unexpected("':' after variable name"));
                        }
                        self.require_custom(definition, &tok)?;
                        definition.valueless.push(name);
                        while self.eat(&TokenKind::Comma) {
                            let name = self.parse_property_name()?;
                            definition.valueless.push(name);
                        }
                        if !self.check(&TokenKind::RightBrace) {
                            self.expect(&TokenKind::Semicolon, "';' after property list")?;
                        }
                    }
                }
            }
        }
    }

    /// Body of an `@Element` definition. Elements are parsed detached and
    /// owned by the definition.
    fn parse_element_definition_body(&mut self, definition: &mut Definition) -> PResult<()> {
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::RightBrace | TokenKind::Eof => return Ok(()),
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Comment(CommentKind::Generator) => {
                    self.advance();
                    let content = tok.text.trim_start_matches('-').trim();
                    let id = self
                        .ast
                        .insert_detached(Node::comment(content).with_span(tok.span));
                    definition.elements.push(id);
                }
                TokenKind::Keyword(Keyword::Inherit) => {
                    self.advance();
                    let parent = self.parse_usage(Some(DefinitionType::Element))?;
                    definition.inherits.push(Inheritance {
                        parent,
                        explicit: true,
                    });
                }
                TokenKind::At(_) | TokenKind::Block(BlockKeyword::Template | BlockKeyword::Custom) => {
                    let parent = self.parse_usage(Some(DefinitionType::Element))?;
                    definition.inherits.push(Inheritance {
                        parent,
                        explicit: false,
                    });
                }
                TokenKind::Keyword(Keyword::Delete) => {
                    self.require_custom(definition, &tok)?;
                    let ops = self.parse_delete()?;
                    definition.specializations.extend(ops);
                }
                TokenKind::Keyword(Keyword::Insert) => {
                    self.require_custom(definition, &tok)?;
                    let op = self.parse_insert(DefinitionType::Element)?;
                    definition.specializations.push(op);
                }
                TokenKind::Keyword(Keyword::Text) if self.next_is(&TokenKind::LeftBrace) => {
                    let node = self.parse_text_block()?;
                    definition.elements.push(self.ast.insert_detached(node));
                }
                TokenKind::Block(BlockKeyword::Origin) => {
                    let id = self.parse_origin_detached()?;
                    definition.elements.push(id);
                }
                _ if tok.is_name() && self.next_is(&TokenKind::LeftBrace) => {
                    let id = self.parse_element(None)?;
                    definition.elements.push(id);
                }
                _ => return Err(self.unexpected("an element in @Element definition")),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Usages
    // -----------------------------------------------------------------------

    /// `[Custom]? @Type Name (from ns.path)? ( ; | { ... } )`
    ///
    /// With `expected` set, a usage of another type is an error.
    pub(super) fn parse_usage(&mut self, expected: Option<DefinitionType>) -> PResult<Usage> {
        let kind = match self.peek().kind {
            TokenKind::Block(BlockKeyword::Template) => {
                self.advance();
                Some(DefinitionKind::Template)
            }
            TokenKind::Block(BlockKeyword::Custom) => {
                self.advance();
                Some(DefinitionKind::Custom)
            }
            _ => None,
        };
        let at = self.peek().clone();
        let ty = self.parse_definition_type()?;
        if let Some(expected) = expected {
            if expected != ty {
                return Err(ParseError::at(
                    ParseErrorKind::UnexpectedToken,
                    at.span,
                    format!("expected {expected} usage, found {ty}"),
                ));
            }
        }
        let name = self.parse_definition_name()?;
        let mut usage = Usage::new(ty, name);
        usage.kind = kind;
        usage.scope = self.map.current_namespace().to_string();
        if self.check_keyword(Keyword::From) {
            self.advance();
            usage.from = Some(self.parse_namespace_path()?);
        }
        if self.eat(&TokenKind::LeftBrace) {
            self.nested(|parser| parser.parse_usage_body(&mut usage))?;
            self.expect(&TokenKind::RightBrace, "'}' to close usage body")?;
        }
        self.eat(&TokenKind::Semicolon);
        Ok(usage)
    }

    /// An element-level usage stored as a tree node, attached to `parent`
    /// or left detached.
    pub(super) fn parse_usage_node(&mut self, parent: Option<NodeId>) -> PResult<NodeId> {
        let span = self.peek().span;
        let usage = self.parse_usage(Some(DefinitionType::Element))?;
        let node = Node::new(NodeKind::Usage(usage))
            .with_namespace(self.map.current_namespace())
            .with_span(span);
        Ok(match parent {
            Some(parent) => self.ast.insert_child(parent, node),
            None => self.ast.insert_detached(node),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{
        DefinitionKind, DefinitionType, InsertContent, InsertPosition, NodeKind, Specialization,
        Target,
    };
    use crate::lexer::tokenize;
    use crate::parser::{parse, ParseErrorKind, ParseResult};
    use crate::symbols::{DefinitionKey, GlobalMap, QualifiedName};
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> (ParseResult, GlobalMap) {
        let mut map = GlobalMap::new();
        let result = parse(source, tokenize(source).unwrap(), &mut map);
        (result, map)
    }

    fn key(kind: DefinitionKind, ty: DefinitionType, name: &str) -> DefinitionKey {
        DefinitionKey::new(kind, ty, QualifiedName::global(name))
    }

    #[test]
    fn style_template_is_registered() {
        let (result, map) =
            parse_source("[Template] @Style Base { color: red; font-size: 12px; }");
        assert!(result.success, "{:?}", result.error);
        let def = map
            .definition(&key(DefinitionKind::Template, DefinitionType::Style, "Base"))
            .unwrap();
        let props: Vec<_> = def.properties.keys().cloned().collect();
        assert_eq!(props, vec!["color", "font-size"]);
        let marker = result.ast.children(result.root())[0];
        assert_eq!(
            result.ast.get(marker).unwrap().kind,
            NodeKind::TemplateDef(DefinitionType::Style)
        );
    }

    #[test]
    fn element_template_owns_detached_nodes() {
        let (result, map) = parse_source("[Template] @Element Card { div { } span { } }");
        assert!(result.success, "{:?}", result.error);
        let def = map
            .definition(&key(DefinitionKind::Template, DefinitionType::Element, "Card"))
            .unwrap();
        assert_eq!(def.elements.len(), 2);
        assert!(def.elements.iter().all(|id| result.ast.parent(*id).is_none()));
        // Definition elements are not part of the document tree.
        assert!(result.ast.query_by_tag("div").is_empty());
    }

    #[test]
    fn inherit_and_composition() {
        let (result, map) = parse_source(
            "[Template] @Style A { color: red; }\n\
             [Template] @Style B { inherit @Style A; @Style A; width: 1px; }",
        );
        assert!(result.success, "{:?}", result.error);
        let def = map
            .definition(&key(DefinitionKind::Template, DefinitionType::Style, "B"))
            .unwrap();
        assert_eq!(def.inherits.len(), 2);
        assert!(def.inherits[0].explicit);
        assert!(!def.inherits[1].explicit);
        assert_eq!(def.inherits[0].parent.name, "A");
    }

    #[test]
    fn custom_valueless_properties() {
        let (result, map) = parse_source("[Custom] @Style Text { color, font-size; margin: 0; }");
        assert!(result.success, "{:?}", result.error);
        let def = map
            .definition(&key(DefinitionKind::Custom, DefinitionType::Style, "Text"))
            .unwrap();
        assert_eq!(def.valueless, vec!["color", "font-size"]);
        assert_eq!(def.properties.len(), 1);
    }

    #[test]
    fn template_rejects_valueless_properties() {
        let (result, _) = parse_source("[Template] @Style Text { color; }");
        assert!(!result.success);
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::InvalidDefinition);
    }

    #[test]
    fn template_rejects_delete() {
        let (result, _) = parse_source("[Template] @Style T { delete color; }");
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::InvalidDefinition);
    }

    #[test]
    fn html_is_not_a_definition_type() {
        let (result, _) = parse_source("[Template] @Html X { }");
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::InvalidDefinition);
    }

    #[test]
    fn duplicate_definition_warns_and_keeps_first() {
        let (result, map) = parse_source(
            "[Template] @Var V { a: 1; }\n[Template] @Var V { a: 2; }",
        );
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        let def = map
            .definition(&key(DefinitionKind::Template, DefinitionType::Var, "V"))
            .unwrap();
        assert_eq!(def.properties["a"].to_string(), "1");
    }

    #[test]
    fn element_usage_with_specialization() {
        let (result, _) = parse_source(
            "body { @Element Card { delete span; insert after div[0] { p { } } } }",
        );
        assert!(result.success, "{:?}", result.error);
        let usage_id = result
            .ast
            .query_all(result.root(), |n| matches!(n.kind, NodeKind::Usage(_)))[0];
        let NodeKind::Usage(usage) = &result.ast.get(usage_id).unwrap().kind else {
            unreachable!();
        };
        assert_eq!(usage.name, "Card");
        assert_eq!(usage.specializations.len(), 2);
        assert_eq!(
            usage.specializations[0],
            Specialization::DeleteProperty(vec!["span".into()])
        );
        let Specialization::Insert { position, content } = &usage.specializations[1] else {
            panic!("expected insert");
        };
        assert_eq!(position, &InsertPosition::After(Target::indexed("div", 0)));
        assert!(matches!(content, InsertContent::Elements(nodes) if nodes.len() == 1));
    }

    #[test]
    fn usage_with_from_clause() {
        let (result, _) = parse_source("body { @Element Box from ui.forms; }");
        assert!(result.success, "{:?}", result.error);
        let usage_id = result
            .ast
            .query_all(result.root(), |n| matches!(n.kind, NodeKind::Usage(_)))[0];
        let NodeKind::Usage(usage) = &result.ast.get(usage_id).unwrap().kind else {
            unreachable!();
        };
        assert_eq!(usage.from.as_deref(), Some("ui.forms"));
    }

    #[test]
    fn style_usage_type_mismatch() {
        let (result, _) = parse_source("div { style { @Element Card; } }");
        assert!(!result.success);
    }
}
