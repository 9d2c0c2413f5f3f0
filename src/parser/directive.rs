//! Directives: `[Origin]`, `[Import]`, `[Namespace]`, `[Configuration]`,
//! `use` and `except`.

use tracing::debug;

use super::{PResult, ParseError, ParseErrorKind, Parser};
use crate::ast::{
    ConstraintTarget, DefinitionKind, DefinitionType, ImportSpec, Node, NodeId, NodeKind,
    OriginBlock, OriginType, UseTarget,
};
use crate::lexer::{AtType, BlockKeyword, Keyword, TokenKind};
use crate::symbols::{NamespaceEvent, OriginEntry, QualifiedName};

impl Parser<'_> {
    // -----------------------------------------------------------------------
    // [Origin]
    // -----------------------------------------------------------------------

    pub(super) fn parse_origin(&mut self, parent: NodeId) -> PResult<()> {
        let id = self.parse_origin_detached()?;
        self.ast.append(parent, id);
        Ok(())
    }

    /// `[Origin] @Type [name] { raw }` or `[Origin] @Type name;`.
    ///
    /// A named block with a body is registered for later reference.
    pub(super) fn parse_origin_detached(&mut self) -> PResult<NodeId> {
        let keyword = self.advance();
        let tok = self.peek().clone();
        let TokenKind::At(at) = &tok.kind else {
            return Err(self.unexpected("an origin type such as @Html"));
        };
        let ty = OriginType::from_at(at);
        self.advance();
        let name = if self.peek().is_name() {
            Some(self.advance().text)
        } else {
            None
        };

        let content = if self.check(&TokenKind::LeftBrace) {
            let open = self.cursor;
            let close = self.matching_brace(open)?;
            let raw = trim_block(self.between(open, close));
            self.cursor = close + 1;
            Some(raw)
        } else {
            if name.is_none() {
                return Err(self.unexpected("an origin name or '{'"));
            }
            None
        };
        self.eat(&TokenKind::Semicolon);

        if let (Some(name), Some(content)) = (&name, &content) {
            let entry = OriginEntry {
                ty: ty.clone(),
                name: QualifiedName::new(self.map.current_namespace(), name),
                content: content.clone(),
            };
            if !self.map.register_origin(entry) {
                self.warn(keyword.span, format!("duplicate origin {ty} {name}; keeping the first"));
            }
        }

        let node = Node::new(NodeKind::Origin(OriginBlock { ty, name, content }))
            .with_namespace(self.map.current_namespace())
            .with_span(keyword.span);
        Ok(self.ast.insert_detached(node))
    }

    // -----------------------------------------------------------------------
    // [Import]
    // -----------------------------------------------------------------------

    /// `[Import] target from path (as alias)?;` is recorded only.
    pub(super) fn parse_import(&mut self, parent: NodeId) -> PResult<()> {
        let keyword = self.advance();
        let start = self.cursor;
        while !self.check_keyword(Keyword::From) {
            if matches!(
                self.peek().kind,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
            ) {
                return Err(self.unexpected("'from' in import"));
            }
            self.advance();
        }
        if self.cursor == start {
            return Err(self.unexpected("an import target"));
        }
        let target = normalize_space(self.spanning(start, self.cursor - 1));
        self.advance();

        let path = match &self.peek().kind {
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                s
            }
            _ => {
                let path_start = self.cursor;
                while !self.check_keyword(Keyword::As)
                    && !matches!(
                        self.peek().kind,
                        TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
                    )
                {
                    self.advance();
                }
                if self.cursor == path_start {
                    return Err(self.unexpected("an import path"));
                }
                self.spanning(path_start, self.cursor - 1).to_string()
            }
        };
        let alias = if self.check_keyword(Keyword::As) {
            self.advance();
            Some(self.expect_name("an alias")?.text)
        } else {
            None
        };
        self.eat(&TokenKind::Semicolon);

        let spec = ImportSpec {
            target,
            path,
            alias,
        };
        debug!(target = %spec.target, path = %spec.path, "recorded import");
        self.map.add_import(spec.clone());
        let node = Node::new(NodeKind::Import(spec)).with_span(keyword.span);
        self.ast.insert_child(parent, node);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // [Namespace]
    // -----------------------------------------------------------------------

    /// `[Namespace] name { ... }`, or `[Namespace] name` which covers the
    /// rest of the file.
    pub(super) fn parse_namespace(&mut self, parent: NodeId) -> PResult<()> {
        let keyword = self.advance();
        let name = self.expect_name("a namespace name")?;
        let event = self.map.enter_namespace(&name.text);
        if let NamespaceEvent::Conflict { existing } = &event {
            self.warn(
                name.span,
                format!("namespace '{}' conflicts with '{existing}'", name.text),
            );
        }
        let node = Node::new(NodeKind::Namespace)
            .with_name(&name.text)
            .with_namespace(self.map.current_namespace())
            .with_span(keyword.span);
        let id = self.ast.insert_child(parent, node);

        if !self.eat(&TokenKind::LeftBrace) {
            self.eat(&TokenKind::Semicolon);
            return Ok(());
        }
        let result = self.nested(|parser| parser.parse_namespace_body(id));
        self.map.exit_namespace();
        result
    }

    fn parse_namespace_body(&mut self, namespace: NodeId) -> PResult<()> {
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            self.parse_top_level_item(namespace)?;
        }
        self.expect(&TokenKind::RightBrace, "'}' to close namespace")?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // [Configuration]
    // -----------------------------------------------------------------------

    /// `[Configuration] (@Config Name)? { KEY = value; [Name] { ... } }`
    ///
    /// An unnamed block changes the active configuration right away; a
    /// named one waits for `use @Config Name;`.
    pub(super) fn parse_configuration(&mut self, parent: NodeId) -> PResult<()> {
        let keyword = self.advance();
        let name = if matches!(self.peek().kind, TokenKind::At(AtType::Config)) {
            self.advance();
            Some(self.expect_name("a configuration name")?.text)
        } else if self.peek().is_name() {
            Some(self.advance().text)
        } else {
            None
        };
        self.expect(&TokenKind::LeftBrace, "'{' to open configuration")?;

        let mut config = self.map.config().clone();
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::RightBrace | TokenKind::Eof => break,
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Block(block @ (BlockKeyword::Name | BlockKeyword::OriginType)) => {
                    let prefix = match block {
                        BlockKeyword::Name => "Name",
                        _ => "OriginType",
                    };
                    self.advance();
                    self.expect(&TokenKind::LeftBrace, "'{'")?;
                    while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
                        if self.eat(&TokenKind::Semicolon) {
                            continue;
                        }
                        let (key, value) = self.parse_config_entry()?;
                        config.extra.insert(format!("{prefix}.{key}"), value);
                    }
                    self.expect(&TokenKind::RightBrace, "'}'")?;
                }
                _ => {
                    let (key, value) = self.parse_config_entry()?;
                    if let Err(error) = config.set(&key, &value) {
                        self.warn(tok.span, error.to_string());
                    }
                }
            }
        }
        self.expect(&TokenKind::RightBrace, "'}' to close configuration")?;

        let mut node = Node::new(NodeKind::Configuration).with_span(keyword.span);
        match &name {
            Some(name) => {
                node = node.with_name(name);
                if !self.map.register_configuration(name, config) {
                    self.warn(keyword.span, format!("duplicate configuration '{name}'"));
                }
            }
            None => self.map.set_config(config),
        }
        self.ast.insert_child(parent, node);
        Ok(())
    }

    /// `KEY = value;`
    fn parse_config_entry(&mut self) -> PResult<(String, String)> {
        let key = self.expect_name("a configuration key")?.text;
        if !self.peek().is_assign() {
            return Err(self.unexpected("'=' after configuration key"));
        }
        self.advance();
        let value = self.parse_literal(false)?;
        self.eat(&TokenKind::Semicolon);
        Ok((key, value))
    }

    // -----------------------------------------------------------------------
    // use / except
    // -----------------------------------------------------------------------

    /// `use html5;` or `use @Config Name;`. Only valid before any other
    /// statement.
    pub(super) fn parse_use(&mut self, parent: NodeId) -> PResult<()> {
        let keyword = self.peek().clone();
        if self.seen_content {
            return Err(ParseError::at(
                ParseErrorKind::UseNotFirst,
                keyword.span,
                "'use' must come before any other statement",
            ));
        }
        self.advance();
        let target = if self.check_keyword(Keyword::Html5) {
            self.advance();
            self.map.set_html5();
            UseTarget::Html5
        } else if matches!(self.peek().kind, TokenKind::At(AtType::Config)) {
            self.advance();
            let name = self.expect_name("a configuration name")?;
            self.pending_configs.push((name.text.clone(), name.span));
            UseTarget::Config(name.text)
        } else {
            return Err(self.unexpected("'html5' or @Config"));
        };
        self.eat(&TokenKind::Semicolon);
        self.ast
            .insert_child(parent, Node::new(NodeKind::Use(target)).with_span(keyword.span));
        Ok(())
    }

    /// `except span, [Custom] @Element Box, @Html;`
    pub(super) fn parse_constraint(&mut self, element: NodeId) -> PResult<()> {
        let keyword = self.advance();
        let mut targets = Vec::new();
        loop {
            targets.push(self.parse_constraint_target()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        if !self.check(&TokenKind::RightBrace) {
            self.expect(&TokenKind::Semicolon, "';' after except list")?;
        }
        self.ast.insert_child(
            element,
            Node::new(NodeKind::Constraint(targets)).with_span(keyword.span),
        );
        Ok(())
    }

    fn parse_constraint_target(&mut self) -> PResult<ConstraintTarget> {
        let tok = self.peek().clone();
        let kind = match tok.kind {
            TokenKind::Block(BlockKeyword::Template) => Some(DefinitionKind::Template),
            TokenKind::Block(BlockKeyword::Custom) => Some(DefinitionKind::Custom),
            _ => None,
        };
        if kind.is_some() {
            self.advance();
        }
        let at = match &self.peek().kind {
            TokenKind::At(at) => Some(at.clone()),
            _ => None,
        };
        match at {
            Some(at) => {
                self.advance();
                match DefinitionType::from_at(&at) {
                    Some(ty) => {
                        let name = if self.peek().is_name() {
                            Some(self.advance().text)
                        } else {
                            None
                        };
                        Ok(ConstraintTarget::Definition {
                            kind,
                            ty: Some(ty),
                            name,
                        })
                    }
                    None if kind.is_none() => Ok(ConstraintTarget::Origin(OriginType::from_at(&at))),
                    None => Err(ParseError::at(
                        ParseErrorKind::UnexpectedToken,
                        tok.span,
                        format!("{at} is not a definition type"),
                    )),
                }
            }
            None if kind.is_some() => Ok(ConstraintTarget::Definition {
                kind,
                ty: None,
                name: None,
            }),
            None => Ok(ConstraintTarget::Tag(self.expect_name("a tag name")?.text)),
        }
    }
}

/// Strip the line break after `{` and the indentation-only last line, so
/// raw content keeps its own internal layout.
fn trim_block(raw: &str) -> String {
    let raw = raw.trim_end();
    let raw = raw.trim_start_matches([' ', '\t']);
    let raw = raw.strip_prefix("\r\n").or_else(|| raw.strip_prefix('\n')).unwrap_or(raw);
    let indent = raw
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    raw.lines()
        .map(|l| l.get(indent..).unwrap_or(l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::trim_block;
    use crate::ast::{ConstraintTarget, DefinitionType, NodeKind, OriginType};
    use crate::lexer::tokenize;
    use crate::parser::{parse, ParseErrorKind, ParseResult};
    use crate::symbols::GlobalMap;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> (ParseResult, GlobalMap) {
        let mut map = GlobalMap::new();
        let result = parse(source, tokenize(source).unwrap(), &mut map);
        (result, map)
    }

    #[test]
    fn trim_block_dedents() {
        assert_eq!(trim_block("\n    <b>hi</b>\n      <i/>\n  "), "<b>hi</b>\n  <i/>");
        assert_eq!(trim_block(" x "), "x");
    }

    #[test]
    fn named_origin_is_registered() {
        let (result, map) = parse_source("[Origin] @Html banner { <b>hi</b> }");
        assert!(result.success, "{:?}", result.error);
        let entry = map.origin(&OriginType::Html, "banner", "").unwrap();
        assert_eq!(entry.content, "<b>hi</b>");
    }

    #[test]
    fn origin_reference_form() {
        let (result, _) = parse_source("div { [Origin] @Html banner; }");
        assert!(result.success, "{:?}", result.error);
        let id = result
            .ast
            .query_all(result.root(), |n| matches!(n.kind, NodeKind::Origin(_)))[0];
        let NodeKind::Origin(origin) = &result.ast.get(id).unwrap().kind else {
            unreachable!();
        };
        assert_eq!(origin.name.as_deref(), Some("banner"));
        assert!(origin.content.is_none());
    }

    #[test]
    fn import_is_recorded() {
        let (result, map) = parse_source("[Import] @Chtl from \"lib/ui.chtl\" as ui;");
        assert!(result.success, "{:?}", result.error);
        let import = &map.imports()[0];
        assert_eq!(import.target, "@Chtl");
        assert_eq!(import.path, "lib/ui.chtl");
        assert_eq!(import.alias.as_deref(), Some("ui"));
    }

    #[test]
    fn unquoted_import_path_keeps_dots_and_slashes() {
        let (result, map) = parse_source("[Import] @Chtl from lib/ui.v2.chtl as ui;");
        assert!(result.success, "{:?}", result.error);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(map.imports()[0].path, "lib/ui.v2.chtl");
    }

    #[test]
    fn namespace_scopes_definitions() {
        let (result, map) = parse_source(
            "[Namespace] ui { [Template] @Style Box { color: red; } }\n\
             [Template] @Style Box { color: blue; }",
        );
        assert!(result.success, "{:?}", result.error);
        assert!(map.namespaces().contains("ui"));
        assert_eq!(map.current_namespace(), "");
        assert_eq!(map.definitions().count(), 2);
    }

    #[test]
    fn nested_namespaces() {
        let (result, map) = parse_source("[Namespace] a { [Namespace] b { } }");
        assert!(result.success, "{:?}", result.error);
        assert!(map.namespaces().contains("a.b"));
    }

    #[test]
    fn unnamed_configuration_applies() {
        let (result, map) = parse_source(
            "[Configuration] { INDEX_INITIAL_COUNT = 1; DEBUG_MODE = true; [Name] { CUSTOM_STYLE = @Style; } }",
        );
        assert!(result.success, "{:?}", result.error);
        assert_eq!(map.config().index_initial_count, 1);
        assert!(map.config().debug_mode);
        assert_eq!(map.config().extra("Name.CUSTOM_STYLE"), Some("@Style"));
    }

    #[test]
    fn invalid_configuration_value_warns() {
        let (result, map) = parse_source("[Configuration] { INDEX_INITIAL_COUNT = lots; }");
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(map.config().index_initial_count, 0);
    }

    #[test]
    fn named_configuration_activated_by_use() {
        let (result, map) = parse_source(
            "use @Config Std;\n[Configuration] @Config Std { DISABLE_STYLE_AUTO_ADD_CLASS = true; }",
        );
        assert!(result.success, "{:?}", result.error);
        assert!(map.config().disable_style_auto_add_class);
    }

    #[test]
    fn use_html5() {
        let (result, map) = parse_source("use html5;\nhtml { }");
        assert!(result.success);
        assert!(map.uses_html5());
    }

    #[test]
    fn use_after_content_is_an_error() {
        let (result, _) = parse_source("div { }\nuse html5;");
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::UseNotFirst);
    }

    #[test]
    fn constraint_targets() {
        let (result, _) =
            parse_source("div { except span, [Custom] @Element Box, @Html, [Template]; }");
        assert!(result.success, "{:?}", result.error);
        let id = result
            .ast
            .query_all(result.root(), |n| matches!(n.kind, NodeKind::Constraint(_)))[0];
        let NodeKind::Constraint(targets) = &result.ast.get(id).unwrap().kind else {
            unreachable!();
        };
        assert_eq!(targets.len(), 4);
        assert_eq!(targets[0], ConstraintTarget::Tag("span".into()));
        assert!(matches!(
            &targets[1],
            ConstraintTarget::Definition { ty: Some(DefinitionType::Element), name: Some(n), .. } if n == "Box"
        ));
        assert_eq!(targets[2], ConstraintTarget::Origin(OriginType::Html));
    }
}
