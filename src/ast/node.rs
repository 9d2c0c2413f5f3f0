//! Node types: NodeId, NodeKind, Node.

use indexmap::IndexMap;
use slotmap::new_key_type;

use super::directive::{ConstraintTarget, ImportSpec, OriginBlock, OriginType, UseTarget};
use super::html;
use super::script::ScriptBlock;
use super::style::StyleBlock;
use super::usage::{DefinitionType, Usage};
use crate::lexer::Span;

new_key_type! {
    /// Unique identifier for an AST node. Copy, lightweight (u64).
    pub struct NodeId;
}

/// What a node is, with the payload specific to that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The root of a parsed document.
    Document,
    Element,
    Text,
    /// A `--` generator comment.
    Comment,
    Style(StyleBlock),
    Script(ScriptBlock),
    /// `[Template] @Type Name { ... }`; the body lives in the global map.
    TemplateDef(DefinitionType),
    /// `[Custom] @Type Name { ... }`; the body lives in the global map.
    CustomDef(DefinitionType),
    Usage(Usage),
    Origin(OriginBlock),
    Import(ImportSpec),
    Namespace,
    Configuration,
    Use(UseTarget),
    Constraint(Vec<ConstraintTarget>),
}

/// Data associated with a single AST node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Tag name, definition name, namespace name or configuration name.
    pub name: String,
    /// Raw content for text and comments.
    pub content: String,
    /// Attributes in source order.
    pub attributes: IndexMap<String, String>,
    /// Inline style properties, filled during generation.
    pub properties: IndexMap<String, String>,
    /// Dotted namespace path the node was declared in.
    pub namespace: String,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: String::new(),
            content: String::new(),
            attributes: IndexMap::new(),
            properties: IndexMap::new(),
            namespace: String::new(),
            span: Span::default(),
        }
    }

    pub fn document() -> Self {
        Self::new(NodeKind::Document)
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self::new(NodeKind::Element).with_name(tag)
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Text).with_content(content)
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Comment).with_content(content)
    }

    /// Set the name (builder).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the content (builder).
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Add an attribute (builder).
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the namespace path (builder).
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the source position (builder).
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Elements like `img` and `br` that may not have children.
    pub fn is_void(&self) -> bool {
        self.is_element() && html::is_void_element(&self.name)
    }

    /// Nodes that become element content in the output, as opposed to
    /// style/script blocks, definitions and directives.
    pub fn is_content(&self) -> bool {
        match &self.kind {
            NodeKind::Element | NodeKind::Text | NodeKind::Comment => true,
            NodeKind::Usage(usage) => usage.ty == DefinitionType::Element,
            NodeKind::Origin(origin) => {
                !matches!(origin.ty, OriginType::Style | OriginType::JavaScript)
            }
            _ => false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the attribute is present with a non-blank value.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some_and(|v| !v.trim().is_empty())
    }

    /// First entry of the `class` attribute.
    pub fn first_class(&self) -> Option<&str> {
        self.attribute("class")?.split_whitespace().next()
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id").map(str::trim).filter(|id| !id.is_empty())
    }

    pub fn style_block(&self) -> Option<&StyleBlock> {
        match &self.kind {
            NodeKind::Style(block) => Some(block),
            _ => None,
        }
    }

    pub fn script_block(&self) -> Option<&ScriptBlock> {
        match &self.kind {
            NodeKind::Script(block) => Some(block),
            _ => None,
        }
    }
}
