//! Element emission: tags, attributes, constraints and void elements.

use indexmap::IndexMap;
use tracing::trace;

use super::css::declarations;
use super::{Except, GenerateError, Generator, Scope};
use crate::ast::{ConstraintTarget, Node, NodeId, NodeKind};
use crate::automation::{self, ContextSide};

/// Escape text for use in HTML content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// ` name="value"` pairs, with inline declarations merged into `style`.
fn render_attributes(
    attributes: &IndexMap<String, String>,
    properties: &IndexMap<String, String>,
) -> String {
    let mut out = String::new();
    let mut style_written = false;
    for (name, value) in attributes {
        if name == "style" && !properties.is_empty() {
            let mut merged = value.trim().to_string();
            if !merged.is_empty() && !merged.ends_with(';') {
                merged.push(';');
            }
            merged.push_str(&declarations(properties));
            push_attribute(&mut out, name, &merged);
            style_written = true;
        } else {
            push_attribute(&mut out, name, value);
        }
    }
    if !style_written && !properties.is_empty() {
        push_attribute(&mut out, "style", &declarations(properties));
    }
    out
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

/// `html` and `head` hold document-wide style and script blocks.
fn is_document_level(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("html") || tag.eq_ignore_ascii_case("head")
}

impl Generator<'_> {
    pub(super) fn generate_element(&mut self, id: NodeId) {
        let Some(node) = self.ast.get(id) else {
            return;
        };
        let tag = node.name.clone();
        let span = node.span;
        let namespace = node.namespace.clone();
        let void = node.is_void();
        let children = self.ast.children(id).to_vec();

        if void
            && children
                .iter()
                .any(|child| self.ast.get(*child).is_some_and(Node::is_content))
        {
            self.errors.push(GenerateError::VoidElementChildren {
                tag,
                line: span.line,
                column: span.column,
            });
            return;
        }

        let document_level = is_document_level(&tag);
        // Automation may rename the selectors in the blocks collected below.
        if !document_level {
            let outcome = automation::apply(self.ast, self.map, id);
            trace!(%tag, ?outcome, "element automation");
        }

        let mut styles = Vec::new();
        let mut scripts = Vec::new();
        let mut targets = Vec::new();
        for child in &children {
            match self.ast.get(*child).map(|n| &n.kind) {
                Some(NodeKind::Style(block)) if !document_level => styles.push(block.clone()),
                Some(NodeKind::Script(block)) if !document_level => scripts.push(block.clone()),
                Some(NodeKind::Constraint(list)) => targets.extend(list.iter().cloned()),
                _ => {}
            }
        }

        let (style_context, script_context) = match self.ast.get(id) {
            Some(node) => (
                automation::context_selector(node, ContextSide::Style),
                automation::context_selector(node, ContextSide::Script),
            ),
            None => (None, None),
        };

        let inline = self.generate_local_styles(&styles, style_context.as_deref(), span);
        for block in &scripts {
            self.generate_script(block, script_context.clone(), &namespace, span);
        }

        let attributes = match self.ast.get_mut(id) {
            Some(node) => {
                node.properties = inline;
                render_attributes(&node.attributes, &node.properties)
            }
            None => String::new(),
        };
        self.html.push('<');
        self.html.push_str(&tag);
        self.html.push_str(&attributes);
        self.html.push('>');
        if void {
            return;
        }

        let scope = if document_level { Scope::Global } else { Scope::Local };
        let except = Except {
            tag: &tag,
            targets: &targets,
        };
        let except = (!targets.is_empty()).then_some(&except);
        for child in children {
            self.generate_node(child, scope, except);
        }
        self.html.push_str("</");
        self.html.push_str(&tag);
        self.html.push('>');
    }

    /// The first target in `targets` that forbids `node`.
    pub(super) fn violation<'t>(
        &self,
        targets: &'t [ConstraintTarget],
        node: &Node,
    ) -> Option<&'t ConstraintTarget> {
        targets.iter().find(|target| self.forbids(target, node))
    }

    fn forbids(&self, target: &ConstraintTarget, node: &Node) -> bool {
        match (target, &node.kind) {
            (ConstraintTarget::Tag(tag), NodeKind::Element) => node.name.eq_ignore_ascii_case(tag),
            (ConstraintTarget::Definition { kind, ty, name }, NodeKind::Usage(usage)) => {
                if ty.is_some_and(|ty| ty != usage.ty) {
                    return false;
                }
                if name.as_ref().is_some_and(|name| {
                    simple_name(name) != simple_name(&usage.name)
                }) {
                    return false;
                }
                let Some(kind) = kind else {
                    return true;
                };
                let namespace = usage.from.as_deref().unwrap_or(usage.scope.as_str());
                let actual = usage.kind.or_else(|| {
                    self.map
                        .lookup_key(&usage.name, usage.ty, None, namespace)
                        .map(|key| key.kind)
                });
                actual == Some(*kind)
            }
            (ConstraintTarget::Origin(ty), NodeKind::Origin(origin)) => origin.ty == *ty,
            _ => false,
        }
    }
}

fn simple_name(name: &str) -> &str {
    name.rsplit_once("::").map_or(name, |(_, simple)| simple)
}
