//! Selector automation.
//!
//! Before an element is emitted, the selectors in its own style and script
//! blocks may supply its `class` and `id`:
//!
//! - the first rule in the style blocks led by `.name` (or `#name`) sets the
//!   attribute when it is absent, unless disabled by configuration;
//! - `{{.name}}` / `{{#name}}` in the script blocks do the same, but only
//!   when script automation is enabled (it is off by default) and the style
//!   pass left the attribute empty.
//!
//! Names come from [`GlobalMap::generate_auto_class`] and friends, so a
//! second element asking for `box` gets `box1`; the element's own selectors
//! are rewritten to match.
//!
//! The context reference `&` resolves against the automated attributes:
//! class first in style blocks, id first in scripts.

use tracing::trace;

use crate::ast::{Ast, Node, NodeId, NodeKind};
use crate::symbols::GlobalMap;

/// Where a `&` appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSide {
    Style,
    Script,
}

/// Attributes added to an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub class: Option<String>,
    pub id: Option<String>,
}

#[derive(Clone, Copy)]
enum Attr {
    Class,
    Id,
}

impl Attr {
    fn name(self) -> &'static str {
        match self {
            Attr::Class => "class",
            Attr::Id => "id",
        }
    }
}

/// Fill in `class`/`id` on `element` from its style and script children.
pub fn apply(ast: &mut Ast, map: &mut GlobalMap, element: NodeId) -> Outcome {
    let mut outcome = Outcome::default();
    let Some(node) = ast.get(element) else {
        return outcome;
    };
    if !node.is_element() {
        return outcome;
    }
    let tag = node.name.clone();
    let config = map.config().clone();

    let mut style_class = None;
    let mut style_id = None;
    let mut script_class = None;
    let mut script_id = None;
    for child in ast.children(element) {
        match ast.get(*child).map(|n| &n.kind) {
            Some(NodeKind::Style(block)) => {
                style_class = style_class.or_else(|| block.first_class().map(str::to_string));
                style_id = style_id.or_else(|| block.first_id().map(str::to_string));
            }
            Some(NodeKind::Script(block)) => {
                script_class = script_class.or_else(|| block.first_class().map(str::to_string));
                script_id = script_id.or_else(|| block.first_id().map(str::to_string));
            }
            _ => {}
        }
    }

    let candidates = [
        (Attr::Class, style_class, !config.disable_style_auto_add_class, "style"),
        (Attr::Class, script_class, !config.disable_script_auto_add_class, "script"),
        (Attr::Id, style_id, !config.disable_style_auto_add_id, "style"),
        (Attr::Id, script_id, !config.disable_script_auto_add_id, "script"),
    ];
    for (attr, base, enabled, source) in candidates {
        let Some(base) = base else {
            continue;
        };
        let present = ast.get(element).is_some_and(|n| n.has_attribute(attr.name()));
        if !enabled || present {
            trace!(%tag, attr = attr.name(), %base, source, enabled, present, "automation skipped");
            continue;
        }
        let name = match attr {
            Attr::Class => map.generate_auto_class(&base),
            Attr::Id => map.generate_auto_id(&base),
        };
        trace!(%tag, attr = attr.name(), %name, source, "automation added attribute");
        if name != base {
            rename(ast, element, attr, &base, &name);
        }
        if let Some(node) = ast.get_mut(element) {
            node.attributes.insert(attr.name().to_string(), name.clone());
        }
        match attr {
            Attr::Class => outcome.class = Some(name),
            Attr::Id => outcome.id = Some(name),
        }
    }
    outcome
}

/// Rewrite `base` to `name` in the element's own style and script blocks.
fn rename(ast: &mut Ast, element: NodeId, attr: Attr, base: &str, name: &str) {
    let children = ast.children(element).to_vec();
    for child in children {
        let Some(node) = ast.get_mut(child) else {
            continue;
        };
        match (&mut node.kind, attr) {
            (NodeKind::Style(block), Attr::Class) => {
                for rule in block.rules_mut() {
                    rule.selector.rename_class(base, name);
                }
            }
            (NodeKind::Style(block), Attr::Id) => {
                for rule in block.rules_mut() {
                    rule.selector.rename_id(base, name);
                }
            }
            (NodeKind::Script(block), Attr::Class) => block.rename_class(base, name),
            (NodeKind::Script(block), Attr::Id) => block.rename_id(base, name),
            _ => {}
        }
    }
}

/// The selector `&` stands for on `node`, or `None` when the element has
/// neither a class nor an id.
pub fn context_selector(node: &Node, side: ContextSide) -> Option<String> {
    let class = node.first_class().map(|c| format!(".{c}"));
    let id = node.id().map(|i| format!("#{i}"));
    match side {
        ContextSide::Style => class.or(id),
        ContextSide::Script => id.or(class),
    }
}
