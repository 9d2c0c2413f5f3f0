//! Style blocks: inline declarations and CSS rules.

use indexmap::IndexMap;

use super::Generator;
use crate::ast::{DefinitionType, StyleBlock, StyleItem, StyleRule, Usage};
use crate::lexer::Span;

/// `name:value;` for each declaration, in order.
pub(super) fn declarations(properties: &IndexMap<String, String>) -> String {
    properties
        .iter()
        .map(|(name, value)| format!("{name}:{value};"))
        .collect()
}

impl Generator<'_> {
    /// Process an element's local style blocks. Rules go to the global
    /// stylesheet with `&` bound to `context`; the returned map holds the
    /// inline declarations, later ones overriding earlier ones.
    pub(super) fn generate_local_styles(
        &mut self,
        blocks: &[StyleBlock],
        context: Option<&str>,
        span: Span,
    ) -> IndexMap<String, String> {
        let mut inline = IndexMap::new();
        for block in blocks {
            for item in &block.items {
                match item {
                    StyleItem::Property(property) => {
                        let value = self.render_value(&property.value, span);
                        inline.insert(property.name.clone(), value);
                    }
                    StyleItem::Usage(usage) => self.expand_style_usage(usage, span, &mut inline),
                    StyleItem::Rule(rule) => {
                        let css = self.render_rule(rule, context, span);
                        self.css.push(css);
                    }
                    StyleItem::Raw(raw) => self.css.push(raw.clone()),
                }
            }
        }
        inline
    }

    /// A `style` block at document level: only rules and raw CSS apply.
    pub(super) fn generate_global_style(&mut self, block: &StyleBlock, span: Span) {
        for item in &block.items {
            match item {
                StyleItem::Rule(rule) => {
                    let css = self.render_rule(rule, None, span);
                    self.css.push(css);
                }
                StyleItem::Raw(raw) => self.css.push(raw.clone()),
                StyleItem::Property(property) => self.warn(
                    span,
                    format!("property '{}' in a global style block has no selector", property.name),
                ),
                StyleItem::Usage(usage) => self.warn(
                    span,
                    format!("{usage} in a global style block has no selector"),
                ),
            }
        }
    }

    fn render_rule(&mut self, rule: &StyleRule, context: Option<&str>, span: Span) -> String {
        let mut properties = IndexMap::new();
        for item in &rule.items {
            match item {
                StyleItem::Property(property) => {
                    let value = self.render_value(&property.value, span);
                    properties.insert(property.name.clone(), value);
                }
                StyleItem::Usage(usage) => self.expand_style_usage(usage, span, &mut properties),
                StyleItem::Rule(_) | StyleItem::Raw(_) => {
                    self.warn(span, format!("nested rule in '{}' is ignored", rule.selector));
                }
            }
        }
        format!("{}{{{}}}", rule.selector.render(context), declarations(&properties))
    }

    fn expand_style_usage(
        &mut self,
        usage: &Usage,
        span: Span,
        out: &mut IndexMap<String, String>,
    ) {
        if usage.ty != DefinitionType::Style {
            self.warn(span, format!("{usage} cannot be used in a style block"));
            return;
        }
        let Some(resolved) = self.instantiate(usage, span) else {
            return;
        };
        for (name, value) in &resolved.properties {
            let value = self.render_value(value, span);
            out.insert(name.clone(), value);
        }
    }
}
