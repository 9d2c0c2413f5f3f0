//! Style block model: properties, selector rules and template usages.

use std::fmt;

use super::usage::Usage;
use super::value::Value;

/// A single selector component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorComponent {
    /// Class selector: `.classname`.
    Class(String),
    /// ID selector: `#id`.
    Id(String),
    /// Context reference `&` with its pseudo suffix (`:hover`, `::before`
    /// or empty).
    Context(String),
    /// Anything else, kept verbatim (tags, pseudo-classes, combinators,
    /// whitespace).
    Raw(String),
}

/// A selector as a flat sequence of components.
///
/// For example, `&:hover > .item` is `[Context(":hover"), Raw(" > "), Class("item")]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    pub components: Vec<SelectorComponent>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, component: SelectorComponent) {
        if let (SelectorComponent::Raw(text), Some(SelectorComponent::Raw(last))) =
            (&component, self.components.last_mut())
        {
            last.push_str(text);
            return;
        }
        self.components.push(component);
    }

    /// Class name that leads the selector, e.g. `box` for `.box:hover`.
    pub fn leading_class(&self) -> Option<&str> {
        match self.components.first() {
            Some(SelectorComponent::Class(name)) => Some(name),
            _ => None,
        }
    }

    /// ID that leads the selector.
    pub fn leading_id(&self) -> Option<&str> {
        match self.components.first() {
            Some(SelectorComponent::Id(name)) => Some(name),
            _ => None,
        }
    }

    pub fn has_context(&self) -> bool {
        self.components
            .iter()
            .any(|c| matches!(c, SelectorComponent::Context(_)))
    }

    /// Rename every `.from` component to `.to`.
    pub fn rename_class(&mut self, from: &str, to: &str) {
        for component in &mut self.components {
            if let SelectorComponent::Class(name) = component {
                if name == from {
                    *name = to.to_string();
                }
            }
        }
    }

    /// Rename every `#from` component to `#to`.
    pub fn rename_id(&mut self, from: &str, to: &str) {
        for component in &mut self.components {
            if let SelectorComponent::Id(name) = component {
                if name == from {
                    *name = to.to_string();
                }
            }
        }
    }

    /// Render with `&` replaced by `context`. Without a context the `&` is
    /// kept literally.
    pub fn render(&self, context: Option<&str>) -> String {
        let mut out = String::new();
        for component in &self.components {
            match component {
                SelectorComponent::Class(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                SelectorComponent::Id(name) => {
                    out.push('#');
                    out.push_str(name);
                }
                SelectorComponent::Context(suffix) => {
                    out.push_str(context.unwrap_or("&"));
                    out.push_str(suffix);
                }
                SelectorComponent::Raw(text) => out.push_str(text),
            }
        }
        out.trim().to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

/// A single property declaration, e.g. `color: red`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: Value,
}

impl Property {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A selector rule inside a style block: `.box { width: 10px; }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: Selector,
    pub items: Vec<StyleItem>,
}

/// One entry of a style block or rule body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleItem {
    Property(Property),
    Rule(StyleRule),
    /// `@Style Name;` with optional fills and specialization.
    Usage(Usage),
    /// Verbatim CSS such as an `@media` block.
    Raw(String),
}

/// A `style { ... }` block, local to an element or global.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleBlock {
    pub items: Vec<StyleItem>,
}

impl StyleBlock {
    pub fn rules(&self) -> impl Iterator<Item = &StyleRule> {
        self.items.iter().filter_map(|item| match item {
            StyleItem::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    pub fn rules_mut(&mut self) -> impl Iterator<Item = &mut StyleRule> {
        self.items.iter_mut().filter_map(|item| match item {
            StyleItem::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    /// First class that leads a rule selector, in source order.
    pub fn first_class(&self) -> Option<&str> {
        self.rules().find_map(|r| r.selector.leading_class())
    }

    /// First ID that leads a rule selector, in source order.
    pub fn first_id(&self) -> Option<&str> {
        self.rules().find_map(|r| r.selector.leading_id())
    }
}
