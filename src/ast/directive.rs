//! Payloads for origin blocks, imports, `use` statements and `except`
//! constraints.

use std::fmt;

use super::usage::{DefinitionKind, DefinitionType};
use crate::lexer::AtType;

/// Output channel of an `[Origin]` block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OriginType {
    Html,
    Style,
    JavaScript,
    /// User-defined types such as `@Vue`; emitted like `@Html`.
    Custom(String),
}

impl OriginType {
    pub fn from_at(at: &AtType) -> Self {
        match at {
            AtType::Html => Self::Html,
            AtType::Style => Self::Style,
            AtType::JavaScript => Self::JavaScript,
            other => Self::Custom(other.to_string().trim_start_matches('@').to_string()),
        }
    }
}

impl fmt::Display for OriginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html => f.write_str("@Html"),
            Self::Style => f.write_str("@Style"),
            Self::JavaScript => f.write_str("@JavaScript"),
            Self::Custom(name) => write!(f, "@{name}"),
        }
    }
}

/// `[Origin] @Type [name] { raw }` or the reference form
/// `[Origin] @Type name;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginBlock {
    pub ty: OriginType,
    pub name: Option<String>,
    /// `None` for the reference form.
    pub content: Option<String>,
}

/// `[Import] <target> from <path> [as <alias>];`, recorded but not loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Target as written, e.g. `@Chtl` or `[Custom] @Element Box`.
    pub target: String,
    pub path: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseTarget {
    /// `use html5;`
    Html5,
    /// `use @Config Name;`
    Config(String),
}

/// One entry of an `except` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintTarget {
    /// A tag name: `except span;`
    Tag(String),
    /// A definition, or a whole category when `name` is `None`:
    /// `except [Custom] @Element Box;`, `except [Template];`
    Definition {
        kind: Option<DefinitionKind>,
        ty: Option<DefinitionType>,
        name: Option<String>,
    },
    /// A raw embedding type: `except @Html;`
    Origin(OriginType),
}

impl fmt::Display for ConstraintTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => f.write_str(tag),
            Self::Definition { kind, ty, name } => {
                let mut parts = Vec::new();
                if let Some(kind) = kind {
                    parts.push(kind.to_string());
                }
                if let Some(ty) = ty {
                    parts.push(ty.to_string());
                }
                if let Some(name) = name {
                    parts.push(name.clone());
                }
                f.write_str(&parts.join(" "))
            }
            Self::Origin(ty) => write!(f, "{ty}"),
        }
    }
}
