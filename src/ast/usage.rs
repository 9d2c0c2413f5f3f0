//! Template and custom usages, and the specialization operations that
//! refine them.

use std::fmt;

use indexmap::IndexMap;

use super::node::NodeId;
use super::value::Value;
use crate::lexer::AtType;

/// `[Template]` or `[Custom]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Template,
    Custom,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template => f.write_str("[Template]"),
            Self::Custom => f.write_str("[Custom]"),
        }
    }
}

/// What a definition produces: style properties, elements or variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionType {
    Style,
    Element,
    Var,
}

impl DefinitionType {
    pub fn from_at(at: &AtType) -> Option<Self> {
        match at {
            AtType::Style => Some(Self::Style),
            AtType::Element => Some(Self::Element),
            AtType::Var => Some(Self::Var),
            _ => None,
        }
    }
}

impl fmt::Display for DefinitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Style => f.write_str("@Style"),
            Self::Element => f.write_str("@Element"),
            Self::Var => f.write_str("@Var"),
        }
    }
}

/// Target of a delete or insert: a property name, or a tag with an
/// optional index (`div[1]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub index: Option<usize>,
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn indexed(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{index}]", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition {
    Before(Target),
    After(Target),
    Replace(Target),
    AtTop,
    AtBottom,
}

/// Payload of an insert: detached element subtrees, or properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertContent {
    Elements(Vec<NodeId>),
    Properties(IndexMap<String, Value>),
}

/// A single refinement applied to a resolved definition, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specialization {
    /// `delete color, width;` on styles, or `delete span;` on elements.
    DeleteProperty(Vec<String>),
    /// `delete div[1];`
    DeleteElement(Target),
    /// `delete @Style Base;`
    DeleteInheritance { ty: DefinitionType, name: String },
    /// `insert after div[0] { ... }`, `insert at top { ... }`, ...
    Insert {
        position: InsertPosition,
        content: InsertContent,
    },
}

/// Flat classification of a [`Specialization`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecializationKind {
    DeleteProperty,
    DeleteElement,
    DeleteInheritance,
    InsertBefore,
    InsertAfter,
    InsertReplace,
    InsertAtTop,
    InsertAtBottom,
}

impl Specialization {
    pub fn kind(&self) -> SpecializationKind {
        match self {
            Self::DeleteProperty(_) => SpecializationKind::DeleteProperty,
            Self::DeleteElement(_) => SpecializationKind::DeleteElement,
            Self::DeleteInheritance { .. } => SpecializationKind::DeleteInheritance,
            Self::Insert { position, .. } => match position {
                InsertPosition::Before(_) => SpecializationKind::InsertBefore,
                InsertPosition::After(_) => SpecializationKind::InsertAfter,
                InsertPosition::Replace(_) => SpecializationKind::InsertReplace,
                InsertPosition::AtTop => SpecializationKind::InsertAtTop,
                InsertPosition::AtBottom => SpecializationKind::InsertAtBottom,
            },
        }
    }
}

/// A reference to a definition at a usage site, e.g.
/// `[Custom] @Style Theme from ui { color: red; delete border; }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub ty: DefinitionType,
    /// Explicit `[Template]`/`[Custom]` prefix, if written.
    pub kind: Option<DefinitionKind>,
    pub name: String,
    /// Namespace path from a `from` clause.
    pub from: Option<String>,
    /// Namespace that was current at the usage site.
    pub scope: String,
    /// Values for valueless properties, and plain overrides.
    pub fills: IndexMap<String, Value>,
    pub specializations: Vec<Specialization>,
}

impl Usage {
    pub fn new(ty: DefinitionType, name: impl Into<String>) -> Self {
        Self {
            ty,
            kind: None,
            name: name.into(),
            from: None,
            scope: String::new(),
            fills: IndexMap::new(),
            specializations: Vec::new(),
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kind) = self.kind {
            write!(f, "{kind} ")?;
        }
        write!(f, "{} {}", self.ty, self.name)?;
        if let Some(from) = &self.from {
            write!(f, " from {from}")?;
        }
        Ok(())
    }
}
