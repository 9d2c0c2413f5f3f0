//! Definition records stored in the global map.

use std::fmt;

use indexmap::IndexMap;

use crate::ast::{DefinitionKind, DefinitionType, NodeId, Specialization, Usage, Value};
use crate::lexer::Span;

/// A definition name together with the namespace it was declared in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Dotted namespace path; empty for the global scope.
    pub namespace: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::new("", name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}::{}", self.namespace, self.name)
        }
    }
}

/// Identity of a definition: `[Custom] @Style ui::Theme`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefinitionKey {
    pub kind: DefinitionKind,
    pub ty: DefinitionType,
    pub name: QualifiedName,
}

impl DefinitionKey {
    pub fn new(kind: DefinitionKind, ty: DefinitionType, name: QualifiedName) -> Self {
        Self { kind, ty, name }
    }
}

impl fmt::Display for DefinitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.ty, self.name)
    }
}

/// A parent reference inside a definition body.
///
/// Both `inherit @Style Base;` (explicit) and the bare composition form
/// `@Style Base;` produce one. A composed parent may carry its own fills
/// and specializations: `@Style Base { delete color; }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inheritance {
    pub parent: Usage,
    pub explicit: bool,
}

/// A `[Template]` or `[Custom]` definition.
#[derive(Debug, Clone)]
pub struct Definition {
    pub key: DefinitionKey,
    /// Style properties or variables, in declaration order.
    pub properties: IndexMap<String, Value>,
    /// Detached element subtrees for `@Element` definitions.
    pub elements: Vec<NodeId>,
    pub inherits: Vec<Inheritance>,
    /// `delete`/`insert` operations, `[Custom]` only.
    pub specializations: Vec<Specialization>,
    /// Properties declared without a value, `[Custom] @Style` only.
    pub valueless: Vec<String>,
    pub span: Span,
    /// Set once inheritance and specialization have been applied.
    pub resolved: bool,
    /// Set while resolution of this definition is on the stack.
    pub in_progress: bool,
}

impl Definition {
    pub fn new(key: DefinitionKey, span: Span) -> Self {
        Self {
            key,
            properties: IndexMap::new(),
            elements: Vec::new(),
            inherits: Vec::new(),
            specializations: Vec::new(),
            valueless: Vec::new(),
            span,
            resolved: false,
            in_progress: false,
        }
    }

    pub fn kind(&self) -> DefinitionKind {
        self.key.kind
    }

    pub fn ty(&self) -> DefinitionType {
        self.key.ty
    }

    pub fn name(&self) -> &QualifiedName {
        &self.key.name
    }

    pub fn is_custom(&self) -> bool {
        self.key.kind == DefinitionKind::Custom
    }
}
