//! Syntax tree: slotmap-backed arena of [`Node`]s plus the style, script
//! and usage payloads they carry.

pub mod directive;
pub mod html;
pub mod node;
pub mod query;
pub mod script;
pub mod style;
pub mod tree;
pub mod usage;
pub mod value;

pub use directive::{ConstraintTarget, ImportSpec, OriginBlock, OriginType, UseTarget};
pub use node::{Node, NodeId, NodeKind};
pub use script::{ScriptBlock, ScriptPart};
pub use style::{Property, Selector, SelectorComponent, StyleBlock, StyleItem, StyleRule};
pub use tree::Ast;
pub use usage::{
    DefinitionKind, DefinitionType, InsertContent, InsertPosition, Specialization,
    SpecializationKind, Target, Usage,
};
pub use value::{Value, ValuePart, VarRef};
