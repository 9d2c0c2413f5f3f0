//! Inheritance and specialization resolution.
//!
//! A definition is resolved once, on first use: its parents are resolved
//! and merged in declaration order, then its own `delete`/`insert`
//! operations are applied in source order. The result replaces the
//! definition's body in the [`GlobalMap`] and the `resolved` flag makes
//! every later request a no-op.
//!
//! Usage sites never see the stored definition directly. [`Resolver::instantiate`]
//! hands out a [`Resolved`] copy with cloned element subtrees, so fills and
//! usage-level specializations cannot leak back into the definition.

mod specialize;
mod vars;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::ast::{Ast, DefinitionType, NodeId, Specialization, Usage, Value};
use crate::symbols::{DefinitionKey, GlobalMap, Inheritance};

/// Errors raised while resolving definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A definition (indirectly) inherits from itself. The chain starts and
    /// ends with the same name.
    #[error("cyclic inheritance: {}", cycle.join(" -> "))]
    CyclicInheritance { cycle: Vec<String> },

    #[error("undefined {kind} '{name}'")]
    UndefinedReference { kind: String, name: String },
}

/// The final content of a definition as seen by one usage site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub ty: DefinitionType,
    pub properties: IndexMap<String, Value>,
    /// Detached element subtrees, owned by the caller.
    pub elements: Vec<NodeId>,
    /// Properties still waiting for a value.
    pub valueless: Vec<String>,
}

impl Resolved {
    fn new(ty: DefinitionType) -> Self {
        Self {
            ty,
            properties: IndexMap::new(),
            elements: Vec::new(),
            valueless: Vec::new(),
        }
    }
}

/// Resolution engine over one compilation unit's map and tree.
pub struct Resolver<'a> {
    map: &'a mut GlobalMap,
    ast: &'a mut Ast,
    /// Keys currently being resolved, outermost first.
    stack: Vec<DefinitionKey>,
    warnings: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(map: &'a mut GlobalMap, ast: &'a mut Ast) -> Self {
        Self {
            map,
            ast,
            stack: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    /// Resolve the definition stored under `key`, in place.
    pub fn resolve(&mut self, key: &DefinitionKey) -> Result<(), ResolveError> {
        trace!(key = %key, "resolve");
        let Some(definition) = self.map.definition(key) else {
            return Err(undefined(key.ty, &key.name.to_string()));
        };
        if definition.resolved {
            return Ok(());
        }
        if definition.in_progress {
            let start = self.stack.iter().position(|k| k == key).unwrap_or(0);
            let mut cycle: Vec<String> = self.stack[start..]
                .iter()
                .map(|k| k.name.to_string())
                .collect();
            cycle.push(key.name.to_string());
            return Err(ResolveError::CyclicInheritance { cycle });
        }

        self.set_in_progress(key, true);
        self.stack.push(key.clone());
        let result = self.resolve_body(key);
        self.stack.pop();
        self.set_in_progress(key, false);

        let resolved = result?;
        if let Some(definition) = self.map.definition_mut(key) {
            definition.properties = resolved.properties;
            definition.elements = resolved.elements;
            definition.valueless = resolved.valueless;
            definition.resolved = true;
        }
        debug!(key = %key, "resolved definition");
        Ok(())
    }

    fn set_in_progress(&mut self, key: &DefinitionKey, value: bool) {
        if let Some(definition) = self.map.definition_mut(key) {
            definition.in_progress = value;
        }
    }

    fn resolve_body(&mut self, key: &DefinitionKey) -> Result<Resolved, ResolveError> {
        let Some(definition) = self.map.definition(key) else {
            return Err(undefined(key.ty, &key.name.to_string()));
        };
        let mut inherits: Vec<Inheritance> = definition.inherits.clone();
        let specializations = definition.specializations.clone();
        let own_properties = definition.properties.clone();
        let own_elements = definition.elements.clone();
        let own_valueless = definition.valueless.clone();
        let namespace = key.name.namespace.clone();

        // `delete @Style Base;` drops the parent before anything is merged.
        for spec in &specializations {
            if let Specialization::DeleteInheritance { ty, name } = spec {
                let before = inherits.len();
                inherits.retain(|i| !(i.parent.ty == *ty && i.parent.name == *name));
                if inherits.len() == before {
                    self.warn(format!("{key}: no inherited {ty} '{name}' to delete"));
                }
            }
        }

        let mut state = Resolved::new(key.ty);
        let mut inherited_elements = Vec::new();
        for inheritance in &inherits {
            let form = if inheritance.explicit { "inherits" } else { "composes" };
            trace!(%key, parent = %inheritance.parent, form, "merging parent");
            let parent = match self.instantiate_parent(&inheritance.parent, &namespace) {
                Ok(parent) => parent,
                Err(ResolveError::UndefinedReference { kind, name }) => {
                    self.warn(format!("{key}: {form} undefined {kind} '{name}'"));
                    continue;
                }
                Err(error) => return Err(error),
            };
            for (name, value) in parent.properties {
                state.properties.insert(name, value);
            }
            for name in parent.valueless {
                if !state.valueless.contains(&name) {
                    state.valueless.push(name);
                }
            }
            inherited_elements.extend(parent.elements);
        }

        for (name, value) in own_properties {
            state.properties.insert(name, value);
        }
        for name in own_valueless {
            if !state.valueless.contains(&name) {
                state.valueless.push(name);
            }
        }
        state
            .valueless
            .retain(|name| !state.properties.contains_key(name));
        state.elements = own_elements;
        state.elements.extend(inherited_elements);

        let context = key.to_string();
        for spec in &specializations {
            if !matches!(spec, Specialization::DeleteInheritance { .. }) {
                self.apply(&mut state, spec, &context);
            }
        }
        Ok(state)
    }

    /// A parent referenced from a definition body: resolved and cloned,
    /// with its own fills and specializations applied. Unfilled valueless
    /// properties carry over to the child.
    fn instantiate_parent(&mut self, usage: &Usage, namespace: &str) -> Result<Resolved, ResolveError> {
        let mut usage = usage.clone();
        if usage.from.is_none() && usage.scope.is_empty() {
            usage.scope = namespace.to_string();
        }
        self.instantiate_usage(&usage)
    }

    /// Content for a usage site: the resolved definition, cloned, with the
    /// usage's fills and specializations applied. Valueless properties that
    /// stay unfilled are dropped with a warning.
    pub fn instantiate(&mut self, usage: &Usage) -> Result<Resolved, ResolveError> {
        let mut resolved = self.instantiate_usage(usage)?;
        for name in std::mem::take(&mut resolved.valueless) {
            self.warn(format!("{usage}: valueless property '{name}' was not given a value"));
        }
        Ok(resolved)
    }

    fn instantiate_usage(&mut self, usage: &Usage) -> Result<Resolved, ResolveError> {
        let namespace = usage.from.as_deref().unwrap_or(usage.scope.as_str());
        let key = self
            .map
            .lookup_key(&usage.name, usage.ty, usage.kind, namespace)
            .ok_or_else(|| undefined(usage.ty, &usage.name))?;
        self.resolve(&key)?;
        let Some(definition) = self.map.definition(&key) else {
            return Err(undefined(usage.ty, &usage.name));
        };

        let mut resolved = Resolved::new(usage.ty);
        resolved.properties = definition.properties.clone();
        resolved.valueless = definition.valueless.clone();
        let is_custom = definition.is_custom();
        let elements = definition.elements.clone();
        for id in elements {
            if let Some(copy) = self.ast.clone_subtree(id) {
                resolved.elements.push(copy);
            }
        }

        for (name, value) in &usage.fills {
            resolved.valueless.retain(|n| n != name);
            resolved.properties.insert(name.clone(), value.clone());
        }

        if !usage.specializations.is_empty() {
            if is_custom {
                let context = usage.to_string();
                for spec in &usage.specializations {
                    self.apply(&mut resolved, spec, &context);
                }
            } else {
                self.warn(format!(
                    "{usage}: templates cannot be specialized; ignoring delete/insert"
                ));
            }
        }
        Ok(resolved)
    }
}

fn undefined(ty: DefinitionType, name: &str) -> ResolveError {
    ResolveError::UndefinedReference {
        kind: ty.to_string(),
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DefinitionKind;
    use crate::lexer::tokenize;
    use crate::parser::{parse, ParseResult};
    use crate::symbols::QualifiedName;
    use pretty_assertions::assert_eq;

    fn setup(source: &str) -> (ParseResult, GlobalMap) {
        let mut map = GlobalMap::new();
        let result = parse(source, tokenize(source).unwrap(), &mut map);
        assert!(result.success, "{:?}", result.error);
        (result, map)
    }

    fn key(kind: DefinitionKind, ty: DefinitionType, name: &str) -> DefinitionKey {
        DefinitionKey::new(kind, ty, QualifiedName::global(name))
    }

    fn props(map: &GlobalMap, key: &DefinitionKey) -> Vec<(String, String)> {
        map.definition(key)
            .unwrap()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn child_properties_win() {
        let (mut result, mut map) = setup(
            "[Template] @Style A { color: red; size: 1; }\n\
             [Template] @Style B { inherit @Style A; color: blue; }",
        );
        let b = key(DefinitionKind::Template, DefinitionType::Style, "B");
        Resolver::new(&mut map, &mut result.ast).resolve(&b).unwrap();
        assert_eq!(props(&map, &b), pairs(&[("color", "blue"), ("size", "1")]));
    }

    #[test]
    fn later_parent_wins_over_earlier() {
        let (mut result, mut map) = setup(
            "[Template] @Style A { color: red; }\n\
             [Template] @Style B { color: green; }\n\
             [Template] @Style C { @Style A; @Style B; }",
        );
        let c = key(DefinitionKind::Template, DefinitionType::Style, "C");
        Resolver::new(&mut map, &mut result.ast).resolve(&c).unwrap();
        assert_eq!(props(&map, &c), pairs(&[("color", "green")]));
    }

    #[test]
    fn resolution_is_idempotent() {
        let (mut result, mut map) = setup(
            "[Template] @Style A { color: red; }\n\
             [Custom] @Style B { @Style A; width: 1px; insert at top { z-index: 2; } }",
        );
        let b = key(DefinitionKind::Custom, DefinitionType::Style, "B");
        let mut resolver = Resolver::new(&mut map, &mut result.ast);
        resolver.resolve(&b).unwrap();
        resolver.resolve(&b).unwrap();
        assert_eq!(
            props(&map, &b),
            pairs(&[("z-index", "2"), ("color", "red"), ("width", "1px")])
        );
    }

    #[test]
    fn cycle_is_reported_with_chain() {
        let (mut result, mut map) = setup(
            "[Template] @Style A { inherit @Style B; }\n\
             [Template] @Style B { inherit @Style A; }",
        );
        let a = key(DefinitionKind::Template, DefinitionType::Style, "A");
        let err = Resolver::new(&mut map, &mut result.ast)
            .resolve(&a)
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::CyclicInheritance {
                cycle: vec!["A".into(), "B".into(), "A".into()]
            }
        );
        assert_eq!(err.to_string(), "cyclic inheritance: A -> B -> A");
        // Flags are cleared so a later attempt fails the same way.
        assert!(!map.definition(&a).unwrap().in_progress);
    }

    #[test]
    fn self_inheritance_is_a_cycle() {
        let (mut result, mut map) = setup("[Template] @Style A { inherit @Style A; }");
        let a = key(DefinitionKind::Template, DefinitionType::Style, "A");
        let err = Resolver::new(&mut map, &mut result.ast)
            .resolve(&a)
            .unwrap_err();
        assert!(matches!(err, ResolveError::CyclicInheritance { cycle } if cycle == vec!["A", "A"]));
    }

    #[test]
    fn undefined_parent_is_a_warning() {
        let (mut result, mut map) = setup("[Template] @Style A { inherit @Style Missing; color: red; }");
        let a = key(DefinitionKind::Template, DefinitionType::Style, "A");
        let mut resolver = Resolver::new(&mut map, &mut result.ast);
        resolver.resolve(&a).unwrap();
        assert_eq!(resolver.warnings().len(), 1);
    }

    #[test]
    fn delete_inheritance_drops_parent() {
        let (mut result, mut map) = setup(
            "[Template] @Style A { color: red; }\n\
             [Custom] @Style B { @Style A; width: 1px; delete @Style A; }",
        );
        let b = key(DefinitionKind::Custom, DefinitionType::Style, "B");
        Resolver::new(&mut map, &mut result.ast).resolve(&b).unwrap();
        assert_eq!(props(&map, &b), pairs(&[("width", "1px")]));
    }

    #[test]
    fn element_inheritance_appends_clones() {
        let (mut result, mut map) = setup(
            "[Template] @Element Base { span { } }\n\
             [Template] @Element Card { @Element Base; div { } }",
        );
        let card = key(DefinitionKind::Template, DefinitionType::Element, "Card");
        let base = key(DefinitionKind::Template, DefinitionType::Element, "Base");
        Resolver::new(&mut map, &mut result.ast).resolve(&card).unwrap();
        let elements = map.definition(&card).unwrap().elements.clone();
        let tags: Vec<_> = elements
            .iter()
            .map(|id| result.ast.get(*id).unwrap().name.clone())
            .collect();
        assert_eq!(tags, vec!["div", "span"]);
        // The inherited span is a copy, not the parent's node.
        assert!(!map.definition(&base).unwrap().elements.contains(&elements[1]));
    }

    #[test]
    fn instantiate_fills_valueless_and_warns_on_missing() {
        let (mut result, mut map) = setup("[Custom] @Style Text { color, size; margin: 0; }");
        let mut usage = Usage::new(DefinitionType::Style, "Text");
        usage.fills.insert("color".into(), Value::literal("red"));
        let mut resolver = Resolver::new(&mut map, &mut result.ast);
        let resolved = resolver.instantiate(&usage).unwrap();
        let keys: Vec<_> = resolved.properties.keys().cloned().collect();
        assert_eq!(keys, vec!["margin", "color"]);
        assert_eq!(resolver.warnings().len(), 1);
        assert!(resolver.warnings()[0].contains("size"));
    }

    #[test]
    fn valueless_carries_through_inheritance() {
        let (mut result, mut map) = setup(
            "[Custom] @Style Base { color; }\n\
             [Custom] @Style Child { @Style Base; width: 1px; }",
        );
        let child = key(DefinitionKind::Custom, DefinitionType::Style, "Child");
        Resolver::new(&mut map, &mut result.ast).resolve(&child).unwrap();
        assert_eq!(map.definition(&child).unwrap().valueless, vec!["color"]);
    }

    #[test]
    fn template_usage_ignores_specialization() {
        let (mut result, mut map) = setup("[Template] @Style T { color: red; }");
        let mut usage = Usage::new(DefinitionType::Style, "T");
        usage
            .specializations
            .push(Specialization::DeleteProperty(vec!["color".into()]));
        let mut resolver = Resolver::new(&mut map, &mut result.ast);
        let resolved = resolver.instantiate(&usage).unwrap();
        assert!(resolved.properties.contains_key("color"));
        assert_eq!(resolver.warnings().len(), 1);
    }

    #[test]
    fn undefined_parent_warning_names_the_inheritance_form() {
        let (mut result, mut map) = setup(
            "[Template] @Style A { inherit @Style Missing; color: red; }\n\
             [Template] @Style B { @Style Gone; }",
        );
        let a = key(DefinitionKind::Template, DefinitionType::Style, "A");
        let b = key(DefinitionKind::Template, DefinitionType::Style, "B");
        let mut resolver = Resolver::new(&mut map, &mut result.ast);
        resolver.resolve(&a).unwrap();
        resolver.resolve(&b).unwrap();
        let warnings = resolver.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("inherits undefined @Style 'Missing'"), "{warnings:?}");
        assert!(warnings[1].contains("composes undefined @Style 'Gone'"), "{warnings:?}");
    }

    #[test]
    fn undefined_usage_is_an_error() {
        let (mut result, mut map) = setup("");
        let usage = Usage::new(DefinitionType::Element, "Nope");
        let err = Resolver::new(&mut map, &mut result.ast)
            .instantiate(&usage)
            .unwrap_err();
        assert_eq!(err.to_string(), "undefined @Element 'Nope'");
    }

    #[test]
    fn namespaced_lookup_from_usage() {
        let (mut result, mut map) = setup(
            "[Namespace] ui { [Template] @Style Box { color: red; } }\n\
             [Template] @Style Box { color: blue; }",
        );
        let mut usage = Usage::new(DefinitionType::Style, "Box");
        usage.from = Some("ui".into());
        let resolved = Resolver::new(&mut map, &mut result.ast)
            .instantiate(&usage)
            .unwrap();
        assert_eq!(resolved.properties["color"].to_string(), "red");
    }
}
