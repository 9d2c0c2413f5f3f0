//! Applying `delete` and `insert` operations to resolved content.
//!
//! Every miss (a property or element that is not there) is a warning and
//! leaves the content unchanged.

use indexmap::IndexMap;
use tracing::trace;

use super::{Resolved, Resolver};
use crate::ast::{
    DefinitionType, InsertContent, InsertPosition, NodeId, Specialization, Target, Value,
};

impl Resolver<'_> {
    /// Apply one operation to `state`. `context` names the definition or
    /// usage for warnings.
    pub(super) fn apply(&mut self, state: &mut Resolved, spec: &Specialization, context: &str) {
        trace!(kind = ?spec.kind(), context, "applying specialization");
        match spec {
            Specialization::DeleteProperty(names) => {
                for name in names {
                    self.delete_named(state, name, context);
                }
            }
            Specialization::DeleteElement(target) => match self.find_element(&state.elements, target) {
                Some(index) => {
                    let id = state.elements.remove(index);
                    self.ast.remove(id);
                }
                None => self.warn(format!("{context}: no element {target} to delete")),
            },
            Specialization::DeleteInheritance { ty, name } => {
                // Parents are already merged into what a usage receives.
                self.warn(format!(
                    "{context}: cannot delete inherited {ty} '{name}' at a usage site"
                ));
            }
            Specialization::Insert { position, content } => match content {
                InsertContent::Elements(nodes) if state.ty == DefinitionType::Element => {
                    self.insert_elements(state, position, nodes, context);
                }
                InsertContent::Properties(properties) if state.ty != DefinitionType::Element => {
                    insert_properties(&mut state.properties, position, properties)
                        .unwrap_or_else(|target| {
                            self.warn(format!("{context}: no property '{target}' to insert at"))
                        });
                }
                _ => self.warn(format!("{context}: insert content does not match {}", state.ty)),
            },
        }
    }

    /// `delete name;`: a property, or for element content the first
    /// element with that tag.
    fn delete_named(&mut self, state: &mut Resolved, name: &str, context: &str) {
        if state.ty == DefinitionType::Element {
            match self.find_element(&state.elements, &Target::new(name)) {
                Some(index) => {
                    let id = state.elements.remove(index);
                    self.ast.remove(id);
                }
                None => self.warn(format!("{context}: no element '{name}' to delete")),
            }
            return;
        }
        let removed = state.properties.shift_remove(name).is_some();
        let was_valueless = state.valueless.iter().any(|n| n == name);
        state.valueless.retain(|n| n != name);
        if !removed && !was_valueless {
            self.warn(format!("{context}: no property '{name}' to delete"));
        }
    }

    /// Position of `target` in `elements`. Indexes count elements with the
    /// same tag, starting from the configured initial index.
    fn find_element(&self, elements: &[NodeId], target: &Target) -> Option<usize> {
        let nth = match target.index {
            Some(index) => index.checked_sub(self.map.config().index_initial_count)?,
            None => 0,
        };
        elements
            .iter()
            .enumerate()
            .filter(|(_, id)| {
                self.ast
                    .get(**id)
                    .is_some_and(|n| n.is_element() && n.name == target.name)
            })
            .nth(nth)
            .map(|(index, _)| index)
    }

    fn insert_elements(
        &mut self,
        state: &mut Resolved,
        position: &InsertPosition,
        nodes: &[NodeId],
        context: &str,
    ) {
        let copies: Vec<NodeId> = nodes
            .iter()
            .filter_map(|id| self.ast.clone_subtree(*id))
            .collect();
        let at = match position {
            InsertPosition::AtTop => 0,
            InsertPosition::AtBottom => state.elements.len(),
            InsertPosition::Before(target)
            | InsertPosition::After(target)
            | InsertPosition::Replace(target) => {
                let Some(index) = self.find_element(&state.elements, target) else {
                    self.warn(format!("{context}: no element {target} to insert at"));
                    for id in copies {
                        self.ast.remove(id);
                    }
                    return;
                };
                match position {
                    InsertPosition::After(_) => index + 1,
                    InsertPosition::Replace(_) => {
                        let old = state.elements.remove(index);
                        self.ast.remove(old);
                        index
                    }
                    _ => index,
                }
            }
        };
        state.elements.splice(at..at, copies);
    }
}

/// Insert `properties` into `map` at `position`. Keys that already exist
/// move to the new position. Returns the missing target name on a miss.
fn insert_properties(
    map: &mut IndexMap<String, Value>,
    position: &InsertPosition,
    properties: &IndexMap<String, Value>,
) -> Result<(), String> {
    let anchor = match position {
        InsertPosition::AtTop => Some(0),
        InsertPosition::AtBottom => None,
        InsertPosition::Before(target) | InsertPosition::After(target) => {
            let index = map
                .get_index_of(&target.name)
                .ok_or_else(|| target.name.clone())?;
            match position {
                InsertPosition::After(_) => Some(index + 1),
                _ => Some(index),
            }
        }
        InsertPosition::Replace(target) => {
            let index = map
                .get_index_of(&target.name)
                .ok_or_else(|| target.name.clone())?;
            map.shift_remove_index(index);
            Some(index)
        }
    };

    let Some(mut at) = anchor else {
        for (name, value) in properties {
            map.shift_remove(name);
            map.insert(name.clone(), value.clone());
        }
        return Ok(());
    };
    for (name, value) in properties {
        if let Some(existing) = map.get_index_of(name) {
            map.shift_remove_index(existing);
            if existing < at {
                at -= 1;
            }
        }
        let at_clamped = at.min(map.len());
        map.shift_insert(at_clamped, name.clone(), value.clone());
        at = at_clamped + 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DefinitionKind;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::symbols::{DefinitionKey, GlobalMap, QualifiedName};
    use pretty_assertions::assert_eq;

    fn map_of(items: &[(&str, &str)]) -> IndexMap<String, Value> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), Value::literal(*v)))
            .collect()
    }

    fn keys(map: &IndexMap<String, Value>) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn insert_properties_positions() {
        let base = map_of(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let new = map_of(&[("x", "9")]);

        let mut map = base.clone();
        insert_properties(&mut map, &InsertPosition::AtTop, &new).unwrap();
        assert_eq!(keys(&map), vec!["x", "a", "b", "c"]);

        let mut map = base.clone();
        insert_properties(&mut map, &InsertPosition::AtBottom, &new).unwrap();
        assert_eq!(keys(&map), vec!["a", "b", "c", "x"]);

        let mut map = base.clone();
        insert_properties(&mut map, &InsertPosition::After(Target::new("a")), &new).unwrap();
        assert_eq!(keys(&map), vec!["a", "x", "b", "c"]);

        let mut map = base.clone();
        insert_properties(&mut map, &InsertPosition::Before(Target::new("c")), &new).unwrap();
        assert_eq!(keys(&map), vec!["a", "b", "x", "c"]);

        let mut map = base.clone();
        insert_properties(&mut map, &InsertPosition::Replace(Target::new("b")), &new).unwrap();
        assert_eq!(keys(&map), vec!["a", "x", "c"]);
    }

    #[test]
    fn insert_moves_existing_key() {
        let mut map = map_of(&[("a", "1"), ("b", "2"), ("c", "3")]);
        insert_properties(&mut map, &InsertPosition::AtTop, &map_of(&[("c", "4")])).unwrap();
        assert_eq!(keys(&map), vec!["c", "a", "b"]);
        assert_eq!(map["c"].to_string(), "4");
    }

    #[test]
    fn insert_missing_target() {
        let mut map = map_of(&[("a", "1")]);
        let err = insert_properties(
            &mut map,
            &InsertPosition::After(Target::new("zzz")),
            &map_of(&[("x", "1")]),
        )
        .unwrap_err();
        assert_eq!(err, "zzz");
        assert_eq!(keys(&map), vec!["a"]);
    }

    fn resolve_custom(source: &str, ty: DefinitionType, name: &str) -> (Vec<String>, Vec<String>) {
        let mut map = GlobalMap::new();
        let mut result = parse(source, tokenize(source).unwrap(), &mut map);
        assert!(result.success, "{:?}", result.error);
        let key = DefinitionKey::new(DefinitionKind::Custom, ty, QualifiedName::global(name));
        let mut resolver = Resolver::new(&mut map, &mut result.ast);
        resolver.resolve(&key).unwrap();
        let warnings = resolver.into_warnings();
        let def = map.definition(&key).unwrap();
        let names = match ty {
            DefinitionType::Element => def
                .elements
                .iter()
                .map(|id| result.ast.get(*id).unwrap().name.clone())
                .collect(),
            _ => def.properties.keys().cloned().collect(),
        };
        (names, warnings)
    }

    #[test]
    fn insert_then_delete_applies_in_order() {
        let (names, warnings) = resolve_custom(
            "[Template] @Style Base { color: red; size: 1; }\n\
             [Custom] @Style D { @Style Base; insert after color { weight: 2; } delete weight; }",
            DefinitionType::Style,
            "D",
        );
        assert_eq!(names, vec!["color", "size"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn delete_then_insert_applies_in_order() {
        let (names, _) = resolve_custom(
            "[Template] @Style Base { color: red; size: 1; }\n\
             [Custom] @Style D { @Style Base; delete color; insert at top { color: blue; } }",
            DefinitionType::Style,
            "D",
        );
        assert_eq!(names, vec!["color", "size"]);
    }

    #[test]
    fn delete_missing_property_warns() {
        let (names, warnings) = resolve_custom(
            "[Custom] @Style D { color: red; delete border; }",
            DefinitionType::Style,
            "D",
        );
        assert_eq!(names, vec!["color"]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn element_operations() {
        let (names, warnings) = resolve_custom(
            "[Custom] @Element Box {\n\
               div { } span { } div { }\n\
               delete div[1];\n\
               insert before span { p { } }\n\
               insert replace span { em { } }\n\
               insert at bottom { hr { } }\n\
             }",
            DefinitionType::Element,
            "Box",
        );
        assert_eq!(names, vec!["div", "p", "em", "hr"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn delete_bare_tag_removes_first() {
        let (names, _) = resolve_custom(
            "[Custom] @Element Box { span { id: a; } span { id: b; } delete span; }",
            DefinitionType::Element,
            "Box",
        );
        assert_eq!(names, vec!["span"]);
    }

    #[test]
    fn out_of_range_index_warns() {
        let (names, warnings) = resolve_custom(
            "[Custom] @Element Box { div { } delete div[3]; }",
            DefinitionType::Element,
            "Box",
        );
        assert_eq!(names, vec!["div"]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn index_initial_count_shifts_targets() {
        let source = "[Configuration] { INDEX_INITIAL_COUNT = 1; }\n\
                      [Custom] @Element Box { div { id: a; } div { id: b; } delete div[1]; }";
        let mut map = GlobalMap::new();
        let mut result = parse(source, tokenize(source).unwrap(), &mut map);
        let key = DefinitionKey::new(
            DefinitionKind::Custom,
            DefinitionType::Element,
            QualifiedName::global("Box"),
        );
        Resolver::new(&mut map, &mut result.ast).resolve(&key).unwrap();
        let def = map.definition(&key).unwrap();
        assert_eq!(def.elements.len(), 1);
        assert_eq!(result.ast.get(def.elements[0]).unwrap().attribute("id"), Some("b"));
    }
}
