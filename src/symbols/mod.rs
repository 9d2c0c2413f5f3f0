//! The global map: every named thing a document declares.
//!
//! Definitions are registered while parsing and looked up by later phases.
//! Registration is first-writer-wins; lookups walk outward from a namespace
//! to the global scope, and prefer `[Custom]` over `[Template]` when the
//! usage does not say which it means.

pub mod definition;
pub mod namespace;

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::trace;

use crate::ast::{DefinitionKind, DefinitionType, ImportSpec, OriginType};
use crate::config::Config;

pub use definition::{Definition, DefinitionKey, Inheritance, QualifiedName};
pub use namespace::{NamespaceEntry, NamespaceEvent, NamespaceTable};

/// A named `[Origin]` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginEntry {
    pub ty: OriginType,
    pub name: QualifiedName,
    pub content: String,
}

/// Symbol table shared by the parser, resolver and generator.
#[derive(Debug, Clone, Default)]
pub struct GlobalMap {
    templates: HashMap<DefinitionKey, Definition>,
    customs: HashMap<DefinitionKey, Definition>,
    origins: IndexMap<(OriginType, QualifiedName), OriginEntry>,
    configurations: IndexMap<String, Config>,
    imports: Vec<ImportSpec>,
    namespaces: NamespaceTable,
    namespace_stack: Vec<String>,
    config: Config,
    html5: bool,
    auto_classes: HashMap<String, usize>,
    auto_ids: HashMap<String, usize>,
}

impl GlobalMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map whose active configuration starts from `config`.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    fn table(&self, kind: DefinitionKind) -> &HashMap<DefinitionKey, Definition> {
        match kind {
            DefinitionKind::Template => &self.templates,
            DefinitionKind::Custom => &self.customs,
        }
    }

    fn table_mut(&mut self, kind: DefinitionKind) -> &mut HashMap<DefinitionKey, Definition> {
        match kind {
            DefinitionKind::Template => &mut self.templates,
            DefinitionKind::Custom => &mut self.customs,
        }
    }

    /// Add a definition. Returns `false`, leaving the existing entry
    /// untouched, when the key is already taken.
    pub fn register(&mut self, definition: Definition) -> bool {
        let table = self.table_mut(definition.key.kind);
        if table.contains_key(&definition.key) {
            return false;
        }
        trace!(key = %definition.key, "registered definition");
        table.insert(definition.key.clone(), definition);
        true
    }

    pub fn definition(&self, key: &DefinitionKey) -> Option<&Definition> {
        self.table(key.kind).get(key)
    }

    pub fn definition_mut(&mut self, key: &DefinitionKey) -> Option<&mut Definition> {
        self.table_mut(key.kind).get_mut(key)
    }

    /// Find the key of a definition visible from `namespace`.
    ///
    /// `name` may be qualified (`ui.forms::Box`), in which case only that
    /// exact name is tried. Otherwise the namespace and each enclosing one
    /// are searched, nearest first. Without an explicit `kind`, `[Custom]`
    /// wins over `[Template]` within the same scope.
    pub fn lookup_key(
        &self,
        name: &str,
        ty: DefinitionType,
        kind: Option<DefinitionKind>,
        namespace: &str,
    ) -> Option<DefinitionKey> {
        let kinds: &[DefinitionKind] = match kind {
            Some(DefinitionKind::Template) => &[DefinitionKind::Template],
            Some(DefinitionKind::Custom) => &[DefinitionKind::Custom],
            None => &[DefinitionKind::Custom, DefinitionKind::Template],
        };
        let candidates = match name.rsplit_once("::") {
            Some((ns, simple)) => vec![QualifiedName::new(ns, simple)],
            None => namespace::scope_chain(namespace)
                .into_iter()
                .map(|ns| QualifiedName::new(ns, name))
                .collect(),
        };
        candidates.into_iter().find_map(|qualified| {
            kinds.iter().find_map(|&kind| {
                let key = DefinitionKey::new(kind, ty, qualified.clone());
                self.table(kind).contains_key(&key).then_some(key)
            })
        })
    }

    /// Find a definition visible from `namespace`. See [`GlobalMap::lookup_key`].
    pub fn lookup(
        &self,
        name: &str,
        ty: DefinitionType,
        kind: Option<DefinitionKind>,
        namespace: &str,
    ) -> Option<&Definition> {
        let key = self.lookup_key(name, ty, kind, namespace)?;
        self.definition(&key)
    }

    /// All definitions, templates first.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.templates.values().chain(self.customs.values())
    }

    // -----------------------------------------------------------------------
    // Namespaces
    // -----------------------------------------------------------------------

    /// Open a namespace nested in the current one.
    pub fn enter_namespace(&mut self, name: &str) -> NamespaceEvent {
        let parent = self.current_namespace().to_string();
        let (path, event) = self.namespaces.declare(&parent, name);
        self.namespace_stack.push(path);
        event
    }

    /// Close the innermost namespace, returning its path.
    pub fn exit_namespace(&mut self) -> Option<String> {
        self.namespace_stack.pop()
    }

    /// Dotted path of the innermost open namespace; empty at global scope.
    pub fn current_namespace(&self) -> &str {
        self.namespace_stack.last().map_or("", String::as_str)
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    // -----------------------------------------------------------------------
    // Origins
    // -----------------------------------------------------------------------

    /// Register a named origin block. First writer wins.
    pub fn register_origin(&mut self, entry: OriginEntry) -> bool {
        let key = (entry.ty.clone(), entry.name.clone());
        if self.origins.contains_key(&key) {
            return false;
        }
        self.origins.insert(key, entry);
        true
    }

    /// Find a named origin visible from `namespace`.
    pub fn origin(&self, ty: &OriginType, name: &str, namespace: &str) -> Option<&OriginEntry> {
        let candidates = match name.rsplit_once("::") {
            Some((ns, simple)) => vec![QualifiedName::new(ns, simple)],
            None => namespace::scope_chain(namespace)
                .into_iter()
                .map(|ns| QualifiedName::new(ns, name))
                .collect(),
        };
        candidates
            .into_iter()
            .find_map(|qualified| self.origins.get(&(ty.clone(), qualified)))
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// The configuration currently in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Store a named `[Configuration]` block. First writer wins.
    pub fn register_configuration(&mut self, name: &str, config: Config) -> bool {
        if self.configurations.contains_key(name) {
            return false;
        }
        self.configurations.insert(name.to_string(), config);
        true
    }

    /// Make a named configuration the active one.
    pub fn activate_configuration(&mut self, name: &str) -> bool {
        match self.configurations.get(name) {
            Some(config) => {
                self.config = config.clone();
                true
            }
            None => false,
        }
    }

    pub fn configuration(&self, name: &str) -> Option<&Config> {
        self.configurations.get(name)
    }

    // -----------------------------------------------------------------------
    // Imports and document flags
    // -----------------------------------------------------------------------

    pub fn add_import(&mut self, import: ImportSpec) {
        self.imports.push(import);
    }

    pub fn imports(&self) -> &[ImportSpec] {
        &self.imports
    }

    /// Record a `use html5;` declaration.
    pub fn set_html5(&mut self) {
        self.html5 = true;
    }

    pub fn uses_html5(&self) -> bool {
        self.html5
    }

    // -----------------------------------------------------------------------
    // Automatic selector names
    // -----------------------------------------------------------------------

    /// Next class name for `base`: `base` itself on first use, then
    /// `base1`, `base2`, ...
    pub fn generate_auto_class(&mut self, base: &str) -> String {
        next_auto_name(&mut self.auto_classes, base)
    }

    /// Next id for `base`, numbered like [`GlobalMap::generate_auto_class`].
    pub fn generate_auto_id(&mut self, base: &str) -> String {
        next_auto_name(&mut self.auto_ids, base)
    }
}

fn next_auto_name(counters: &mut HashMap<String, usize>, base: &str) -> String {
    let count = counters.entry(base.to_string()).or_insert(0);
    let name = if *count == 0 {
        base.to_string()
    } else {
        format!("{base}{count}")
    };
    *count += 1;
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Span;

    fn key(kind: DefinitionKind, ty: DefinitionType, ns: &str, name: &str) -> DefinitionKey {
        DefinitionKey::new(kind, ty, QualifiedName::new(ns, name))
    }

    fn define(map: &mut GlobalMap, kind: DefinitionKind, ns: &str, name: &str) -> bool {
        map.register(Definition::new(
            key(kind, DefinitionType::Style, ns, name),
            Span::default(),
        ))
    }

    #[test]
    fn register_is_first_writer_wins() {
        let mut map = GlobalMap::new();
        assert!(define(&mut map, DefinitionKind::Template, "", "A"));
        assert!(!define(&mut map, DefinitionKind::Template, "", "A"));
        // Same name in the other table is a different definition.
        assert!(define(&mut map, DefinitionKind::Custom, "", "A"));
        assert_eq!(map.definitions().count(), 2);
    }

    #[test]
    fn lookup_prefers_custom_without_kind() {
        let mut map = GlobalMap::new();
        define(&mut map, DefinitionKind::Template, "", "A");
        define(&mut map, DefinitionKind::Custom, "", "A");
        let found = map.lookup_key("A", DefinitionType::Style, None, "").unwrap();
        assert_eq!(found.kind, DefinitionKind::Custom);
        let found = map
            .lookup_key("A", DefinitionType::Style, Some(DefinitionKind::Template), "")
            .unwrap();
        assert_eq!(found.kind, DefinitionKind::Template);
    }

    #[test]
    fn lookup_walks_outward_from_namespace() {
        let mut map = GlobalMap::new();
        define(&mut map, DefinitionKind::Template, "", "Base");
        define(&mut map, DefinitionKind::Template, "ui", "Base");
        let inner = map
            .lookup("Base", DefinitionType::Style, None, "ui.forms")
            .unwrap();
        assert_eq!(inner.name().namespace, "ui");
        let outer = map.lookup("Base", DefinitionType::Style, None, "").unwrap();
        assert_eq!(outer.name().namespace, "");
    }

    #[test]
    fn lookup_qualified_name_is_exact() {
        let mut map = GlobalMap::new();
        define(&mut map, DefinitionKind::Template, "ui", "Box");
        assert!(map
            .lookup("ui::Box", DefinitionType::Style, None, "")
            .is_some());
        assert!(map
            .lookup("other::Box", DefinitionType::Style, None, "ui")
            .is_none());
        assert!(map.lookup("Box", DefinitionType::Element, None, "ui").is_none());
    }

    #[test]
    fn namespace_stack() {
        let mut map = GlobalMap::new();
        assert_eq!(map.current_namespace(), "");
        assert_eq!(map.enter_namespace("ui"), NamespaceEvent::Created);
        map.enter_namespace("forms");
        assert_eq!(map.current_namespace(), "ui.forms");
        assert_eq!(map.exit_namespace().as_deref(), Some("ui.forms"));
        assert_eq!(map.current_namespace(), "ui");
        map.exit_namespace();
        assert_eq!(map.enter_namespace("ui"), NamespaceEvent::Merged);
    }

    #[test]
    fn origins_resolve_through_scopes() {
        let mut map = GlobalMap::new();
        let entry = OriginEntry {
            ty: OriginType::Html,
            name: QualifiedName::global("banner"),
            content: "<b>hi</b>".into(),
        };
        assert!(map.register_origin(entry.clone()));
        assert!(!map.register_origin(entry));
        let found = map.origin(&OriginType::Html, "banner", "ui").unwrap();
        assert_eq!(found.content, "<b>hi</b>");
        assert!(map.origin(&OriginType::Style, "banner", "").is_none());
    }

    #[test]
    fn named_configurations_activate() {
        let mut map = GlobalMap::new();
        let config = Config::new().with_index_initial_count(1);
        assert!(map.register_configuration("Std", config));
        assert!(!map.register_configuration("Std", Config::new()));
        assert_eq!(map.config().index_initial_count, 0);
        assert!(map.activate_configuration("Std"));
        assert_eq!(map.config().index_initial_count, 1);
        assert!(!map.activate_configuration("Missing"));
    }

    #[test]
    fn auto_names_count_per_base() {
        let mut map = GlobalMap::new();
        assert_eq!(map.generate_auto_class("box"), "box");
        assert_eq!(map.generate_auto_class("box"), "box1");
        assert_eq!(map.generate_auto_class("card"), "card");
        assert_eq!(map.generate_auto_class("box"), "box2");
        assert_eq!(map.generate_auto_id("box"), "box");
    }
}
