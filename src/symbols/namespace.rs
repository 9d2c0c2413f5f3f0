//! Namespace bookkeeping.
//!
//! Namespaces are identified by dotted paths (`ui.forms`). Re-declaring a
//! path merges into the existing namespace; declaring the same simple name
//! under a different parent is reported as a conflict.

use indexmap::IndexMap;

/// A declared namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceEntry {
    pub path: String,
    pub name: String,
    pub parent: Option<String>,
    /// How many `[Namespace]` blocks contributed to this namespace.
    pub declarations: usize,
}

/// Outcome of declaring a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceEvent {
    Created,
    /// The path already existed; declarations are merged into it.
    Merged,
    /// Created, but another namespace with the same simple name exists
    /// under a different parent.
    Conflict { existing: String },
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    entries: IndexMap<String, NamespaceEntry>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` inside `parent` (empty for global). Returns the full
    /// path and what happened.
    pub fn declare(&mut self, parent: &str, name: &str) -> (String, NamespaceEvent) {
        let path = join(parent, name);
        if let Some(entry) = self.entries.get_mut(&path) {
            entry.declarations += 1;
            return (path, NamespaceEvent::Merged);
        }
        let existing = self
            .entries
            .values()
            .find(|e| e.name == name)
            .map(|e| e.path.clone());
        self.entries.insert(
            path.clone(),
            NamespaceEntry {
                path: path.clone(),
                name: name.to_string(),
                parent: (!parent.is_empty()).then(|| parent.to_string()),
                declarations: 1,
            },
        );
        let event = match existing {
            Some(existing) => NamespaceEvent::Conflict { existing },
            None => NamespaceEvent::Created,
        };
        (path, event)
    }

    pub fn get(&self, path: &str) -> Option<&NamespaceEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamespaceEntry> {
        self.entries.values()
    }
}

/// Join a parent path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// `path` followed by each enclosing namespace, ending with the global
/// scope: `a.b` gives `["a.b", "a", ""]`.
pub fn scope_chain(path: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = path;
    while !current.is_empty() {
        chain.push(current.to_string());
        current = current.rsplit_once('.').map_or("", |(parent, _)| parent);
    }
    chain.push(String::new());
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_creates_then_merges() {
        let mut table = NamespaceTable::new();
        assert_eq!(table.declare("", "ui"), ("ui".to_string(), NamespaceEvent::Created));
        assert_eq!(table.declare("", "ui"), ("ui".to_string(), NamespaceEvent::Merged));
        assert_eq!(table.get("ui").unwrap().declarations, 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn nested_paths() {
        let mut table = NamespaceTable::new();
        table.declare("", "ui");
        let (path, event) = table.declare("ui", "forms");
        assert_eq!(path, "ui.forms");
        assert_eq!(event, NamespaceEvent::Created);
        assert_eq!(table.get("ui.forms").unwrap().parent.as_deref(), Some("ui"));
    }

    #[test]
    fn same_simple_name_under_other_parent_conflicts() {
        let mut table = NamespaceTable::new();
        table.declare("a", "x");
        let (_, event) = table.declare("b", "x");
        assert_eq!(
            event,
            NamespaceEvent::Conflict {
                existing: "a.x".into()
            }
        );
        assert!(table.contains("b.x"));
    }

    #[test]
    fn scope_chain_walks_outward() {
        assert_eq!(scope_chain("a.b"), vec!["a.b", "a", ""]);
        assert_eq!(scope_chain(""), vec![""]);
    }

    #[test]
    fn join_paths() {
        assert_eq!(join("", "ui"), "ui");
        assert_eq!(join("ui", "forms"), "ui.forms");
    }
}
