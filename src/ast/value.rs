//! Property values: literal text interleaved with variable-group references.

use std::fmt;

/// A `Group(name)` or `Group(name = override)` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    pub group: String,
    pub name: String,
    /// Usage-site override, honored only for `[Custom] @Var` groups.
    pub override_value: Option<String>,
    /// Namespace that was current where the reference was written.
    pub scope: String,
    /// Exact source text, emitted unchanged when the group is unknown.
    pub raw: String,
}

/// One piece of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuePart {
    Text(String),
    Var(VarRef),
}

/// A property value as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Value {
    pub parts: Vec<ValuePart>,
}

impl Value {
    /// A value with no variable references.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self {
            parts: vec![ValuePart::Text(text)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn has_vars(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, ValuePart::Var(_)))
    }

    /// Append text, merging with a trailing text part.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(ValuePart::Text(last)) = self.parts.last_mut() {
            last.push_str(text);
        } else {
            self.parts.push(ValuePart::Text(text.to_string()));
        }
    }

    pub fn push_var(&mut self, var: VarRef) {
        self.parts.push(ValuePart::Var(var));
    }

    /// Iterate over the variable references.
    pub fn vars(&self) -> impl Iterator<Item = &VarRef> {
        self.parts.iter().filter_map(|p| match p {
            ValuePart::Var(v) => Some(v),
            ValuePart::Text(_) => None,
        })
    }
}

impl fmt::Display for Value {
    /// Source rendering, with references left unexpanded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                ValuePart::Text(text) => f.write_str(text)?,
                ValuePart::Var(var) => f.write_str(&var.raw)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(group: &str, name: &str) -> VarRef {
        VarRef {
            group: group.into(),
            name: name.into(),
            override_value: None,
            scope: String::new(),
            raw: format!("{group}({name})"),
        }
    }

    #[test]
    fn literal_of_empty_text_has_no_parts() {
        assert!(Value::literal("").is_empty());
        assert_eq!(Value::literal("red").to_string(), "red");
    }

    #[test]
    fn push_text_merges_adjacent_text() {
        let mut value = Value::default();
        value.push_text("1px ");
        value.push_text("solid");
        assert_eq!(value.parts.len(), 1);
    }

    #[test]
    fn display_reproduces_references() {
        let mut value = Value::literal("1px solid ");
        value.push_var(var("Theme", "border"));
        assert!(value.has_vars());
        assert_eq!(value.to_string(), "1px solid Theme(border)");
        assert_eq!(value.vars().count(), 1);
    }
}
