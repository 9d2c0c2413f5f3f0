//! Variable group references: `Theme(primary)` and `Theme(primary = red)`.

use tracing::trace;

use super::{ResolveError, Resolver};
use crate::ast::{DefinitionType, Value, ValuePart, VarRef};

/// How deep variable values may refer to other variables.
const MAX_VAR_DEPTH: usize = 16;

impl Resolver<'_> {
    /// Render `value` to text, substituting every known variable reference.
    /// Unknown groups keep their source text, since CSS functions share the
    /// syntax.
    pub fn render_value(&mut self, value: &Value) -> Result<String, ResolveError> {
        self.render_value_at(value, 0)
    }

    fn render_value_at(&mut self, value: &Value, depth: usize) -> Result<String, ResolveError> {
        let mut out = String::new();
        for part in &value.parts {
            match part {
                ValuePart::Text(text) => out.push_str(text),
                ValuePart::Var(var) => match self.resolve_var_at(var, depth)? {
                    Some(text) => out.push_str(&text),
                    None => out.push_str(&var.raw),
                },
            }
        }
        Ok(out.trim().to_string())
    }

    /// The value of one variable reference, or `None` when the group is
    /// not a `@Var` definition.
    pub fn resolve_var(&mut self, var: &VarRef) -> Result<Option<String>, ResolveError> {
        self.resolve_var_at(var, 0)
    }

    fn resolve_var_at(&mut self, var: &VarRef, depth: usize) -> Result<Option<String>, ResolveError> {
        let Some(key) = self
            .map
            .lookup_key(&var.group, DefinitionType::Var, None, &var.scope)
        else {
            return Ok(None);
        };
        self.resolve(&key)?;
        let Some(definition) = self.map.definition(&key) else {
            return Ok(None);
        };
        let is_custom = definition.is_custom();
        let Some(value) = definition.properties.get(&var.name).cloned() else {
            self.warn(format!("{key} has no variable '{}'", var.name));
            return Ok(None);
        };

        if let Some(override_value) = &var.override_value {
            if is_custom {
                trace!(var = %var.raw, "variable override");
                return Ok(Some(override_value.clone()));
            }
            self.warn(format!(
                "{}: template variables cannot be overridden; keeping the defined value",
                var.raw
            ));
        }
        if depth >= MAX_VAR_DEPTH {
            self.warn(format!("{}: variable references nest too deeply", var.raw));
            return Ok(None);
        }
        self.render_value_at(&value, depth + 1).map(Some)
    }
}
