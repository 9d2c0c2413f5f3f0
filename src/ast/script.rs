//! Script block model.
//!
//! Script bodies are opaque JavaScript. Only a small whitelist of CHTL
//! constructs is recognized inside them; everything else is carried as
//! [`ScriptPart::Code`] byte-for-byte.

use super::directive::OriginType;
use super::value::VarRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptPart {
    Code(String),
    /// `{{&}}`
    ContextRef,
    /// `{{.name}}`
    Class(String),
    /// `{{#name}}`
    Id(String),
    /// `Group(name)` for a variable group.
    Var(VarRef),
    /// `[Origin] @JavaScript name;`
    Origin { ty: OriginType, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptBlock {
    pub parts: Vec<ScriptPart>,
}

impl ScriptBlock {
    pub fn push_code(&mut self, code: &str) {
        if code.is_empty() {
            return;
        }
        if let Some(ScriptPart::Code(last)) = self.parts.last_mut() {
            last.push_str(code);
        } else {
            self.parts.push(ScriptPart::Code(code.to_string()));
        }
    }

    /// First `{{.name}}` in source order.
    pub fn first_class(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            ScriptPart::Class(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// First `{{#name}}` in source order.
    pub fn first_id(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            ScriptPart::Id(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn rename_class(&mut self, from: &str, to: &str) {
        for part in &mut self.parts {
            if let ScriptPart::Class(name) = part {
                if name == from {
                    *name = to.to_string();
                }
            }
        }
    }

    pub fn rename_id(&mut self, from: &str, to: &str) {
        for part in &mut self.parts {
            if let ScriptPart::Id(name) = part {
                if name == from {
                    *name = to.to_string();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_code_merges() {
        let mut block = ScriptBlock::default();
        block.push_code("let a = 1;");
        block.push_code("\nlet b = 2;");
        assert_eq!(block.parts.len(), 1);
    }

    #[test]
    fn first_selectors_and_rename() {
        let mut block = ScriptBlock {
            parts: vec![
                ScriptPart::Code("const el = ".into()),
                ScriptPart::Class("box".into()),
                ScriptPart::Id("main".into()),
                ScriptPart::Class("box".into()),
            ],
        };
        assert_eq!(block.first_class(), Some("box"));
        assert_eq!(block.first_id(), Some("main"));
        block.rename_class("box", "box1");
        assert_eq!(block.first_class(), Some("box1"));
        assert!(matches!(&block.parts[3], ScriptPart::Class(n) if n == "box1"));
    }
}
