//! Script blocks.
//!
//! Code passes through untouched. `{{&}}` becomes the owning element's
//! selector, variables are substituted and `[Origin]` references are
//! spliced in. `{{.x}}` and `{{#x}}` are kept for a runtime to interpret.

use super::{Generator, ScriptFragment};
use crate::ast::{ScriptBlock, ScriptPart};
use crate::lexer::Span;

impl Generator<'_> {
    /// Render `block` and append it to the script output. `owner` is the
    /// selector `{{&}}` stands for.
    pub(super) fn generate_script(
        &mut self,
        block: &ScriptBlock,
        owner: Option<String>,
        namespace: &str,
        span: Span,
    ) {
        let code = self.render_script(block, owner.as_deref(), namespace, span);
        if code.is_empty() {
            return;
        }
        self.js.push(code.clone());
        self.fragments.push(ScriptFragment { owner, code });
    }

    fn render_script(
        &mut self,
        block: &ScriptBlock,
        context: Option<&str>,
        namespace: &str,
        span: Span,
    ) -> String {
        let mut out = String::new();
        for part in &block.parts {
            match part {
                ScriptPart::Code(code) => out.push_str(code),
                ScriptPart::ContextRef => {
                    out.push_str("{{");
                    out.push_str(context.unwrap_or("&"));
                    out.push_str("}}");
                }
                ScriptPart::Class(name) => {
                    out.push_str("{{.");
                    out.push_str(name);
                    out.push_str("}}");
                }
                ScriptPart::Id(name) => {
                    out.push_str("{{#");
                    out.push_str(name);
                    out.push_str("}}");
                }
                ScriptPart::Var(var) => {
                    let text = self.resolve_var(var, span);
                    out.push_str(&text);
                }
                ScriptPart::Origin { ty, name } => match self.map.origin(ty, name, namespace) {
                    Some(entry) => out.push_str(&entry.content),
                    None => self.warn(span, format!("undefined origin {ty} {name}")),
                },
            }
        }
        if context.is_none() && block.parts.contains(&ScriptPart::ContextRef) {
            self.warn(span, "{{&}} has no element selector to refer to");
        }
        out.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::generator::{generate, GenerationResult, ScriptFragment};
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::symbols::GlobalMap;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> GenerationResult {
        let mut map = GlobalMap::new();
        let mut result = parse(source, tokenize(source).unwrap(), &mut map);
        assert!(result.success, "{:?}", result.error);
        generate(&mut result.ast, &mut map)
    }

    #[test]
    fn context_reference_prefers_id() {
        let out = run("div { id: x; class: c; script { {{&}}.show(); } }");
        assert_eq!(out.js, "{{#x}}.show();");
        assert_eq!(
            out.script_fragments,
            vec![ScriptFragment {
                owner: Some("#x".into()),
                code: "{{#x}}.show();".into()
            }]
        );
    }

    #[test]
    fn context_reference_falls_back_to_class() {
        let out = run("div { style { .panel { } } script { {{&}}.hide(); } }");
        assert_eq!(out.js, "{{.panel}}.hide();");
    }

    #[test]
    fn global_script_has_no_owner() {
        let out = run("script { let n = 1; }");
        assert_eq!(out.js, "let n = 1;");
        assert_eq!(out.script_fragments[0].owner, None);
    }

    #[test]
    fn selectors_are_kept() {
        let out = run("div { script { {{.box}}.addEventListener('click', f); } }");
        assert_eq!(out.js, "{{.box}}.addEventListener('click', f);");
    }

    #[test]
    fn variables_in_scripts() {
        let out = run(
            "[Template] @Var Timing { delay: 300; }\n\
             script { setTimeout(go, Timing(delay)); }",
        );
        assert_eq!(out.js, "setTimeout(go, 300);");
    }

    #[test]
    fn origin_reference_in_script() {
        let out = run(
            "[Origin] @JavaScript helper { function h() {} }\n\
             script { [Origin] @JavaScript helper; h(); }",
        );
        assert_eq!(out.js, "function h() {} h();");
    }

    #[test]
    fn empty_script_is_skipped() {
        let out = run("div { script { } }");
        assert_eq!(out.js, "");
        assert!(out.script_fragments.is_empty());
    }
}
