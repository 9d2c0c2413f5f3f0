//! Output generation: a resolved tree to HTML, CSS and JavaScript.
//!
//! The generator walks the document once, depth first. Element usages are
//! expanded in place (the tree is modified), selector automation runs on
//! each element before its opening tag is written, and style and script
//! blocks are split into inline declarations, global CSS rules and script
//! fragments.
//!
//! Problems fall into two groups. Undefined references and ignored content
//! become warnings and generation carries on. Cycles, void elements with
//! children, `except` violations and elements nested past
//! [`MAX_NESTING_DEPTH`] are errors: the offending subtree is skipped and
//! [`GenerationResult::success`] is false.

mod css;
mod html;
mod script;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ast::{Ast, ConstraintTarget, DefinitionType, NodeId, NodeKind, OriginBlock, OriginType, Usage, Value, VarRef};
use crate::lexer::Span;
use crate::parser::MAX_NESTING_DEPTH;
use crate::resolve::{ResolveError, Resolved, Resolver};
use crate::symbols::GlobalMap;

pub use html::escape;

/// Errors that abort generation of a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("line {line}, column {column}: <{tag}> is a void element and cannot have children")]
    VoidElementChildren { tag: String, line: u32, column: u32 },

    #[error("line {line}, column {column}: {forbidden} is not allowed inside <{tag}>")]
    ConstraintViolation {
        tag: String,
        forbidden: String,
        line: u32,
        column: u32,
    },

    #[error("line {line}, column {column}: <{tag}> is nested deeper than {limit} elements")]
    NestingTooDeep {
        tag: String,
        limit: usize,
        line: u32,
        column: u32,
    },

    #[error("line {line}, column {column}: {source}")]
    Resolve {
        source: ResolveError,
        line: u32,
        column: u32,
    },
}

/// One script block's rendered code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFragment {
    /// Selector of the owning element (`#id` or `.class`), `None` for
    /// global scripts and elements without either.
    pub owner: Option<String>,
    pub code: String,
}

/// Everything one generation pass produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub html: String,
    /// Rules, one per line.
    pub css: String,
    /// Script blocks, one per line group, in document order.
    pub js: String,
    pub success: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<GenerateError>,
    pub script_fragments: Vec<ScriptFragment>,
}

/// Whether style and script blocks are document-wide or belong to the
/// element that contains them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Global,
    Local,
}

/// An `except` list in force for the children of `tag`.
struct Except<'c> {
    tag: &'c str,
    targets: &'c [ConstraintTarget],
}

/// Generate output for the whole document in `ast`.
pub fn generate(ast: &mut Ast, map: &mut GlobalMap) -> GenerationResult {
    Generator::new(ast, map).run()
}

/// Single-use generation pass over one tree.
pub struct Generator<'a> {
    ast: &'a mut Ast,
    map: &'a mut GlobalMap,
    html: String,
    css: Vec<String>,
    js: Vec<String>,
    fragments: Vec<ScriptFragment>,
    warnings: Vec<String>,
    errors: Vec<GenerateError>,
    /// Element definitions being expanded, outermost first.
    expanding: Vec<String>,
    /// Elements open around the node being generated.
    depth: usize,
}

impl<'a> Generator<'a> {
    pub fn new(ast: &'a mut Ast, map: &'a mut GlobalMap) -> Self {
        Self {
            ast,
            map,
            html: String::new(),
            css: Vec::new(),
            js: Vec::new(),
            fragments: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            expanding: Vec::new(),
            depth: 0,
        }
    }

    pub fn run(mut self) -> GenerationResult {
        debug!(nodes = self.ast.len(), html5 = self.map.uses_html5(), "generating");
        if self.map.uses_html5() {
            self.html.push_str("<!DOCTYPE html>");
        }
        let root = self.ast.root();
        self.generate_children(root, Scope::Global, None);

        let result = GenerationResult {
            html: self.html,
            css: self.css.join("\n"),
            js: self.js.join("\n"),
            success: self.errors.is_empty(),
            warnings: self.warnings,
            errors: self.errors,
            script_fragments: self.fragments,
        };
        if self.map.config().debug_mode {
            info!(
                html = result.html.len(),
                css = result.css.len(),
                js = result.js.len(),
                warnings = result.warnings.len(),
                errors = result.errors.len(),
                "generated output"
            );
        } else {
            debug!(
                html = result.html.len(),
                css = result.css.len(),
                js = result.js.len(),
                warnings = result.warnings.len(),
                errors = result.errors.len(),
                "generated output"
            );
        }
        result
    }

    fn generate_children(&mut self, parent: NodeId, scope: Scope, except: Option<&Except<'_>>) {
        let children = self.ast.children(parent).to_vec();
        for child in children {
            self.generate_node(child, scope, except);
        }
    }

    fn generate_node(&mut self, id: NodeId, scope: Scope, except: Option<&Except<'_>>) {
        let Some(node) = self.ast.get(id) else {
            return;
        };
        if let Some(except) = except {
            if let Some(target) = self.violation(except.targets, node) {
                self.errors.push(GenerateError::ConstraintViolation {
                    tag: except.tag.to_string(),
                    forbidden: target.to_string(),
                    line: node.span.line,
                    column: node.span.column,
                });
                return;
            }
        }
        let span = node.span;
        let namespace = node.namespace.clone();
        match &node.kind {
            NodeKind::Element if self.depth >= MAX_NESTING_DEPTH => {
                self.errors.push(GenerateError::NestingTooDeep {
                    tag: node.name.clone(),
                    limit: MAX_NESTING_DEPTH,
                    line: span.line,
                    column: span.column,
                });
            }
            NodeKind::Element => {
                self.depth += 1;
                self.generate_element(id);
                self.depth -= 1;
            }
            NodeKind::Text => {
                let text = escape(&node.content);
                self.html.push_str(&text);
            }
            NodeKind::Comment => {
                let comment = format!("<!-- {} -->", node.content.trim());
                self.html.push_str(&comment);
            }
            NodeKind::Style(block) if scope == Scope::Global => {
                let block = block.clone();
                self.generate_global_style(&block, span);
            }
            NodeKind::Script(block) if scope == Scope::Global => {
                let block = block.clone();
                self.generate_script(&block, None, &namespace, span);
            }
            NodeKind::Usage(usage) if usage.ty == DefinitionType::Element => {
                let usage = usage.clone();
                self.expand_element_usage(id, &usage, span, scope, except);
            }
            NodeKind::Usage(usage) => {
                let message = format!("{usage} can only be used inside a style block");
                self.warn(span, message);
            }
            NodeKind::Origin(origin) => {
                let origin = origin.clone();
                self.generate_origin(&origin, &namespace, span);
            }
            NodeKind::Namespace => self.generate_children(id, Scope::Global, None),
            // Local blocks were consumed by their element; the rest emit
            // nothing.
            NodeKind::Style(_)
            | NodeKind::Script(_)
            | NodeKind::Document
            | NodeKind::TemplateDef(_)
            | NodeKind::CustomDef(_)
            | NodeKind::Import(_)
            | NodeKind::Configuration
            | NodeKind::Use(_)
            | NodeKind::Constraint(_) => {}
        }
    }

    /// Replace an element usage with copies of the definition's elements
    /// and generate them.
    fn expand_element_usage(
        &mut self,
        id: NodeId,
        usage: &Usage,
        span: Span,
        scope: Scope,
        except: Option<&Except<'_>>,
    ) {
        let namespace = usage.from.as_deref().unwrap_or(usage.scope.as_str());
        let label = self
            .map
            .lookup_key(&usage.name, usage.ty, usage.kind, namespace)
            .map_or_else(|| usage.name.clone(), |key| key.name.to_string());
        if let Some(start) = self.expanding.iter().position(|name| *name == label) {
            let mut cycle = self.expanding[start..].to_vec();
            cycle.push(label);
            self.report(ResolveError::CyclicInheritance { cycle }, span);
            return;
        }

        let Some(resolved) = self.instantiate(usage, span) else {
            return;
        };
        self.ast.splice(id, &resolved.elements);
        self.expanding.push(label);
        for element in resolved.elements {
            self.generate_node(element, scope, except);
        }
        self.expanding.pop();
    }

    fn generate_origin(&mut self, origin: &OriginBlock, namespace: &str, span: Span) {
        let content = match (&origin.content, &origin.name) {
            // Named blocks are only emitted where they are referenced.
            (Some(_), Some(_)) => return,
            (Some(content), None) => content.clone(),
            (None, Some(name)) => match self.map.origin(&origin.ty, name, namespace) {
                Some(entry) => entry.content.clone(),
                None => {
                    let message = format!("undefined origin {} {name}", origin.ty);
                    self.warn(span, message);
                    return;
                }
            },
            (None, None) => return,
        };
        match origin.ty {
            OriginType::Style => self.css.push(content),
            OriginType::JavaScript => self.js.push(content),
            OriginType::Html | OriginType::Custom(_) => self.html.push_str(&content),
        }
    }

    // -----------------------------------------------------------------------
    // Resolution helpers
    // -----------------------------------------------------------------------

    fn instantiate(&mut self, usage: &Usage, span: Span) -> Option<Resolved> {
        let mut resolver = Resolver::new(&mut *self.map, &mut *self.ast);
        let result = resolver.instantiate(usage);
        let warnings = resolver.into_warnings();
        self.absorb(warnings, span);
        match result {
            Ok(resolved) => Some(resolved),
            Err(error) => {
                self.report(error, span);
                None
            }
        }
    }

    fn render_value(&mut self, value: &Value, span: Span) -> String {
        if !value.has_vars() {
            return value.to_string().trim().to_string();
        }
        let mut resolver = Resolver::new(&mut *self.map, &mut *self.ast);
        let result = resolver.render_value(value);
        let warnings = resolver.into_warnings();
        self.absorb(warnings, span);
        result.unwrap_or_else(|error| {
            self.report(error, span);
            value.to_string().trim().to_string()
        })
    }

    fn resolve_var(&mut self, var: &VarRef, span: Span) -> String {
        let mut resolver = Resolver::new(&mut *self.map, &mut *self.ast);
        let result = resolver.resolve_var(var);
        let warnings = resolver.into_warnings();
        self.absorb(warnings, span);
        match result {
            Ok(Some(text)) => text,
            Ok(None) => var.raw.clone(),
            Err(error) => {
                self.report(error, span);
                var.raw.clone()
            }
        }
    }

    /// Undefined references are warnings; everything else is an error.
    fn report(&mut self, error: ResolveError, span: Span) {
        match error {
            ResolveError::UndefinedReference { .. } => self.warn(span, error.to_string()),
            source => self.errors.push(GenerateError::Resolve {
                source,
                line: span.line,
                column: span.column,
            }),
        }
    }

    fn absorb(&mut self, warnings: Vec<String>, span: Span) {
        for message in warnings {
            self.warnings
                .push(format!("line {}, column {}: {message}", span.line, span.column));
        }
    }

    fn warn(&mut self, span: Span, message: impl AsRef<str>) {
        let message = format!("line {}, column {}: {}", span.line, span.column, message.as_ref());
        warn!("{message}");
        self.warnings.push(message);
    }
}
