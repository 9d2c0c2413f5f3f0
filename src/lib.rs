//! # chtl
//!
//! A source-to-source compiler for CHTL, an HTML-authoring language with
//! nested elements, reusable templates, inheritance and specialization.
//! One CHTL document compiles to plain HTML, CSS and JavaScript.
//!
//! ```text
//! html {
//!     body {
//!         div {
//!             style { .box { width: 10px; } }
//!             text { "Hello" }
//!         }
//!     }
//! }
//! ```
//!
//! becomes `<html><body><div class="box">Hello</div></body></html>` with the
//! stylesheet `.box{width:10px;}`.
//!
//! ## Pipeline
//!
//! - **[`lexer`]**: logos-based tokenizer with line/column spans
//! - **[`parser`]**: recursive-descent parser with error recovery
//! - **[`ast`]**: slotmap-backed syntax tree
//! - **[`symbols`]**: the [`GlobalMap`] of templates, customs, origins and namespaces
//! - **[`resolve`]**: inheritance, specialization and variable resolution
//! - **[`automation`]**: class/id assignment from local selectors
//! - **[`generator`]**: HTML, CSS and JavaScript output
//! - **[`config`]**: options set by `[Configuration]` blocks
//!
//! [`compile`] runs all of it with defaults; [`Compiler`] takes options.

// Front end
pub mod ast;
pub mod lexer;
pub mod parser;

// Semantics
pub mod automation;
pub mod resolve;
pub mod symbols;

// Output
pub mod config;
pub mod generator;

// Test helpers
pub mod testing;

use thiserror::Error;
use tracing::debug;

pub use config::Config;
pub use generator::{GenerateError, GenerationResult, ScriptFragment};
pub use lexer::LexError;
pub use parser::{ParseError, ParseOptions};
pub use symbols::GlobalMap;

/// A failure that stops compilation before generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("tokenize failed: {0}")]
    Lex(#[from] LexError),
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
}

/// The result of compiling one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
    pub html: String,
    pub css: String,
    pub js: String,
    pub success: bool,
    /// The primary failure, when `success` is false.
    pub error: Option<String>,
    pub warnings: Vec<String>,
    /// Every generation error, including the primary one.
    pub errors: Vec<String>,
    pub script_fragments: Vec<ScriptFragment>,
}

impl CompileOutput {
    fn failed(error: &CompileError, warnings: Vec<String>) -> Self {
        let message = error.to_string();
        Self {
            success: false,
            error: Some(message.clone()),
            errors: vec![message],
            warnings,
            ..Self::default()
        }
    }
}

/// Compile `source` with default options.
pub fn compile(source: &str) -> CompileOutput {
    Compiler::new().compile(source)
}

/// The compilation pipeline with caller-supplied options.
///
/// ```
/// use chtl::{Compiler, Config};
///
/// let output = Compiler::new()
///     .with_config(Config::default().with_style_auto_add(false, false))
///     .compile("div { style { .box { color: red; } } }");
/// assert_eq!(output.html, "<div></div>");
/// assert_eq!(output.css, ".box{color:red;}");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: ParseOptions,
    config: Config,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warn about unknown tag names.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.options = self.options.with_strict(strict);
        self
    }

    /// Base configuration; `[Configuration]` blocks in the source override it.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Compile, reporting lex and parse failures as an unsuccessful output.
    pub fn compile(&self, source: &str) -> CompileOutput {
        self.run(source)
            .unwrap_or_else(|(error, warnings)| CompileOutput::failed(&error, warnings))
    }

    /// Compile, returning lex and parse failures as errors. Generation
    /// errors still produce an output with `success == false`.
    pub fn try_compile(&self, source: &str) -> Result<CompileOutput, CompileError> {
        self.run(source).map_err(|(error, _)| error)
    }

    fn run(&self, source: &str) -> Result<CompileOutput, (CompileError, Vec<String>)> {
        let lexed = lexer::Lexer::new(source)
            .tokenize()
            .map_err(|error| (CompileError::from(error), Vec::new()))?;
        let mut warnings = lexed.warnings;

        let mut map = GlobalMap::with_config(self.config.clone());
        let mut parsed = parser::parse_with(source, lexed.tokens, &mut map, self.options);
        warnings.append(&mut parsed.warnings);
        if let Some(error) = parsed.error.take() {
            return Err((CompileError::from(error), warnings));
        }

        let generated = generator::generate(&mut parsed.ast, &mut map);
        warnings.extend(generated.warnings);
        let errors: Vec<String> = generated.errors.iter().map(ToString::to_string).collect();
        debug!(
            success = generated.success,
            warnings = warnings.len(),
            errors = errors.len(),
            "compiled"
        );
        Ok(CompileOutput {
            html: generated.html,
            css: generated.css,
            js: generated.js,
            success: generated.success,
            error: errors.first().cloned(),
            warnings,
            errors,
            script_fragments: generated.script_fragments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn compile_simple_document() {
        let out = compile("html { body { text { \"Hi\" } } }");
        assert!(out.success);
        assert_eq!(out.html, "<html><body>Hi</body></html>");
        assert_eq!(out.error, None);
    }

    #[test]
    fn lex_error_fails_compile() {
        let out = compile("div { text { \"open } }");
        assert!(!out.success);
        assert!(out.error.unwrap().starts_with("tokenize failed"));
    }

    #[test]
    fn parse_error_fails_compile() {
        let err = Compiler::new().try_compile("div { 42 }").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn generation_error_keeps_output() {
        let out = compile("div { br { span { } } p { } }");
        assert!(!out.success);
        assert_eq!(out.html, "<div><p></p></div>");
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.error.as_deref(), Some(out.errors[0].as_str()));
    }

    #[test]
    fn strict_mode_warns() {
        let out = Compiler::new().with_strict(true).compile("widget { }");
        assert!(out.success);
        assert_eq!(out.html, "<widget></widget>");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn source_configuration_overrides_base() {
        let out = Compiler::new()
            .with_config(Config::default().with_style_auto_add(false, false))
            .compile("[Configuration] { DISABLE_STYLE_AUTO_ADD_CLASS = false; }\ndiv { style { .a { } } }");
        assert_eq!(out.html, "<div class=\"a\"></div>");
    }
}
