//! Fixtures and snapshot helpers for tests.
//!
//! Use [`minimal_document`] to build nested sources of a known shape and
//! [`render_output`] to capture a [`CompileOutput`] as one string for
//! `insta` snapshots.

use crate::CompileOutput;

/// A valid document of `depth` nested `div` elements, the innermost
/// holding a text node. Depth 0 is an empty document.
///
/// # Examples
///
/// ```
/// use chtl::testing::minimal_document;
///
/// assert_eq!(minimal_document(2), "div {\n  div {\n    text { \"leaf\" }\n  }\n}\n");
/// ```
pub fn minimal_document(depth: usize) -> String {
    let mut out = String::new();
    for level in 0..depth {
        out.push_str(&"  ".repeat(level));
        out.push_str("div {\n");
    }
    if depth > 0 {
        out.push_str(&"  ".repeat(depth));
        out.push_str("text { \"leaf\" }\n");
    }
    for level in (0..depth).rev() {
        out.push_str(&"  ".repeat(level));
        out.push_str("}\n");
    }
    out
}

/// The three output streams under `--- html`, `--- css` and `--- js`
/// headings, followed by any errors. Lines are trimmed of trailing spaces.
pub fn render_output(output: &CompileOutput) -> String {
    let mut sections = vec![
        format!("--- html\n{}", output.html),
        format!("--- css\n{}", output.css),
        format!("--- js\n{}", output.js),
    ];
    if !output.errors.is_empty() {
        sections.push(format!("--- errors\n{}", output.errors.join("\n")));
    }
    sections
        .join("\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}
