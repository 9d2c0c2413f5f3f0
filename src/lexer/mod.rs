//! Lexical analysis: CHTL source text to classified tokens.
//!
//! Built on [`logos`]. The scanner recognizes ordinary comments, generator
//! comments (`--` at line start), quoted strings, numbers, identifiers, bracketed
//! block keywords, `@` type tags, selectors and the `&` context reference.

pub mod span;
pub mod token;
pub mod tokenizer;

pub use span::{LineIndex, Span};
pub use token::{AtType, BlockKeyword, CommentKind, Keyword, LexErrorKind, Token, TokenKind};
pub use tokenizer::{tokenize, LexError, Lexed, Lexer};
