//! `script { ... }` blocks. The body is JavaScript and is kept verbatim,
//! except for `{{.class}}`, `{{#id}}`, `{{&}}`, variable references and
//! `[Origin]` references.

use super::{PResult, Parser};
use crate::ast::{OriginType, ScriptBlock, ScriptPart};
use crate::lexer::{BlockKeyword, TokenKind};

impl Parser<'_> {
    /// Parse `script { ... }` with the cursor on `script`.
    pub(super) fn parse_script_block(&mut self) -> PResult<ScriptBlock> {
        self.advance();
        let open = self.cursor;
        self.expect(&TokenKind::LeftBrace, "'{' after script")?;
        let close = self.matching_brace(open)?;

        let mut block = ScriptBlock::default();
        let mut segment_start = self.tokens[open].span.end;
        let mut index = open + 1;
        while index < close {
            match self.script_construct(index, close) {
                Some((part, next)) => {
                    let start = self.tokens[index].span.start;
                    block.push_code(&self.source[segment_start..start]);
                    block.parts.push(part);
                    segment_start = self.tokens[next - 1].span.end;
                    index = next;
                }
                None => index += 1,
            }
        }
        let end = self.tokens[close].span.start;
        block.push_code(&self.source[segment_start..end]);

        self.cursor = close + 1;
        Ok(block)
    }

    /// Recognize a CHTL construct starting at token `index`. Returns the
    /// part and the index of the first token after it.
    fn script_construct(&self, index: usize, close: usize) -> Option<(ScriptPart, usize)> {
        let tok = &self.tokens[index];
        match &tok.kind {
            TokenKind::LeftBrace => {
                if index + 4 >= close {
                    return None;
                }
                let t = &self.tokens[index..index + 5];
                let braces = t[1].kind == TokenKind::LeftBrace
                    && t[3].kind == TokenKind::RightBrace
                    && t[4].kind == TokenKind::RightBrace
                    && self.adjacent_at(index + 1)
                    && self.adjacent_at(index + 4);
                if !braces {
                    return None;
                }
                let part = match t[2].kind {
                    TokenKind::ClassSelector => ScriptPart::Class(t[2].selector_name().to_string()),
                    TokenKind::IdSelector => ScriptPart::Id(t[2].selector_name().to_string()),
                    TokenKind::ContextRef if t[2].text == "&" => ScriptPart::ContextRef,
                    _ => return None,
                };
                Some((part, index + 5))
            }
            TokenKind::Block(BlockKeyword::Origin) => {
                let at = self.tokens.get(index + 1)?;
                let TokenKind::At(ty) = &at.kind else {
                    return None;
                };
                let name = self.tokens.get(index + 2)?;
                if !name.is_name() || index + 2 >= close {
                    return None;
                }
                let mut next = index + 3;
                if next < close && self.tokens[next].kind == TokenKind::Semicolon {
                    next += 1;
                }
                let part = ScriptPart::Origin {
                    ty: OriginType::from_at(ty),
                    name: name.text.clone(),
                };
                Some((part, next))
            }
            TokenKind::Identifier => {
                let (var, next) = self.var_ref_at(index)?;
                // A method call like `obj.get(x)` is not a variable reference.
                if index > 0 && self.adjacent_at(index) {
                    if let TokenKind::Dot | TokenKind::ClassSelector = self.tokens[index - 1].kind {
                        return None;
                    }
                }
                (next <= close).then_some((ScriptPart::Var(var), next))
            }
            _ => None,
        }
    }
}
