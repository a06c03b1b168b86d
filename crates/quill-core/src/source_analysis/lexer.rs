// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Pull-based tokenizer.
//!
//! Quill tokens are produced on demand from a [`Stream`] rather than lexed
//! up front: the parser pulls a token, and if the enclosing speculative
//! branch fails, the stream rolls back and the same bytes are lexed again
//! down another path. [`Token::pull`] is the canonical tokenizer;
//! [`Token::peek`], [`Token::draw`], and [`Token::expect`] are the
//! non-consuming / conditional / expect-or-error wrappers the parser is
//! built from.
//!
//! # Token forms
//!
//! 1. String literals `"…"` with escapes `\n \r \t \" \' \\ \{`. Unknown
//!    escapes warn and drop the backslash. String interpolation and
//!    hexadecimal number literals are recognized and rejected explicitly.
//! 2. Number literals: a run of digits with at most one `.`.
//! 3. Identifiers and keywords: a maximal run of identifier bytes.
//!    `true`, `false`, and `void` become literals.
//! 4. Operators: a maximal run of operator bytes matched against the
//!    operator table.
//! 5. Punctuation: one character at a time, never merged.

use ecow::EcoString;

use crate::diagnostics::ParseResult;

use super::token::{is_ident, is_ident_byte, is_op_byte, is_punct_byte};
use super::{Keyword, Lit, Op, Span, Stream, Token, TokenKind};

/// A pattern that an expected token can be matched against.
///
/// Implemented for [`char`] (punctuation), [`Keyword`], and [`Op`], so the
/// parser can write `Token::expect('{', stream)` or
/// `Token::draw(Keyword::Else, stream)`.
pub trait TokenPattern: Copy {
    /// Returns true if `kind` matches this pattern.
    fn matches(self, kind: &TokenKind) -> bool;

    /// How to describe the expected token in a diagnostic.
    fn expected(self) -> String;
}

impl TokenPattern for char {
    fn matches(self, kind: &TokenKind) -> bool {
        matches!(kind, TokenKind::Punct(c) if *c == self)
    }

    fn expected(self) -> String {
        format!("`{self}`")
    }
}

impl TokenPattern for Keyword {
    fn matches(self, kind: &TokenKind) -> bool {
        matches!(kind, TokenKind::Keyword(kw) if *kw == self)
    }

    fn expected(self) -> String {
        format!("`{}`", self.as_str())
    }
}

impl TokenPattern for Op {
    fn matches(self, kind: &TokenKind) -> bool {
        matches!(kind, TokenKind::Op(op) if *op == self)
    }

    fn expected(self) -> String {
        format!("`{}`", self.as_str())
    }
}

impl Token {
    /// Skips whitespace and comments until neither remains.
    ///
    /// Comments are `// …` to end of line and `/* … */`. Block comments do
    /// not nest; the first `*/` closes. An unterminated block comment eats
    /// to end of file.
    pub fn skip_trivia(stream: &mut Stream) {
        loop {
            stream.debug_tick();
            stream.bump_while(|b| b.is_ascii_whitespace());
            if stream.starts_with("//") {
                stream.bump_while(|b| b != b'\n');
            } else if stream.starts_with("/*") {
                stream.bump();
                stream.bump();
                while !stream.is_eof() && !stream.starts_with("*/") {
                    stream.bump();
                }
                stream.bump();
                stream.bump();
            } else {
                break;
            }
        }
    }

    /// Pulls the next token from the stream.
    ///
    /// On success the token is recorded as the stream's last-token memo.
    /// On failure the stream is restored to where it was before the call.
    pub fn pull(stream: &mut Stream) -> ParseResult<Token> {
        Self::skip_trivia(stream);
        let cp = stream.checkpoint();
        let start = cp.offset();

        if stream.is_eof() {
            let err = stream.error("expected a token, found end of file", stream.blame_span());
            stream.rollback(cp);
            return Err(err);
        }

        match Self::pull_kind(stream, start) {
            Ok(kind) => {
                let token = Token::new(kind, Span::new(start, stream.offset()));
                stream.commit(cp);
                stream.set_last_token(token.clone());
                Ok(token)
            }
            Err(err) => {
                stream.rollback(cp);
                Err(err)
            }
        }
    }

    fn pull_kind(stream: &mut Stream, start: u32) -> ParseResult<TokenKind> {
        match stream.peek() {
            Some(b'"') => return Self::pull_string(stream),
            Some(b) if b.is_ascii_digit() => return Self::pull_number(stream),
            _ => {}
        }

        // Maximal identifier run; empty means operator or punctuation.
        stream.bump_while(is_ident_byte);
        let text: EcoString = stream.text_from(start).into();

        if text.is_empty() {
            return Self::pull_op_or_punct(stream, start);
        }

        // true/false/void lex as literals, not keywords or identifiers
        match text.as_str() {
            "true" => return Ok(TokenKind::Literal(Lit::Bool(true))),
            "false" => return Ok(TokenKind::Literal(Lit::Bool(false))),
            "void" => return Ok(TokenKind::Literal(Lit::Void)),
            _ => {}
        }

        if let Some(keyword) = Keyword::from_str(&text) {
            return Ok(TokenKind::Keyword(keyword));
        }

        if is_ident(&text) {
            return Ok(TokenKind::Ident(text));
        }

        Err(stream.error(
            format!("invalid identifier `{text}`"),
            Span::new(start, stream.offset()),
        ))
    }

    fn pull_op_or_punct(stream: &mut Stream, start: u32) -> ParseResult<TokenKind> {
        let first = stream.peek();
        stream.bump_while(is_op_byte);
        let run: EcoString = stream.text_from(start).into();

        if !run.is_empty() {
            if let Some(op) = Op::from_str(&run) {
                return Ok(TokenKind::Op(op));
            }
        }

        // Punctuation is consumed one character at a time, even when a byte
        // like `:` also counts as an operator byte (`::` is an operator,
        // a lone `:` is punctuation).
        if let Some(byte) = first {
            if is_punct_byte(byte) {
                stream.navigate(start + 1);
                return Ok(TokenKind::Punct(byte as char));
            }
        }

        if run.is_empty() {
            let byte = stream.bump().unwrap_or(0);
            return Err(stream.error(
                format!("unexpected character `{}`", byte.escape_ascii()),
                Span::new(start, stream.offset()),
            ));
        }
        let msg = format!("invalid operator `{run}`");
        let span = Span::new(start, stream.offset());
        Err(stream.error(msg, span))
    }

    fn pull_string(stream: &mut Stream) -> ParseResult<TokenKind> {
        let start = stream.offset();
        stream.bump(); // opening quote
        let mut bytes = Vec::new();

        loop {
            match stream.bump() {
                None => {
                    return Err(stream.error(
                        "unterminated string literal",
                        Span::new(start, stream.offset()),
                    ));
                }
                Some(b'"') => break,
                Some(b'{') => {
                    // TODO: interpolated string literals
                    return Err(stream
                        .error(
                            "string interpolation is not supported",
                            Span::new(stream.offset() - 1, stream.offset()),
                        )
                        .with_hint("escape the brace as `\\{`"));
                }
                Some(b'\\') => {
                    let esc_start = stream.offset() - 1;
                    match stream.bump() {
                        None => {
                            return Err(stream.error(
                                "expected escape sequence, found end of file",
                                Span::new(esc_start, stream.offset()),
                            ));
                        }
                        Some(b'n') => bytes.push(b'\n'),
                        Some(b'r') => bytes.push(b'\r'),
                        Some(b't') => bytes.push(b'\t'),
                        Some(b'"') => bytes.push(b'"'),
                        Some(b'\'') => bytes.push(b'\''),
                        Some(b'\\') => bytes.push(b'\\'),
                        Some(b'{') => bytes.push(b'{'),
                        Some(other) => {
                            stream.warn(
                                format!("unknown escape sequence `\\{}`", other.escape_ascii()),
                                Span::new(esc_start, stream.offset()),
                            );
                            bytes.push(other);
                        }
                    }
                }
                Some(other) => bytes.push(other),
            }
        }

        let value = String::from_utf8_lossy(&bytes).into_owned();
        Ok(TokenKind::Literal(Lit::Str(value.into())))
    }

    fn pull_number(stream: &mut Stream) -> ParseResult<TokenKind> {
        let start = stream.offset();

        // TODO: hex literals
        if stream.starts_with("0x") || stream.starts_with("0X") {
            stream.bump();
            stream.bump();
            stream.bump_while(|b| b.is_ascii_hexdigit());
            return Err(stream.error(
                "hexadecimal literals are not supported",
                Span::new(start, stream.offset()),
            ));
        }

        let mut found_dot = false;
        while let Some(byte) = stream.peek() {
            if byte.is_ascii_digit() {
                stream.bump();
            } else if byte == b'.' && !found_dot {
                found_dot = true;
                stream.bump();
            } else {
                break;
            }
        }

        let text = stream.text_from(start);
        if found_dot {
            match text.parse::<f64>() {
                Ok(value) => Ok(TokenKind::Literal(Lit::Float(value))),
                Err(_) => {
                    let msg = format!("invalid float literal `{text}`");
                    let span = Span::new(start, stream.offset());
                    Err(stream.error(msg, span))
                }
            }
        } else {
            match text.parse::<u64>() {
                Ok(value) => Ok(TokenKind::Literal(Lit::Int(value))),
                Err(_) => {
                    let msg = format!("invalid integer literal `{text}`");
                    let span = Span::new(start, stream.offset());
                    Err(stream.error(msg, span))
                }
            }
        }
    }

    /// Returns the `n`-th upcoming token without consuming anything.
    ///
    /// Returns `None` at end of input or on a lex error; warnings emitted
    /// while looking ahead are discarded with the rollback.
    pub fn peek_n(stream: &mut Stream, n: usize) -> Option<Token> {
        let cp = stream.checkpoint();
        let mut result = None;
        for _ in 0..=n {
            match Self::pull(stream) {
                Ok(token) => result = Some(token),
                Err(_) => {
                    result = None;
                    break;
                }
            }
        }
        stream.rollback(cp);
        result
    }

    /// Returns the next token without consuming it.
    pub fn peek(stream: &mut Stream) -> Option<Token> {
        Self::peek_n(stream, 0)
    }

    /// Returns true if the next token matches `pattern`.
    pub fn peek_is<P: TokenPattern>(pattern: P, stream: &mut Stream) -> bool {
        Self::peek(stream).is_some_and(|t| pattern.matches(t.kind()))
    }

    /// Consumes the next token if it matches `pattern`, otherwise leaves
    /// the stream unchanged.
    pub fn draw<P: TokenPattern>(pattern: P, stream: &mut Stream) -> Option<Token> {
        let cp = stream.checkpoint();
        match Self::pull(stream) {
            Ok(token) if pattern.matches(token.kind()) => {
                stream.commit(cp);
                Some(token)
            }
            _ => {
                stream.rollback(cp);
                None
            }
        }
    }

    /// Consumes the next token, requiring it to match `pattern`.
    pub fn expect<P: TokenPattern>(pattern: P, stream: &mut Stream) -> ParseResult<Token> {
        Self::skip_trivia(stream);
        if stream.is_eof() {
            return Err(stream.error(
                format!("expected {}, found end of file", pattern.expected()),
                stream.blame_span(),
            ));
        }
        let cp = stream.checkpoint();
        match Self::pull(stream) {
            Ok(token) if pattern.matches(token.kind()) => {
                stream.commit(cp);
                Ok(token)
            }
            Ok(token) => {
                let err = stream.error(
                    format!(
                        "expected {}, found {}",
                        pattern.expected(),
                        token.kind().describe()
                    ),
                    token.span(),
                );
                stream.rollback(cp);
                Err(err)
            }
            Err(err) => {
                stream.rollback(cp);
                Err(err)
            }
        }
    }

    /// Expects at least one `;`, then consumes all consecutive ones.
    ///
    /// The leading `;` is optional when the previously consumed token was
    /// `}`, so `if x { } let y = 1;` needs no semicolon after the block.
    pub fn pull_semicolons(stream: &mut Stream) -> ParseResult<()> {
        let after_block = matches!(
            stream.last_token().map(Token::kind),
            Some(TokenKind::Punct('}'))
        );
        let cp = stream.checkpoint();
        if !after_block {
            if let Err(err) = Self::expect(';', stream) {
                stream.rollback(cp);
                return Err(err);
            }
        }
        while Self::draw(';', stream).is_some() {}
        stream.commit(cp);
        Ok(())
    }

    /// Consumes a list separator, tolerating a trailing one.
    ///
    /// Returns `Ok(true)` when the list ends: either `closer` follows
    /// directly (empty list or no trailing separator) or a separator was
    /// consumed and `closer` follows it.
    pub fn pull_separator(
        separator: char,
        closer: char,
        stream: &mut Stream,
    ) -> ParseResult<bool> {
        if Self::peek_is(closer, stream) {
            return Ok(true);
        }
        Self::expect(separator, stream)?;
        Ok(Self::peek_is(closer, stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_analysis::Source;

    fn stream(text: &str) -> Stream {
        Stream::new(Source::new("test.ql", text, "."))
    }

    /// Pulls every token, asserting none fail.
    fn lex_all(text: &str) -> Vec<TokenKind> {
        let mut s = stream(text);
        let mut kinds = Vec::new();
        loop {
            Token::skip_trivia(&mut s);
            if s.is_eof() {
                break;
            }
            kinds.push(Token::pull(&mut s).expect("lex error").into_kind());
        }
        kinds
    }

    #[test]
    fn lexes_literals() {
        assert_eq!(
            lex_all("42 3.25 true false void \"hi\""),
            vec![
                TokenKind::Literal(Lit::Int(42)),
                TokenKind::Literal(Lit::Float(3.25)),
                TokenKind::Literal(Lit::Bool(true)),
                TokenKind::Literal(Lit::Bool(false)),
                TokenKind::Literal(Lit::Void),
                TokenKind::Literal(Lit::Str("hi".into())),
            ]
        );
    }

    #[test]
    fn lexes_keywords_and_idents() {
        assert_eq!(
            lex_all("let x fun this"),
            vec![
                TokenKind::Keyword(Keyword::Let),
                TokenKind::Ident("x".into()),
                TokenKind::Keyword(Keyword::Fun),
                TokenKind::Ident("this".into()),
            ]
        );
    }

    #[test]
    fn operator_maximal_munch() {
        assert_eq!(
            lex_all("a <= b <=> c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Op(Op::Le),
                TokenKind::Ident("b".into()),
                TokenKind::Op(Op::Bind),
                TokenKind::Ident("c".into()),
            ]
        );
    }

    #[test]
    fn unary_minus_stays_separate_when_spaced() {
        // `-1 - -2` tokenizes to Sub, Int(1), Sub, Sub, Int(2)
        assert_eq!(
            lex_all("-1 - -2"),
            vec![
                TokenKind::Op(Op::Sub),
                TokenKind::Literal(Lit::Int(1)),
                TokenKind::Op(Op::Sub),
                TokenKind::Op(Op::Sub),
                TokenKind::Literal(Lit::Int(2)),
            ]
        );
    }

    #[test]
    fn scope_op_vs_colon_punct() {
        assert_eq!(
            lex_all("a::b: c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Op(Op::Scope),
                TokenKind::Ident("b".into()),
                TokenKind::Punct(':'),
                TokenKind::Ident("c".into()),
            ]
        );
    }

    #[test]
    fn punctuation_is_not_merged() {
        assert_eq!(
            lex_all(".."),
            vec![TokenKind::Punct('.'), TokenKind::Punct('.')]
        );
    }

    #[test]
    fn line_and_block_comments_are_trivia() {
        assert_eq!(
            lex_all("// note\n/* block */ 1"),
            vec![TokenKind::Literal(Lit::Int(1))]
        );
    }

    #[test]
    fn block_comments_do_not_nest() {
        // The first `*/` closes the comment
        assert_eq!(
            lex_all("/* a /* */ 1"),
            vec![TokenKind::Literal(Lit::Int(1))]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            lex_all(r#""a\n\t\"\\\{b""#),
            vec![TokenKind::Literal(Lit::Str("a\n\t\"\\{b".into()))]
        );
    }

    #[test]
    fn unknown_escape_warns_and_drops_backslash() {
        let mut s = stream(r#""\q""#);
        let token = Token::pull(&mut s).unwrap();
        assert_eq!(
            token.into_kind(),
            TokenKind::Literal(Lit::Str("q".into()))
        );
        let diags = s.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unknown escape sequence"));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut s = stream("\"abc");
        let err = Token::pull(&mut s).unwrap_err();
        assert!(err.message.contains("unterminated string"));
        // Rollback neutrality: the failed pull left the cursor alone
        assert_eq!(s.offset(), 0);
    }

    #[test]
    fn string_interpolation_is_rejected() {
        let mut s = stream("\"a{b}\"");
        let err = Token::pull(&mut s).unwrap_err();
        assert!(err.message.contains("interpolation"));
        assert!(err.hint.is_some());
    }

    #[test]
    fn hex_literals_are_rejected() {
        let mut s = stream("0xFF");
        let err = Token::pull(&mut s).unwrap_err();
        assert!(err.message.contains("hexadecimal"));
    }

    #[test]
    fn float_consumes_one_dot() {
        assert_eq!(
            lex_all("1.5.2"),
            vec![
                TokenKind::Literal(Lit::Float(1.5)),
                TokenKind::Punct('.'),
                TokenKind::Literal(Lit::Int(2)),
            ]
        );
    }

    #[test]
    fn invalid_operator_is_an_error() {
        let mut s = stream("a ==> b");
        assert!(Token::pull(&mut s).is_ok()); // a
        let err = Token::pull(&mut s).unwrap_err();
        assert!(err.message.contains("invalid operator `==>`"));
    }

    #[test]
    fn eof_error_blames_last_token() {
        let mut s = stream("let ");
        let let_token = Token::pull(&mut s).unwrap();
        let err = Token::pull(&mut s).unwrap_err();
        assert_eq!(err.span, let_token.span());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut s = stream("a b");
        let peeked = Token::peek(&mut s).unwrap();
        assert_eq!(peeked.kind(), &TokenKind::Ident("a".into()));
        assert_eq!(s.offset(), 0);
        assert!(s.last_token().is_none());

        let second = Token::peek_n(&mut s, 1).unwrap();
        assert_eq!(second.kind(), &TokenKind::Ident("b".into()));
        assert_eq!(s.offset(), 0);
    }

    #[test]
    fn draw_consumes_only_on_match() {
        let mut s = stream("; x");
        assert!(Token::draw(';', &mut s).is_some());
        assert!(Token::draw(';', &mut s).is_none());
        assert_eq!(
            Token::pull(&mut s).unwrap().into_kind(),
            TokenKind::Ident("x".into())
        );
    }

    #[test]
    fn expect_reports_found_token() {
        let mut s = stream("x");
        let err = Token::expect(';', &mut s).unwrap_err();
        assert_eq!(err.message, "expected `;`, found identifier `x`");
        // Stream unchanged so the caller can try something else
        assert_eq!(s.offset(), 0);
    }

    #[test]
    fn expect_at_eof_names_the_pattern() {
        let mut s = stream("x ");
        Token::pull(&mut s).unwrap();
        let err = Token::expect(';', &mut s).unwrap_err();
        assert_eq!(err.message, "expected `;`, found end of file");
    }

    #[test]
    fn semicolons_required_unless_after_block() {
        let mut s = stream("x y");
        Token::pull(&mut s).unwrap();
        assert!(Token::pull_semicolons(&mut s).is_err());

        let mut s = stream("} x");
        Token::pull(&mut s).unwrap(); // `}` becomes the last-token memo
        assert!(Token::pull_semicolons(&mut s).is_ok());

        let mut s = stream("x ;;; y");
        Token::pull(&mut s).unwrap();
        assert!(Token::pull_semicolons(&mut s).is_ok());
        assert_eq!(
            Token::pull(&mut s).unwrap().into_kind(),
            TokenKind::Ident("y".into())
        );
    }

    #[test]
    fn separator_allows_trailing() {
        // `a, b, }` — each call reports whether the list ended
        let mut s = stream(", b , }");
        assert_eq!(Token::pull_separator(',', '}', &mut s), Ok(false));
        Token::pull(&mut s).unwrap(); // b
        assert_eq!(Token::pull_separator(',', '}', &mut s), Ok(true));

        // Immediate closer: empty list
        let mut s = stream("}");
        assert_eq!(Token::pull_separator(',', '}', &mut s), Ok(true));
    }

    #[test]
    fn non_ascii_identifiers() {
        assert_eq!(
            lex_all("låda"),
            vec![TokenKind::Ident("låda".into())]
        );
    }
}
