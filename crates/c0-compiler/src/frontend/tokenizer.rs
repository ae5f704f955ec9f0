//! Tokenizer for miniplc0 using pest.
//!
//! The grammar matches one token at a time at the cursor, so the analyser
//! can pull tokens on demand and errors surface at the exact token that
//! caused them.

use super::lexer::{Token, TokenKind, TokenValue};
use c0_common::{CompileError, CompileResult, ErrorCode, Span};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use tracing::trace;

#[derive(Parser)]
#[grammar = "frontend/c0.pest"]
struct TokenGrammar;

/// Pull-based tokenizer over a source string.
#[derive(Debug, Clone)]
pub struct Tokenizer<'src> {
    source: &'src str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'src> Tokenizer<'src> {
    /// Create a tokenizer positioned at the start of `source`.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Produce the next token, or [`TokenKind::Eof`] once input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns a tokenize error for stray characters, invalid escapes,
    /// unterminated strings and integer literals beyond 64 bits.
    pub fn next_token(&mut self) -> CompileResult<Token> {
        self.skip_trivia();
        let start = self.position();
        let rest = &self.source[self.offset..];
        if rest.is_empty() {
            return Ok(Token::new(TokenKind::Eof, TokenValue::None, start));
        }

        let lexeme = TokenGrammar::parse(Rule::lexeme, rest)
            .ok()
            .and_then(|mut pairs| pairs.next())
            .and_then(|pair| pair.into_inner().next());
        let Some(pair) = lexeme else {
            return Err(self.unrecognized(rest, start));
        };

        let len = pair.as_str().len();
        let (kind, value) = self.classify(pair, start, len)?;
        self.advance(len);

        let span = Span::new(start.start, self.offset, start.line, start.column);
        trace!(kind = %kind, %span, "token");
        Ok(Token::new(kind, value, span))
    }

    /// Skip whitespace and `//` line comments.
    fn skip_trivia(&mut self) {
        loop {
            let rest = &self.source[self.offset..];
            let trimmed = rest.trim_start();
            self.advance(rest.len() - trimmed.len());
            if !trimmed.starts_with("//") {
                break;
            }
            let comment = trimmed.find('\n').unwrap_or(trimmed.len());
            self.advance(comment);
        }
    }

    fn classify(
        &self,
        pair: Pair<'_, Rule>,
        start: Span,
        len: usize,
    ) -> CompileResult<(TokenKind, TokenValue)> {
        let span = Span::new(start.start, start.start + len, start.line, start.column);
        let text = pair.as_str();
        match pair.as_rule() {
            Rule::uint_literal => text
                .parse::<u64>()
                .map(|value| (TokenKind::UintLiteral, TokenValue::Uint(value)))
                .map_err(|_| CompileError::tokenize(ErrorCode::IntegerOverflow, span)),
            Rule::word => Ok(match TokenKind::from_keyword(text) {
                Some(keyword) => (keyword, TokenValue::None),
                None => (TokenKind::Ident, TokenValue::Text(text.to_string())),
            }),
            Rule::string_literal => {
                let body = self.unescape(pair)?;
                Ok((TokenKind::StringLiteral, TokenValue::Text(body)))
            }
            Rule::unterminated_string => {
                // An invalid escape inside is reported before the missing quote
                self.unescape(pair)?;
                Err(CompileError::tokenize(ErrorCode::UnterminatedString, span))
            }
            Rule::symbol => TokenKind::from_symbol(text)
                .map(|kind| (kind, TokenValue::None))
                .ok_or_else(|| CompileError::tokenize(ErrorCode::InvalidInput, span)),
            _ => Err(CompileError::tokenize(ErrorCode::InvalidInput, span)),
        }
    }

    /// Decode the body of a string token.
    fn unescape(&self, pair: Pair<'_, Rule>) -> CompileResult<String> {
        let mut out = String::new();
        let parts = pair
            .into_inner()
            .filter(|p| p.as_rule() == Rule::string_body)
            .flat_map(Pair::into_inner);
        for part in parts {
            match part.as_rule() {
                Rule::plain => out.push_str(part.as_str()),
                Rule::escape => out.push(match part.as_str() {
                    "\\n" => '\n',
                    "\\r" => '\r',
                    "\\t" => '\t',
                    "\\\"" => '"',
                    "\\'" => '\'',
                    _ => '\\',
                }),
                _ => {
                    let at = self.offset + part.as_span().start();
                    let span = self.locate(at, part.as_str().len());
                    return Err(CompileError::tokenize(ErrorCode::InvalidEscape, span));
                }
            }
        }
        Ok(out)
    }

    fn unrecognized(&self, rest: &str, start: Span) -> CompileError {
        let width = rest.chars().next().map_or(0, char::len_utf8);
        let span = Span::new(start.start, start.start + width, start.line, start.column);
        // A quote that matched neither string rule ends in a dangling backslash
        let code = if rest.starts_with('"') {
            ErrorCode::UnterminatedString
        } else {
            ErrorCode::InvalidInput
        };
        CompileError::tokenize(code, span)
    }

    fn position(&self) -> Span {
        Span::point(self.offset, self.line, self.column)
    }

    /// Span of `len` bytes at absolute `offset`, which must not precede the cursor.
    fn locate(&self, offset: usize, len: usize) -> Span {
        let mut cursor = self.clone();
        cursor.advance(offset - self.offset);
        Span::new(offset, offset + len, cursor.line, cursor.column)
    }

    fn advance(&mut self, len: usize) {
        let end = self.offset + len;
        for c in self.source[self.offset..end].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset = end;
    }
}

/// Token source with one token of lookahead.
#[derive(Debug)]
pub struct TokenStream<'src> {
    tokenizer: Tokenizer<'src>,
    peeked: Option<Token>,
}

impl<'src> TokenStream<'src> {
    /// Create a stream over `source`.
    pub fn new(source: &'src str) -> Self {
        Self {
            tokenizer: Tokenizer::new(source),
            peeked: None,
        }
    }

    /// Look at the next token without consuming it.
    ///
    /// # Errors
    ///
    /// Returns a tokenize error if the next token is malformed.
    pub fn peek(&mut self) -> CompileResult<&Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.tokenizer.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Kind of the next token.
    ///
    /// # Errors
    ///
    /// Returns a tokenize error if the next token is malformed.
    pub fn peek_kind(&mut self) -> CompileResult<TokenKind> {
        self.peek().map(|token| token.kind)
    }

    /// Consume the next token.
    ///
    /// # Errors
    ///
    /// Returns a tokenize error if the next token is malformed.
    pub fn next(&mut self) -> CompileResult<Token> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.tokenizer.next_token(),
        }
    }

    /// Whether the next token has the given kind.
    ///
    /// # Errors
    ///
    /// Returns a tokenize error if the next token is malformed.
    pub fn check(&mut self, kind: TokenKind) -> CompileResult<bool> {
        Ok(self.peek_kind()? == kind)
    }

    /// Consume the next token if it has the given kind.
    ///
    /// # Errors
    ///
    /// Returns a tokenize error if the next token is malformed.
    pub fn next_if(&mut self, kind: TokenKind) -> CompileResult<Option<Token>> {
        if self.check(kind)? {
            self.next().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Consume a token of the given kind or fail with a syntax error.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ExpectedToken`] on any other kind.
    pub fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        self.expect_one_of(&[kind])
    }

    /// Consume a token whose kind is one of `kinds` or fail with a syntax error.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ExpectedToken`] listing `kinds`.
    pub fn expect_one_of(&mut self, kinds: &[TokenKind]) -> CompileResult<Token> {
        let token = self.next()?;
        if kinds.contains(&token.kind) {
            Ok(token)
        } else {
            Err(unexpected(&token, kinds))
        }
    }
}

/// Syntax error for `token` where one of `expected` was required.
pub fn unexpected(token: &Token, expected: &[TokenKind]) -> CompileError {
    CompileError::ExpectedToken {
        expected: expected.iter().map(|kind| kind.name().to_string()).collect(),
        found: token.kind.name().to_string(),
        span: token.span,
    }
}

/// Tokenize the whole source, excluding the final end-of-input token.
///
/// # Errors
///
/// Returns the first tokenize error encountered.
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token()?;
        if token.kind == TokenKind::Eof {
            return Ok(tokens);
        }
        tokens.push(token);
    }
}
