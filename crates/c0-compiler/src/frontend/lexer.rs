//! Lexical tokens for miniplc0.
//!
//! The tokenizer in [`super::tokenizer`] produces these; the analyser
//! consumes them through a one-token lookahead stream.

use c0_common::Span;
use serde::Serialize;
use std::fmt;

/// Token types for miniplc0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Keywords
    /// `fn` keyword.
    Fn,
    /// `let` keyword.
    Let,
    /// `const` keyword.
    Const,
    /// `as` keyword.
    As,
    /// `while` keyword.
    While,
    /// `if` keyword.
    If,
    /// `else` keyword.
    Else,
    /// `return` keyword.
    Return,
    /// `int` type.
    Int,
    /// `void` type.
    Void,

    // Literals and identifiers
    /// Unsigned integer literal.
    UintLiteral,
    /// String literal.
    StringLiteral,
    /// Identifier.
    Ident,

    // Operators
    /// Plus (+).
    Plus,
    /// Minus (-).
    Minus,
    /// Star (*).
    Mul,
    /// Slash (/).
    Div,
    /// Assignment (=).
    Assign,
    /// Equal (==).
    Eq,
    /// Not equal (!=).
    Neq,
    /// Less than (<).
    Lt,
    /// Greater than (>).
    Gt,
    /// Less or equal (<=).
    Le,
    /// Greater or equal (>=).
    Ge,

    // Delimiters
    /// Left parenthesis.
    LParen,
    /// Right parenthesis.
    RParen,
    /// Left brace.
    LBrace,
    /// Right brace.
    RBrace,
    /// Return type arrow (->).
    Arrow,
    /// Comma.
    Comma,
    /// Colon.
    Colon,
    /// Semicolon.
    Semicolon,

    /// End of input.
    Eof,
}

impl TokenKind {
    /// Get the keyword for a string, if it matches.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "fn" => Some(TokenKind::Fn),
            "let" => Some(TokenKind::Let),
            "const" => Some(TokenKind::Const),
            "as" => Some(TokenKind::As),
            "while" => Some(TokenKind::While),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "return" => Some(TokenKind::Return),
            "int" => Some(TokenKind::Int),
            "void" => Some(TokenKind::Void),
            _ => None,
        }
    }

    /// Get the operator or delimiter for its source text.
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "+" => Some(TokenKind::Plus),
            "-" => Some(TokenKind::Minus),
            "*" => Some(TokenKind::Mul),
            "/" => Some(TokenKind::Div),
            "=" => Some(TokenKind::Assign),
            "==" => Some(TokenKind::Eq),
            "!=" => Some(TokenKind::Neq),
            "<" => Some(TokenKind::Lt),
            ">" => Some(TokenKind::Gt),
            "<=" => Some(TokenKind::Le),
            ">=" => Some(TokenKind::Ge),
            "(" => Some(TokenKind::LParen),
            ")" => Some(TokenKind::RParen),
            "{" => Some(TokenKind::LBrace),
            "}" => Some(TokenKind::RBrace),
            "->" => Some(TokenKind::Arrow),
            "," => Some(TokenKind::Comma),
            ":" => Some(TokenKind::Colon),
            ";" => Some(TokenKind::Semicolon),
            _ => None,
        }
    }

    /// Name used in diagnostics and token dumps.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Fn => "'fn'",
            TokenKind::Let => "'let'",
            TokenKind::Const => "'const'",
            TokenKind::As => "'as'",
            TokenKind::While => "'while'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::Return => "'return'",
            TokenKind::Int => "'int'",
            TokenKind::Void => "'void'",
            TokenKind::UintLiteral => "UINT_LITERAL",
            TokenKind::StringLiteral => "STRING_LITERAL",
            TokenKind::Ident => "IDENT",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Mul => "'*'",
            TokenKind::Div => "'/'",
            TokenKind::Assign => "'='",
            TokenKind::Eq => "'=='",
            TokenKind::Neq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Le => "'<='",
            TokenKind::Ge => "'>='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Arrow => "'->'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Eof => "EOF",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TokenValue {
    /// Keywords, operators and end of input carry nothing.
    None,
    /// Value of an unsigned integer literal.
    Uint(u64),
    /// Identifier name or unescaped string contents.
    Text(String),
}

/// A token with its span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Token type.
    pub kind: TokenKind,
    /// Literal value or name.
    pub value: TokenValue,
    /// Source location.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, value: TokenValue, span: Span) -> Self {
        Self { kind, value, span }
    }

    /// Identifier name or string contents, empty for other tokens.
    pub fn text(&self) -> &str {
        match &self.value {
            TokenValue::Text(text) => text,
            _ => "",
        }
    }

    /// Integer literal value, zero for other tokens.
    pub fn uint(&self) -> u64 {
        match self.value {
            TokenValue::Uint(value) => value,
            _ => 0,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Line: {} Column: {} Type: {}",
            self.span.line, self.span.column, self.kind
        )?;
        match &self.value {
            TokenValue::None => Ok(()),
            TokenValue::Uint(value) => write!(f, " Value: {value}"),
            TokenValue::Text(text) => write!(f, " Value: {text:?}"),
        }
    }
}
