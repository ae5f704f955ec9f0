//! Frontend module for miniplc0 source text.
//!
//! This module contains:
//! - [`lexer`] - Token definitions
//! - [`tokenizer`] - pest-driven tokenizer and the lookahead token stream

pub mod lexer;
pub mod tokenizer;

pub use lexer::*;
pub use tokenizer::*;
