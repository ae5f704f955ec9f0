//! Single-pass miniplc0 compiler targeting the navm stack virtual machine.
//!
//! This crate provides:
//! - [`frontend`] - tokenizer and token stream
//! - [`analyser`] - recursive-descent parser that checks and generates code
//! - [`symbols`] - scoped symbol table and module builder
//! - [`operator`] - deferred binary operator emission
//! - [`control_flow`] - branch assembly for `if` and `while`
//! - [`binary`] - module encoder and decoder
//!
//! # Example
//!
//! ```
//! use c0_compiler::compile;
//!
//! let source = r#"
//!     let x: int = 1;
//!     fn main() -> void {
//!         x = x + 1;
//!         putint(x);
//!     }
//! "#;
//!
//! let module = compile(source).expect("Compilation failed");
//! assert_eq!(&module[..4], &[0x72, 0x30, 0x3b, 0x3e]);
//! ```

pub mod analyser;
pub mod binary;
pub mod control_flow;
pub mod frontend;
pub mod instruction;
pub mod module;
pub mod operator;
pub mod symbols;

use anyhow::Context;
use c0_common::{CompileResult, CompilerConfig};
use frontend::Token;
use module::Module;
use std::io::Write;
use tracing::debug;

/// Compile miniplc0 source to a binary module with the default configuration.
///
/// For more control, use [`Compiler`] directly.
///
/// # Errors
///
/// Returns the first lexical, syntax or semantic error.
pub fn compile(source: &str) -> anyhow::Result<Vec<u8>> {
    Compiler::new().compile(source)
}

/// Analyse source into an in-memory module with the default configuration.
///
/// # Errors
///
/// Returns the first lexical, syntax or semantic error.
pub fn analyse(source: &str) -> CompileResult<Module> {
    Compiler::new().analyse(source)
}

/// Split source into tokens, excluding the end-of-file marker.
///
/// # Errors
///
/// Returns the first lexical error.
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
    frontend::tokenize(source)
}

/// The main compiler driver.
#[derive(Debug, Default)]
pub struct Compiler {
    /// Header, entry and library settings.
    pub config: CompilerConfig,
}

impl Compiler {
    /// Create a compiler with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler with the given configuration.
    pub fn with_config(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Split source into tokens.
    ///
    /// # Errors
    ///
    /// Returns the first lexical error.
    pub fn tokenize(&self, source: &str) -> CompileResult<Vec<Token>> {
        frontend::tokenize(source)
    }

    /// Parse, check and generate code in one pass.
    ///
    /// # Errors
    ///
    /// Returns the first lexical, syntax or semantic error.
    pub fn analyse(&self, source: &str) -> CompileResult<Module> {
        analyser::analyse(source, &self.config)
    }

    /// Encode a module with the configured header.
    pub fn emit(&self, module: &Module) -> Vec<u8> {
        binary::emit(module, &self.config.module)
    }

    /// Encode a module into `sink`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the sink.
    pub fn write_module<W: Write>(&self, module: &Module, sink: W) -> std::io::Result<()> {
        binary::write_module(module, &self.config.module, sink)
    }

    /// Decode a module encoded with the configured header.
    ///
    /// # Errors
    ///
    /// Returns a [`binary::DecodeError`] for malformed input.
    pub fn decode(&self, bytes: &[u8]) -> Result<Module, binary::DecodeError> {
        binary::decode(bytes, &self.config.module)
    }

    /// Compile source to a binary module.
    ///
    /// # Errors
    ///
    /// Returns the first lexical, syntax or semantic error.
    pub fn compile(&self, source: &str) -> anyhow::Result<Vec<u8>> {
        // 1. Analyse source into a module
        let module = self.analyse(source).context("Compilation failed")?;

        // 2. Encode the module
        let bytes = self.emit(&module);

        debug!(
            functions = module.functions.len(),
            globals = module.globals.len(),
            bytes = bytes.len(),
            "Module emitted"
        );
        Ok(bytes)
    }
}
