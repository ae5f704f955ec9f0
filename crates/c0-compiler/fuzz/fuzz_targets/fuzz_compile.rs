//! Fuzz target for the complete source-to-module pipeline.
//!
//! Any panic while tokenizing, analysing or encoding is a bug. Every module
//! that compiles must also decode back to itself.
//!
//! # Running
//!
//! ```bash
//! cd crates/c0-compiler
//! cargo +nightly fuzz run fuzz_compile
//! ```
//!
//! # Seeding
//!
//! ```bash
//! mkdir -p fuzz/corpus/fuzz_compile
//! cp ../../demos/*.c0 fuzz/corpus/fuzz_compile/
//! ```

#![no_main]

use c0_compiler::Compiler;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        if source.len() > 100_000 {
            return;
        }

        let compiler = Compiler::new();
        if let Ok(module) = compiler.analyse(source) {
            let bytes = compiler.emit(&module);
            assert_eq!(compiler.decode(&bytes).ok(), Some(module));
        }
    }
});
