//! Fuzz target for the tokenizer.
//!
//! Integer literals, escapes and unterminated strings are the usual sources
//! of overflow and slicing bugs.
//!
//! # Running
//!
//! ```bash
//! cd crates/c0-compiler
//! cargo +nightly fuzz run fuzz_lex
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if s.len() > 10_000 {
            return;
        }

        let _ = c0_compiler::tokenize(s);

        // Same bytes inside a string literal, to reach the escape decoder
        let quoted = format!("\"{s}\"");
        let _ = c0_compiler::tokenize(&quoted);
    }
});
