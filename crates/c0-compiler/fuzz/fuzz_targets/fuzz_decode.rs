//! Fuzz target for the binary module reader.
//!
//! # Running
//!
//! ```bash
//! cd crates/c0-compiler
//! cargo +nightly fuzz run fuzz_decode
//! ```

#![no_main]

use c0_common::ModuleConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let header = ModuleConfig::default();
    if let Ok(module) = c0_compiler::binary::decode(data, &header) {
        let bytes = c0_compiler::binary::emit(&module, &header);
        assert_eq!(c0_compiler::binary::decode(&bytes, &header).ok(), Some(module));
    }
});
