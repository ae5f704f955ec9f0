//! Acceptance tests for compiled program behavior.
//!
//! Every program goes through the full pipeline: source, module, binary
//! encoding, decoding and execution. The interpreter in `common` implements
//! the navm instructions the compiler emits.

mod common;
mod programs_test;
mod stress_test;
