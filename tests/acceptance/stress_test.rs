//! Large generated programs.
//!
//! These tests push the single-pass compiler past the sizes seen in hand
//! written programs: long operator chains, deep nesting, many functions and
//! long-running loops.

use super::common::{output_of, run_program};
use std::fmt::Write;

/// Test a long alternating chain of all four operators.
#[test]
fn test_long_operator_chain() {
    // 1 + 2 * 3 - 4 / 2 + 2 * 3 - 4 / 2 ... evaluated left to right by terms
    let mut expr = String::from("1");
    let mut expected: i64 = 1;
    for _ in 0..200 {
        expr.push_str(" + 2 * 3 - 4 / 2");
        expected += 2 * 3 - 4 / 2;
    }
    let source = format!("fn main() -> void {{ putint({expr}); }}");
    assert_eq!(output_of(&source, &[]), expected.to_string());
}

/// Test deeply nested parentheses.
#[test]
fn test_deep_grouping() {
    let depth = 64;
    let source = format!(
        "fn main() -> void {{ putint({}1{}); }}",
        "(".repeat(depth),
        " + 1)".repeat(depth)
    );
    assert_eq!(output_of(&source, &[]), (depth + 1).to_string());
}

/// Test deeply nested blocks and ifs.
#[test]
fn test_deep_nesting() {
    let depth = 40;
    let mut body = String::new();
    for level in 0..depth {
        let _ = write!(body, "if {level} < {depth} {{ let v{level}: int = {level}; ");
    }
    body.push_str("putint(v0 + v39);");
    body.push_str(&" }".repeat(depth));
    let source = format!("fn main() -> void {{ {body} }}");
    assert_eq!(output_of(&source, &[]), "39");
}

/// Test a chain of many functions calling each other.
#[test]
fn test_many_functions() {
    let count = 100;
    let mut source = String::from("fn f0(x: int) -> int { return x + 1; }\n");
    for i in 1..count {
        let _ = writeln!(source, "fn f{i}(x: int) -> int {{ return f{}(x) + 1; }}", i - 1);
    }
    let _ = writeln!(source, "fn main() -> void {{ putint(f{}(0)); }}", count - 1);
    assert_eq!(output_of(&source, &[]), count.to_string());
}

/// Test a long-running loop stays within stack bounds.
#[test]
fn test_long_loop_stack_is_stable() {
    let source = r"
        fn main() -> void {
            let i: int = 0;
            let sum: int = 0;
            while i < 10000 {
                sum = sum + i;
                i = i + 1;
            }
            putint(sum);
        }
    ";
    let result = run_program(source, &[]);
    assert_eq!(result.output, "49995000");
    assert!(result.peak_stack < 16, "stack grew to {}", result.peak_stack);
}

/// Test deep recursion.
#[test]
fn test_deep_recursion() {
    let source = r"
        fn depth(n: int) -> int {
            if n == 0 { return 0; }
            return depth(n - 1) + 1;
        }
        fn main() -> void { putint(depth(2000)); }
    ";
    assert_eq!(output_of(source, &[]), "2000");
}
