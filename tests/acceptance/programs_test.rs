//! Behavioral acceptance tests.
//!
//! Each program is compiled, encoded, decoded and executed on the reference
//! interpreter; the test checks what the program printed.

use super::common::{output_of, run_program};

const FACT: &str = include_str!("../../demos/fact.c0");
const FIB: &str = include_str!("../../demos/fib.c0");
const GRADE: &str = include_str!("../../demos/grade.c0");
const GCD: &str = include_str!("../../demos/gcd.c0");

/// Test operator precedence, grouping and unary minus.
#[test]
fn test_arithmetic_precedence() {
    let source = r"
        fn main() -> void {
            putint(1 + 2 * 3); putln();
            putint((1 + 2) * 3); putln();
            putint(8 - 4 - 2); putln();
            putint(2 * (3 + 4 * 5) - 1); putln();
            putint(-2 * 3 + 1); putln();
            putint(10 - -3); putln();
            putint(7 / 2); putln();
            putint(-7 / 2); putln();
            putint(100 / 10 / 5); putln();
        }
    ";
    assert_eq!(output_of(source, &[]), "7\n9\n2\n45\n-5\n13\n3\n-3\n2\n");
}

/// Test every relational operator in both outcomes.
#[test]
fn test_relations() {
    let source = r"
        fn show(a: int, b: int) -> void {
            if a == b { putchar(61); } else { putchar(46); }
            if a != b { putchar(33); } else { putchar(46); }
            if a < b { putchar(60); } else { putchar(46); }
            if a > b { putchar(62); } else { putchar(46); }
            if a <= b { putchar(108); } else { putchar(46); }
            if a >= b { putchar(103); } else { putchar(46); }
            putln();
        }
        fn main() -> void {
            show(1, 2);
            show(2, 2);
            show(3, 2);
            show(-1, 1);
        }
    ";
    assert_eq!(output_of(source, &[]), ".!<.l.\n=...lg\n.!.>.g\n.!<.l.\n");
}

/// Test a bare expression used as a condition.
#[test]
fn test_truthy_condition() {
    let source = r"
        fn main() -> void {
            let n: int = 3;
            while n { putint(n); n = n - 1; }
            if n { putint(99); } else { putint(0); }
        }
    ";
    assert_eq!(output_of(source, &[]), "3210");
}

/// Test recursion through the factorial demo.
#[test]
fn test_factorial() {
    assert_eq!(output_of(FACT, &[5]), "120\n");
    assert_eq!(output_of(FACT, &[1]), "1\n");
    assert_eq!(output_of(FACT, &[20]), "2432902008176640000\n");
}

/// Test loops with block-local declarations.
#[test]
fn test_fibonacci() {
    assert_eq!(output_of(FIB, &[]), "0\n1\n1\n2\n3\n5\n8\n13\n21\n34\n");
}

/// Test an if/else-if chain driven by input.
#[test]
fn test_grades() {
    let output = output_of(GRADE, &[95, 85, 72, 10, 90, -1]);
    assert_eq!(output, "95: A\n85: B\n72: C\n10: F\n90: A\n");
}

/// Test globals updated from a recursive function.
#[test]
fn test_gcd_counts_calls() {
    assert_eq!(output_of(GCD, &[48, 18]), "6 in 5 calls\n");
    assert_eq!(output_of(GCD, &[7, 7]), "7 in 1 calls\n");
}

/// Test that global initializers run before main, in order.
#[test]
fn test_global_initializers() {
    let source = r"
        let a: int = 2;
        const b: int = a * 10;
        let c: int = getint();
        fn main() -> void { putint(a + b + c); }
    ";
    assert_eq!(output_of(source, &[100]), "122");
}

/// Test parameters, locals and shadowing in nested blocks.
#[test]
fn test_scopes_and_shadowing() {
    let source = r"
        let x: int = 1;
        fn f(y: int) -> int {
            let x: int = 10;
            {
                let x: int = 100;
                y = y + x;
            }
            return x + y;
        }
        fn main() -> void {
            putint(f(5));
            putchar(32);
            putint(x);
        }
    ";
    assert_eq!(output_of(source, &[]), "115 1");
}

/// Test that void calls and ignored results leave the caller intact.
#[test]
fn test_call_results_discarded() {
    let source = r"
        let hits: int = 0;
        fn bump() -> int { hits = hits + 1; return hits; }
        fn main() -> void {
            let i: int = 0;
            while i < 500 { bump(); i = i + 1; }
            putint(hits);
        }
    ";
    let result = run_program(source, &[]);
    assert_eq!(result.output, "500");
    assert!(result.peak_stack < 16, "stack grew to {}", result.peak_stack);
}

/// Test string literals and character output.
#[test]
fn test_strings() {
    let source = r#"
        fn main() -> void {
            putstr("tab\there");
            putln();
            putstr("quote \"q\" and backslash \\");
        }
    "#;
    assert_eq!(
        output_of(source, &[]),
        "tab\there\nquote \"q\" and backslash \\"
    );
}

/// Test an early return from inside a loop.
#[test]
fn test_return_from_loop() {
    let source = r"
        fn first_multiple(n: int, of: int) -> int {
            while 1 {
                if n / of * of == n { return n; }
                n = n + 1;
            }
            return 0;
        }
        fn main() -> void { putint(first_multiple(22, 7)); }
    ";
    assert_eq!(output_of(source, &[]), "28");
}

/// Test that main returning int still terminates cleanly.
#[test]
fn test_int_main() {
    let result = run_program("fn main() -> int { putint(4); return 4; }", &[]);
    assert_eq!(result.output, "4");
}

/// Test that a program without main only runs initializers.
#[test]
fn test_no_main() {
    let result = run_program("let a: int = getint();", &[3]);
    assert!(result.output.is_empty());
    assert_eq!(result.steps, 4);
}
