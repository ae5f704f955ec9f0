//! Integration tests for the miniplc0 compiler.
//!
//! These tests verify the complete pipeline from source text to the binary
//! module, and read the result back through the decoder.

use c0_common::{CompileError, CompilerConfig, ErrorCode};
use c0_compiler::frontend::TokenKind;
use c0_compiler::instruction::Operation;
use c0_compiler::module::Module;
use c0_compiler::{compile, tokenize, Compiler};

fn compile_and_decode(source: &str) -> Module {
    let compiler = Compiler::new();
    let result = compiler.compile(source);
    assert!(result.is_ok(), "Compile failed: {:?}", result.err());
    let decoded = compiler.decode(&result.unwrap());
    assert!(decoded.is_ok(), "Decode failed: {:?}", decoded.err());
    decoded.unwrap()
}

fn body_ops(module: &Module, name: &str) -> Vec<Operation> {
    module
        .function(name)
        .unwrap_or_else(|| panic!("function {name} missing"))
        .body
        .iter()
        .map(|i| i.op)
        .collect()
}

/// Test compiling a program with globals, a loop and output.
#[test]
fn test_compile_counter_program() {
    let source = r#"
        const limit: int = 10;
        let total: int = 0;

        fn main() -> void {
            let i: int = 0;
            while i < limit {
                total = total + i;
                i = i + 1;
            }
            putstr("total: ");
            putint(total);
            putln();
        }
    "#;

    let result = compile(source);
    assert!(result.is_ok(), "Compile failed: {:?}", result.err());

    let bytes = result.unwrap();
    assert_eq!(&bytes[0..4], &[0x72, 0x30, 0x3b, 0x3e], "Invalid magic");
    assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x01], "Invalid version");
}

/// Test the function table layout of a multi-function program.
#[test]
fn test_function_table() {
    let module = compile_and_decode(
        r#"
        fn add(a: int, b: int) -> int { return a + b; }
        fn twice(x: int) -> int { return add(x, x); }
        fn main() -> void { putint(twice(21)); }
    "#,
    );

    assert_eq!(module.functions.len(), 4);
    assert_eq!(module.global_text(module.functions[0].name_id), Some("_start"));

    let add = module.function("add").unwrap();
    assert_eq!(add.param_slots, 2);
    assert_eq!(add.return_slots, 1);
    assert_eq!(add.local_slots, 0);

    let main = module.function("main").unwrap();
    assert_eq!(main.return_slots, 0);

    // _start ends by calling main with no result to drop
    let start = body_ops(&module, "_start");
    assert_eq!(start, vec![Operation::StackAlloc, Operation::Call]);
}

/// Test that locals in sibling and nested blocks each get a slot.
#[test]
fn test_local_slot_count() {
    let module = compile_and_decode(
        r"
        fn f() -> void {
            let a: int = 1;
            { let b: int = 2; }
            { let c: int = 3; { let d: int = 4; } }
        }
    ",
    );
    assert_eq!(module.function("f").unwrap().local_slots, 4);
}

/// Test that every branch lands inside its function body.
#[test]
fn test_branches_stay_in_bounds() {
    let module = compile_and_decode(
        r"
        fn classify(n: int) -> int {
            let result: int = 0;
            while n > 0 {
                if n >= 100 { result = result + 3; n = n - 100; }
                else if n >= 10 { result = result + 2; n = n - 10; }
                else if n != 0 { result = result + 1; n = n - 1; }
                else { n = 0; }
            }
            return result;
        }
    ",
    );

    let body = &module.function("classify").unwrap().body;
    let len = i64::try_from(body.len()).unwrap();
    for (pc, instruction) in body.iter().enumerate() {
        if instruction.op.is_branch() {
            let target = i64::try_from(pc).unwrap() + 1 + instruction.operand_or_zero();
            assert!(
                (0..=len).contains(&target),
                "branch at {pc} lands at {target}"
            );
        }
    }
}

/// Test that built-in calls reference their names in the global table.
#[test]
fn test_builtin_names_in_globals() {
    let module = compile_and_decode(
        r"
        fn main() -> void {
            let c: int = getchar();
            putchar(c);
            putint(getint());
            putint(getint());
        }
    ",
    );

    let names: Vec<&str> = module
        .functions
        .iter()
        .flat_map(|f| &f.body)
        .filter(|i| i.op == Operation::CallName)
        .map(|i| module.global_text(u32::try_from(i.operand_or_zero()).unwrap()).unwrap())
        .collect();
    assert_eq!(names, vec!["getchar", "putchar", "getint", "putint", "getint", "putint"]);

    // One global per builtin name
    let getint_globals = module.globals.iter().filter(|g| g.value == b"getint").count();
    assert_eq!(getint_globals, 1);
}

/// Test that a user function shadows a builtin of the same name.
#[test]
fn test_user_function_shadows_builtin() {
    let module = compile_and_decode(
        r"
        fn putint(x: int) -> void { }
        fn main() -> void { putint(1); }
    ",
    );
    let main = body_ops(&module, "main");
    assert!(main.contains(&Operation::Call));
    assert!(!main.contains(&Operation::CallName));
}

/// Test that disabling the library leaves builtin names undeclared.
#[test]
fn test_builtins_disabled() {
    let mut config = CompilerConfig::default();
    config.library.builtins = false;
    let compiler = Compiler::with_config(config);

    let err = compiler.analyse("fn main() -> void { putln(); }").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NotDeclared));
}

/// Test that a program without main still gets a start function.
#[test]
fn test_library_without_main() {
    let module = compile_and_decode("let a: int = 5; fn helper() -> int { return a; }");
    let start = body_ops(&module, "_start");
    assert_eq!(
        start,
        vec![Operation::GlobA, Operation::Push, Operation::Store64]
    );
}

/// Test that tokenizing reports positions of every lexeme.
#[test]
fn test_tokenize_positions() {
    let tokens = tokenize("fn main() -> void {\n  putstr(\"a\\n\");\n}").unwrap();
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Fn,
            TokenKind::Ident,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Arrow,
            TokenKind::Void,
            TokenKind::LBrace,
            TokenKind::Ident,
            TokenKind::LParen,
            TokenKind::StringLiteral,
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::RBrace,
        ]
    );
    let string = &tokens[9];
    assert_eq!(string.text(), "a\n");
    assert_eq!((string.span.line, string.span.column), (2, 10));
}

/// Test that each failure stage reports its own error kind.
#[test]
fn test_error_kinds() {
    let cases = [
        ("let a: int = 99999999999999999999;", ErrorCode::IntegerOverflow),
        ("let s: int = \"open;", ErrorCode::UnterminatedString),
        ("fn f() -> void { putstr(\"\\q\"); }", ErrorCode::InvalidEscape),
        ("let a: int = #;", ErrorCode::InvalidInput),
        ("fn f() -> void { g(); }", ErrorCode::NotDeclared),
        ("const k: int = 1; fn f() -> void { k = 2; }", ErrorCode::AssignToConstant),
    ];
    for (source, code) in cases {
        let err = Compiler::new().analyse(source).unwrap_err();
        assert_eq!(err.code(), Some(code), "source: {source}");
    }

    let err = Compiler::new().analyse("let a int;").unwrap_err();
    assert!(matches!(err, CompileError::ExpectedToken { .. }));
    assert_eq!(err.code(), None);
}

/// Test that compilation is deterministic.
#[test]
fn test_deterministic_output() {
    let source = r#"
        let g: int = 3;
        fn main() -> void { putstr("x"); putint(g * 2 - 1); }
    "#;
    assert_eq!(compile(source).unwrap(), compile(source).unwrap());
}
