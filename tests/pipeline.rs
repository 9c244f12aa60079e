// End-to-end tests for the herc pipeline.

use herc::parser::ParseError;
use herc::{compile, compile_with_options, CompileError, CompileOptions};

const GREETER: &str = r#"
# A small program that exercises every statement form.
start:
    set total
    greet "Ada"
    greet name
    say "total: ", total
    say "no newline" end=" "
    farewell
end

function greet who:
    say "Hello, ", who, "!"
end

function farewell:
    say "bye"
end
"#;

#[test]
fn compiles_a_complete_program() {
    let cpp = compile(GREETER).expect("compile");

    assert!(cpp.starts_with("#include <iostream>\n#include <string>\n"));
    let greet = concat!(
        "void greet(auto who) {\n",
        "    std::cout << \"Hello, \" << who << \"!\" << std::endl;\n",
        "}\n",
    );
    assert!(cpp.contains(greet), "{cpp}");
    assert!(cpp.contains("void farewell() {\n"));
    assert!(cpp.contains("    auto total = 0;\n"));
    assert!(cpp.contains("    greet(\"Ada\");\n"));
    assert!(cpp.contains("    greet(name);\n"));
    assert!(cpp.contains("    std::cout << \"total: \" << total << std::endl;\n"));
    assert!(cpp.contains("    std::cout << \"no newline\" << \" \";\n"));
    assert!(cpp.contains("    farewell();\n    return 0;\n}\n"));
}

#[test]
fn definitions_precede_the_entry_point() {
    let cpp = compile(GREETER).expect("compile");
    let main_at = cpp.find("int main()").expect("main");
    for function in ["void greet(", "void farewell("] {
        let at = cpp.find(function).expect("function emitted");
        assert!(at < main_at, "{function} should come before main");
    }
}

#[test]
fn compiling_twice_is_byte_identical() {
    assert_eq!(compile(GREETER).expect("first"), compile(GREETER).expect("second"));
}

#[test]
fn indentation_does_not_affect_output() {
    let flat = GREETER
        .lines()
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(compile(&flat).expect("flat"), compile(GREETER).expect("indented"));
}

#[test]
fn unterminated_string_fails_with_line_number() {
    let err = compile("start:\n    say \"fine\"\n    say \"oops\nend\n").expect_err("should fail");
    assert!(matches!(err, CompileError::Lex(_)), "{err:?}");
    assert_eq!(err.line(), 3);
}

#[test]
fn every_parse_error_carries_a_line() {
    let cases = [
        ("start\nend\n", 1),
        ("function f x y:\nend\n", 1),
        ("start:\n\n    say \"a\" = \"b\"\nend\n", 3),
        ("start:\n    say \"never closed\"\n", 2),
    ];
    for (source, line) in cases {
        let err = compile(source).expect_err(source);
        assert!(matches!(err, CompileError::Parse(_)), "{source}: {err:?}");
        assert_eq!(err.line(), line, "{source}: {err}");
    }
}

#[test]
fn reserved_keywords_do_not_reject_a_program() {
    let cpp = compile("if\nstart:\n    else\n    say \"hi\"\nend\n").expect("compile");
    assert!(cpp.contains("int main() {"), "{cpp}");
    assert!(cpp.contains("    std::cout << \"hi\" << std::endl;\n"), "{cpp}");
    assert!(!cpp.contains("else"), "{cpp}");
}

#[test]
fn block_limit_is_configurable() {
    let source = "start:\n    a\n    b\n    c\nend\n";
    let options = CompileOptions {
        max_block_statements: 3,
    };
    assert!(compile_with_options(source, &options).is_ok());

    let options = CompileOptions {
        max_block_statements: 1,
    };
    let err = compile_with_options(source, &options).expect_err("limit");
    assert!(matches!(
        err,
        CompileError::Parse(ParseError::BlockLimitExceeded { limit: 1, .. })
    ));
}
