#![allow(clippy::cognitive_complexity)]

use crate::test::parse_rule;
use crate::{CParser, Rule};
use ::pest::*;

#[test]
fn ident() {
    parses_to! {
        parser: CParser,
        input: "x42_",
        rule: Rule::ident,
        tokens: [ ident(0, 4) ]
    };
    fails_with! {
        parser: CParser,
        input: "42x",
        rule: Rule::ident,
        positives: vec![Rule::ident],
        negatives: vec![],
        pos: 0
    };
    // Keywords are not identifiers.
    assert!(parse_rule(Rule::ident, "int").is_err());
    assert!(parse_rule(Rule::ident, "return").is_err());
}

#[test]
fn number() {
    parses_to! {
        parser: CParser,
        input: "0x1F",
        rule: Rule::number,
        tokens: [ number(0, 4) ]
    };
    parses_to! {
        parser: CParser,
        input: "1.5e3",
        rule: Rule::number,
        tokens: [ number(0, 5) ]
    };
}

#[test]
fn string() {
    parses_to! {
        parser: CParser,
        input: "\"hi\"",
        rule: Rule::string,
        tokens: [ string(0, 4, [ string_inner(1, 3) ]) ]
    };
}

#[test]
fn assignment() {
    parses_to! {
        parser: CParser,
        input: "x += 2",
        rule: Rule::assignment,
        tokens: [ assignment(0, 6, [
            ident(0, 1),
            assign_op(2, 4),
            expr(5, 6, [ binary(5, 6, [ unary(5, 6, [ postfix(5, 6, [ number(5, 6) ]) ]) ]) ])
        ]) ]
    };
}

#[test]
fn call() {
    parses_to! {
        parser: CParser,
        input: "f(1, x)",
        rule: Rule::call,
        tokens: [ call(0, 7, [
            ident(0, 1),
            arg_list(2, 6, [
                expr(2, 3, [ binary(2, 3, [ unary(2, 3, [ postfix(2, 3, [ number(2, 3) ]) ]) ]) ]),
                expr(5, 6, [ binary(5, 6, [ unary(5, 6, [ postfix(5, 6, [ ident(5, 6) ]) ]) ]) ])
            ])
        ]) ]
    };
}

#[test]
fn while_statement() {
    parses_to! {
        parser: CParser,
        input: "while (x) { }",
        rule: Rule::while_stmt,
        tokens: [ while_stmt(0, 13, [
            expr(7, 8, [ binary(7, 8, [ unary(7, 8, [ postfix(7, 8, [ ident(7, 8) ]) ]) ]) ]),
            block(10, 13)
        ]) ]
    };
}

#[test]
fn accepted_programs() {
    let sources = [
        "void main() { }",
        "int f(void); void main() { int x; x = 1; }",
        "void main() { for (int i = 0; i < 3; ++i) print(i); }",
        "struct MindustryObject b; void main() { b = get_link(0); }",
        "void main() { if (1) { } else { } do ; while (0); }",
        "// comment\n#pragma once\nvoid main() { /* block */ }",
        "unsigned int f() { return 0; } void main() { f(); }",
        "void main() { int a = 1, b = 2; a = a << b; }",
    ];
    for source in &sources {
        assert!(
            parse_rule(Rule::program, source).is_ok(),
            "failed to parse: {}",
            source
        );
    }
}

#[test]
fn rejected_programs() {
    let sources = [
        // logical operators have no opcode mapping
        "void main() { int x = 1 && 2; }",
        // ternary
        "void main() { int x = 1 ? 2 : 3; }",
        // array subscript
        "void main() { int a; a[0] = 1; }",
        // pointer dereference
        "void main() { int p; *p = 1; }",
        "void main() { int x = ; }",
        "void main() { ",
    ];
    for source in &sources {
        assert!(
            parse_rule(Rule::program, source).is_err(),
            "should not parse: {}",
            source
        );
    }
}
