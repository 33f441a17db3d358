use itertools::Itertools;
use pretty_assertions::assert_eq;
use stream_regex_parser::Parser;

use super::{CompileError, Compiled, Compiler, PostfixKind};

fn compile(pattern: &str) -> Compiled {
    let ast = Parser::new()
        .build_ast(pattern)
        .unwrap_or_else(|err| panic!("pattern `{pattern}` failed: {err}"));
    Compiler::new()
        .compile(&ast)
        .unwrap_or_else(|err| panic!("pattern `{pattern}` failed: {err}"))
}

fn compile_err(pattern: &str) -> CompileError {
    let ast = Parser::new().build_ast(pattern).unwrap();
    Compiler::new().compile(&ast).err().unwrap_or_else(|| {
        panic!("pattern `{pattern}` compiled but shouldn't have")
    })
}

/// Renders the postfix sequence as a compact string for assertions.
fn postfix(pattern: &str) -> String {
    compile(pattern).instructions.iter().map(|i| i.to_string()).join(" ")
}

#[test]
fn concatenation_and_alternation() {
    assert_eq!(postfix("ab"), "'a' 'b' .");
    assert_eq!(postfix("abc"), "'a' 'b' . 'c' .");
    assert_eq!(postfix("a|b"), "'a' 'b' |");
    assert_eq!(postfix("ab|cd"), "'a' 'b' . 'c' 'd' . |");
    // Left-associative in source order.
    assert_eq!(postfix("a|b|c"), "'a' 'b' | 'c' |");
}

#[test]
fn simple_quantifiers() {
    assert_eq!(postfix("a?"), "'a' ?");
    assert_eq!(postfix("a*"), "'a' *");
    assert_eq!(postfix("a+b"), "'a' + 'b' .");
    assert_eq!(postfix("(a|b)+c"), "'a' 'b' | + 'c' .");
}

#[test]
fn lazy_suffix_is_ignored() {
    assert_eq!(postfix("a*?"), postfix("a*"));
    assert_eq!(postfix("a+?"), postfix("a+"));
}

#[test]
fn counted_repetition_expands_eagerly() {
    assert_eq!(postfix("a{3}"), "'a' 'a' . 'a' .");
    assert_eq!(postfix("a{2,4}"), "'a' 'a' . 'a' ? . 'a' ? .");
    assert_eq!(postfix("a{0,2}"), "'a' ? 'a' ? .");
    // `{m,}` always expands to `m` mandatory copies plus one `*` copy.
    assert_eq!(postfix("a{2,}"), "'a' 'a' . 'a' * .");
    assert_eq!(postfix("a{0,}"), "'a' *");
    // A whole group is duplicated just like a single operand.
    assert_eq!(postfix("(ab){2}"), "'a' 'b' . 'a' 'b' . .");
}

#[test]
fn counted_repetition_of_zero_vanishes() {
    assert_eq!(postfix("ab{0}"), "'a'");
    assert!(matches!(compile_err("a{0}"), CompileError::EmptyPattern));
}

#[test]
fn invalid_quantifier_range() {
    assert!(matches!(
        compile_err("a{3,1}"),
        CompileError::InvalidQuantifier { quantifier } if quantifier == "{3,1}"
    ));
}

#[test]
fn empty_patterns_are_rejected() {
    assert!(matches!(compile_err(""), CompileError::EmptyPattern));
    assert!(matches!(compile_err("^"), CompileError::EmptyPattern));
}

#[test]
fn empty_alternative_makes_the_other_side_optional() {
    assert_eq!(postfix("a|"), "'a' ?");
    assert_eq!(postfix("|a"), "'a' ?");
}

#[test]
fn start_anchor() {
    assert!(compile("^ab").has_start_anchor);
    assert!(!compile("ab").has_start_anchor);
    // Only the top-level expression can anchor the pattern; a `^` inside
    // a group neither sets nor clears the flag.
    assert!(compile("^(a)b").has_start_anchor);
    assert!(!compile("(^a)b").has_start_anchor);
}

#[test]
fn end_anchor_truncates_the_rest_of_the_sequence() {
    let compiled = compile("ab$");
    assert!(compiled.has_end_anchor);

    // `$` is only recognized as a trailing anchor; everything after it in
    // the same sequence is silently dropped.
    let compiled = compile("a$bc");
    assert!(compiled.has_end_anchor);
    assert_eq!(
        compiled.instructions.iter().map(|i| i.to_string()).join(" "),
        "'a'"
    );
}

#[test]
fn escaped_dollar_is_a_literal() {
    let compiled = compile(r"a\$b");
    assert!(!compiled.has_end_anchor);
    assert_eq!(
        compiled.instructions.iter().map(|i| i.to_string()).join(" "),
        "'a' '$' . 'b' ."
    );
}

#[test]
fn character_classes_expand_to_unions() {
    assert_eq!(
        postfix(r"\d"),
        "'0' '1' | '2' | '3' | '4' | '5' | '6' | '7' | '8' | '9' |"
    );

    // 26 + 26 + 10 + 1 operands, interleaved with one `|` less.
    let compiled = compile(r"\w");
    assert_eq!(compiled.instructions.len(), 63 + 62);

    // Six whitespace operands joined by five `|`.
    let compiled = compile(r"\s");
    assert_eq!(compiled.instructions.len(), 11);
}

#[test]
fn negated_classes_are_single_operands() {
    for (pattern, member_count) in
        [(r"\W", 63), (r"\D", 10), (r"\S", 6)]
    {
        let compiled = compile(pattern);
        assert_eq!(compiled.instructions.len(), 1, "pattern `{pattern}`");
        match &compiled.instructions[0].kind {
            PostfixKind::Operand(matcher) => {
                assert!(matcher.negated);
                assert_eq!(
                    matcher.values.len(),
                    member_count,
                    "pattern `{pattern}`"
                );
            }
            other => panic!("expected an operand, got {other:?}"),
        }
    }
}

#[test]
fn ranges_expand_per_code_point() {
    assert_eq!(postfix("[a-c]"), "'a' 'b' | 'c' |");
    assert_eq!(postfix("[abc]"), "'a' 'b' | 'c' |");
    assert_eq!(postfix("[aX]"), "'a' 'X' |");
}

#[test]
fn negated_group_folds_into_one_operand() {
    assert_eq!(postfix("[^ab]"), "!{a,b}");
    assert_eq!(postfix("[^a-c_]"), "!{a,b,c,_}");
}

#[test]
fn any_char_is_the_negation_of_the_empty_grapheme() {
    assert_eq!(postfix("."), "!{}");

    let compiled = compile(".");
    let PostfixKind::Operand(matcher) = &compiled.instructions[0].kind else {
        panic!("expected an operand");
    };
    assert!(matcher.matches("x"));
    assert!(matcher.matches("👍"));
    assert!(!matcher.matches(""));
}

#[test]
fn negated_group_matches_absence() {
    let compiled = compile("[^ab]");
    let PostfixKind::Operand(matcher) = &compiled.instructions[0].kind else {
        panic!("expected an operand");
    };
    assert!(matcher.matches("c"));
    assert!(matcher.matches("👍"));
    assert!(!matcher.matches("a"));
    assert!(!matcher.matches("b"));
}

#[test]
fn case_folding_happens_at_compile_time() {
    let ast = Parser::new().build_ast("AB").unwrap();
    let compiled =
        Compiler::new().ignore_case(true).compile(&ast).unwrap();
    assert_eq!(
        compiled.instructions.iter().map(|i| i.to_string()).join(" "),
        "'a' 'b' ."
    );
}

#[test]
fn group_with_alternation_inside() {
    assert_eq!(postfix("x(a|b)y"), "'x' 'a' 'b' | . 'y' .");
    // `?:` carries no semantic effect.
    assert_eq!(postfix("x(?:a|b)y"), "'x' 'a' 'b' | . 'y' .");
}

#[test]
fn multi_codepoint_characters_are_single_operands() {
    assert_eq!(postfix("😄👍"), "'😄' '👍' .");
}
