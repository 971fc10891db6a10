//! Lexer edge cases and error tests.

mod common;

use brightscript_rs::token::{Literal, Position};
use brightscript_rs::{LexErrorKind, Lexeme, scan};
use common::kinds;

// -----------------------------------------------------------
// Basic lexer behaviour.
// -----------------------------------------------------------

#[test]
fn lex_only_whitespace_and_comments() {
    assert_eq!(
        kinds("  \t ' a comment\n\r\n"),
        vec![Lexeme::Newline, Lexeme::Newline, Lexeme::Eof]
    );
}

#[test]
fn lex_byte_order_mark_is_skipped() {
    let tokens = scan("\u{feff}print 1", "bom.brs").tokens;
    assert_eq!(tokens[0].kind, Lexeme::Print);
    assert_eq!(tokens[0].location.start, Position::new(1, 1));
}

#[test]
fn lex_question_mark_is_print() {
    assert_eq!(
        kinds("? 1"),
        vec![Lexeme::Print, Lexeme::Integer, Lexeme::Eof]
    );
}

#[test]
fn lex_keywords_are_case_insensitive() {
    assert_eq!(
        kinds("IF x THEN"),
        vec![Lexeme::If, Lexeme::Identifier, Lexeme::Then, Lexeme::Eof]
    );
}

#[test]
fn lex_compound_assignment_operators() {
    assert_eq!(
        kinds("+= -= *= /= \\= <<= >>="),
        vec![
            Lexeme::PlusEqual,
            Lexeme::MinusEqual,
            Lexeme::StarEqual,
            Lexeme::SlashEqual,
            Lexeme::BackslashEqual,
            Lexeme::LeftShiftEqual,
            Lexeme::RightShiftEqual,
            Lexeme::Eof,
        ]
    );
}

#[test]
fn lex_increment_operators() {
    assert_eq!(
        kinds("i++\nj--"),
        vec![
            Lexeme::Identifier,
            Lexeme::PlusPlus,
            Lexeme::Newline,
            Lexeme::Identifier,
            Lexeme::MinusMinus,
            Lexeme::Eof,
        ]
    );
}

#[test]
fn lex_end_while_and_end_try() {
    assert_eq!(
        kinds("end while\nend   try\nexit for"),
        vec![
            Lexeme::EndWhile,
            Lexeme::Newline,
            Lexeme::EndTry,
            Lexeme::Newline,
            Lexeme::ExitFor,
            Lexeme::Eof,
        ]
    );
}

#[test]
fn lex_for_without_each_stays_for() {
    assert_eq!(
        kinds("for i"),
        vec![Lexeme::For, Lexeme::Identifier, Lexeme::Eof]
    );
}

#[test]
fn lex_keyword_after_dot_is_still_a_keyword_token() {
    let tokens = scan("aa.next", "test.brs").tokens;
    assert_eq!(tokens[1].kind, Lexeme::Dot);
    assert_eq!(tokens[2].kind, Lexeme::Next);
    assert!(tokens[2].kind.is_keyword());
}

// -----------------------------------------------------------
// Literals.
// -----------------------------------------------------------

#[test]
fn lex_string_with_escaped_quote() {
    let tokens = scan(r#""say ""hi""""#, "test.brs").tokens;
    assert_eq!(tokens[0].kind, Lexeme::String);
    assert_eq!(
        tokens[0].literal,
        Some(Literal::String("say \"hi\"".to_string()))
    );
}

#[test]
fn lex_boolean_and_invalid_literals() {
    let tokens = scan("true False INVALID", "test.brs").tokens;
    assert_eq!(tokens[0].literal, Some(Literal::Boolean(true)));
    assert_eq!(tokens[1].literal, Some(Literal::Boolean(false)));
    assert_eq!(tokens[2].literal, Some(Literal::Invalid));
}

#[test]
fn lex_numeric_literal_kinds() {
    let tokens = scan("7 7% 7& 7! 7# 1.5 1.5# 2e3 2d3 .25", "test.brs").tokens;
    let expected = [
        (Lexeme::Integer, Literal::Integer(7)),
        (Lexeme::Integer, Literal::Integer(7)),
        (Lexeme::LongInteger, Literal::LongInteger(7)),
        (Lexeme::Float, Literal::Float(7.0)),
        (Lexeme::Double, Literal::Double(7.0)),
        (Lexeme::Float, Literal::Float(1.5)),
        (Lexeme::Double, Literal::Double(1.5)),
        (Lexeme::Float, Literal::Float(2000.0)),
        (Lexeme::Double, Literal::Double(2000.0)),
        (Lexeme::Float, Literal::Float(0.25)),
    ];
    for (token, (kind, literal)) in tokens.iter().zip(expected) {
        assert_eq!(token.kind, kind, "kind of {}", token.text);
        assert_eq!(token.literal.as_ref(), Some(&literal), "value of {}", token.text);
    }
}

#[test]
fn lex_ten_digit_integer_becomes_double() {
    let tokens = scan("2147483648", "test.brs").tokens;
    assert_eq!(tokens[0].kind, Lexeme::Double);
    assert_eq!(tokens[0].literal, Some(Literal::Double(2_147_483_648.0)));
}

#[test]
fn lex_leading_zeros_suffixes_and_doubled_quotes() {
    let tokens = scan(
        r#"0000000005 0.00000008! 123& 123# "the cat says ""meow""""#,
        "test.brs",
    )
    .tokens;
    let expected = [
        (Lexeme::Double, Literal::Double(5.0)),
        (Lexeme::Float, Literal::Float(0.000_000_08)),
        (Lexeme::LongInteger, Literal::LongInteger(123)),
        (Lexeme::Double, Literal::Double(123.0)),
        (
            Lexeme::String,
            Literal::String("the cat says \"meow\"".to_string()),
        ),
    ];
    assert_eq!(tokens.len(), expected.len() + 1);
    for (token, (kind, literal)) in tokens.iter().zip(expected) {
        assert_eq!(token.kind, kind, "kind of {}", token.text);
        assert_eq!(token.literal.as_ref(), Some(&literal), "value of {}", token.text);
    }
}

#[test]
fn lex_hex_integer_wraps_to_negative() {
    let tokens = scan("&hFFFFFFFF", "test.brs").tokens;
    assert_eq!(tokens[0].literal, Some(Literal::Integer(-1)));
}

#[test]
fn lex_exponent_marker_without_digits_is_not_consumed() {
    assert_eq!(
        kinds("2e"),
        vec![Lexeme::Integer, Lexeme::Identifier, Lexeme::Eof]
    );
}

// -----------------------------------------------------------
// Preprocessor directives.
// -----------------------------------------------------------

#[test]
fn lex_directive_spellings() {
    assert_eq!(
        kinds("#const a = true\n#if a\n#else if b\n#elseif c\n#else\n#end if\n#endif"),
        vec![
            Lexeme::HashConst,
            Lexeme::Identifier,
            Lexeme::Equal,
            Lexeme::True,
            Lexeme::Newline,
            Lexeme::HashIf,
            Lexeme::Identifier,
            Lexeme::Newline,
            Lexeme::HashElseIf,
            Lexeme::Identifier,
            Lexeme::Newline,
            Lexeme::HashElseIf,
            Lexeme::Identifier,
            Lexeme::Newline,
            Lexeme::HashElse,
            Lexeme::Newline,
            Lexeme::HashEndIf,
            Lexeme::Newline,
            Lexeme::HashEndIf,
            Lexeme::Eof,
        ]
    );
}

#[test]
fn lex_unknown_directive() {
    let results = scan("#pragma once", "test.brs");
    assert_eq!(
        results.errors[0].kind,
        LexErrorKind::UnknownDirective("pragma".to_string())
    );
}

// -----------------------------------------------------------
// Errors.
// -----------------------------------------------------------

#[test]
fn lex_unexpected_character_reports_whole_char() {
    let results = scan("x = 1 @ 2\ny = \u{e9}", "test.brs");
    let unexpected: Vec<_> = results.errors.iter().map(|e| e.kind.clone()).collect();
    assert_eq!(
        unexpected,
        vec![
            LexErrorKind::UnexpectedCharacter('@'),
            LexErrorKind::UnexpectedCharacter('\u{e9}'),
        ]
    );
    assert_eq!(results.errors[1].location.start, Position::new(2, 5));
}

#[test]
fn lex_lone_ampersand() {
    let results = scan("a & b", "test.brs");
    assert_eq!(
        results.errors[0].kind,
        LexErrorKind::UnexpectedCharacter('&')
    );
}

#[test]
fn lex_error_display_includes_location() {
    let results = scan("\n  \"open", "where.brs");
    assert_eq!(
        results.errors[0].to_string(),
        "unterminated string at where.brs:2:3"
    );
}

#[test]
fn lex_errors_still_end_with_eof() {
    let results = scan("@@@", "test.brs");
    assert_eq!(results.errors.len(), 3);
    assert_eq!(kinds("@@@"), vec![Lexeme::Eof]);
}
