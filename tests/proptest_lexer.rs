//! Property-based tests with proptest.
//!
//! Random token streams check the lexer's structural guarantees, random
//! operands check that integer arithmetic in programs agrees with Rust's
//! own 32-bit wrapping arithmetic, and arbitrary text checks that no stage
//! panics.

mod common;

use brightscript_rs::token::Literal;
use brightscript_rs::{Lexeme, parse, preprocess, scan};
use common::output_of;
use proptest::prelude::*;

// -- Leaf strategies --

/// Identifier that can never collide with a keyword or `rem`.
fn identifier() -> impl Strategy<Value = String> {
    "v_[a-z0-9]{0,6}".prop_map(|s| s)
}

fn operator() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "+", "-", "*", "/", "(", ")", ",", "=", "<>", "<=", ">=", "<", ">", "[", "]", ".",
    ])
    .prop_map(str::to_string)
}

/// One word that lexes to exactly one token.
fn word() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => identifier(),
        2 => (0u32..100_000).prop_map(|n| n.to_string()),
        2 => operator(),
        1 => "[a-z ]{0,10}".prop_map(|s| format!("\"{s}\"")),
    ]
}

/// Lines of words, joined with single spaces.
fn lines() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(word(), 0..8), 0..8)
}

fn hex(value: i32) -> String {
    format!("&h{value:X}")
}

proptest! {
    #[test]
    fn exactly_one_eof_and_it_is_last(source in "\\PC{0,60}") {
        let tokens = scan(&source, "prop.brs").tokens;
        let eofs = tokens.iter().filter(|t| t.kind == Lexeme::Eof).count();
        prop_assert_eq!(eofs, 1);
        prop_assert_eq!(tokens.last().map(|t| t.kind), Some(Lexeme::Eof));
    }

    #[test]
    fn every_word_becomes_one_token(lines in lines()) {
        let source = lines
            .iter()
            .map(|words| words.join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        let results = scan(&source, "prop.brs");
        prop_assert!(results.errors.is_empty(), "{:?}", results.errors);

        let newlines = results.tokens.iter().filter(|t| t.kind == Lexeme::Newline).count();
        prop_assert_eq!(newlines, source.matches('\n').count());

        let words: usize = lines.iter().map(Vec::len).sum();
        let others = results
            .tokens
            .iter()
            .filter(|t| !matches!(t.kind, Lexeme::Newline | Lexeme::Eof))
            .count();
        prop_assert_eq!(others, words);
    }

    #[test]
    fn tokens_never_go_backwards(lines in lines()) {
        let source = lines
            .iter()
            .map(|words| words.join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        let tokens = scan(&source, "prop.brs").tokens;
        for pair in tokens.windows(2) {
            prop_assert!(pair[0].location.start <= pair[1].location.start);
        }
    }

    #[test]
    fn integer_suffix(n in 0..=i32::MAX) {
        let tokens = scan(&format!("{n}%"), "prop.brs").tokens;
        prop_assert_eq!(tokens[0].kind, Lexeme::Integer);
        prop_assert_eq!(tokens[0].literal.clone(), Some(Literal::Integer(n)));
    }

    #[test]
    fn long_integer_suffix(n in 0..=i64::MAX) {
        let tokens = scan(&format!("{n}&"), "prop.brs").tokens;
        prop_assert_eq!(tokens[0].kind, Lexeme::LongInteger);
        prop_assert_eq!(tokens[0].literal.clone(), Some(Literal::LongInteger(n)));
    }

    #[test]
    fn double_and_float_suffixes(n in 0u32..1_000_000) {
        let tokens = scan(&format!("{n}# {n}!"), "prop.brs").tokens;
        prop_assert_eq!(tokens[0].kind, Lexeme::Double);
        prop_assert_eq!(tokens[0].literal.clone(), Some(Literal::Double(f64::from(n))));
        prop_assert_eq!(tokens[1].kind, Lexeme::Float);
        #[allow(clippy::cast_precision_loss)]
        let expected = n as f32;
        prop_assert_eq!(tokens[1].literal.clone(), Some(Literal::Float(expected)));
    }

    #[test]
    fn hex_literals_round_trip_through_i32(value in any::<i32>()) {
        let tokens = scan(&hex(value), "prop.brs").tokens;
        prop_assert_eq!(tokens[0].literal.clone(), Some(Literal::Integer(value)));
    }

    #[test]
    fn int32_arithmetic_wraps_like_rust(a in any::<i32>(), b in any::<i32>()) {
        let source = format!(
            "a = {}\nb = {}\nprint a + b\nprint a - b\nprint a * b",
            hex(a),
            hex(b)
        );
        let expected = format!(
            "{}\n{}\n{}\n",
            a.wrapping_add(b),
            a.wrapping_sub(b),
            a.wrapping_mul(b)
        );
        prop_assert_eq!(output_of(&source), expected);
    }

    #[test]
    fn int32_division_and_modulo_follow_rust(a in any::<i32>(), b in any::<i32>()) {
        prop_assume!(b != 0);
        let source = format!("a = {}\nb = {}\nprint a \\ b\nprint a mod b", hex(a), hex(b));
        let expected = format!("{}\n{}\n", a.wrapping_div(b), a.wrapping_rem(b));
        prop_assert_eq!(output_of(&source), expected);
    }

    #[test]
    fn comparisons_agree_with_rust(a in any::<i32>(), b in any::<i32>()) {
        let source = format!("a = {}\nb = {}\nprint a < b; a = b; a >= b", hex(a), hex(b));
        let expected = format!("{}{}{}\n", a < b, a == b, a >= b);
        prop_assert_eq!(output_of(&source), expected);
    }

    #[test]
    fn no_stage_panics_on_arbitrary_text(source in "\\PC{0,80}") {
        let scanned = scan(&source, "prop.brs");
        let filtered = preprocess(&scanned.tokens, &std::collections::HashMap::new());
        let _ = parse(&filtered.processed_tokens);
    }
}
