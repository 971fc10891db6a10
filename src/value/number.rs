//! Numeric promotion lattice and the binary/unary operators over values.
//!
//! Operand pairs are widened along `Int32 < Int64 < Float < Double`.
//! `Float` results are computed in `f64` and rounded once to `f32`, so an
//! `Int64` mixed with a `Float` never passes through a lossy 32-bit
//! intermediate.

use std::cmp::Ordering;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::interpreter::RuntimeErrorKind;

use super::{BrsObject, BrsType};

/// A numeric operand pair after promotion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Operands {
    Int32(i32, i32),
    Int64(i64, i64),
    Float(f64, f64),
    Double(f64, f64),
}

fn operands(left: &BrsType, right: &BrsType) -> Option<Operands> {
    use BrsType::{Double, Float, Int32, Int64};

    let pair = match (left, right) {
        (Int32(a), Int32(b)) => Operands::Int32(*a, *b),
        (Int32(a), Int64(b)) => Operands::Int64(i64::from(*a), *b),
        (Int64(a), Int32(b)) => Operands::Int64(*a, i64::from(*b)),
        (Int64(a), Int64(b)) => Operands::Int64(*a, *b),
        (Double(a), other) => Operands::Double(*a, to_f64(other)?),
        (other, Double(b)) => Operands::Double(to_f64(other)?, *b),
        (Float(a), other) => Operands::Float(f64::from(*a), to_f64(other)?),
        (other, Float(b)) => Operands::Float(to_f64(other)?, f64::from(*b)),
        _ => return None,
    };
    Some(pair)
}

/// Any numeric value as `f64`.
#[must_use]
pub fn to_f64(value: &BrsType) -> Option<f64> {
    match value {
        BrsType::Int32(v) => Some(f64::from(*v)),
        BrsType::Int64(v) => Some(i64_to_f64(*v)),
        BrsType::Float(v) => Some(f64::from(*v)),
        BrsType::Double(v) => Some(*v),
        BrsType::Object(BrsObject::Boxed(inner)) => to_f64(inner),
        _ => None,
    }
}

/// Any numeric value as `i64`, truncating fractions.
#[must_use]
pub fn to_i64(value: &BrsType) -> Option<i64> {
    match value {
        BrsType::Int32(v) => Some(i64::from(*v)),
        BrsType::Int64(v) => Some(*v),
        BrsType::Float(v) => Some(f64_to_i64(f64::from(*v))),
        BrsType::Double(v) => Some(f64_to_i64(*v)),
        BrsType::Object(BrsObject::Boxed(inner)) => to_i64(inner),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
#[must_use]
pub const fn i64_to_f64(value: i64) -> f64 {
    value as f64
}

#[allow(clippy::cast_precision_loss)]
#[must_use]
pub const fn i64_to_f32(value: i64) -> f32 {
    value as f32
}

#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub const fn f64_to_f32(value: f64) -> f32 {
    value as f32
}

/// Saturating, truncates toward zero; NaN becomes 0.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub const fn f64_to_i32(value: f64) -> i32 {
    value as i32
}

#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub const fn f64_to_i64(value: f64) -> i64 {
    value as i64
}

/// Keeps the low 32 bits.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub const fn truncate_i32(value: i64) -> i32 {
    value as i32
}

#[allow(clippy::cast_sign_loss)]
const fn shift_amount(value: i64) -> u32 {
    (value & 0x3f) as u32
}

fn mismatch(operator: impl ToString, left: &BrsType, right: &BrsType) -> RuntimeErrorKind {
    RuntimeErrorKind::TypeMismatch {
        operator: operator.to_string(),
        left: left.kind(),
        right: Some(right.kind()),
    }
}

/// Evaluate every binary operator except the short-circuiting forms of
/// `and`/`or`, which the interpreter handles before calling here.
pub fn binary(
    operator: BinaryOperator,
    left: &BrsType,
    right: &BrsType,
) -> Result<BrsType, RuntimeErrorKind> {
    let left = left.unboxed();
    let right = right.unboxed();

    match operator {
        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::Less
        | BinaryOperator::LessEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterEqual => Ok(BrsType::Boolean(compare(operator, &left, &right))),
        BinaryOperator::And | BinaryOperator::Or => logical(operator, &left, &right),
        BinaryOperator::Add => {
            if let (BrsType::String(a), BrsType::String(b)) = (&left, &right) {
                return Ok(BrsType::String(format!("{a}{b}")));
            }
            arithmetic(operator, &left, &right)
        }
        _ => arithmetic(operator, &left, &right),
    }
}

fn arithmetic(
    operator: BinaryOperator,
    left: &BrsType,
    right: &BrsType,
) -> Result<BrsType, RuntimeErrorKind> {
    let pair = operands(left, right).ok_or_else(|| mismatch(operator, left, right))?;

    match operator {
        BinaryOperator::Add => Ok(apply(pair, i32::wrapping_add, i64::wrapping_add, |a, b| a + b)),
        BinaryOperator::Subtract => {
            Ok(apply(pair, i32::wrapping_sub, i64::wrapping_sub, |a, b| a - b))
        }
        BinaryOperator::Multiply => {
            Ok(apply(pair, i32::wrapping_mul, i64::wrapping_mul, |a, b| a * b))
        }
        BinaryOperator::Divide => Ok(divide(pair)),
        BinaryOperator::IntegerDivide => integer_divide(pair),
        BinaryOperator::Modulo => modulo(pair),
        BinaryOperator::Power => Ok(power(pair)),
        BinaryOperator::LeftShift | BinaryOperator::RightShift => {
            shift(operator, pair).ok_or_else(|| mismatch(operator, left, right))
        }
        _ => Err(mismatch(operator, left, right)),
    }
}

fn apply(
    pair: Operands,
    int32: fn(i32, i32) -> i32,
    int64: fn(i64, i64) -> i64,
    float: fn(f64, f64) -> f64,
) -> BrsType {
    match pair {
        Operands::Int32(a, b) => BrsType::Int32(int32(a, b)),
        Operands::Int64(a, b) => BrsType::Int64(int64(a, b)),
        Operands::Float(a, b) => BrsType::Float(f64_to_f32(float(a, b))),
        Operands::Double(a, b) => BrsType::Double(float(a, b)),
    }
}

/// `/` is always floating point: 32-bit operands give `Float`, anything
/// involving 64 bits gives `Double`.
fn divide(pair: Operands) -> BrsType {
    match pair {
        Operands::Int32(a, b) => BrsType::Float(f64_to_f32(f64::from(a) / f64::from(b))),
        Operands::Int64(a, b) => BrsType::Double(i64_to_f64(a) / i64_to_f64(b)),
        Operands::Float(a, b) => BrsType::Float(f64_to_f32(a / b)),
        Operands::Double(a, b) => BrsType::Double(a / b),
    }
}

fn integer_divide(pair: Operands) -> Result<BrsType, RuntimeErrorKind> {
    match pair {
        Operands::Int32(_, 0) | Operands::Int64(_, 0) => Err(RuntimeErrorKind::DivideByZero),
        Operands::Int32(a, b) => Ok(BrsType::Int32(a.wrapping_div(b))),
        Operands::Int64(a, b) => Ok(BrsType::Int64(a.wrapping_div(b))),
        Operands::Float(a, b) | Operands::Double(a, b) => {
            if b == 0.0 {
                Err(RuntimeErrorKind::DivideByZero)
            } else {
                Ok(BrsType::Int32(f64_to_i32((a / b).trunc())))
            }
        }
    }
}

/// Remainder takes the sign of the dividend.
fn modulo(pair: Operands) -> Result<BrsType, RuntimeErrorKind> {
    match pair {
        Operands::Int32(_, 0) | Operands::Int64(_, 0) => Err(RuntimeErrorKind::DivideByZero),
        Operands::Int32(a, b) => Ok(BrsType::Int32(a.wrapping_rem(b))),
        Operands::Int64(a, b) => Ok(BrsType::Int64(a.wrapping_rem(b))),
        Operands::Float(a, b) => Ok(BrsType::Float(f64_to_f32(a % b))),
        Operands::Double(a, b) => Ok(BrsType::Double(a % b)),
    }
}

/// `^` follows `/`: integer operands produce a floating result.
fn power(pair: Operands) -> BrsType {
    match pair {
        Operands::Int32(a, b) => {
            BrsType::Float(f64_to_f32(f64::from(a).powf(f64::from(b))))
        }
        Operands::Int64(a, b) => BrsType::Double(i64_to_f64(a).powf(i64_to_f64(b))),
        Operands::Float(a, b) => BrsType::Float(f64_to_f32(a.powf(b))),
        Operands::Double(a, b) => BrsType::Double(a.powf(b)),
    }
}

fn shift(operator: BinaryOperator, pair: Operands) -> Option<BrsType> {
    let left = operator == BinaryOperator::LeftShift;
    match pair {
        Operands::Int32(a, b) => {
            let amount = shift_amount(i64::from(b)) & 0x1f;
            Some(BrsType::Int32(if left {
                a.wrapping_shl(amount)
            } else {
                a.wrapping_shr(amount)
            }))
        }
        Operands::Int64(a, b) => {
            let amount = shift_amount(b);
            Some(BrsType::Int64(if left {
                a.wrapping_shl(amount)
            } else {
                a.wrapping_shr(amount)
            }))
        }
        Operands::Float(..) | Operands::Double(..) => None,
    }
}

/// Boolean pairs combine logically, integer pairs bitwise.
fn logical(
    operator: BinaryOperator,
    left: &BrsType,
    right: &BrsType,
) -> Result<BrsType, RuntimeErrorKind> {
    let and = operator == BinaryOperator::And;
    if let (BrsType::Boolean(a), BrsType::Boolean(b)) = (left, right) {
        return Ok(BrsType::Boolean(if and { *a && *b } else { *a || *b }));
    }

    match operands(left, right) {
        Some(Operands::Int32(a, b)) => Ok(BrsType::Int32(if and { a & b } else { a | b })),
        Some(Operands::Int64(a, b)) => Ok(BrsType::Int64(if and { a & b } else { a | b })),
        _ => Err(mismatch(operator, left, right)),
    }
}

/// Comparison never fails: incompatible kinds are unequal and unordered.
#[must_use]
pub fn compare(operator: BinaryOperator, left: &BrsType, right: &BrsType) -> bool {
    let left = left.unboxed();
    let right = right.unboxed();

    let ordering = match (&left, &right) {
        (BrsType::String(a), BrsType::String(b)) => Some(a.cmp(b)),
        (BrsType::Boolean(a), BrsType::Boolean(b)) => {
            return match operator {
                BinaryOperator::Equal => a == b,
                BinaryOperator::NotEqual => a != b,
                _ => false,
            };
        }
        _ => match operands(&left, &right) {
            Some(Operands::Int32(a, b)) => Some(a.cmp(&b)),
            Some(Operands::Int64(a, b)) => Some(a.cmp(&b)),
            Some(Operands::Float(a, b) | Operands::Double(a, b)) => a.partial_cmp(&b),
            None => {
                let same = identical(&left, &right);
                return match operator {
                    BinaryOperator::Equal => same,
                    BinaryOperator::NotEqual => !same,
                    _ => false,
                };
            }
        },
    };

    match ordering {
        Some(ordering) => match operator {
            BinaryOperator::Equal => ordering == Ordering::Equal,
            BinaryOperator::NotEqual => ordering != Ordering::Equal,
            BinaryOperator::Less => ordering == Ordering::Less,
            BinaryOperator::LessEqual => ordering != Ordering::Greater,
            BinaryOperator::Greater => ordering == Ordering::Greater,
            BinaryOperator::GreaterEqual => ordering != Ordering::Less,
            _ => false,
        },
        // NaN
        None => operator == BinaryOperator::NotEqual,
    }
}

/// Equality for non-numeric, non-string kinds: `invalid` only equals
/// `invalid`, objects and functions compare by identity.
fn identical(left: &BrsType, right: &BrsType) -> bool {
    match (left, right) {
        (BrsType::Invalid, BrsType::Invalid) => true,
        (BrsType::Object(_) | BrsType::Callable(_) | BrsType::Interface(_), _) => left == right,
        _ => false,
    }
}

pub fn unary(operator: UnaryOperator, operand: &BrsType) -> Result<BrsType, RuntimeErrorKind> {
    let value = operand.unboxed();
    let result = match (operator, &value) {
        (UnaryOperator::Negate, BrsType::Int32(v)) => BrsType::Int32(v.wrapping_neg()),
        (UnaryOperator::Negate, BrsType::Int64(v)) => BrsType::Int64(v.wrapping_neg()),
        (UnaryOperator::Negate, BrsType::Float(v)) => BrsType::Float(-v),
        (UnaryOperator::Negate, BrsType::Double(v)) => BrsType::Double(-v),
        (UnaryOperator::Not, BrsType::Boolean(v)) => BrsType::Boolean(!v),
        (UnaryOperator::Not, BrsType::Int32(v)) => BrsType::Int32(!v),
        (UnaryOperator::Not, BrsType::Int64(v)) => BrsType::Int64(!v),
        _ => {
            let symbol = match operator {
                UnaryOperator::Negate => "-",
                UnaryOperator::Not => "not",
            };
            return Err(RuntimeErrorKind::TypeMismatch {
                operator: symbol.to_string(),
                left: value.kind(),
                right: None,
            });
        }
    };
    Ok(result)
}

/// Truth value of a condition: booleans as-is, numbers when non-zero.
#[must_use]
pub fn truthiness(value: &BrsType) -> Option<bool> {
    match value.unboxed() {
        BrsType::Boolean(v) => Some(v),
        other => to_f64(&other).map(|v| v != 0.0),
    }
}

/// `%g`-style rendering with `precision` significant digits: trailing
/// zeros trimmed, exponent form below `1e-4` or at `10^precision` and above.
#[must_use]
pub fn format_float(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let digits = precision.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i64 = exponent.parse().unwrap_or(0);
    let limit = i64::try_from(digits).unwrap_or(i64::MAX);

    if exponent < -4 || exponent >= limit {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = usize::try_from(limit - 1 - exponent).unwrap_or(0);
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(operator: BinaryOperator, left: BrsType, right: BrsType) -> BrsType {
        binary(operator, &left, &right).unwrap()
    }

    #[test]
    fn int32_integer_division_stays_int32() {
        assert_eq!(
            eval(BinaryOperator::IntegerDivide, BrsType::Int32(5), BrsType::Int32(2)),
            BrsType::Int32(2)
        );
        assert_eq!(
            eval(BinaryOperator::IntegerDivide, BrsType::Int32(-7), BrsType::Int32(2)),
            BrsType::Int32(-3)
        );
    }

    #[test]
    fn division_is_floating() {
        assert_eq!(
            eval(BinaryOperator::Divide, BrsType::Int32(5), BrsType::Int32(2)),
            BrsType::Float(2.5)
        );
        assert_eq!(
            eval(BinaryOperator::Divide, BrsType::Int64(5), BrsType::Int32(2)),
            BrsType::Double(2.5)
        );
    }

    #[test]
    fn int64_promotion() {
        assert_eq!(
            eval(BinaryOperator::Add, BrsType::Int64(1 << 40), BrsType::Int32(1)),
            BrsType::Int64((1 << 40) + 1)
        );
        assert_eq!(
            eval(BinaryOperator::Subtract, BrsType::Int32(1), BrsType::Int64(3)),
            BrsType::Int64(-2)
        );
    }

    #[test]
    fn int64_with_float_rounds_once() {
        let big = 16_777_217_i64;
        let result = eval(BinaryOperator::Add, BrsType::Int64(big), BrsType::Float(0.0));
        assert_eq!(result, BrsType::Float(16_777_216.0));
        let result = eval(BinaryOperator::Subtract, BrsType::Float(0.5), BrsType::Int64(big));
        assert_eq!(result.kind(), crate::value::ValueKind::Float);
        let result = eval(BinaryOperator::Multiply, BrsType::Int64(3), BrsType::Double(0.5));
        assert_eq!(result, BrsType::Double(1.5));
    }

    #[test]
    fn modulo_follows_dividend_sign() {
        assert_eq!(
            eval(BinaryOperator::Modulo, BrsType::Int32(-7), BrsType::Int32(3)),
            BrsType::Int32(-1)
        );
    }

    #[test]
    fn integer_division_by_zero() {
        assert_eq!(
            binary(BinaryOperator::IntegerDivide, &BrsType::Int32(1), &BrsType::Int32(0)),
            Err(RuntimeErrorKind::DivideByZero)
        );
        assert_eq!(
            binary(BinaryOperator::Modulo, &BrsType::Int64(1), &BrsType::Int32(0)),
            Err(RuntimeErrorKind::DivideByZero)
        );
    }

    #[test]
    fn strings_concatenate_and_compare() {
        assert_eq!(
            eval(BinaryOperator::Add, BrsType::string("ab"), BrsType::string("cd")),
            BrsType::string("abcd")
        );
        assert!(compare(
            BinaryOperator::Less,
            &BrsType::string("abc"),
            &BrsType::string("abd")
        ));
    }

    #[test]
    fn mixed_kinds_never_error_on_comparison() {
        let s = BrsType::string("1");
        let n = BrsType::Int32(1);
        assert!(!compare(BinaryOperator::Equal, &s, &n));
        assert!(compare(BinaryOperator::NotEqual, &s, &n));
        assert!(!compare(BinaryOperator::Less, &s, &n));
        assert!(compare(BinaryOperator::Equal, &BrsType::Invalid, &BrsType::Invalid));
    }

    #[test]
    fn adding_string_to_number_is_a_mismatch() {
        assert!(matches!(
            binary(BinaryOperator::Add, &BrsType::string("a"), &BrsType::Int32(1)),
            Err(RuntimeErrorKind::TypeMismatch { .. })
        ));
    }

    #[test]
    fn bitwise_and_or_on_integers() {
        assert_eq!(
            eval(BinaryOperator::And, BrsType::Int32(6), BrsType::Int32(3)),
            BrsType::Int32(2)
        );
        assert_eq!(
            eval(BinaryOperator::Or, BrsType::Int32(4), BrsType::Int64(1)),
            BrsType::Int64(5)
        );
    }

    #[test]
    fn shifts() {
        assert_eq!(
            eval(BinaryOperator::LeftShift, BrsType::Int32(1), BrsType::Int32(4)),
            BrsType::Int32(16)
        );
        assert_eq!(
            eval(BinaryOperator::RightShift, BrsType::Int32(-16), BrsType::Int32(2)),
            BrsType::Int32(-4)
        );
    }

    #[test]
    fn unary_operators() {
        assert_eq!(
            unary(UnaryOperator::Negate, &BrsType::Int32(3)).unwrap(),
            BrsType::Int32(-3)
        );
        assert_eq!(
            unary(UnaryOperator::Not, &BrsType::Boolean(true)).unwrap(),
            BrsType::Boolean(false)
        );
        assert!(unary(UnaryOperator::Negate, &BrsType::string("x")).is_err());
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_float(2.5, 7), "2.5");
        assert_eq!(format_float(f64::from(0.1_f32), 7), "0.1");
        assert_eq!(format_float(10_000_000.0, 7), "1e+07");
        assert_eq!(format_float(123_456.7, 7), "123456.7");
        assert_eq!(format_float(0.000_012_5, 7), "1.25e-05");
        assert_eq!(format_float(1.0 / 3.0, 15), "0.333333333333333");
    }
}
