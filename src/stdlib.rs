//! Global functions registered into every interpreter.
//!
//! Each is an ordinary [`Callable`]; the interpreter has no special
//! knowledge of any of them.

use std::rc::Rc;

use crate::interpreter::{Environment, Interpreter, RuntimeErrorKind, Scope};
use crate::value::number::{self, f64_to_f32, f64_to_i32, to_f64};
use crate::value::{
    Argument, BrsObject, BrsType, Callable, Interface, RoArray, RoAssociativeArray, Signature,
    ValueKind, try_coerce,
};

type NativeResult = Result<BrsType, RuntimeErrorKind>;

/// Define every global function in `environment`.
pub fn register(environment: &mut Environment) {
    let functions = [
        type_function(),
        str_function(),
        stri_function(),
        val_function(),
        unary_string("Len", ValueKind::Int32, |s| {
            BrsType::Int32(i32::try_from(s.chars().count()).unwrap_or(i32::MAX))
        }),
        unary_string("UCase", ValueKind::String, |s| BrsType::String(s.to_uppercase())),
        unary_string("LCase", ValueKind::String, |s| BrsType::String(s.to_lowercase())),
        abs_function(),
        unary_float("Int", ValueKind::Int32, |x| BrsType::Int32(f64_to_i32(x.floor()))),
        unary_float("Fix", ValueKind::Int32, |x| BrsType::Int32(f64_to_i32(x.trunc()))),
        unary_float("Sqr", ValueKind::Float, |x| BrsType::Float(f64_to_f32(x.sqrt()))),
        create_object_function(),
        box_function(),
        get_global_aa_function(),
        get_interface_function(),
    ];

    for function in functions {
        let name = function.display_name().to_string();
        environment.define(Scope::Global, &name, BrsType::Callable(Rc::new(function)));
    }
    tracing::trace!("registered standard library");
}

fn signature(args: Vec<Argument>, returns: ValueKind) -> Signature {
    Signature::new(args, returns)
}

fn numeric_argument(function: &str, value: &BrsType) -> Result<f64, RuntimeErrorKind> {
    to_f64(value).ok_or_else(|| RuntimeErrorKind::ArgumentMismatch {
        function: function.to_string(),
        detail: format!("expected a number, got {}", value.kind()),
    })
}

fn string_argument(value: &BrsType) -> String {
    match value {
        BrsType::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unary_string(
    name: &'static str,
    returns: ValueKind,
    apply: fn(&str) -> BrsType,
) -> Callable {
    Callable::native(
        name,
        signature(vec![Argument::required("s", ValueKind::String)], returns),
        move |_, args| Ok(apply(&string_argument(&args[0]))),
    )
}

fn unary_float(name: &'static str, returns: ValueKind, apply: fn(f64) -> BrsType) -> Callable {
    Callable::native(
        name,
        signature(vec![Argument::required("x", ValueKind::Dynamic)], returns),
        move |_, args| Ok(apply(numeric_argument(name, &args[0])?)),
    )
}

/// `Type(value)`: `"Integer"`, `"roArray"`, `"<uninitialized>"` and so on.
fn type_function() -> Callable {
    Callable::native(
        "Type",
        signature(
            vec![
                Argument::required("value", ValueKind::Dynamic),
                Argument::optional("version", ValueKind::Dynamic),
            ],
            ValueKind::String,
        ),
        |_, args| Ok(BrsType::String(args[0].type_name())),
    )
}

/// `Str(number)`: non-negative numbers get a leading space.
fn str_function() -> Callable {
    Callable::native(
        "Str",
        signature(vec![Argument::required("value", ValueKind::Dynamic)], ValueKind::String),
        |_, args| {
            let value = args[0].unboxed();
            let amount = numeric_argument("Str", &value)?;
            let text = match value {
                BrsType::Int32(_) | BrsType::Int64(_) | BrsType::Double(_) => value.to_string(),
                _ => number::format_float(f64::from(f64_to_f32(amount)), 7),
            };
            Ok(BrsType::String(if amount >= 0.0 {
                format!(" {text}")
            } else {
                text
            }))
        },
    )
}

/// `StrI(integer [, radix])`: no leading space.
fn stri_function() -> Callable {
    Callable::native(
        "StrI",
        signature(
            vec![
                Argument::required("value", ValueKind::Int32),
                Argument::optional("radix", ValueKind::Int32),
            ],
            ValueKind::String,
        ),
        |_, args| {
            let BrsType::Int32(value) = args[0] else {
                return Ok(BrsType::String(args[0].to_string()));
            };
            let radix = match args.get(1) {
                Some(BrsType::Int32(radix)) if (2..=36).contains(radix) => radix.unsigned_abs(),
                Some(BrsType::Int32(_)) => return Ok(BrsType::String(String::new())),
                _ => 10,
            };
            Ok(BrsType::String(to_radix(i64::from(value), radix)))
        },
    )
}

fn to_radix(value: i64, radix: u32) -> String {
    if radix == 10 {
        return value.to_string();
    }
    let mut magnitude = value.unsigned_abs();
    let mut digits = Vec::new();
    loop {
        let digit = u32::try_from(magnitude % u64::from(radix)).unwrap_or(0);
        digits.push(char::from_digit(digit, radix).unwrap_or('0'));
        magnitude /= u64::from(radix);
        if magnitude == 0 {
            break;
        }
    }
    if value < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// `Val(string)` parses the leading numeric prefix as a Float;
/// `Val(string, radix)` parses an Integer in the given radix. Unparseable
/// input yields zero.
fn val_function() -> Callable {
    Callable::native(
        "Val",
        signature(vec![Argument::required("s", ValueKind::String)], ValueKind::Float),
        |_, args| Ok(BrsType::Float(f64_to_f32(leading_number(&string_argument(&args[0]))))),
    )
    .overload(
        signature(
            vec![
                Argument::required("s", ValueKind::String),
                Argument::required("radix", ValueKind::Int32),
            ],
            ValueKind::Int32,
        ),
        |_, args| {
            let text = string_argument(&args[0]);
            let radix = match args[1] {
                BrsType::Int32(radix) => u32::try_from(radix).unwrap_or(10),
                _ => 10,
            };
            if !(2..=36).contains(&radix) {
                return Ok(BrsType::Int32(0));
            }
            let parsed = i64::from_str_radix(text.trim(), radix).unwrap_or(0);
            Ok(BrsType::Int32(number::truncate_i32(parsed)))
        },
    )
}

/// Longest prefix of `text` (after leading whitespace) that parses as a
/// number.
fn leading_number(text: &str) -> f64 {
    let text = text.trim_start();
    let mut best = 0.0;
    for (index, c) in text.char_indices() {
        if let Ok(value) = text[..index + c.len_utf8()].parse::<f64>() {
            best = value;
        } else if !matches!(c, '+' | '-' | '.' | 'e' | 'E') {
            break;
        }
    }
    best
}

/// `Abs(number)` keeps the argument's numeric kind.
fn abs_function() -> Callable {
    Callable::native(
        "Abs",
        signature(vec![Argument::required("x", ValueKind::Dynamic)], ValueKind::Dynamic),
        |_, args| match args[0].unboxed() {
            BrsType::Int32(v) => Ok(BrsType::Int32(v.wrapping_abs())),
            BrsType::Int64(v) => Ok(BrsType::Int64(v.wrapping_abs())),
            BrsType::Float(v) => Ok(BrsType::Float(v.abs())),
            BrsType::Double(v) => Ok(BrsType::Double(v.abs())),
            other => Err(RuntimeErrorKind::ArgumentMismatch {
                function: "Abs".to_string(),
                detail: format!("expected a number, got {}", other.kind()),
            }),
        },
    )
}

/// `CreateObject(name)`: built-in containers and boxes, then components
/// registered with the interpreter. Unknown names give `invalid`.
fn create_object_function() -> Callable {
    Callable::native(
        "CreateObject",
        signature(
            vec![Argument::required("name", ValueKind::String)],
            ValueKind::Dynamic,
        ),
        |interpreter: &mut Interpreter, args: &[BrsType]| -> NativeResult {
            let name = string_argument(&args[0]);
            let builtin = match name.to_ascii_lowercase().as_str() {
                "roarray" => Some(BrsObject::Array(RoArray::default())),
                "roassociativearray" => {
                    Some(BrsObject::AssociativeArray(RoAssociativeArray::new()))
                }
                "rostring" => BrsObject::boxed(&BrsType::String(String::new())),
                "roint" => BrsObject::boxed(&BrsType::Int32(0)),
                "rolonginteger" => BrsObject::boxed(&BrsType::Int64(0)),
                "rofloat" => BrsObject::boxed(&BrsType::Float(0.0)),
                "rodouble" => BrsObject::boxed(&BrsType::Double(0.0)),
                "roboolean" => BrsObject::boxed(&BrsType::Boolean(false)),
                "roinvalid" => BrsObject::boxed(&BrsType::Invalid),
                _ => None,
            };
            match builtin.or_else(|| interpreter.create_component(&name)) {
                Some(object) => Ok(BrsType::Object(object)),
                None => {
                    tracing::warn!(component = %name, "CreateObject: unknown component");
                    Ok(BrsType::Invalid)
                }
            }
        },
    )
}

fn box_function() -> Callable {
    Callable::native(
        "Box",
        signature(vec![Argument::required("value", ValueKind::Dynamic)], ValueKind::Object),
        |_, args| Ok(try_coerce(&args[0], ValueKind::Object).unwrap_or_else(|| args[0].clone())),
    )
}

fn get_global_aa_function() -> Callable {
    Callable::native(
        "GetGlobalAA",
        signature(vec![], ValueKind::Object),
        |interpreter, _| {
            Ok(BrsType::Object(BrsObject::AssociativeArray(
                interpreter.environment().root_m(),
            )))
        },
    )
}

/// `GetInterface(object, name)`: the object viewed through `name`, or
/// `invalid` if it does not implement it.
fn get_interface_function() -> Callable {
    Callable::native(
        "GetInterface",
        signature(
            vec![
                Argument::required("object", ValueKind::Object),
                Argument::required("name", ValueKind::String),
            ],
            ValueKind::Interface,
        ),
        |_, args| {
            let BrsType::Object(object) = &args[0] else {
                return Ok(BrsType::Invalid);
            };
            let requested = string_argument(&args[1]);
            let found = object
                .interfaces()
                .into_iter()
                .find(|name| name.eq_ignore_ascii_case(&requested));
            Ok(found.map_or(BrsType::Invalid, |name| {
                BrsType::Interface(Interface {
                    name: name.to_string(),
                    object: object.clone(),
                })
            }))
        },
    )
}
