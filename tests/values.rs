//! Value model, boxing, components and the standard library, driven
//! through real programs.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use brightscript_rs::interpreter::RuntimeErrorKind;
use brightscript_rs::value::{
    Argument, BrsComponent, BrsObject, Callable, Signature, try_coerce,
};
use brightscript_rs::{BrsType, ValueKind};
use common::{Harness, output_of, runtime_error};

/// A host component with one writable field, iterable readings and a
/// `reset` method.
#[derive(Debug, Default)]
struct Thermostat {
    target: RefCell<i32>,
    readings: Vec<i32>,
}

impl BrsComponent for Thermostat {
    fn component_name(&self) -> &str {
        "roThermostat"
    }

    fn interfaces(&self) -> &'static [&'static str] {
        &["ifThermostat"]
    }

    fn get(&self, name: &str) -> Option<BrsType> {
        name.eq_ignore_ascii_case("target")
            .then(|| BrsType::Int32(*self.target.borrow()))
    }

    fn set(&self, name: &str, value: BrsType) -> Result<(), RuntimeErrorKind> {
        match value {
            BrsType::Int32(degrees) if name.eq_ignore_ascii_case("target") => {
                *self.target.borrow_mut() = degrees;
                Ok(())
            }
            _ => Err(RuntimeErrorKind::MemberNotFound {
                component: self.component_name().to_string(),
                name: name.to_string(),
            }),
        }
    }

    fn elements(&self) -> Option<Vec<BrsType>> {
        Some(self.readings.iter().copied().map(BrsType::Int32).collect())
    }

    fn method(self: Rc<Self>, name: &str) -> Option<Callable> {
        (name == "reset").then(|| {
            Callable::native(
                "reset",
                Signature::new(vec![], ValueKind::Void),
                move |_, _| {
                    *self.target.borrow_mut() = 0;
                    Ok(BrsType::Invalid)
                },
            )
        })
    }
}

fn thermostat_harness() -> Harness {
    let mut harness = Harness::new();
    harness.interpreter.register_component("roThermostat", || {
        BrsObject::Component(Rc::new(Thermostat {
            target: RefCell::new(20),
            readings: vec![18, 19, 21],
        }))
    });
    harness
}

// -----------------------------------------------------------
// Registered components.
// -----------------------------------------------------------

#[test]
fn component_fields_methods_and_iteration() {
    let mut harness = thermostat_harness();
    let source = "\
t = CreateObject(\"ROTHERMOSTAT\")
print type(t)
print t.target
t.target = 23
print t.Target
for each reading in t
  print reading;
end for
print
t.reset()
print t.target
print t
";
    harness.run(source).expect("program runs");
    assert_eq!(
        harness.stdout.contents(),
        "roThermostat\n20\n23\n181921\n0\n<Component: roThermostat>\n"
    );
}

#[test]
fn component_rejects_unknown_field() {
    let mut harness = thermostat_harness();
    let error = harness
        .run("t = CreateObject(\"roThermostat\")\nt.humidity = 40")
        .expect_err("unknown field");
    assert!(error.to_string().contains("humidity"), "{error}");
}

#[test]
fn each_create_object_builds_a_fresh_component() {
    let mut harness = thermostat_harness();
    let source = "\
a = CreateObject(\"roThermostat\")
b = CreateObject(\"roThermostat\")
a.target = 1
print b.target
";
    harness.run(source).expect("program runs");
    assert_eq!(harness.stdout.contents(), "20\n");
}

#[test]
fn unknown_component_is_invalid() {
    assert_eq!(
        output_of("print CreateObject(\"roNothing\")"),
        "invalid\n"
    );
}

#[test]
fn get_interface_on_components_and_builtins() {
    let mut harness = thermostat_harness();
    let source = "\
t = CreateObject(\"roThermostat\")
print GetInterface(t, \"ifthermostat\")
print GetInterface(t, \"ifArray\")
list = GetInterface([1, 2, 3], \"ifArray\")
print list.count()
print type(list)
print GetInterface(\"abc\", \"ifString\")
";
    harness.run(source).expect("program runs");
    assert_eq!(
        harness.stdout.contents(),
        "<Interface: ifThermostat>\ninvalid\n3\nInterface\n<Interface: ifString>\n"
    );
}

// -----------------------------------------------------------
// Boxing and type names.
// -----------------------------------------------------------

#[test]
fn type_names() {
    let source = "\
print type(1)
print type(1&)
print type(1.5)
print type(1.5#)
print type(\"s\")
print type(true)
print type(invalid)
print type([])
print type({})
print type(type)
print type(never_assigned)
";
    assert_eq!(
        output_of(source),
        "Integer\nLongInteger\nFloat\nDouble\nString\nBoolean\nInvalid\nroArray\nroAssociativeArray\nFunction\n<uninitialized>\n"
    );
}

#[test]
fn boxed_primitives() {
    let source = "\
b = Box(5)
print type(b)
print b + 1
s = CreateObject(\"roString\")
print type(s); \"[\"; s; \"]\"
print \"hello\".len()
n = 42
print n.toStr() + \"!\"
print type(Box(\"x\"))
";
    assert_eq!(
        output_of(source),
        "roInt\n6\nroString[]\n5\n42!\nroString\n"
    );
}

#[test]
fn primitive_has_no_unknown_members() {
    let error = runtime_error("x = 5\nprint x.nothing()");
    assert!(matches!(
        error.kind,
        RuntimeErrorKind::MemberNotFound { ref component, .. } if component == "roInt"
    ));
}

#[test]
fn nested_values_in_listings() {
    let source = "print [\"s\", {}, Box(3), invalid]";
    assert_eq!(
        output_of(source),
        "<Component: roArray> =\n[\n    \"s\"\n    <Component: roAssociativeArray>\n    3\n    invalid\n]\n"
    );
}

// -----------------------------------------------------------
// Coercion.
// -----------------------------------------------------------

#[test]
fn numeric_coercion_truncates_toward_zero() {
    assert_eq!(
        try_coerce(&BrsType::Double(-2.9), ValueKind::Int32),
        Some(BrsType::Int32(-2))
    );
    assert_eq!(
        try_coerce(&BrsType::Int32(3), ValueKind::Double),
        Some(BrsType::Double(3.0))
    );
    assert_eq!(
        try_coerce(&BrsType::Float(1.5), ValueKind::Int64),
        Some(BrsType::Int64(1))
    );
}

#[test]
fn no_conversion_between_strings_and_numbers() {
    assert_eq!(try_coerce(&BrsType::string("1"), ValueKind::Int32), None);
    assert_eq!(try_coerce(&BrsType::Int32(1), ValueKind::String), None);
    assert_eq!(try_coerce(&BrsType::Boolean(true), ValueKind::Int32), None);
}

#[test]
fn dynamic_accepts_anything_and_objects_accept_invalid() {
    let value = BrsType::string("x");
    assert_eq!(try_coerce(&value, ValueKind::Dynamic), Some(value));
    assert_eq!(
        try_coerce(&BrsType::Invalid, ValueKind::Object),
        Some(BrsType::Invalid)
    );
}

#[test]
fn boxed_values_unbox_for_typed_targets() {
    let boxed = try_coerce(&BrsType::Int32(7), ValueKind::Object).expect("boxes");
    assert_eq!(boxed.type_name(), "roInt");
    assert_eq!(try_coerce(&boxed, ValueKind::Int32), Some(BrsType::Int32(7)));
}

#[test]
fn designated_variable_coerces_on_assignment() {
    assert_eq!(output_of("n% = 7.9\nprint n%\nf! = 2\nprint f! / 4"), "7\n0.5\n");
}

// -----------------------------------------------------------
// Standard library.
// -----------------------------------------------------------

#[test]
fn str_and_stri() {
    let source = "\
print \"[\"; Str(5); \"]\"
print \"[\"; Str(-2); \"]\"
print \"[\"; Str(1.5); \"]\"
print StrI(255, 16)
print StrI(-10, 2)
print StrI(42)
";
    assert_eq!(output_of(source), "[ 5]\n[-2]\n[ 1.5]\nff\n-1010\n42\n");
}

#[test]
fn val_overloads() {
    let source = "\
print Val(\"12abc\")
print Val(\"  -3.5\")
print Val(\"nothing\")
print Val(\"ff\", 16)
print type(Val(\"7\", 10))
";
    assert_eq!(output_of(source), "12\n-3.5\n0\n255\nInteger\n");
}

#[test]
fn numeric_functions() {
    let source = "\
print Abs(-3)
print Abs(-2.5)
print type(Abs(-3))
print Int(-2.5)
print Fix(-2.5)
print Sqr(16)
";
    assert_eq!(output_of(source), "3\n2.5\nInteger\n-3\n-2\n4\n");
}

#[test]
fn string_functions() {
    assert_eq!(
        output_of("print UCase(\"MiXed\"); LCase(\"MiXed\")\nprint Len(\"h\u{e9}llo\")"),
        "MIXEDmixed\n5\n"
    );
}

#[test]
fn stdlib_argument_mismatch() {
    let error = runtime_error("print Len(5)");
    assert!(matches!(
        error.kind,
        RuntimeErrorKind::ArgumentMismatch { ref function, .. } if function == "Len"
    ));
    assert_eq!(error.code(), 0xF1);
}

#[test]
fn user_function_shadows_global() {
    let source = "\
function UCase(s)
  return \"mine\"
end function
print ucase(\"x\")
";
    assert_eq!(output_of(source), "mine\n");
}

// -----------------------------------------------------------
// Mocks.
// -----------------------------------------------------------

#[test]
fn mocked_function_replaces_stdlib_and_user_definitions() {
    let mut harness = Harness::new();
    harness.interpreter.mock_function(
        "UCase",
        Callable::native(
            "UCase",
            Signature::new(
                vec![Argument::required("s", ValueKind::String)],
                ValueKind::String,
            ),
            |_, _| Ok(BrsType::string("mocked")),
        ),
    );
    harness.interpreter.mock_function(
        "fetch",
        Callable::native("fetch", Signature::new(vec![], ValueKind::Int32), |_, _| {
            Ok(BrsType::Int32(99))
        }),
    );
    let source = "\
function fetch()
  return 1
end function
print UCase(\"x\")
print fetch()
";
    harness.run(source).expect("program runs");
    assert_eq!(harness.stdout.contents(), "mocked\n99\n");
}
