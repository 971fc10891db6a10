//! Reference-typed values: arrays, associative arrays, boxed primitives
//! and externally supplied components.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::interpreter::RuntimeErrorKind;

use super::callable::{Argument, Callable, Signature};
use super::number::to_i64;
use super::{BrsType, ValueKind};

/// Longest an array may grow through indexed assignment or `dim`.
pub const MAX_ARRAY_LENGTH: usize = 1 << 20;

/// Capability surface for components supplied from outside the core
/// (scene-graph nodes, platform objects). The interpreter dispatches
/// dotted and indexed access through these methods without knowing the
/// concrete type.
pub trait BrsComponent: fmt::Debug {
    fn component_name(&self) -> &str;

    /// Interfaces reported to `GetInterface`.
    fn interfaces(&self) -> &'static [&'static str] {
        &[]
    }

    /// Field read through `obj.name`.
    fn get(&self, _name: &str) -> Option<BrsType> {
        None
    }

    /// Field write through `obj.name = value`.
    fn set(&self, name: &str, _value: BrsType) -> Result<(), RuntimeErrorKind> {
        Err(RuntimeErrorKind::MemberNotFound {
            component: self.component_name().to_string(),
            name: name.to_string(),
        })
    }

    fn get_index(&self, _index: &BrsType) -> Option<BrsType> {
        None
    }

    fn set_index(&self, _index: &BrsType, _value: BrsType) -> Result<(), RuntimeErrorKind> {
        Err(RuntimeErrorKind::InvalidIndexedAccess(ValueKind::Object))
    }

    /// Values visited by `for each`, when the component is iterable.
    fn elements(&self) -> Option<Vec<BrsType>> {
        None
    }

    /// Member function bound to this component.
    fn method(self: Rc<Self>, _name: &str) -> Option<Callable> {
        None
    }
}

/// `roArray`: a shared, growable list.
#[derive(Clone, Default)]
pub struct RoArray {
    elements: Rc<RefCell<Vec<BrsType>>>,
}

impl RoArray {
    #[must_use]
    pub fn new(elements: Vec<BrsType>) -> Self {
        Self {
            elements: Rc::new(RefCell::new(elements)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    /// Element at `index`, `invalid` when out of range.
    #[must_use]
    pub fn get(&self, index: i64) -> BrsType {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.elements.borrow().get(i).cloned())
            .unwrap_or(BrsType::Invalid)
    }

    /// Store at `index`, padding with `invalid` past the end. Indices at
    /// or beyond [`MAX_ARRAY_LENGTH`] are out of range.
    pub fn set(&self, index: i64, value: BrsType) -> Result<(), RuntimeErrorKind> {
        let out_of_range = || RuntimeErrorKind::IndexOutOfRange(index);
        let index = usize::try_from(index)
            .ok()
            .filter(|&i| i < MAX_ARRAY_LENGTH)
            .ok_or_else(out_of_range)?;
        let mut elements = self.elements.borrow_mut();
        if index >= elements.len() {
            elements.resize(index + 1, BrsType::Invalid);
        }
        elements[index] = value;
        Ok(())
    }

    pub fn push(&self, value: BrsType) {
        self.elements.borrow_mut().push(value);
    }

    /// Snapshot of the current elements.
    #[must_use]
    pub fn elements(&self) -> Vec<BrsType> {
        self.elements.borrow().clone()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.elements, &other.elements)
    }

    fn method(&self, name: &str) -> Option<Callable> {
        let this = self.clone();
        let value = || Argument::required("value", ValueKind::Dynamic);
        let callable = match name {
            "count" => nullary("count", ValueKind::Int32, move || Ok(count(this.len()))),
            "push" => unary("push", value(), ValueKind::Void, move |item| {
                this.push(item.clone());
                Ok(BrsType::Invalid)
            }),
            "pop" => nullary("pop", ValueKind::Dynamic, move || {
                Ok(this.elements.borrow_mut().pop().unwrap_or(BrsType::Invalid))
            }),
            "peek" => nullary("peek", ValueKind::Dynamic, move || {
                Ok(this.elements.borrow().last().cloned().unwrap_or(BrsType::Invalid))
            }),
            "shift" => nullary("shift", ValueKind::Dynamic, move || {
                let mut elements = this.elements.borrow_mut();
                Ok(if elements.is_empty() {
                    BrsType::Invalid
                } else {
                    elements.remove(0)
                })
            }),
            "unshift" => unary("unshift", value(), ValueKind::Void, move |item| {
                this.elements.borrow_mut().insert(0, item.clone());
                Ok(BrsType::Invalid)
            }),
            "clear" => nullary("clear", ValueKind::Void, move || {
                this.elements.borrow_mut().clear();
                Ok(BrsType::Invalid)
            }),
            "isempty" => nullary("isEmpty", ValueKind::Boolean, move || {
                Ok(BrsType::Boolean(this.is_empty()))
            }),
            "append" => {
                let array = Argument::required("array", ValueKind::Object);
                unary("append", array, ValueKind::Void, move |other| match other {
                    BrsType::Object(BrsObject::Array(other)) => {
                        let items = other.elements();
                        this.elements.borrow_mut().extend(items);
                        Ok(BrsType::Invalid)
                    }
                    other => Err(append_mismatch("roArray", other)),
                })
            }
            _ => return None,
        };
        Some(callable)
    }
}

/// Member function without arguments.
fn nullary<F>(name: &str, returns: ValueKind, body: F) -> Callable
where
    F: Fn() -> Result<BrsType, RuntimeErrorKind> + 'static,
{
    Callable::native(name, Signature::new(vec![], returns), move |_, _| body())
}

/// Member function with exactly one argument.
fn unary<F>(name: &str, arg: Argument, returns: ValueKind, body: F) -> Callable
where
    F: Fn(&BrsType) -> Result<BrsType, RuntimeErrorKind> + 'static,
{
    Callable::native(name, Signature::new(vec![arg], returns), move |_, args| {
        body(&args[0])
    })
}

fn count(len: usize) -> BrsType {
    BrsType::Int32(i32::try_from(len).unwrap_or(i32::MAX))
}

fn append_mismatch(expected: &str, found: &BrsType) -> RuntimeErrorKind {
    RuntimeErrorKind::ArgumentMismatch {
        function: "append".to_string(),
        detail: format!("expected {expected}, got {}", found.type_name()),
    }
}

impl fmt::Debug for RoArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoArray(len = {})", self.len())
    }
}

/// `roAssociativeArray`: a shared map with case-insensitive keys, stored
/// lowercased and iterated in sorted order.
#[derive(Clone, Default)]
pub struct RoAssociativeArray {
    entries: Rc<RefCell<BTreeMap<String, BrsType>>>,
}

impl RoAssociativeArray {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<BrsType> {
        self.entries.borrow().get(&key.to_ascii_lowercase()).cloned()
    }

    pub fn set(&self, key: &str, value: BrsType) {
        self.entries
            .borrow_mut()
            .insert(key.to_ascii_lowercase(), value);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries
            .borrow_mut()
            .remove(&key.to_ascii_lowercase())
            .is_some()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .borrow()
            .contains_key(&key.to_ascii_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Snapshot of the current entries in key order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, BrsType)> {
        self.entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }

    fn method(&self, name: &str) -> Option<Callable> {
        let this = self.clone();
        let key = || Argument::required("key", ValueKind::String);
        let callable = match name {
            "count" => nullary("count", ValueKind::Int32, move || Ok(count(this.len()))),
            "clear" => nullary("clear", ValueKind::Void, move || {
                this.entries.borrow_mut().clear();
                Ok(BrsType::Invalid)
            }),
            "isempty" => nullary("isEmpty", ValueKind::Boolean, move || {
                Ok(BrsType::Boolean(this.is_empty()))
            }),
            "doesexist" => unary("doesExist", key(), ValueKind::Boolean, move |k| {
                Ok(BrsType::Boolean(this.contains(&key_of(k))))
            }),
            "delete" => unary("delete", key(), ValueKind::Boolean, move |k| {
                Ok(BrsType::Boolean(this.remove(&key_of(k))))
            }),
            "lookup" => unary("lookup", key(), ValueKind::Dynamic, move |k| {
                Ok(this.get(&key_of(k)).unwrap_or(BrsType::Invalid))
            }),
            "addreplace" => Callable::native(
                "addReplace",
                Signature::new(
                    vec![key(), Argument::required("value", ValueKind::Dynamic)],
                    ValueKind::Void,
                ),
                move |_, args| {
                    this.set(&key_of(&args[0]), args[1].clone());
                    Ok(BrsType::Invalid)
                },
            ),
            "keys" => nullary("keys", ValueKind::Object, move || {
                let keys = this.keys().into_iter().map(BrsType::String).collect();
                Ok(BrsType::Object(BrsObject::Array(RoArray::new(keys))))
            }),
            "items" => nullary("items", ValueKind::Object, move || {
                let items = this
                    .entries()
                    .into_iter()
                    .map(|(key, value)| {
                        let item = Self::new();
                        item.set("key", BrsType::String(key));
                        item.set("value", value);
                        BrsType::Object(BrsObject::AssociativeArray(item))
                    })
                    .collect();
                Ok(BrsType::Object(BrsObject::Array(RoArray::new(items))))
            }),
            "append" => {
                let aa = Argument::required("aa", ValueKind::Object);
                unary("append", aa, ValueKind::Void, move |other| match other {
                    BrsType::Object(BrsObject::AssociativeArray(other)) => {
                        for (key, value) in other.entries() {
                            this.set(&key, value);
                        }
                        Ok(BrsType::Invalid)
                    }
                    other => Err(append_mismatch("roAssociativeArray", other)),
                })
            }
            _ => return None,
        };
        Some(callable)
    }
}

fn key_of(value: &BrsType) -> String {
    match value {
        BrsType::String(key) => key.clone(),
        other => other.to_string(),
    }
}

impl fmt::Debug for RoAssociativeArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Any reference-typed value.
#[derive(Debug, Clone)]
pub enum BrsObject {
    Array(RoArray),
    AssociativeArray(RoAssociativeArray),
    /// A primitive wrapped as `roString`, `roInt` and friends.
    Boxed(Rc<BrsType>),
    Component(Rc<dyn BrsComponent>),
}

impl BrsObject {
    /// Box a primitive. Functions, interfaces and objects have no box.
    #[must_use]
    pub fn boxed(value: &BrsType) -> Option<Self> {
        match value {
            BrsType::Invalid
            | BrsType::Boolean(_)
            | BrsType::String(_)
            | BrsType::Int32(_)
            | BrsType::Int64(_)
            | BrsType::Float(_)
            | BrsType::Double(_) => Some(Self::Boxed(Rc::new(value.clone()))),
            _ => None,
        }
    }

    #[must_use]
    pub fn component_name(&self) -> String {
        match self {
            Self::Array(_) => "roArray".to_string(),
            Self::AssociativeArray(_) => "roAssociativeArray".to_string(),
            Self::Boxed(inner) => boxed_name(inner).to_string(),
            Self::Component(component) => component.component_name().to_string(),
        }
    }

    #[must_use]
    pub fn same_object(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::AssociativeArray(a), Self::AssociativeArray(b)) => a.ptr_eq(b),
            (Self::Boxed(a), Self::Boxed(b)) => Rc::ptr_eq(a, b),
            (Self::Component(a), Self::Component(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn interfaces(&self) -> Vec<&'static str> {
        match self {
            Self::Array(_) => vec!["ifArray", "ifArrayGet", "ifArraySet", "ifEnum"],
            Self::AssociativeArray(_) => vec!["ifAssociativeArray", "ifEnum"],
            Self::Boxed(inner) => {
                let specific = match inner.as_ref() {
                    BrsType::String(_) => "ifString",
                    BrsType::Int32(_) => "ifInt",
                    BrsType::Int64(_) => "ifLongInt",
                    BrsType::Float(_) => "ifFloat",
                    BrsType::Double(_) => "ifDouble",
                    BrsType::Boolean(_) => "ifBoolean",
                    _ => return vec!["ifToStr"],
                };
                vec!["ifToStr", specific]
            }
            Self::Component(component) => component.interfaces().to_vec(),
        }
    }

    /// Member function `name` (lowercase) bound to this object.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<Callable> {
        let name = name.to_ascii_lowercase();
        match self {
            Self::Array(array) => array.method(&name),
            Self::AssociativeArray(aa) => aa.method(&name),
            Self::Boxed(inner) => boxed_method(inner, &name),
            Self::Component(component) => Rc::clone(component).method(&name),
        }
    }

    /// `obj.name`: associative-array entries first, then member functions.
    /// A missing associative-array key reads as `invalid`.
    pub fn get_property(&self, name: &str) -> Result<BrsType, RuntimeErrorKind> {
        let found = match self {
            Self::AssociativeArray(aa) => {
                return Ok(aa
                    .get(name)
                    .or_else(|| aa.method(&name.to_ascii_lowercase()).map(callable_value))
                    .unwrap_or(BrsType::Invalid));
            }
            Self::Component(component) => component
                .get(name)
                .or_else(|| self.method(name).map(callable_value)),
            Self::Array(_) | Self::Boxed(_) => self.method(name).map(callable_value),
        };
        found.ok_or_else(|| RuntimeErrorKind::MemberNotFound {
            component: self.component_name(),
            name: name.to_string(),
        })
    }

    /// `obj.name = value`.
    pub fn set_property(&self, name: &str, value: BrsType) -> Result<(), RuntimeErrorKind> {
        match self {
            Self::AssociativeArray(aa) => {
                aa.set(name, value);
                Ok(())
            }
            Self::Component(component) => component.set(name, value),
            Self::Array(_) | Self::Boxed(_) => Err(RuntimeErrorKind::MemberNotFound {
                component: self.component_name(),
                name: name.to_string(),
            }),
        }
    }

    /// `obj[index]`.
    pub fn get_index(&self, index: &BrsType) -> Result<BrsType, RuntimeErrorKind> {
        match self {
            Self::Array(array) => {
                let i = to_i64(index).ok_or_else(|| index_mismatch(self, index))?;
                Ok(array.get(i))
            }
            Self::AssociativeArray(aa) => match index.unboxed() {
                BrsType::String(key) => Ok(aa.get(&key).unwrap_or(BrsType::Invalid)),
                _ => Err(index_mismatch(self, index)),
            },
            Self::Component(component) => component
                .get_index(index)
                .ok_or(RuntimeErrorKind::InvalidIndexedAccess(ValueKind::Object)),
            Self::Boxed(inner) => Err(RuntimeErrorKind::InvalidIndexedAccess(inner.kind())),
        }
    }

    /// `obj[index] = value`.
    pub fn set_index(&self, index: &BrsType, value: BrsType) -> Result<(), RuntimeErrorKind> {
        match self {
            Self::Array(array) => {
                let i = to_i64(index).ok_or_else(|| index_mismatch(self, index))?;
                array.set(i, value)
            }
            Self::AssociativeArray(aa) => match index.unboxed() {
                BrsType::String(key) => {
                    aa.set(&key, value);
                    Ok(())
                }
                _ => Err(index_mismatch(self, index)),
            },
            Self::Component(component) => component.set_index(index, value),
            Self::Boxed(inner) => Err(RuntimeErrorKind::InvalidIndexedAccess(inner.kind())),
        }
    }

    /// Values visited by `for each`: array elements, associative-array
    /// keys, or whatever a component yields.
    #[must_use]
    pub fn elements(&self) -> Option<Vec<BrsType>> {
        match self {
            Self::Array(array) => Some(array.elements()),
            Self::AssociativeArray(aa) => {
                Some(aa.keys().into_iter().map(BrsType::String).collect())
            }
            Self::Component(component) => component.elements(),
            Self::Boxed(_) => None,
        }
    }
}

fn callable_value(callable: Callable) -> BrsType {
    BrsType::Callable(Rc::new(callable))
}

fn index_mismatch(object: &BrsObject, index: &BrsType) -> RuntimeErrorKind {
    RuntimeErrorKind::TypeMismatch {
        operator: format!("{}[]", object.component_name()),
        left: ValueKind::Object,
        right: Some(index.kind()),
    }
}

const fn boxed_name(value: &BrsType) -> &'static str {
    match value {
        BrsType::String(_) => "roString",
        BrsType::Int32(_) => "roInt",
        BrsType::Int64(_) => "roLongInteger",
        BrsType::Float(_) => "roFloat",
        BrsType::Double(_) => "roDouble",
        BrsType::Boolean(_) => "roBoolean",
        _ => "roInvalid",
    }
}

fn boxed_method(inner: &Rc<BrsType>, name: &str) -> Option<Callable> {
    let value = inner.as_ref().clone();
    let getter = |method: &str, returns: ValueKind, value: BrsType| {
        Callable::native(method, Signature::new(vec![], returns), move |_, _| Ok(value.clone()))
    };

    let callable = match (name, &value) {
        ("tostr", _) => {
            let text = match &value {
                BrsType::Invalid => "invalid".to_string(),
                other => other.to_string(),
            };
            getter("toStr", ValueKind::String, BrsType::String(text))
        }
        ("getstring", BrsType::String(_)) => getter("getString", ValueKind::String, value.clone()),
        ("len", BrsType::String(s)) => {
            let len = i32::try_from(s.chars().count()).unwrap_or(i32::MAX);
            getter("len", ValueKind::Int32, BrsType::Int32(len))
        }
        ("getint", BrsType::Int32(_)) => getter("getInt", ValueKind::Int32, value.clone()),
        ("getlonginteger", BrsType::Int64(_)) => {
            getter("getLongInteger", ValueKind::Int64, value.clone())
        }
        ("getfloat", BrsType::Float(_)) => getter("getFloat", ValueKind::Float, value.clone()),
        ("getdouble", BrsType::Double(_)) => getter("getDouble", ValueKind::Double, value.clone()),
        ("getboolean", BrsType::Boolean(_)) => {
            getter("getBoolean", ValueKind::Boolean, value.clone())
        }
        _ => return None,
    };
    Some(callable)
}

impl fmt::Display for BrsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(array) => {
                writeln!(f, "<Component: roArray> =")?;
                writeln!(f, "[")?;
                for element in array.elements() {
                    writeln!(f, "    {}", element.to_nested_string())?;
                }
                write!(f, "]")
            }
            Self::AssociativeArray(aa) => {
                writeln!(f, "<Component: roAssociativeArray> =")?;
                writeln!(f, "{{")?;
                for (key, value) in aa.entries() {
                    writeln!(f, "    {key}: {}", value.to_nested_string())?;
                }
                write!(f, "}}")
            }
            Self::Boxed(inner) => write!(f, "{inner}"),
            Self::Component(component) => write!(f, "<Component: {}>", component.component_name()),
        }
    }
}

/// An object viewed through one of its interfaces, as returned by
/// `GetInterface`. Member calls go to the underlying object.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub object: BrsObject,
}
