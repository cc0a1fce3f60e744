//! The Sift value
//!
//! `Value` is the tagged union every query primitive operates on: the seven
//! JSON kinds plus `Invalid`, the in-band error signal. Scalars live inline;
//! strings, arrays, objects, and decimal literals sit behind shared
//! reference-counted cells.
//!
//! Ownership follows a consuming discipline: mutating operations take the
//! value by `self` and return the result, queries borrow. Sharing is
//! `Clone` (a refcount bump), releasing is `Drop`. A mutating operation
//! that finds its cell uniquely owned patches it in place; a shared cell is
//! copied first, so every other owner keeps seeing the original contents.
//!
//! Values never form cycles: the graph is a tree whose subtrees may be
//! shared by several parents.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::array::SiftArray;
#[cfg(feature = "decimal")]
use crate::number::SiftDecimal;
use crate::object::SiftObject;
use crate::string::SiftString;

/// The kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Invalid,
    Null,
    False,
    True,
    Number,
    String,
    Array,
    Object,
}

impl Kind {
    /// Human-readable kind name, as used in error messages. `False` and
    /// `True` both read "boolean".
    pub fn name(self) -> &'static str {
        match self {
            Kind::Invalid => "<invalid>",
            Kind::Null => "null",
            Kind::False | Kind::True => "boolean",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

/// A JSON value with copy-on-write sharing.
#[derive(Clone)]
pub enum Value {
    Null,
    False,
    True,
    /// Native IEEE-754 number.
    Number(f64),
    /// Exact decimal literal, preserved as parsed.
    #[cfg(feature = "decimal")]
    Literal(SiftDecimal),
    String(SiftString),
    Array(SiftArray),
    Object(SiftObject),
    /// In-band error, with an optional message value.
    Invalid(Option<Rc<Value>>),
}

impl Value {
    pub fn null() -> Value {
        Value::Null
    }

    pub fn bool(b: bool) -> Value {
        if b { Value::True } else { Value::False }
    }

    /// The message-less `Invalid`, used to signal "absent".
    pub fn invalid() -> Value {
        Value::Invalid(None)
    }

    /// `Invalid` carrying a message value (usually a string).
    pub fn invalid_with_msg(msg: Value) -> Value {
        Value::Invalid(Some(Rc::new(msg)))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::False => Kind::False,
            Value::True => Kind::True,
            Value::Number(_) => Kind::Number,
            #[cfg(feature = "decimal")]
            Value::Literal(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
            Value::Invalid(_) => Kind::Invalid,
        }
    }

    /// Strong count of the backing cell; 1 for inline values.
    /// Diagnostic only.
    pub fn refcnt(&self) -> usize {
        match self {
            Value::String(s) => s.refcnt(),
            Value::Array(a) => a.refcnt(),
            Value::Object(o) => o.refcnt(),
            #[cfg(feature = "decimal")]
            Value::Literal(n) => n.refcnt(),
            Value::Invalid(Some(m)) => Rc::strong_count(m),
            _ => 1,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Invalid(_))
    }

    pub fn invalid_has_msg(&self) -> bool {
        match self {
            Value::Invalid(msg) => msg.is_some(),
            other => panic!(
                "invalid_has_msg: expected <invalid>, got {}",
                other.kind().name()
            ),
        }
    }

    /// Take the message out of an `Invalid`; `Null` when there is none.
    pub fn invalid_get_msg(self) -> Value {
        match self {
            Value::Invalid(Some(msg)) => Rc::try_unwrap(msg).unwrap_or_else(|m| (*m).clone()),
            Value::Invalid(None) => Value::Null,
            other => panic!(
                "invalid_get_msg: expected <invalid>, got {}",
                other.kind().name()
            ),
        }
    }

    /// Same descriptor, not just equal contents: the same heap cell (and
    /// window, for arrays), or bit-identical inline payload. Two native
    /// NaNs are identical exactly when their bit patterns match.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null)
            | (Value::False, Value::False)
            | (Value::True, Value::True)
            | (Value::Invalid(None), Value::Invalid(None)) => true,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            #[cfg(feature = "decimal")]
            (Value::Literal(a), Value::Literal(b)) => SiftDecimal::ptr_eq(a, b),
            (Value::String(a), Value::String(b)) => SiftString::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(&a.cell, &b.cell) && a.offset == b.offset && a.len == b.len
            }
            (Value::Object(a), Value::Object(b)) => SiftObject::ptr_eq(a, b),
            (Value::Invalid(Some(a)), Value::Invalid(Some(b))) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Containment: equality on scalars, byte-substring on strings,
    /// element-wise on arrays, key-wise recursive on objects. Values of
    /// different kinds never contain each other.
    pub fn contains(&self, b: &Value) -> bool {
        if self.kind() != b.kind() {
            return false;
        }
        match (self, b) {
            (Value::Object(_), Value::Object(_)) => b
                .object_entries()
                .all(|(k, bv)| self.object_get(&k).contains(&bv)),
            (Value::Array(_), Value::Array(_)) => b
                .array_iter()
                .all(|be| self.array_iter().any(|ae| ae.contains(&be))),
            (Value::String(a), Value::String(nb)) => {
                nb.len_bytes() == 0 || a.as_str().contains(nb.as_str())
            }
            _ => self == b,
        }
    }
}

/// Structural equality. Numbers compare by value (`1.10` literal equals
/// native `1.1`), objects ignore insertion order, and a shared cell
/// short-circuits the deep compare. NaN is not equal to itself, so this
/// is partial, like `f64`.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.equal(b),
            (Value::Object(a), Value::Object(b)) => a.equal(b),
            // any two invalids are equal, message or not
            (Value::Invalid(_), Value::Invalid(_)) => true,
            (Value::Null, _) | (Value::False, _) | (Value::True, _) => true,
            // both sides are numbers of some representation
            _ => self.number_cmp(other) == Ordering::Equal,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::False => f.write_str("false"),
            Value::True => f.write_str("true"),
            Value::Number(x) => write!(f, "{x}"),
            #[cfg(feature = "decimal")]
            Value::Literal(n) => match n.literal() {
                Some(lit) => f.write_str(lit),
                None => write!(f, "{}", n.to_f64()),
            },
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(_) => f.debug_list().entries(self.array_iter()).finish(),
            Value::Object(_) => f.debug_map().entries(self.object_entries()).finish(),
            Value::Invalid(None) => f.write_str("<invalid>"),
            Value::Invalid(Some(msg)) => write!(f, "<invalid: {msg:?}>"),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Number(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(SiftString::from_string(s))
    }
}
