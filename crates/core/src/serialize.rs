//! Serialization of Sift values
//!
//! Provides a serializable mirror of the runtime [`Value`] for persistence
//! and exchange with external systems (snapshots, caches, IPC). The runtime
//! value holds shared cells and cached hashes that have no business on the
//! wire; `SerialValue` uses plain owned data and derives serde.
//!
//! Objects serialize as ordered key/value pairs, not a map type, so the
//! same logical object always produces identical bytes and insertion order
//! survives a round trip.
//!
//! `Invalid` values are an in-band error channel, not data; serializing one
//! is an error. Non-finite numbers are rejected for the same reason: they
//! have no JSON-compatible reading on the other end.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Error during serialization/deserialization.
#[derive(Debug)]
pub enum SerializeError {
    /// `Invalid` is an error signal, not data
    InvalidNotSerializable,
    /// NaN or infinity
    NonFiniteNumber(f64),
    /// A literal did not parse back into a number
    BadLiteral(String),
    /// Bincode encoding/decoding error
    BincodeError(Box<bincode::Error>),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::InvalidNotSerializable => {
                write!(f, "invalid values cannot be serialized")
            }
            SerializeError::NonFiniteNumber(x) => {
                write!(f, "cannot serialize non-finite number: {x}")
            }
            SerializeError::BadLiteral(lit) => {
                write!(f, "malformed number literal in serialized data: {lit:?}")
            }
            SerializeError::BincodeError(e) => write!(f, "bincode error: {e}"),
        }
    }
}

impl std::error::Error for SerializeError {}

/// Owned, serde-friendly form of a [`Value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SerialValue {
    Null,
    Bool(bool),
    Number(f64),
    /// Exact decimal literal, kept as text
    #[cfg(feature = "decimal")]
    Literal(String),
    String(String),
    Array(Vec<SerialValue>),
    /// Entries in insertion order
    Object(Vec<(String, SerialValue)>),
}

impl SerialValue {
    pub fn from_value(value: &Value) -> Result<SerialValue, SerializeError> {
        match value {
            Value::Null => Ok(SerialValue::Null),
            Value::False => Ok(SerialValue::Bool(false)),
            Value::True => Ok(SerialValue::Bool(true)),
            Value::Number(x) => {
                if x.is_finite() {
                    Ok(SerialValue::Number(*x))
                } else {
                    Err(SerializeError::NonFiniteNumber(*x))
                }
            }
            #[cfg(feature = "decimal")]
            Value::Literal(_) => match value.number_get_literal() {
                Some(lit) => Ok(SerialValue::Literal(lit.to_owned())),
                None => Err(SerializeError::NonFiniteNumber(value.number_value())),
            },
            Value::String(s) => Ok(SerialValue::String(s.as_str().to_owned())),
            Value::Array(_) => {
                let mut elems = Vec::with_capacity(value.array_length());
                for elem in value.array_iter() {
                    elems.push(SerialValue::from_value(&elem)?);
                }
                Ok(SerialValue::Array(elems))
            }
            Value::Object(_) => {
                let mut entries = Vec::with_capacity(value.object_length());
                for (k, v) in value.object_entries() {
                    entries.push((k.string_value().to_owned(), SerialValue::from_value(&v)?));
                }
                Ok(SerialValue::Object(entries))
            }
            Value::Invalid(_) => Err(SerializeError::InvalidNotSerializable),
        }
    }

    pub fn into_value(self) -> Result<Value, SerializeError> {
        match self {
            SerialValue::Null => Ok(Value::Null),
            SerialValue::Bool(b) => Ok(Value::bool(b)),
            SerialValue::Number(x) => Ok(Value::number(x)),
            #[cfg(feature = "decimal")]
            SerialValue::Literal(lit) => {
                let n = Value::number_with_literal(&lit);
                if n.is_valid() {
                    Ok(n)
                } else {
                    Err(SerializeError::BadLiteral(lit))
                }
            }
            SerialValue::String(s) => Ok(Value::from(s)),
            SerialValue::Array(elems) => {
                let mut a = Value::array_sized(elems.len());
                for elem in elems {
                    a = a.array_append(elem.into_value()?);
                }
                Ok(a)
            }
            SerialValue::Object(entries) => {
                let mut o = Value::object();
                for (k, v) in entries {
                    o = o.object_set(Value::from(k), v.into_value()?);
                }
                Ok(o)
            }
        }
    }
}

/// Serialize a value to compact binary bytes.
pub fn to_bytes(value: &Value) -> Result<Vec<u8>, SerializeError> {
    let serial = SerialValue::from_value(value)?;
    bincode::serialize(&serial).map_err(|e| SerializeError::BincodeError(Box::new(e)))
}

/// Deserialize a value from [`to_bytes`] output.
pub fn from_bytes(bytes: &[u8]) -> Result<Value, SerializeError> {
    let serial: SerialValue =
        bincode::deserialize(bytes).map_err(|e| SerializeError::BincodeError(Box::new(e)))?;
    serial.into_value()
}
