//! Sift Core: the value model of the Sift JSON query engine
//!
//! Everything the query language talks about is a [`Value`]: the seven JSON
//! kinds plus `Invalid`, the in-band error signal. The interpreter, the
//! JSON parser/printer, and the CLI all live in other crates and are built
//! as pure functions over this type.
//!
//! Key design principles:
//! - Consuming API: mutators take the value and return the result; sharing
//!   is `Clone`, releasing is `Drop`
//! - Copy-on-write: a uniquely owned cell is mutated in place, a shared
//!   one is copied first, so shared values are immutable in practice
//! - Structural sharing: array slices are windows over a common backing,
//!   objects remember insertion order across rehashes
//! - Errors are values: fallible operations return `Invalid`, with a
//!   message for illegal operations and without one for "absent"
//!
//! # Modules
//!
//! - `value`: the `Value` enum, kinds, equality/identity/containment
//! - `number`: native doubles and exact decimal literals
//! - `string`: UTF-8 string cells with cached hashing
//! - `array`: slice-view arrays
//! - `object`: insertion-ordered hash objects
//! - `serialize`: serde/bincode bridge for persistence and exchange

pub mod array;
#[cfg(feature = "decimal")]
mod dec;
pub mod number;
pub mod object;
pub mod serialize;
pub mod string;
pub mod value;

// Re-export key types and functions
pub use array::SiftArray;
#[cfg(feature = "decimal")]
pub use number::SiftDecimal;
pub use object::{ITER_FINISHED, ObjectEntries, SiftObject};
pub use serialize::{SerialValue, SerializeError, from_bytes, to_bytes};
pub use string::SiftString;
pub use value::{Kind, Value};
