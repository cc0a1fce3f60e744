//! Array values
//!
//! An array value is a window `(offset, len)` onto a shared backing vector,
//! so slicing shares storage instead of copying. Writes go through
//! copy-on-write: a uniquely owned backing is patched in place, a shared one
//! is replaced by a fresh backing holding shares of the visible elements.
//!
//! The window offset is deliberately a 16-bit field; a slice whose offset
//! no longer fits falls back to a fresh backing.

use std::rc::Rc;

use crate::value::Value;

/// Default capacity for `array()`.
const DEFAULT_ARRAY_CAPACITY: usize = 16;

/// Indices past `i32::MAX >> 2` are refused, same bound as the object
/// capacity limit.
const MAX_INDEX: i64 = (i32::MAX >> 2) as i64;

pub(crate) struct ArrCell {
    pub(crate) elems: Vec<Value>,
}

/// Shared handle to an array backing plus the visible window.
#[derive(Clone)]
pub struct SiftArray {
    pub(crate) cell: Rc<ArrCell>,
    pub(crate) offset: u16,
    pub(crate) len: usize,
}

impl SiftArray {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        SiftArray {
            cell: Rc::new(ArrCell {
                elems: Vec::with_capacity(capacity),
            }),
            offset: 0,
            len: 0,
        }
    }

    pub(crate) fn read(&self, i: usize) -> Option<&Value> {
        if i < self.len {
            self.cell.elems.get(usize::from(self.offset) + i)
        } else {
            None
        }
    }

    pub(crate) fn same_view(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.cell, &b.cell) && a.offset == b.offset
    }

    pub(crate) fn refcnt(&self) -> usize {
        Rc::strong_count(&self.cell)
    }

    pub(crate) fn equal(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        if Self::same_view(self, other) {
            return true;
        }
        (0..self.len).all(|i| self.read(i) == other.read(i))
    }
}

/// Normalize slice bounds against `len`: negative indices count from the
/// end, then both are clamped to `[0, len]` with `end >= start`.
pub(crate) fn clamp_slice_params(len: usize, start: i32, end: i32) -> (usize, usize) {
    let len = len as i64;
    let mut start = i64::from(start);
    let mut end = i64::from(end);
    if start < 0 {
        start += len;
    }
    if end < 0 {
        end += len;
    }
    let start = start.clamp(0, len);
    let end = end.clamp(start, len);
    (start as usize, end as usize)
}

impl Value {
    pub fn array() -> Value {
        Value::array_sized(DEFAULT_ARRAY_CAPACITY)
    }

    pub fn array_sized(capacity: usize) -> Value {
        Value::Array(SiftArray::with_capacity(capacity))
    }

    pub fn array_length(&self) -> usize {
        self.as_array("array_length").len
    }

    /// Share of the element at `idx`, or a message-less `Invalid` when the
    /// index is outside the window.
    pub fn array_get(&self, idx: i32) -> Value {
        let arr = self.as_array("array_get");
        if idx < 0 {
            return Value::invalid();
        }
        match arr.read(idx as usize) {
            Some(v) => v.clone(),
            None => Value::invalid(),
        }
    }

    /// Store `val` at `idx`, growing the array with `Null` as needed.
    /// Negative `idx` counts from the end.
    pub fn array_set(self, idx: i32, val: Value) -> Value {
        let mut arr = self.into_array("array_set");

        let mut idx = i64::from(idx);
        if idx < 0 {
            idx += arr.len as i64;
        }
        if idx < 0 {
            return Value::invalid_with_msg(Value::string("Out of bounds negative array index"));
        }
        if idx > MAX_INDEX - i64::from(arr.offset) {
            return Value::invalid_with_msg(Value::string("Array index too large"));
        }
        let idx = idx as usize;
        let pos = usize::from(arr.offset) + idx;

        if Rc::strong_count(&arr.cell) == 1 && pos < arr.cell.elems.capacity() {
            // sole owner with room in the backing: patch in place
            let cell = Rc::get_mut(&mut arr.cell).expect("unique");
            if pos < cell.elems.len() {
                cell.elems[pos] = val;
            } else {
                while cell.elems.len() < pos {
                    cell.elems.push(Value::Null);
                }
                cell.elems.push(val);
            }
            arr.len = arr.len.max(idx + 1);
            Value::Array(arr)
        } else {
            // shared or full: fresh backing with shares of the window
            let new_len = arr.len.max(idx + 1);
            let mut elems = Vec::with_capacity(new_len * 3 / 2);
            for i in 0..arr.len {
                elems.push(arr.read(i).expect("in window").clone());
            }
            elems.resize(new_len, Value::Null);
            elems[idx] = val;
            Value::Array(SiftArray {
                cell: Rc::new(ArrCell { elems }),
                offset: 0,
                len: new_len,
            })
        }
    }

    pub fn array_append(self, val: Value) -> Value {
        let len = self.array_length();
        self.array_set(len as i32, val)
    }

    /// Append every element of `b`, stopping early if the accumulator
    /// becomes `Invalid`.
    pub fn array_concat(self, b: Value) -> Value {
        let b = b.into_array("array_concat");
        let mut a = self;
        for i in 0..b.len {
            a = a.array_append(b.read(i).expect("in window").clone());
            if !a.is_valid() {
                break;
            }
        }
        a
    }

    /// Sub-range as a new value. Shares the backing when the combined
    /// offset still fits the window field, otherwise copies.
    pub fn array_slice(self, start: i32, end: i32) -> Value {
        let arr = self.into_array("array_slice");
        let (start, end) = clamp_slice_params(arr.len, start, end);

        if start == end {
            return Value::array();
        }
        let new_offset = usize::from(arr.offset) + start;
        if new_offset > usize::from(u16::MAX) {
            let mut r = Value::array_sized(end - start);
            for i in start..end {
                r = r.array_append(arr.read(i).expect("in window").clone());
                if !r.is_valid() {
                    break;
                }
            }
            r
        } else {
            Value::Array(SiftArray {
                cell: arr.cell,
                offset: new_offset as u16,
                len: end - start,
            })
        }
    }

    /// Positions at which the subsequence `needle` begins, as a number
    /// array. An empty needle matches nowhere.
    pub fn array_indexes(&self, needle: &Value) -> Value {
        let a = self.as_array("array_indexes");
        let b = needle.as_array("array_indexes");
        let mut res = Value::array();
        if b.len == 0 {
            return res;
        }
        for ai in 0..a.len {
            if ai + b.len > a.len {
                break;
            }
            if (0..b.len).all(|bi| a.read(ai + bi) == b.read(bi)) {
                res = res.array_append(Value::number(ai as f64));
                if !res.is_valid() {
                    break;
                }
            }
        }
        res
    }

    /// Iterate shares of the visible elements.
    pub fn array_iter(&self) -> impl Iterator<Item = Value> + '_ {
        let arr = self.as_array("array_iter");
        (0..arr.len).map(|i| arr.read(i).expect("in window").clone())
    }

    pub(crate) fn as_array(&self, op: &str) -> &SiftArray {
        match self {
            Value::Array(a) => a,
            other => panic!("{op}: expected array, got {}", other.kind().name()),
        }
    }

    pub(crate) fn into_array(self, op: &str) -> SiftArray {
        match self {
            Value::Array(a) => a,
            other => panic!("{op}: expected array, got {}", other.kind().name()),
        }
    }
}
