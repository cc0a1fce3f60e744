//! String values
//!
//! A string is a shared heap cell holding UTF-8 text and a cached 32-bit
//! hash. Untrusted bytes are repaired on entry: every invalid sequence is
//! replaced with U+FFFD, so the buffer is valid UTF-8 for its whole life
//! and `string_value` can hand out `&str` directly.
//!
//! Appends mutate in place when the cell is uniquely owned and copy
//! otherwise; every append invalidates the cached hash. Slicing and
//! splitting work in codepoints, not bytes.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::array::clamp_slice_params;
use crate::value::Value;

/// MurmurHash3-32 seed shared by the string hash and the object table.
const HASH_SEED: u32 = 0x432A_9843;

/// Smallest capacity allocated when an append outgrows a shared cell.
const MIN_GROW: usize = 32;

pub(crate) struct StrCell {
    buf: String,
    hash: Cell<Option<u32>>,
}

/// Shared handle to a string cell.
#[derive(Clone)]
pub struct SiftString(Rc<StrCell>);

impl SiftString {
    pub(crate) fn from_str(s: &str) -> Self {
        Self::from_string(s.to_owned())
    }

    pub(crate) fn from_string(buf: String) -> Self {
        SiftString(Rc::new(StrCell {
            buf,
            hash: Cell::new(None),
        }))
    }

    /// Build from untrusted bytes, repairing invalid UTF-8 to U+FFFD.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_string(String::from_utf8_lossy(bytes).into_owned())
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self::from_string(String::with_capacity(capacity))
    }

    pub fn as_str(&self) -> &str {
        &self.0.buf
    }

    pub fn len_bytes(&self) -> usize {
        self.0.buf.len()
    }

    pub(crate) fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn refcnt(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// The cached MurmurHash3-32 of the bytes, computed on first use.
    pub fn hash(&self) -> u32 {
        if let Some(h) = self.0.hash.get() {
            return h;
        }
        let h = murmur3_32(self.0.buf.as_bytes(), HASH_SEED);
        self.0.hash.set(Some(h));
        h
    }

    /// Append text, reusing the cell when it is the sole owner.
    pub(crate) fn append(mut self, data: &str) -> Self {
        match Rc::get_mut(&mut self.0) {
            Some(cell) => {
                cell.buf.push_str(data);
                cell.hash.set(None);
                self
            }
            None => {
                let total = self.0.buf.len() + data.len();
                let mut buf = String::with_capacity((total * 2).max(MIN_GROW));
                buf.push_str(&self.0.buf);
                buf.push_str(data);
                Self::from_string(buf)
            }
        }
    }
}

impl PartialEq for SiftString {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.as_str() == other.as_str()
    }
}

impl Eq for SiftString {}

impl fmt::Debug for SiftString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for SiftString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// String from known text.
    pub fn string(s: &str) -> Value {
        Value::String(SiftString::from_str(s))
    }

    /// String from untrusted bytes; invalid UTF-8 becomes U+FFFD.
    pub fn string_sized(bytes: &[u8]) -> Value {
        Value::String(SiftString::from_bytes(bytes))
    }

    /// Empty string with reserved capacity.
    pub fn string_empty(capacity: usize) -> Value {
        Value::String(SiftString::with_capacity(capacity))
    }

    /// Borrow the text without consuming the value.
    pub fn string_value(&self) -> &str {
        self.as_string("string_value").as_str()
    }

    pub fn string_length_bytes(&self) -> usize {
        self.as_string("string_length_bytes").len_bytes()
    }

    pub fn string_length_codepoints(&self) -> usize {
        self.as_string("string_length_codepoints")
            .as_str()
            .chars()
            .count()
    }

    pub fn string_hash(&self) -> u32 {
        self.as_string("string_hash").hash()
    }

    pub fn string_concat(self, other: Value) -> Value {
        let b = other.into_string("string_concat");
        let a = self.into_string("string_concat");
        Value::String(a.append(b.as_str()))
    }

    pub fn string_append_str(self, s: &str) -> Value {
        self.string_append_buf(s.as_bytes())
    }

    /// Append raw bytes, repairing invalid UTF-8 to U+FFFD.
    pub fn string_append_buf(self, buf: &[u8]) -> Value {
        let a = self.into_string("string_append_buf");
        match std::str::from_utf8(buf) {
            Ok(s) => Value::String(a.append(s)),
            Err(_) => {
                let repaired = String::from_utf8_lossy(buf);
                Value::String(a.append(&repaired))
            }
        }
    }

    /// Append one codepoint; anything outside the scalar range becomes
    /// U+FFFD.
    pub fn string_append_codepoint(self, c: u32) -> Value {
        let a = self.into_string("string_append_codepoint");
        let ch = char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER);
        let mut buf = [0u8; 4];
        Value::String(a.append(ch.encode_utf8(&mut buf)))
    }

    /// Codepoint-indexed slice. Negative indices count from the end; the
    /// result is always a fresh cell.
    pub fn string_slice(self, start: i32, end: i32) -> Value {
        let s = self.into_string("string_slice");
        let text = s.as_str();
        let len = text.chars().count();
        let (start, end) = clamp_slice_params(len, start, end);
        let byte_start = text
            .char_indices()
            .nth(start)
            .map_or(text.len(), |(i, _)| i);
        let byte_end = text.char_indices().nth(end).map_or(text.len(), |(i, _)| i);
        Value::string(&text[byte_start..byte_end])
    }

    /// Split on a separator. An empty separator yields one element per
    /// codepoint; a trailing separator yields a trailing empty string.
    pub fn string_split(self, sep: Value) -> Value {
        let sep = sep.into_string("string_split");
        let s = self.into_string("string_split");
        let hay = s.as_str();
        let sepstr = sep.as_str();
        let mut a = Value::array();

        if sepstr.is_empty() {
            let mut buf = [0u8; 4];
            for ch in hay.chars() {
                a = a.array_append(Value::string(ch.encode_utf8(&mut buf)));
                if !a.is_valid() {
                    break;
                }
            }
        } else {
            let mut p = 0;
            while p < hay.len() {
                let idx = hay[p..].find(sepstr).map_or(hay.len(), |i| p + i);
                a = a.array_append(Value::string(&hay[p..idx]));
                if !a.is_valid() {
                    break;
                }
                if idx + sepstr.len() == hay.len() {
                    a = a.array_append(Value::string(""));
                }
                p = idx + sepstr.len();
            }
        }
        a
    }

    /// Array of codepoints as numbers.
    pub fn string_explode(self) -> Value {
        let s = self.into_string("string_explode");
        let mut a = Value::array_sized(s.len_bytes());
        for ch in s.as_str().chars() {
            a = a.array_append(Value::number(f64::from(u32::from(ch))));
            if !a.is_valid() {
                break;
            }
        }
        a
    }

    /// Inverse of [`Value::string_explode`]: a number array back into a
    /// string. Codepoints outside `[0, 0x10FFFF]` or in the surrogate
    /// range become U+FFFD.
    pub fn string_implode(self) -> Value {
        let len = self.array_length();
        let mut s = Value::string_empty(len);
        for i in 0..len {
            let n = self.array_get(i as i32);
            let nv = n.number_value() as i64;
            let c = if !(0..=0x10FFFF).contains(&nv) || (0xD800..=0xDFFF).contains(&nv) {
                0xFFFD
            } else {
                nv as u32
            };
            s = s.string_append_codepoint(c);
        }
        s
    }

    /// Repeat the string `n` times. Negative `n` yields `Null`; a result
    /// of `i32::MAX` bytes or more is an error.
    pub fn string_repeat(self, n: i32) -> Value {
        let s = self.into_string("string_repeat");
        if n < 0 {
            return Value::Null;
        }
        let res_len = s.len_bytes() as i64 * i64::from(n);
        if res_len >= i64::from(i32::MAX) {
            return Value::invalid_with_msg(Value::string("Repeat string result too long"));
        }
        if res_len == 0 {
            return Value::string("");
        }
        Value::String(SiftString::from_string(s.as_str().repeat(n as usize)))
    }

    /// Codepoint offsets of the non-overlapping occurrences of `needle`.
    /// An empty needle matches nowhere.
    pub fn string_indexes(&self, needle: &Value) -> Value {
        let hay = self.string_value();
        let nee = needle.string_value();
        let mut a = Value::array();
        if nee.is_empty() {
            return a;
        }
        let mut codepoints = 0usize;
        let mut scanned = 0usize;
        for (pos, _) in hay.match_indices(nee) {
            codepoints += hay[scanned..pos].chars().count();
            scanned = pos;
            a = a.array_append(Value::number(codepoints as f64));
            if !a.is_valid() {
                break;
            }
        }
        a
    }

    pub(crate) fn as_string(&self, op: &str) -> &SiftString {
        match self {
            Value::String(s) => s,
            other => panic!("{op}: expected string, got {}", other.kind().name()),
        }
    }

    pub(crate) fn into_string(self, op: &str) -> SiftString {
        match self {
            Value::String(s) => s,
            other => panic!("{op}: expected string, got {}", other.kind().name()),
        }
    }
}

/// MurmurHash3 (32-bit), by Austin Appleby, public domain.
fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h1 = seed;
    let mut chunks = data.chunks_exact(4);
    for block in &mut chunks {
        let mut k1 = u32::from_le_bytes(block.try_into().unwrap());
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1.rotate_left(13);
        h1 = h1.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    let mut k1 = 0u32;
    if tail.len() >= 3 {
        k1 ^= u32::from(tail[2]) << 16;
    }
    if tail.len() >= 2 {
        k1 ^= u32::from(tail[1]) << 8;
    }
    if !tail.is_empty() {
        k1 ^= u32::from(tail[0]);
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
    }

    h1 ^= data.len() as u32;
    h1 ^= h1 >> 16;
    h1 = h1.wrapping_mul(0x85eb_ca6b);
    h1 ^= h1 >> 13;
    h1 = h1.wrapping_mul(0xc2b2_ae35);
    h1 ^= h1 >> 16;
    h1
}
