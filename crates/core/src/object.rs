//! Object values
//!
//! An object is an open hash table that remembers insertion order. The cell
//! holds `capacity` slots (a power of two) and a bucket table of
//! `2 * capacity` chain heads. Slots are claimed in order by a `next_free`
//! cursor, so walking the slot array visits keys in the order they were
//! first inserted. Deleting a key tombstones its slot (`key == None`);
//! tombstones are reclaimed at the next rehash.
//!
//! Lookups hash the key (the cached string hash), pick a bucket with
//! `hash & (2*capacity - 1)`, and walk the collision chain comparing the
//! hash and then the key bytes.

use std::rc::Rc;

use crate::string::SiftString;
use crate::value::Value;

/// Iterator cursor value meaning "no more entries".
pub const ITER_FINISHED: i32 = -2;

const DEFAULT_OBJECT_CAPACITY: usize = 8;

/// Rehashing refuses to grow past this; `object_set` then reports
/// "Object too big".
const MAX_CAPACITY: usize = (i32::MAX >> 2) as usize;

#[derive(Clone)]
pub(crate) struct ObjSlot {
    next: i32,
    hash: u32,
    key: Option<SiftString>,
    value: Value,
}

impl ObjSlot {
    fn empty() -> Self {
        ObjSlot {
            next: -1,
            hash: 0,
            key: None,
            value: Value::Null,
        }
    }
}

#[derive(Clone)]
pub(crate) struct ObjCell {
    slots: Vec<ObjSlot>,
    buckets: Vec<i32>,
    next_free: usize,
}

/// Shared handle to an object cell.
#[derive(Clone)]
pub struct SiftObject(pub(crate) Rc<ObjCell>);

impl ObjCell {
    fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        ObjCell {
            slots: vec![ObjSlot::empty(); capacity],
            buckets: vec![-1; capacity * 2],
            next_free: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn bucket_of(&self, hash: u32) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    fn find_slot(&self, hash: u32, key: &str) -> Option<usize> {
        let mut cur = self.buckets[self.bucket_of(hash)];
        while cur >= 0 {
            let slot = &self.slots[cur as usize];
            if slot.hash == hash && slot.key.as_ref().is_some_and(|k| k.as_str() == key) {
                return Some(cur as usize);
            }
            cur = slot.next;
        }
        None
    }

    /// Claim the next free slot for `key`. The table must have room.
    fn add_slot(&mut self, key: SiftString, hash: u32, value: Value) -> usize {
        debug_assert!(self.next_free < self.capacity());
        let idx = self.next_free;
        self.next_free += 1;
        let bucket = self.bucket_of(hash);
        self.slots[idx] = ObjSlot {
            next: self.buckets[bucket],
            hash,
            key: Some(key),
            value,
        };
        self.buckets[bucket] = idx as i32;
        idx
    }

    /// Rehash into a table of double capacity, dropping tombstones.
    /// Live entries keep their slot order, so iteration order survives.
    fn grow(&mut self) {
        let mut bigger = ObjCell::new(self.capacity() * 2);
        for slot in self.slots.drain(..) {
            if let Some(key) = slot.key {
                bigger.add_slot(key, slot.hash, slot.value);
            }
        }
        *self = bigger;
    }

    fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.key.is_some()).count()
    }
}

impl SiftObject {
    pub(crate) fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn refcnt(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub(crate) fn equal(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        let mut live = 0;
        for slot in &self.0.slots {
            let Some(key) = &slot.key else { continue };
            match other.0.find_slot(slot.hash, key.as_str()) {
                Some(j) => {
                    if other.0.slots[j].value != slot.value {
                        return false;
                    }
                }
                None => return false,
            }
            live += 1;
        }
        live == other.0.live_count()
    }
}

impl Value {
    pub fn object() -> Value {
        Value::Object(SiftObject(Rc::new(ObjCell::new(DEFAULT_OBJECT_CAPACITY))))
    }

    /// Share of the value under `key`, or a message-less `Invalid` when
    /// the key is absent.
    pub fn object_get(&self, key: &Value) -> Value {
        let obj = self.as_object("object_get");
        let key = key.as_string("object_get");
        match obj.0.find_slot(key.hash(), key.as_str()) {
            Some(i) => obj.0.slots[i].value.clone(),
            None => Value::invalid(),
        }
    }

    pub fn object_has(&self, key: &Value) -> bool {
        let obj = self.as_object("object_has");
        let key = key.as_string("object_has");
        obj.0.find_slot(key.hash(), key.as_str()).is_some()
    }

    /// Insert or replace `key`. Replacing keeps the key's original slot,
    /// so iteration order never changes for an existing key.
    pub fn object_set(self, key: Value, value: Value) -> Value {
        let mut obj = self.into_object("object_set");
        let key = key.into_string("object_set");
        let hash = key.hash();

        let cell = Rc::make_mut(&mut obj.0);
        if let Some(i) = cell.find_slot(hash, key.as_str()) {
            cell.slots[i].value = value;
            return Value::Object(obj);
        }
        if cell.next_free == cell.capacity() {
            if cell.capacity() > MAX_CAPACITY {
                return Value::invalid_with_msg(Value::string("Object too big"));
            }
            cell.grow();
        }
        cell.add_slot(key, hash, value);
        Value::Object(obj)
    }

    /// Remove `key` if present. The slot becomes a tombstone until the
    /// next rehash.
    pub fn object_delete(self, key: &Value) -> Value {
        let mut obj = self.into_object("object_delete");
        let key = key.as_string("object_delete");
        let hash = key.hash();

        let cell = Rc::make_mut(&mut obj.0);
        let bucket = cell.bucket_of(hash);
        let mut prev: Option<usize> = None;
        let mut cur = cell.buckets[bucket];
        while cur >= 0 {
            let i = cur as usize;
            let matches =
                cell.slots[i].hash == hash
                    && cell.slots[i]
                        .key
                        .as_ref()
                        .is_some_and(|k| k.as_str() == key.as_str());
            if matches {
                let next = cell.slots[i].next;
                match prev {
                    None => cell.buckets[bucket] = next,
                    Some(p) => cell.slots[p].next = next,
                }
                cell.slots[i].key = None;
                cell.slots[i].value = Value::Null;
                break;
            }
            prev = Some(i);
            cur = cell.slots[i].next;
        }
        Value::Object(obj)
    }

    /// Number of live keys.
    pub fn object_length(&self) -> usize {
        self.as_object("object_length").0.live_count()
    }

    /// Set every `(key, value)` of `b` into `self`, in `b`'s iteration
    /// order, stopping early if the accumulator becomes `Invalid`.
    pub fn object_merge(self, b: Value) -> Value {
        let mut a = self;
        for (k, v) in b.object_entries() {
            a = a.object_set(k, v);
            if !a.is_valid() {
                break;
            }
        }
        a
    }

    /// Like [`Value::object_merge`], but when both sides hold an object
    /// under the same key the two are merged recursively.
    pub fn object_merge_recursive(self, b: Value) -> Value {
        let mut a = self;
        for (k, v) in b.object_entries() {
            let existing = a.object_get(&k);
            if existing.is_valid()
                && matches!(existing, Value::Object(_))
                && matches!(v, Value::Object(_))
            {
                a = a.object_set(k, existing.object_merge_recursive(v));
            } else {
                a = a.object_set(k, v);
            }
            if !a.is_valid() {
                break;
            }
        }
        a
    }

    /// First iterator cursor, or [`ITER_FINISHED`] for an empty object.
    pub fn object_iter(&self) -> i32 {
        self.object_iter_next(-1)
    }

    /// Advance the cursor past tombstones to the next live slot.
    pub fn object_iter_next(&self, iter: i32) -> i32 {
        debug_assert!(iter != ITER_FINISHED);
        let obj = self.as_object("object_iter_next");
        let mut i = iter;
        loop {
            i += 1;
            if i as usize >= obj.0.capacity() {
                return ITER_FINISHED;
            }
            if obj.0.slots[i as usize].key.is_some() {
                return i;
            }
        }
    }

    pub fn object_iter_valid(iter: i32) -> bool {
        iter != ITER_FINISHED
    }

    /// Share of the key at the cursor.
    pub fn object_iter_key(&self, iter: i32) -> Value {
        let obj = self.as_object("object_iter_key");
        let key = obj.0.slots[iter as usize]
            .key
            .clone()
            .expect("iterator on live slot");
        Value::String(key)
    }

    /// Share of the value at the cursor.
    pub fn object_iter_value(&self, iter: i32) -> Value {
        let obj = self.as_object("object_iter_value");
        obj.0.slots[iter as usize].value.clone()
    }

    /// Iterate shared `(key, value)` pairs in insertion order.
    pub fn object_entries(&self) -> ObjectEntries<'_> {
        ObjectEntries {
            obj: self,
            iter: self.object_iter(),
        }
    }

    pub(crate) fn as_object(&self, op: &str) -> &SiftObject {
        match self {
            Value::Object(o) => o,
            other => panic!("{op}: expected object, got {}", other.kind().name()),
        }
    }

    pub(crate) fn into_object(self, op: &str) -> SiftObject {
        match self {
            Value::Object(o) => o,
            other => panic!("{op}: expected object, got {}", other.kind().name()),
        }
    }
}

/// Iterator over shared `(key, value)` pairs of an object.
pub struct ObjectEntries<'a> {
    obj: &'a Value,
    iter: i32,
}

impl Iterator for ObjectEntries<'_> {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<Self::Item> {
        if !Value::object_iter_valid(self.iter) {
            return None;
        }
        let key = self.obj.object_iter_key(self.iter);
        let value = self.obj.object_iter_value(self.iter);
        self.iter = self.obj.object_iter_next(self.iter);
        Some((key, value))
    }
}
