//! Unordered set with O(1) insert, lookup and removal.
//!
//! Backed by a dense `Vec` plus an index map. Removal swaps the last element
//! into the vacated slot, so iteration order is insertion order only until
//! the first removal. Used for pending epochs and locked collateral, where
//! ordering carries no meaning.

use std::collections::HashMap;
use std::hash::Hash;

use bincode::de::{BorrowDecoder, Decoder};
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use serde::{Serialize, Serializer};

/// Dense-array set with swap-remove.
///
/// # Invariants
///
/// * `index.len() == items.len()`
/// * `items[index[x]] == x` for every member `x`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSet<T: Eq + Hash + Clone> {
    items: Vec<T>,
    index: HashMap<T, usize>,
}

impl<T: Eq + Hash + Clone> IndexedSet<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert `value`. Returns `false` if it was already present.
    pub fn insert(&mut self, value: T) -> bool {
        if self.index.contains_key(&value) {
            return false;
        }
        self.index.insert(value.clone(), self.items.len());
        self.items.push(value);
        true
    }

    /// Remove `value`. Returns `false` if it was absent.
    pub fn remove(&mut self, value: &T) -> bool {
        let Some(pos) = self.index.remove(value) else {
            return false;
        };
        self.items.swap_remove(pos);
        if let Some(moved) = self.items.get(pos) {
            self.index.insert(moved.clone(), pos);
        }
        true
    }

    pub fn contains(&self, value: &T) -> bool {
        self.index.contains_key(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Remove every element, returning them in storage order.
    pub fn drain(&mut self) -> Vec<T> {
        self.index.clear();
        std::mem::take(&mut self.items)
    }
}

impl<T: Eq + Hash + Clone> Default for IndexedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for IndexedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl<'a, T: Eq + Hash + Clone> IntoIterator for &'a IndexedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Eq + Hash + Clone + Serialize> Serialize for IndexedSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}

// Only the dense array is encoded; the index is rebuilt on decode.
impl<T: Eq + Hash + Clone + bincode::Encode> bincode::Encode for IndexedSet<T> {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        bincode::Encode::encode(&self.items, encoder)
    }
}

impl<Context, T> bincode::Decode<Context> for IndexedSet<T>
where
    T: Eq + Hash + Clone + bincode::Decode<Context>,
{
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let items: Vec<T> = bincode::Decode::decode(decoder)?;
        Ok(items.into_iter().collect())
    }
}

impl<'de, Context, T> bincode::BorrowDecode<'de, Context> for IndexedSet<T>
where
    T: Eq + Hash + Clone + bincode::Decode<Context>,
{
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, DecodeError> {
        <Self as bincode::Decode<Context>>::decode(decoder)
    }
}
