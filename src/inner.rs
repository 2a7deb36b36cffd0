use crate::any_value::Value;
use crate::key::AnyKey;
use dyn_clone::DynClone;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::{BuildHasher, Hasher};

/// A plain untyped map of erased keys to erased values
pub type RawMap = HashMap<AnyKey, Box<dyn Value>>;

/// The backing storage of a [`KeyMap`](crate::KeyMap)
///
/// A `KeyMap` uses a [`RawMap`] unless its builder was given another
/// implementation. `BTreeMap` keeps keys in creation order and `IndexMap`
/// keeps them in insertion order; anything else can be plugged in by
/// implementing this trait.
pub trait InnerMap: DynClone + Debug {
    fn insert(&mut self, key: AnyKey, value: Box<dyn Value>) -> Option<Box<dyn Value>>;

    fn get(&self, key: &AnyKey) -> Option<&(dyn Value + 'static)>;

    fn get_mut(&mut self, key: &AnyKey) -> Option<&mut (dyn Value + 'static)>;

    fn remove(&mut self, key: &AnyKey) -> Option<Box<dyn Value>>;

    fn contains_key(&self, key: &AnyKey) -> bool {
        self.get(key).is_some()
    }

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&AnyKey, &(dyn Value + 'static))> + '_>;
}

dyn_clone::clone_trait_object!(InnerMap);

fn erase<'a>(
    (key, value): (&'a AnyKey, &'a Box<dyn Value>),
) -> (&'a AnyKey, &'a (dyn Value + 'static)) {
    (key, &**value)
}

impl<S> InnerMap for HashMap<AnyKey, Box<dyn Value>, S>
where
    S: BuildHasher + Clone + 'static,
{
    fn insert(&mut self, key: AnyKey, value: Box<dyn Value>) -> Option<Box<dyn Value>> {
        HashMap::insert(self, key, value)
    }

    fn get(&self, key: &AnyKey) -> Option<&(dyn Value + 'static)> {
        HashMap::get(self, key).map(|value| &**value)
    }

    fn get_mut(&mut self, key: &AnyKey) -> Option<&mut (dyn Value + 'static)> {
        HashMap::get_mut(self, key).map(|value| &mut **value)
    }

    fn remove(&mut self, key: &AnyKey) -> Option<Box<dyn Value>> {
        HashMap::remove(self, key)
    }

    fn contains_key(&self, key: &AnyKey) -> bool {
        HashMap::contains_key(self, key)
    }

    fn clear(&mut self) {
        HashMap::clear(self)
    }

    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&AnyKey, &(dyn Value + 'static))> + '_> {
        Box::new(HashMap::iter(self).map(erase))
    }
}

impl InnerMap for BTreeMap<AnyKey, Box<dyn Value>> {
    fn insert(&mut self, key: AnyKey, value: Box<dyn Value>) -> Option<Box<dyn Value>> {
        BTreeMap::insert(self, key, value)
    }

    fn get(&self, key: &AnyKey) -> Option<&(dyn Value + 'static)> {
        BTreeMap::get(self, key).map(|value| &**value)
    }

    fn get_mut(&mut self, key: &AnyKey) -> Option<&mut (dyn Value + 'static)> {
        BTreeMap::get_mut(self, key).map(|value| &mut **value)
    }

    fn remove(&mut self, key: &AnyKey) -> Option<Box<dyn Value>> {
        BTreeMap::remove(self, key)
    }

    fn contains_key(&self, key: &AnyKey) -> bool {
        BTreeMap::contains_key(self, key)
    }

    fn clear(&mut self) {
        BTreeMap::clear(self)
    }

    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&AnyKey, &(dyn Value + 'static))> + '_> {
        Box::new(BTreeMap::iter(self).map(erase))
    }
}

impl<S> InnerMap for IndexMap<AnyKey, Box<dyn Value>, S>
where
    S: BuildHasher + Clone + 'static,
{
    fn insert(&mut self, key: AnyKey, value: Box<dyn Value>) -> Option<Box<dyn Value>> {
        IndexMap::insert(self, key, value)
    }

    fn get(&self, key: &AnyKey) -> Option<&(dyn Value + 'static)> {
        IndexMap::get(self, key).map(|value| &**value)
    }

    fn get_mut(&mut self, key: &AnyKey) -> Option<&mut (dyn Value + 'static)> {
        IndexMap::get_mut(self, key).map(|value| &mut **value)
    }

    // Shifting keeps the remaining entries in insertion order.
    fn remove(&mut self, key: &AnyKey) -> Option<Box<dyn Value>> {
        IndexMap::shift_remove(self, key)
    }

    fn contains_key(&self, key: &AnyKey) -> bool {
        IndexMap::contains_key(self, key)
    }

    fn clear(&mut self) {
        IndexMap::clear(self)
    }

    fn len(&self) -> usize {
        IndexMap::len(self)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&AnyKey, &(dyn Value + 'static))> + '_> {
        Box::new(IndexMap::iter(self).map(erase))
    }
}

/// Pairwise entry equality between two backing maps of any kind
pub(crate) fn entries_eq(left: &dyn InnerMap, right: &dyn InnerMap) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(key, value)| right.get(key).is_some_and(|other| value.dyn_eq(other)))
}

/// Hashes the key set independently of iteration order
///
/// Values don't take part: they aren't required to be hashable, and equal maps
/// always have equal key sets.
pub(crate) fn hash_keys<H: Hasher>(map: &dyn InnerMap, state: &mut H) {
    let folded = map
        .iter()
        .fold(0u64, |acc, (key, _)| acc.wrapping_add(key.id()));
    write_key_hash(state, map.len(), folded);
}

/// What [`hash_keys`] writes for a map with no entries
pub(crate) fn hash_empty<H: Hasher>(state: &mut H) {
    write_key_hash(state, 0, 0);
}

fn write_key_hash<H: Hasher>(state: &mut H, len: usize, folded: u64) {
    state.write_usize(len);
    state.write_u64(folded);
}
