use crate::any_value::Value;
use crate::builder::KeyMapBuilder;
use crate::error::{MapError, MapResult};
use crate::inner::{self, InnerMap, RawMap};
use crate::key::{AnyKey, Key};
use crate::view::MapView;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use tracing::debug;

/// A heterogeneous map where every key carries the type of its value
///
/// Each [`Key<T>`] decides what its value looks like, so one `KeyMap` can hold
/// a `u16`, a `String` and a `Vec<Endpoint>` side by side and hand each of
/// them back with its own type. Checked keys validate every value that goes
/// in; unchecked keys trust the caller.
///
/// The map is single-threaded. It shares its storage with the views returned
/// by [`to_map`](KeyMap::to_map), and touching the map from inside one of its
/// own closures (`with`, `with_mut`, `apply`) fails with
/// `MapError::BorrowConflict` instead of panicking.
///
/// # Examples
///
/// ```
/// use sovran_keymap::{Key, KeyMap, MapError};
///
/// let map = KeyMap::new();
///
/// let name = map.insert_value("alpha".to_string())?;
/// let retries = Key::<u32>::new();
/// map.insert(&retries, 3)?;
///
/// assert_eq!(map.get(&name)?, Some("alpha".to_string()));
/// assert_eq!(map.get(&retries)?, Some(3));
/// assert_eq!(map.len()?, 2);
/// # Ok::<(), MapError>(())
/// ```
pub struct KeyMap {
    items: Rc<RefCell<Box<dyn InnerMap>>>,
}

impl KeyMap {
    /// Creates a new, empty KeyMap backed by a [`RawMap`]
    pub fn new() -> Self {
        Self::from_inner(Box::new(RawMap::new()))
    }

    /// Creates a map and fills it with untyped entries
    ///
    /// # Errors
    ///
    /// Same as [`insert_all`](KeyMap::insert_all).
    pub fn with_entries<I>(entries: I) -> MapResult<Self>
    where
        I: IntoIterator<Item = (AnyKey, Box<dyn Value>)>,
    {
        let map = Self::new();
        map.insert_all(entries)?;
        Ok(map)
    }

    /// Creates an independent copy of `other`
    ///
    /// Every entry goes through the usual validation, so a map that was built
    /// without checks and holds a bad entry can't be copied.
    pub fn copy_of(other: &KeyMap) -> MapResult<Self> {
        let map = Self::new();
        map.insert_all_from(other)?;
        Ok(map)
    }

    /// Starts a [`KeyMapBuilder`] for a map with custom storage or content
    pub fn builder() -> KeyMapBuilder {
        KeyMapBuilder::new()
    }

    pub(crate) fn from_inner(inner: Box<dyn InnerMap>) -> Self {
        Self {
            items: Rc::new(RefCell::new(inner)),
        }
    }

    /// Another handle on the same storage
    pub(crate) fn share(&self) -> Self {
        Self {
            items: Rc::clone(&self.items),
        }
    }

    fn read(&self) -> MapResult<Ref<'_, Box<dyn InnerMap>>> {
        self.items.try_borrow().map_err(|_| MapError::BorrowConflict)
    }

    fn write(&self) -> MapResult<RefMut<'_, Box<dyn InnerMap>>> {
        self.items
            .try_borrow_mut()
            .map_err(|_| MapError::BorrowConflict)
    }

    pub(crate) fn with_inner<F, R>(&self, f: F) -> MapResult<R>
    where
        F: FnOnce(&dyn InnerMap) -> R,
    {
        let items = self.read()?;
        Ok(f(&**items))
    }

    /// Stores a value under a freshly minted key checked against its own type
    ///
    /// Use [`insert`](KeyMap::insert) with an explicit key when the key should
    /// outlive the value or be shared before anything is stored.
    pub fn insert_value<T: Value>(&self, value: T) -> MapResult<Key<T>> {
        let key = Key::new();
        self.insert(&key, value)?;
        Ok(key)
    }

    /// Stores a value, returning the one it replaced
    ///
    /// # Errors
    ///
    /// - Returns `MapError::InvalidValue` if the key's descriptor rejects the value
    /// - Returns `MapError::TypeMismatch` if the replaced value isn't a `T`
    ///   (only possible with unchecked keys or unchecked custom storage);
    ///   the new value is stored regardless
    /// - Returns `MapError::BorrowConflict` if the map is already borrowed
    pub fn insert<T: Value>(&self, key: &Key<T>, value: T) -> MapResult<Option<T>> {
        let previous = self.insert_checked(key.erased(), Box::new(value))?;
        previous.map(|previous| key.cast(previous)).transpose()
    }

    /// The one place where values enter the map
    fn insert_checked(
        &self,
        key: &AnyKey,
        value: Box<dyn Value>,
    ) -> MapResult<Option<Box<dyn Value>>> {
        if !key.can_be_mapped_to(&*value) {
            debug!(%key, ?value, "key rejected value");
            return Err(MapError::InvalidValue {
                key: key.to_string(),
                value: format!("{:?}", value),
            });
        }
        Ok(self.write()?.insert(key.clone(), value))
    }

    /// Casts an untyped value to the key's type, then stores it
    pub(crate) fn insert_erased(
        &self,
        key: AnyKey,
        value: Box<dyn Value>,
    ) -> MapResult<Option<Box<dyn Value>>> {
        if let Err(err) = key.check(&*value) {
            debug!(%key, found = value.type_name(), "untyped entry rejected");
            return Err(err);
        }
        self.insert_checked(&key, value)
    }

    /// Stores every untyped entry, in iteration order
    ///
    /// Entries are applied one at a time: when one fails, the ones before it
    /// stay in the map.
    ///
    /// # Errors
    ///
    /// - Returns `MapError::TypeMismatch` for the first entry whose key rejects its value
    /// - Returns `MapError::BorrowConflict` if the map is already borrowed
    pub fn insert_all<I>(&self, entries: I) -> MapResult<()>
    where
        I: IntoIterator<Item = (AnyKey, Box<dyn Value>)>,
    {
        for (key, value) in entries {
            self.insert_erased(key, value)?;
        }
        Ok(())
    }

    /// Stores a copy of every entry of `other`
    pub fn insert_all_from(&self, other: &KeyMap) -> MapResult<()> {
        self.insert_all(other.entries()?)
    }

    /// Retrieves a clone of the value stored under `key`
    ///
    /// # Errors
    ///
    /// - Returns `MapError::TypeMismatch` if the stored value isn't a `T`
    /// - Returns `MapError::BorrowConflict` if the map is mutably borrowed
    pub fn get<T: Value>(&self, key: &Key<T>) -> MapResult<Option<T>> {
        let items = self.read()?;
        items
            .get(key.erased())
            .map(|value| key.cast_ref(value).map(dyn_clone::clone))
            .transpose()
    }

    /// Retrieves a clone of the value stored under an erased key, without narrowing it
    pub fn get_erased(&self, key: &AnyKey) -> MapResult<Option<Box<dyn Value>>> {
        let items = self.read()?;
        Ok(items.get(key).map(dyn_clone::clone_box))
    }

    /// Runs `f` against the stored value without cloning it
    ///
    /// Returns `Ok(None)` when the key isn't mapped.
    ///
    /// # Examples
    ///
    /// ```
    /// use sovran_keymap::{KeyMap, MapError};
    ///
    /// let map = KeyMap::new();
    /// let hosts = map.insert_value(vec!["a.example", "b.example"])?;
    ///
    /// let count = map.with(&hosts, |hosts| hosts.len())?;
    /// assert_eq!(count, Some(2));
    /// # Ok::<(), MapError>(())
    /// ```
    pub fn with<T, F, R>(&self, key: &Key<T>, f: F) -> MapResult<Option<R>>
    where
        T: Value,
        F: FnOnce(&T) -> R,
    {
        let items = self.read()?;
        match items.get(key.erased()) {
            Some(value) => Ok(Some(f(key.cast_ref(value)?))),
            None => Ok(None),
        }
    }

    /// Runs `f` against the stored value with write access
    ///
    /// # Examples
    ///
    /// ```
    /// use sovran_keymap::{KeyMap, MapError};
    ///
    /// let map = KeyMap::new();
    /// let hosts = map.insert_value(vec!["a.example".to_string()])?;
    ///
    /// map.with_mut(&hosts, |hosts| hosts.push("b.example".to_string()))?;
    /// assert_eq!(map.get(&hosts)?.map(|hosts| hosts.len()), Some(2));
    /// # Ok::<(), MapError>(())
    /// ```
    pub fn with_mut<T, F, R>(&self, key: &Key<T>, f: F) -> MapResult<Option<R>>
    where
        T: Value,
        F: FnOnce(&mut T) -> R,
    {
        let mut items = self.write()?;
        match items.get_mut(key.erased()) {
            Some(value) => Ok(Some(f(key.cast_mut(value)?))),
            None => Ok(None),
        }
    }

    /// Removes a value from the map, returning it if the key was mapped
    ///
    /// Removing a key that isn't mapped is not an error.
    pub fn remove<T: Value>(&self, key: &Key<T>) -> MapResult<Option<T>> {
        let removed = self.write()?.remove(key.erased());
        removed.map(|value| key.cast(value)).transpose()
    }

    /// Removes an untyped entry once its value passes the key's descriptor
    ///
    /// A rejected value stays in the map.
    pub(crate) fn remove_erased(&self, key: &AnyKey) -> MapResult<Option<Box<dyn Value>>> {
        let mut items = self.write()?;
        if let Some(value) = items.get(key) {
            key.check(value)?;
        }
        Ok(items.remove(key))
    }

    /// Removes every listed key; keys that aren't mapped are skipped
    pub fn remove_all<I, K>(&self, keys: I) -> MapResult<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<AnyKey>,
    {
        let mut items = self.write()?;
        for key in keys {
            items.remove(key.as_ref());
        }
        Ok(())
    }

    /// Removes every entry
    pub fn clear(&self) -> MapResult<()> {
        self.write()?.clear();
        Ok(())
    }

    /// Returns the number of entries in the map
    pub fn len(&self) -> MapResult<usize> {
        Ok(self.read()?.len())
    }

    /// Returns true if the map contains no entries
    pub fn is_empty(&self) -> MapResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Returns true if `key` is mapped; accepts both typed and erased keys
    pub fn contains_key<K>(&self, key: &K) -> MapResult<bool>
    where
        K: AsRef<AnyKey> + ?Sized,
    {
        Ok(self.read()?.contains_key(key.as_ref()))
    }

    /// Returns true if some entry holds a value equal to `value`
    pub fn contains_value(&self, value: &dyn Value) -> MapResult<bool> {
        let items = self.read()?;
        let found = items.iter().any(|(_, stored)| stored.dyn_eq(value));
        Ok(found)
    }

    /// Returns a snapshot of all keys in the map
    pub fn keys(&self) -> MapResult<Vec<AnyKey>> {
        let items = self.read()?;
        let keys = items.iter().map(|(key, _)| key.clone()).collect();
        Ok(keys)
    }

    /// Returns a snapshot of all values in the map
    pub fn values(&self) -> MapResult<Vec<Box<dyn Value>>> {
        let items = self.read()?;
        let values = items
            .iter()
            .map(|(_, value)| dyn_clone::clone_box(value))
            .collect();
        Ok(values)
    }

    /// Returns a snapshot of all entries in the map
    pub fn entries(&self) -> MapResult<Vec<(AnyKey, Box<dyn Value>)>> {
        let items = self.read()?;
        let entries = items
            .iter()
            .map(|(key, value)| (key.clone(), dyn_clone::clone_box(value)))
            .collect();
        Ok(entries)
    }

    /// Applies a function to every entry, stopping at the first error
    ///
    /// # Errors
    ///
    /// Returns `MapError::BorrowConflict` if the map is mutably borrowed,
    /// or any error returned by the provided function.
    pub fn apply<F>(&self, mut f: F) -> MapResult<()>
    where
        F: FnMut(&AnyKey, &dyn Value) -> MapResult<()>,
    {
        let items = self.read()?;
        for (key, value) in items.iter() {
            f(key, value)?;
        }
        Ok(())
    }

    /// Presents this map as an untyped [`MapView`] over the same storage
    pub fn to_map(&self) -> MapView {
        MapView::new(self.share())
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for KeyMap {
    fn eq(&self, other: &Self) -> bool {
        self.with_inner(|left| {
            other
                .with_inner(|right| inner::entries_eq(left, right))
                .unwrap_or(false)
        })
        .unwrap_or(false)
    }
}

impl Hash for KeyMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // A map that is mutably borrowed can't be looked at; it hashes as empty.
        if self
            .with_inner(|items| inner::hash_keys(items, state))
            .is_err()
        {
            inner::hash_empty(state);
        }
    }
}

impl fmt::Debug for KeyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.items.try_borrow() {
            Ok(items) => f.debug_map().entries(items.iter()).finish(),
            Err(_) => f.write_str("KeyMap { <borrowed> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::TypeDescriptor;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(map: &KeyMap) -> u64 {
        let mut hasher = DefaultHasher::new();
        map.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn insert_returns_previous_value_once() -> MapResult<()> {
        let map = KeyMap::new();
        let key = Key::<String>::new();

        assert_eq!(map.insert(&key, "one".to_string())?, None);
        assert_eq!(map.insert(&key, "two".to_string())?, Some("one".to_string()));
        assert_eq!(map.get(&key)?, Some("two".to_string()));
        assert_eq!(map.len()?, 1);
        Ok(())
    }

    #[test]
    fn descriptor_rejection_is_an_invalid_value() {
        let map = KeyMap::new();
        let key = Key::<i64>::with_descriptor(TypeDescriptor::of::<i32>());

        match map.insert(&key, 5) {
            Err(MapError::InvalidValue { key: name, value }) => {
                assert_eq!(name, "Key(i32)");
                assert_eq!(value, "5");
            }
            other => panic!("expected an invalid value, got {:?}", other),
        }
        assert!(map.is_empty().unwrap());
    }

    #[test]
    fn reentrant_access_is_a_borrow_conflict() -> MapResult<()> {
        let map = KeyMap::new();
        let key = map.insert_value(1u8)?;

        let inner = map.with(&key, |_| map.insert(&key, 2))?;
        assert!(matches!(inner, Some(Err(MapError::BorrowConflict))));

        let inner = map.with_mut(&key, |_| map.len())?;
        assert!(matches!(inner, Some(Err(MapError::BorrowConflict))));

        assert_eq!(map.get(&key)?, Some(1));
        Ok(())
    }

    #[test]
    fn unchecked_key_fails_on_first_typed_read() -> MapResult<()> {
        let map = KeyMap::new();
        let key = Key::<u32>::unchecked();

        // An untyped caller slips in a value of the wrong type.
        map.insert_all(vec![(key.erased().clone(), Box::new("oops") as Box<dyn Value>)])?;
        assert!(map.contains_key(&key)?);

        assert!(matches!(map.get(&key), Err(MapError::TypeMismatch { .. })));
        assert!(matches!(
            map.with(&key, |n| *n + 1),
            Err(MapError::TypeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn equal_content_hashes_alike() -> MapResult<()> {
        let a = Key::<u8>::new();
        let b = Key::<String>::new();

        let first = KeyMap::new();
        first.insert(&a, 1)?;
        first.insert(&b, "b".to_string())?;

        let second = KeyMap::new();
        second.insert(&b, "b".to_string())?;
        second.insert(&a, 1)?;

        assert_eq!(first, second);
        assert_eq!(hash_of(&first), hash_of(&second));

        second.insert(&a, 2)?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn borrowed_map_hashes_as_empty() -> MapResult<()> {
        let map = KeyMap::new();
        let key = map.insert_value(3u8)?;
        let empty = hash_of(&KeyMap::new());

        assert_ne!(hash_of(&map), empty);
        let borrowed = map.with_mut(&key, |_| hash_of(&map))?;
        assert_eq!(borrowed, Some(empty));
        Ok(())
    }

    #[test]
    fn debug_lists_entries() -> MapResult<()> {
        let map = KeyMap::new();
        map.insert_value(7u8)?;

        let rendered = format!("{:?}", map);
        assert!(rendered.contains("Key(u8)"));
        assert!(rendered.contains('7'));
        Ok(())
    }
}
