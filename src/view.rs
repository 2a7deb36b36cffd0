use crate::any_value::Value;
use crate::error::{MapError, MapResult};
use crate::inner::{self, RawMap};
use crate::key::AnyKey;
use crate::map::KeyMap;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The contract of a conventional, untyped key-value map
///
/// Keys are erased [`AnyKey`]s and values are erased [`Value`]s. Probing
/// methods take `&dyn Any` so callers can ask about arbitrary objects: anything
/// that isn't an `AnyKey` is simply not in the map. A typed key is probed
/// through [`Key::erased`](crate::Key::erased).
///
/// Both [`MapView`] and a plain [`RawMap`] implement this trait, so code
/// written against it works with either.
pub trait UntypedMap {
    fn len(&self) -> MapResult<usize>;

    fn is_empty(&self) -> MapResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns false for anything that isn't a mapped `AnyKey`
    fn contains_key(&self, key: &dyn Any) -> MapResult<bool>;

    fn contains_value(&self, value: &dyn Value) -> MapResult<bool>;

    /// Returns `None` for anything that isn't a mapped `AnyKey`
    fn get(&self, key: &dyn Any) -> MapResult<Option<Box<dyn Value>>>;

    fn put(&mut self, key: AnyKey, value: Box<dyn Value>) -> MapResult<Option<Box<dyn Value>>>;

    /// Returns `None` for anything that isn't a mapped `AnyKey`
    fn remove(&mut self, key: &dyn Any) -> MapResult<Option<Box<dyn Value>>>;

    fn put_all(&mut self, entries: Vec<(AnyKey, Box<dyn Value>)>) -> MapResult<()>;

    fn clear(&mut self) -> MapResult<()>;

    fn keys(&self) -> MapResult<Vec<AnyKey>>;

    fn values(&self) -> MapResult<Vec<Box<dyn Value>>>;

    fn entries(&self) -> MapResult<Vec<(AnyKey, Box<dyn Value>)>>;
}

fn as_key(key: &dyn Any) -> Option<&AnyKey> {
    key.downcast_ref::<AnyKey>()
}

const REJECTED: &str = "the map view rejected the entry";
const MISMATCHED: &str = "the map holds a value its key rejects";

/// A live, untyped view of a [`KeyMap`]
///
/// Obtained from [`KeyMap::to_map`]. The view owns no data: every call goes
/// to the map's storage, so changes made through the view show up in the map
/// and the other way around. Any number of views can exist for one map.
///
/// Type errors never leak through the view as `MapError::TypeMismatch`; they
/// are reported as `MapError::InvalidArgument` with the mismatch as source.
/// That covers reads too: `get` and `remove` check the stored value against a
/// checked key's descriptor, and a rejected value is neither returned nor removed.
///
/// A view compares equal to any untyped map with the same entries, including
/// other views, but there is deliberately no comparison between a view and a
/// `KeyMap`:
///
/// ```compile_fail
/// use sovran_keymap::KeyMap;
///
/// let map = KeyMap::new();
/// let view = map.to_map();
/// assert!(map != view);
/// ```
///
/// # Examples
///
/// ```
/// use sovran_keymap::{KeyMap, MapError, UntypedMap};
///
/// let map = KeyMap::new();
/// let key = map.insert_value(7u32)?;
///
/// let mut view = map.to_map();
/// assert!(view.contains_key(key.erased())?);
/// assert!(!view.contains_key(&"not a key")?);
///
/// // Wrong type for the key: rejected, nothing changes.
/// let err = view.put(key.erased().clone(), Box::new("seven")).unwrap_err();
/// assert!(matches!(err, MapError::InvalidArgument { .. }));
/// assert_eq!(map.get(&key)?, Some(7));
/// # Ok::<(), MapError>(())
/// ```
pub struct MapView {
    map: KeyMap,
}

impl MapView {
    pub(crate) fn new(map: KeyMap) -> Self {
        Self { map }
    }

    /// Copies the current entries into a plain [`RawMap`]
    pub fn to_hash_map(&self) -> MapResult<RawMap> {
        Ok(self.map.entries()?.into_iter().collect())
    }
}

impl UntypedMap for MapView {
    fn len(&self) -> MapResult<usize> {
        self.map.len()
    }

    fn is_empty(&self) -> MapResult<bool> {
        self.map.is_empty()
    }

    fn contains_key(&self, key: &dyn Any) -> MapResult<bool> {
        match as_key(key) {
            Some(key) => self.map.contains_key(key),
            None => Ok(false),
        }
    }

    fn contains_value(&self, value: &dyn Value) -> MapResult<bool> {
        self.map.contains_value(value)
    }

    fn get(&self, key: &dyn Any) -> MapResult<Option<Box<dyn Value>>> {
        let Some(key) = as_key(key) else {
            return Ok(None);
        };
        let value = self.map.get_erased(key)?;
        if let Some(value) = &value {
            key.check(&**value)
                .map_err(|err| MapError::invalid_argument(MISMATCHED, err))?;
        }
        Ok(value)
    }

    fn put(&mut self, key: AnyKey, value: Box<dyn Value>) -> MapResult<Option<Box<dyn Value>>> {
        self.map
            .insert_erased(key, value)
            .map_err(|err| MapError::invalid_argument(REJECTED, err))
    }

    fn remove(&mut self, key: &dyn Any) -> MapResult<Option<Box<dyn Value>>> {
        match as_key(key) {
            Some(key) => self
                .map
                .remove_erased(key)
                .map_err(|err| MapError::invalid_argument(MISMATCHED, err)),
            None => Ok(None),
        }
    }

    fn put_all(&mut self, entries: Vec<(AnyKey, Box<dyn Value>)>) -> MapResult<()> {
        self.map
            .insert_all(entries)
            .map_err(|err| MapError::invalid_argument(REJECTED, err))
    }

    fn clear(&mut self) -> MapResult<()> {
        self.map.clear()
    }

    fn keys(&self) -> MapResult<Vec<AnyKey>> {
        self.map.keys()
    }

    fn values(&self) -> MapResult<Vec<Box<dyn Value>>> {
        self.map.values()
    }

    fn entries(&self) -> MapResult<Vec<(AnyKey, Box<dyn Value>)>> {
        self.map.entries()
    }
}

impl UntypedMap for RawMap {
    fn len(&self) -> MapResult<usize> {
        Ok(RawMap::len(self))
    }

    fn contains_key(&self, key: &dyn Any) -> MapResult<bool> {
        Ok(as_key(key).is_some_and(|key| RawMap::contains_key(self, key)))
    }

    fn contains_value(&self, value: &dyn Value) -> MapResult<bool> {
        Ok(RawMap::values(self).any(|stored| stored.dyn_eq(value)))
    }

    fn get(&self, key: &dyn Any) -> MapResult<Option<Box<dyn Value>>> {
        Ok(as_key(key).and_then(|key| RawMap::get(self, key)).cloned())
    }

    // A plain map has no descriptor checks of its own.
    fn put(&mut self, key: AnyKey, value: Box<dyn Value>) -> MapResult<Option<Box<dyn Value>>> {
        Ok(RawMap::insert(self, key, value))
    }

    fn remove(&mut self, key: &dyn Any) -> MapResult<Option<Box<dyn Value>>> {
        Ok(as_key(key).and_then(|key| RawMap::remove(self, key)))
    }

    fn put_all(&mut self, entries: Vec<(AnyKey, Box<dyn Value>)>) -> MapResult<()> {
        self.extend(entries);
        Ok(())
    }

    fn clear(&mut self) -> MapResult<()> {
        RawMap::clear(self);
        Ok(())
    }

    fn keys(&self) -> MapResult<Vec<AnyKey>> {
        Ok(RawMap::keys(self).cloned().collect())
    }

    fn values(&self) -> MapResult<Vec<Box<dyn Value>>> {
        Ok(RawMap::values(self).cloned().collect())
    }

    fn entries(&self) -> MapResult<Vec<(AnyKey, Box<dyn Value>)>> {
        Ok(self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

impl PartialEq for MapView {
    fn eq(&self, other: &Self) -> bool {
        self.map
            .with_inner(|left| {
                other
                    .map
                    .with_inner(|right| inner::entries_eq(left, right))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }
}

impl PartialEq<RawMap> for MapView {
    fn eq(&self, other: &RawMap) -> bool {
        self.map
            .with_inner(|left| inner::entries_eq(left, other))
            .unwrap_or(false)
    }
}

impl PartialEq<MapView> for RawMap {
    fn eq(&self, other: &MapView) -> bool {
        other == self
    }
}

impl Hash for MapView {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.map.hash(state);
    }
}

impl fmt::Debug for MapView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MapView").field(&self.map).finish()
    }
}
