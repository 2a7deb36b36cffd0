use crate::any_value::Value;
use crate::error::{MapError, MapResult};
use crate::inner::{InnerMap, RawMap};
use crate::key::AnyKey;
use crate::map::KeyMap;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BuilderState {
    Unused,
    Used,
}

const UNUSABLE_MAP: &str = "the provided map cannot be used";

/// Configures a single [`KeyMap`] before it is created
///
/// A builder produces exactly one map. Once [`instantiate`](KeyMapBuilder::instantiate)
/// has been called, every method fails with `MapError::IllegalState`.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use sovran_keymap::{AnyKey, Key, KeyMap, MapError, Value};
///
/// let greeting = Key::<String>::new();
///
/// let mut builder = KeyMap::builder();
/// builder
///     .with_custom_inner_map(IndexMap::<AnyKey, Box<dyn Value>>::new())?
///     .with_custom_content(vec![(
///         greeting.erased().clone(),
///         Box::new("hello".to_string()) as Box<dyn Value>,
///     )])?;
/// let map = builder.instantiate()?;
///
/// assert_eq!(map.get(&greeting)?, Some("hello".to_string()));
/// assert!(matches!(builder.instantiate(), Err(MapError::IllegalState(_))));
/// # Ok::<(), MapError>(())
/// ```
#[derive(Debug)]
pub struct KeyMapBuilder {
    content: Vec<(AnyKey, Box<dyn Value>)>,
    inner: Option<Box<dyn InnerMap>>,
    checks: bool,
    state: BuilderState,
}

impl KeyMapBuilder {
    pub fn new() -> Self {
        Self {
            content: Vec::new(),
            inner: None,
            checks: true,
            state: BuilderState::Unused,
        }
    }

    /// Skips validating the maps handed to this builder
    ///
    /// Bad custom content then fails at [`instantiate`](KeyMapBuilder::instantiate),
    /// and bad entries of a custom inner map fail the first time they are read
    /// through a typed key.
    pub fn without_map_checks(&mut self) -> MapResult<&mut Self> {
        self.ensure_unused()?;
        trace!("map checks disabled");
        self.checks = false;
        Ok(self)
    }

    /// Sets the entries the map starts with
    ///
    /// # Errors
    ///
    /// - Returns `MapError::InvalidArgument` if an entry is rejected by its key
    ///   (unless checks are disabled)
    /// - Returns `MapError::IllegalState` if the builder was already used
    pub fn with_custom_content<I>(&mut self, entries: I) -> MapResult<&mut Self>
    where
        I: IntoIterator<Item = (AnyKey, Box<dyn Value>)>,
    {
        self.ensure_unused()?;
        let content: Vec<_> = entries.into_iter().collect();
        self.validate(&content)?;
        self.content = content;
        Ok(self)
    }

    /// Starts the map with a copy of another map's entries
    pub fn with_custom_content_from(&mut self, map: &KeyMap) -> MapResult<&mut Self> {
        self.ensure_unused()?;
        let entries = map.entries()?;
        self.with_custom_content(entries)
    }

    /// Sets the storage the map will use
    ///
    /// Entries already in `map` stay in the resulting `KeyMap`.
    ///
    /// # Errors
    ///
    /// Same as [`with_custom_content`](KeyMapBuilder::with_custom_content).
    pub fn with_custom_inner_map<M>(&mut self, map: M) -> MapResult<&mut Self>
    where
        M: InnerMap + 'static,
    {
        self.ensure_unused()?;
        if self.checks {
            let entries: Vec<_> = map
                .iter()
                .map(|(key, value)| (key.clone(), dyn_clone::clone_box(value)))
                .collect();
            self.validate(&entries)?;
        }
        self.inner = Some(Box::new(map));
        Ok(self)
    }

    /// Creates the map and retires the builder
    ///
    /// The custom content goes through [`KeyMap::insert_all`], so a bad entry
    /// that slipped past disabled checks fails here, after the entries before
    /// it were stored. The builder is used up either way.
    pub fn instantiate(&mut self) -> MapResult<KeyMap> {
        self.ensure_unused()?;
        self.state = BuilderState::Used;

        let inner = self
            .inner
            .take()
            .unwrap_or_else(|| Box::new(RawMap::new()) as Box<dyn InnerMap>);
        let content = std::mem::take(&mut self.content);
        debug!(
            initial = inner.len(),
            content = content.len(),
            checks = self.checks,
            "instantiating key map"
        );

        let map = KeyMap::from_inner(inner);
        map.insert_all(content)?;
        Ok(map)
    }

    fn ensure_unused(&self) -> MapResult<()> {
        match self.state {
            BuilderState::Unused => Ok(()),
            BuilderState::Used => Err(MapError::IllegalState(
                "this builder cannot be used for generating more than one instance",
            )),
        }
    }

    /// Checks that `entries` could all be absorbed by a fresh map
    fn validate(&self, entries: &[(AnyKey, Box<dyn Value>)]) -> MapResult<()> {
        if !self.checks {
            return Ok(());
        }
        let copies = entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()));
        KeyMap::with_entries(copies)
            .map(|_| ())
            .map_err(|err| MapError::invalid_argument(UNUSABLE_MAP, err))
    }
}

impl Default for KeyMapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;

    fn entry<T: Value>(key: &Key<T>, value: impl Value) -> (AnyKey, Box<dyn Value>) {
        (key.erased().clone(), Box::new(value))
    }

    #[test]
    fn every_method_fails_after_instantiate() -> MapResult<()> {
        let mut builder = KeyMapBuilder::new();
        builder.instantiate()?;

        assert!(matches!(
            builder.without_map_checks(),
            Err(MapError::IllegalState(_))
        ));
        assert!(matches!(
            builder.with_custom_content(Vec::<(AnyKey, Box<dyn Value>)>::new()),
            Err(MapError::IllegalState(_))
        ));
        assert!(matches!(
            builder.with_custom_content_from(&KeyMap::new()),
            Err(MapError::IllegalState(_))
        ));
        assert!(matches!(
            builder.with_custom_inner_map(RawMap::new()),
            Err(MapError::IllegalState(_))
        ));
        assert!(matches!(
            builder.instantiate(),
            Err(MapError::IllegalState(_))
        ));
        Ok(())
    }

    #[test]
    fn bad_content_is_rejected_up_front() {
        let key = Key::<u8>::new();
        let mut builder = KeyMapBuilder::new();

        let err = builder
            .with_custom_content(vec![entry(&key, "nope")])
            .unwrap_err();
        match err {
            MapError::InvalidArgument { context, source } => {
                assert_eq!(context, UNUSABLE_MAP);
                assert!(matches!(*source, MapError::TypeMismatch { .. }));
            }
            other => panic!("expected an invalid argument, got {:?}", other),
        }
        assert_eq!(builder.state, BuilderState::Unused);
    }

    #[test]
    fn unchecked_content_fails_at_instantiate() {
        let good = Key::<u8>::new();
        let bad = Key::<u8>::new();
        let mut builder = KeyMapBuilder::new();

        builder
            .without_map_checks()
            .and_then(|builder| {
                builder.with_custom_content(vec![entry(&good, 1u8), entry(&bad, "nope")])
            })
            .expect("checks are disabled");

        assert!(matches!(
            builder.instantiate(),
            Err(MapError::TypeMismatch { .. })
        ));
        assert_eq!(builder.state, BuilderState::Used);
    }

    #[test]
    fn unchecked_inner_map_fails_on_read() -> MapResult<()> {
        let key = Key::<u8>::new();
        let mut raw = RawMap::new();
        raw.insert(key.erased().clone(), Box::new("nope"));

        let mut checked = KeyMapBuilder::new();
        assert!(matches!(
            checked.with_custom_inner_map(raw.clone()),
            Err(MapError::InvalidArgument { .. })
        ));

        let mut unchecked = KeyMapBuilder::new();
        let map = unchecked
            .without_map_checks()?
            .with_custom_inner_map(raw)?
            .instantiate()?;

        assert_eq!(map.len()?, 1);
        assert!(matches!(map.get(&key), Err(MapError::TypeMismatch { .. })));
        Ok(())
    }
}
