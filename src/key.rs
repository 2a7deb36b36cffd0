use crate::any_value::Value;
use crate::error::{MapError, MapResult};
use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{self, AtomicU64};

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// Run-time type information attached to a checked key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    type_id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Describes the type `T`
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if `value` is an instance of the described type
    pub fn is_instance(&self, value: &dyn Value) -> bool {
        value.value_type_id() == self.type_id
    }
}

/// The two safety levels a key can have
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Descriptor {
    /// Values are validated against the descriptor on every mutation
    Checked(TypeDescriptor),
    /// Values are accepted as-is; a wrong type only shows up when it is read back
    Unchecked,
}

/// A key whose value type has been erased
///
/// This is what a [`KeyMap`](crate::KeyMap) actually stores. Equality, ordering
/// and hashing all go through the key's identity, never its descriptor: two
/// keys made with the same descriptor are still different keys.
#[derive(Clone)]
pub struct AnyKey {
    id: u64,
    descriptor: Descriptor,
}

impl AnyKey {
    fn mint(descriptor: Descriptor) -> Self {
        Self {
            id: NEXT_KEY_ID.fetch_add(1, atomic::Ordering::Relaxed),
            descriptor,
        }
    }

    pub fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    pub fn is_checked(&self) -> bool {
        matches!(self.descriptor, Descriptor::Checked(_))
    }

    /// Returns true if this key accepts `value`
    ///
    /// Unchecked keys accept everything.
    pub fn can_be_mapped_to(&self, value: &dyn Value) -> bool {
        match self.descriptor {
            Descriptor::Checked(descriptor) => descriptor.is_instance(value),
            Descriptor::Unchecked => true,
        }
    }

    /// Recovers a typed key with the same identity
    ///
    /// Returns `None` when the key is checked against a type other than `T`.
    /// Unchecked keys can't be verified and are always handed back.
    pub fn typed<T: Value>(&self) -> Option<Key<T>> {
        match self.descriptor {
            Descriptor::Checked(descriptor) if descriptor.type_id() != TypeId::of::<T>() => None,
            _ => Some(Key {
                erased: self.clone(),
                _marker: PhantomData,
            }),
        }
    }

    /// The checked half of a cast: fails if a descriptor is present and rejects `value`
    pub(crate) fn check(&self, value: &dyn Value) -> MapResult<()> {
        match self.descriptor {
            Descriptor::Checked(descriptor) if !descriptor.is_instance(value) => {
                Err(self.mismatch(descriptor.name(), value.type_name()))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn mismatch(&self, expected: &'static str, found: &'static str) -> MapError {
        MapError::TypeMismatch {
            key: self.to_string(),
            expected,
            found,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for AnyKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AnyKey {}

impl Hash for AnyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for AnyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Ids are handed out in creation order, so ordered maps keep keys in that order.
impl Ord for AnyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.descriptor {
            Descriptor::Checked(descriptor) => write!(f, "Key({})", descriptor.name()),
            Descriptor::Unchecked => write!(f, "Key(unchecked)"),
        }
    }
}

impl fmt::Debug for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{} {}", self.id, self)
    }
}

impl AsRef<AnyKey> for AnyKey {
    fn as_ref(&self) -> &AnyKey {
        self
    }
}

/// A key for values of type `T`
///
/// Keys are identity tokens: cloning a key gives back the *same* key, while
/// every constructor call mints a new one.
///
/// # Examples
///
/// ```
/// use sovran_keymap::{Key, KeyMap, MapError};
///
/// let map = KeyMap::new();
/// let port = Key::<u16>::new();
/// let other_port = Key::<u16>::new();
///
/// map.insert(&port, 8080)?;
///
/// assert_eq!(map.get(&port)?, Some(8080));
/// assert_eq!(map.get(&port.clone())?, Some(8080));
/// assert_eq!(map.get(&other_port)?, None);
/// # Ok::<(), MapError>(())
/// ```
pub struct Key<T> {
    erased: AnyKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Value> Key<T> {
    /// Creates a checked key: values are validated against `T` at every mutation
    pub fn new() -> Self {
        Self::with_descriptor(TypeDescriptor::of::<T>())
    }

    /// Returns `value` as a `&T`, failing with `MapError::TypeMismatch` if it isn't one
    pub fn cast_ref<'a>(&self, value: &'a dyn Value) -> MapResult<&'a T> {
        self.erased.check(value)?;
        let found = value.type_name();
        value
            .downcast_ref::<T>()
            .ok_or_else(|| self.erased.mismatch(std::any::type_name::<T>(), found))
    }

    pub(crate) fn cast_mut<'a>(&self, value: &'a mut (dyn Value + 'static)) -> MapResult<&'a mut T> {
        self.erased.check(value)?;
        let found = value.type_name();
        value
            .downcast_mut::<T>()
            .ok_or_else(|| self.erased.mismatch(std::any::type_name::<T>(), found))
    }

    /// Takes ownership of `value` as a `T`
    pub fn cast(&self, value: Box<dyn Value>) -> MapResult<T> {
        self.erased.check(&*value)?;
        let found = value.type_name();
        value
            .into_any()
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| self.erased.mismatch(std::any::type_name::<T>(), found))
    }
}

impl<T> Key<T> {
    /// Creates a key validated against an explicit descriptor
    ///
    /// A descriptor that doesn't describe `T` makes a key that rejects every value.
    pub fn with_descriptor(descriptor: TypeDescriptor) -> Self {
        Self {
            erased: AnyKey::mint(Descriptor::Checked(descriptor)),
            _marker: PhantomData,
        }
    }

    /// Creates a key without run-time type information
    ///
    /// Nothing is validated when a value goes in, so an untyped caller can
    /// store a value of the wrong type. That mistake only surfaces as a
    /// `MapError::TypeMismatch` when the value is read back through this key.
    pub fn unchecked() -> Self {
        Self {
            erased: AnyKey::mint(Descriptor::Unchecked),
            _marker: PhantomData,
        }
    }

    pub fn descriptor(&self) -> Descriptor {
        self.erased.descriptor()
    }

    pub fn can_be_mapped_to(&self, value: &dyn Value) -> bool {
        self.erased.can_be_mapped_to(value)
    }

    /// The type-erased form of this key, as seen by views and iteration
    pub fn erased(&self) -> &AnyKey {
        &self.erased
    }

    pub fn into_erased(self) -> AnyKey {
        self.erased
    }
}

impl<T: Value> Default for Key<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            erased: self.erased.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.erased == other.erased
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.erased.hash(state);
    }
}

impl<T> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.erased, f)
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.erased, f)
    }
}

impl<T> AsRef<AnyKey> for Key<T> {
    fn as_ref(&self) -> &AnyKey {
        &self.erased
    }
}

impl<T> From<Key<T>> for AnyKey {
    fn from(key: Key<T>) -> Self {
        key.erased
    }
}
