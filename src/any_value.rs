use dyn_clone::DynClone;
use std::any::{Any, TypeId};
use std::fmt::Debug;

/// A type-erased value that can be stored in a [`KeyMap`](crate::KeyMap)
///
/// Implemented for every `'static` type that is `Debug + Clone + PartialEq`.
/// `Debug` feeds error messages, `Clone` lets the map hand out copies and
/// `PartialEq` backs `contains_value` and map equality. Trait objects such as
/// `Rc<dyn Service>` need a newtype that supplies the missing impls; the crate
/// docs show one.
pub trait Value: Any + Debug + DynClone {
    /// The `TypeId` of the concrete type behind this value
    fn value_type_id(&self) -> TypeId;

    /// The name of the concrete type behind this value
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Compares with another erased value; values of different types are never equal
    fn dyn_eq(&self, other: &dyn Value) -> bool;
}

dyn_clone::clone_trait_object!(Value);

impl<T> Value for T
where
    T: Any + Debug + Clone + PartialEq,
{
    fn value_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn dyn_eq(&self, other: &dyn Value) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

impl dyn Value + '_ {
    /// Check if the contained value is of type T
    pub fn is<T: Any>(&self) -> bool {
        self.value_type_id() == TypeId::of::<T>()
    }

    /// Get a reference to the contained value if it is of type T
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Get a mutable reference to the contained value if it is of type T
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}
