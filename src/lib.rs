//! # sovran-keymap
//!
//! A heterogeneous container where every key carries the type of its value.
//!
//! `sovran-keymap` lets one map hold values of unrelated types without casting
//! them down to a common type. Instead of a single value type for the whole
//! container, each [`Key<T>`] is bound to its own `T`: storing through a key
//! only accepts a `T`, and reading through it gives a `T` back.
//!
//! ## Key Features
//!
//! - **Typed keys**: `Key<T>` is an identity token; two keys for the same type are still different keys
//! - **Checked or unchecked**: checked keys validate values at run time, unchecked keys trust the caller
//! - **Untyped view**: [`KeyMap::to_map`] exposes the same storage through the [`UntypedMap`] contract
//! - **Pluggable storage**: the [`KeyMapBuilder`] accepts any [`InnerMap`], such as `BTreeMap` or `IndexMap`
//! - **No macros**: pure runtime solution built on `std::any`
//! - **Plain values**: anything `Clone + PartialEq + Debug`; see [Value Requirements](#value-requirements)
//!
//! ## Usage Examples
//!
//! ### Basic Usage
//!
//! ```rust
//! use sovran_keymap::{Key, KeyMap, MapError};
//!
//! fn main() -> Result<(), MapError> {
//!     let settings = KeyMap::new();
//!
//!     // Keys decide the type of their value
//!     let port = Key::<u16>::new();
//!     let hosts = Key::<Vec<String>>::new();
//!
//!     settings.insert(&port, 8080)?;
//!     settings.insert(&hosts, vec!["a.example".to_string()])?;
//!
//!     // Or let the map mint a key from the value's own type
//!     let banner = settings.insert_value("welcome".to_string())?;
//!
//!     let port_value: Option<u16> = settings.get(&port)?;
//!     println!("Port: {:?}", port_value);
//!     println!("Banner: {:?}", settings.get(&banner)?);
//!
//!     // Reading an unmapped key is not an error
//!     assert_eq!(settings.get(&Key::<bool>::new())?, None);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Modifying Values In-Place
//!
//! ```rust
//! use sovran_keymap::{KeyMap, MapError};
//! use std::collections::HashMap;
//!
//! fn main() -> Result<(), MapError> {
//!     let store = KeyMap::new();
//!     let counters = store.insert_value(HashMap::<String, i32>::new())?;
//!
//!     store.with_mut(&counters, |counters| {
//!         *counters.entry("visits".to_string()).or_insert(0) += 1;
//!     })?;
//!
//!     let visits = store.with(&counters, |counters| counters.get("visits").copied())?;
//!     assert_eq!(visits, Some(Some(1)));
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Working With Untyped Code
//!
//! ```rust
//! use sovran_keymap::{KeyMap, MapError, UntypedMap};
//!
//! fn describe(map: &impl UntypedMap) -> Result<Vec<String>, MapError> {
//!     Ok(map.entries()?
//!         .iter()
//!         .map(|(key, value)| format!("{} = {:?}", key, value))
//!         .collect())
//! }
//!
//! fn main() -> Result<(), MapError> {
//!     let store = KeyMap::new();
//!     let limit = store.insert_value(10u32)?;
//!
//!     let mut view = store.to_map();
//!     println!("{:?}", describe(&view)?);
//!
//!     // Changes through the view are changes to the store
//!     view.remove(limit.erased())?;
//!     assert!(store.is_empty()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Value Requirements
//!
//! Any `'static` type that is `Clone + PartialEq + Debug` can be stored (see
//! [`Value`]). `Clone` is what lets [`KeyMap::get`] and the snapshot methods
//! hand out copies, `PartialEq` backs [`KeyMap::contains_value`] and map
//! equality, and `Debug` feeds error messages. Types that lack one of these,
//! such as a shared `Rc<dyn Service>`, go in through a small newtype:
//!
//! ```rust
//! use sovran_keymap::{KeyMap, MapError};
//! use std::fmt;
//! use std::rc::Rc;
//!
//! trait Greeter {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".to_string()
//!     }
//! }
//!
//! // Equal when both point at the same service
//! #[derive(Clone)]
//! struct SharedGreeter(Rc<dyn Greeter>);
//!
//! impl PartialEq for SharedGreeter {
//!     fn eq(&self, other: &Self) -> bool {
//!         Rc::ptr_eq(&self.0, &other.0)
//!     }
//! }
//!
//! impl fmt::Debug for SharedGreeter {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         f.write_str("SharedGreeter")
//!     }
//! }
//!
//! fn main() -> Result<(), MapError> {
//!     let services = KeyMap::new();
//!     let greeter = SharedGreeter(Rc::new(English));
//!     let key = services.insert_value(greeter.clone())?;
//!
//!     assert_eq!(services.with(&key, |g| g.0.greet())?, Some("hello".to_string()));
//!     assert!(services.contains_value(&greeter)?);
//!     assert!(!services.contains_value(&SharedGreeter(Rc::new(English)))?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Error Handling
//!
//! ```rust
//! use sovran_keymap::{Key, KeyMap, MapError, UntypedMap, Value};
//!
//! let store = KeyMap::new();
//! let retries = Key::<u32>::new();
//! let loose = Key::<u32>::unchecked();
//!
//! // Untyped callers can only store what a checked key accepts...
//! let mut view = store.to_map();
//! match view.put(retries.erased().clone(), Box::new("three")) {
//!     Ok(_) => println!("stored"),
//!     Err(MapError::InvalidArgument { source, .. }) => println!("rejected: {}", source),
//!     Err(e) => println!("Other error: {}", e),
//! }
//!
//! // ...while an unchecked key takes anything and fails when read back.
//! view.put(loose.erased().clone(), Box::new("three") as Box<dyn Value>).unwrap();
//! match store.get(&loose) {
//!     Ok(value) => println!("Retries: {:?}", value),
//!     Err(MapError::TypeMismatch { found, .. }) => println!("Retries is a {}", found),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```

mod any_value;
mod builder;
mod error;
mod inner;
mod key;
mod map;
mod view;

pub use any_value::Value;
pub use builder::KeyMapBuilder;
pub use error::{MapError, MapResult};
pub use inner::{InnerMap, RawMap};
pub use key::{AnyKey, Descriptor, Key, TypeDescriptor};
pub use map::KeyMap;
pub use view::{MapView, UntypedMap};

// Re-export std::any for convenience
pub use std::any::{Any, TypeId};
