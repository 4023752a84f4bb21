//! A process-wide name→factory mapping (spec.md §9): `mapper_class` and
//! `reducer_class` flags name a registered constructor, looked up at
//! Initialize. Registration is an explicit call at worker start-up — a
//! user binary (a "demo", in this workspace) registers its classes before
//! handing off to `mrlite-driver`'s run routine.

use std::collections::HashMap;
use std::sync::Arc;

/// Maps a name to a zero-argument constructor producing a boxed `T`.
/// `T` is typically a trait object (`dyn Mapper`, `dyn IncrementalReducer`)
/// so one registry instance can hold every class of a given kind.
pub struct Registry<T: ?Sized> {
    factories: HashMap<String, Arc<dyn Fn() -> Box<T> + Send + Sync>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Registry<T> {
        Registry {
            factories: HashMap::new(),
        }
    }

    /// Registers `factory` under `name`, overwriting any prior registration
    /// for the same name.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// Constructs a fresh instance of the class registered under `name`.
    pub fn create(&self, name: &str) -> Option<Box<T>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Registry::new()
    }
}
