//! Name-keyed registries of selectors and actions.
//!
//! Registries are built once at process start and shared by reference with
//! the generator, resolver, and executor. Nothing checks them ahead of time:
//! a missing name only fails at the call site that needed it.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Something registrable under its own name.
pub trait Named {
    fn name(&self) -> &str;
}

/// A name-to-function mapping. Re-registering a name replaces the entry.
pub struct Registry<T: ?Sized> {
    label: &'static str,
    entries: BTreeMap<String, Arc<T>>,
}

impl<T: ?Sized + Named> Registry<T> {
    /// Register under the entry's own name.
    pub fn register(&mut self, entry: Arc<T>) -> &mut Self {
        let name = entry.name().to_string();
        self.register_as(name, entry)
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: BTreeMap::new(),
        }
    }

    /// Register under an explicit name.
    pub fn register_as(&mut self, name: impl Into<String>, entry: Arc<T>) -> &mut Self {
        let name = name.into();
        if self.entries.insert(name.clone(), entry).is_some() {
            warn!("{} {} already registered, replacing", self.label, name);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
