use crate::serializer::{JsonSerializer, Serializer};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("a serializer with code {0} is already registered")]
pub struct DuplicateSerializerCode(pub u8);

/// Serializers available to one endpoint, keyed by wire code.
///
/// Populated during setup and read-only once the owner starts serving.
#[derive(Clone)]
pub struct SerializerRegistry {
    by_code: HashMap<u8, Arc<dyn Serializer>>,
}

impl Default for SerializerRegistry {
    /// A registry holding only [`JsonSerializer`].
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.by_code.insert(JsonSerializer.code(), Arc::new(JsonSerializer));
        registry
    }
}

impl SerializerRegistry {
    pub fn empty() -> Self {
        Self {
            by_code: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        serializer: Arc<dyn Serializer>,
    ) -> Result<(), DuplicateSerializerCode> {
        match self.by_code.entry(serializer.code()) {
            Entry::Occupied(entry) => Err(DuplicateSerializerCode(*entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(serializer);
                Ok(())
            }
        }
    }

    pub fn get(&self, code: u8) -> Option<Arc<dyn Serializer>> {
        self.by_code.get(&code).cloned()
    }

    pub fn contains(&self, code: u8) -> bool {
        self.by_code.contains_key(&code)
    }

    pub fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        self.by_code.keys().copied()
    }
}
