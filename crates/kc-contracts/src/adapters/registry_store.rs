//! # Registry Store Adapter
//!
//! In-memory registry store. A persistent backend would serialize the
//! registry; the snapshot semantics stay the same.

use crate::domain::entities::Registry;
use crate::ports::outbound::RegistryStore;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory registry.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    registry: RwLock<Registry>,
}

impl InMemoryRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistry {
    async fn load(&self) -> Registry {
        self.registry.read().await.clone()
    }

    async fn store(&self, registry: Registry) {
        *self.registry.write().await = registry;
    }
}
