//! Capabilities shared by every marketplace step.

use record_store::RecordStore;

use crate::auth::CredentialHasher;

/// What marketplace steps run against: the record store and the
/// credential hasher.
#[derive(Debug, Clone)]
pub struct MarketplaceContext<S> {
    store: S,
    hasher: CredentialHasher,
}

impl<S: RecordStore> MarketplaceContext<S> {
    /// Creates a context with the default hasher.
    pub fn new(store: S) -> Self {
        Self {
            store,
            hasher: CredentialHasher::default(),
        }
    }

    /// Replaces the credential hasher.
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }
}
