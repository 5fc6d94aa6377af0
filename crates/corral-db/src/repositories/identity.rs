//! Identity repository implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use corral_core::{Identity, IdentityRepository, LimitOffsetPagination, Result};

use super::page;

/// Identities keyed and ordered by name
#[derive(Default)]
pub struct MemoryIdentityRepository {
    identities: RwLock<BTreeMap<String, Identity>>,
}

impl MemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace an identity
    pub async fn insert(&self, identity: Identity) {
        self.identities
            .write()
            .await
            .insert(identity.name.clone(), identity);
    }
}

#[async_trait]
impl IdentityRepository for MemoryIdentityRepository {
    #[instrument(skip(self))]
    async fn count_identities(&self) -> Result<i64> {
        Ok(self.identities.read().await.len() as i64)
    }

    #[instrument(skip(self))]
    async fn list_identities(&self, filter: &LimitOffsetPagination) -> Result<Vec<Identity>> {
        let identities = self.identities.read().await;
        Ok(page(identities.values().cloned(), filter))
    }

    #[instrument(skip(self))]
    async fn fetch_identity(&self, name: &str) -> Result<Option<Identity>> {
        Ok(self.identities.read().await.get(name).cloned())
    }

    #[instrument(skip(self))]
    async fn get_or_create_identity(&self, name: &str) -> Result<Identity> {
        let mut identities = self.identities.write().await;
        let identity = identities.entry(name.to_string()).or_insert_with(|| {
            debug!(name, "Creating identity on first login");
            Identity::new(name)
        });
        identity.last_login = Some(Utc::now());
        Ok(identity.clone())
    }
}
