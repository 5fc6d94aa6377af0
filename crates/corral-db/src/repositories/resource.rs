//! Resource listing across clouds, controllers, models, offers and service accounts

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use corral_core::{Kind, LimitOffsetPagination, ResourceRecord, ResourceRepository, Result};

use super::page;

#[derive(Default)]
pub struct MemoryResourceRepository {
    resources: RwLock<Vec<ResourceRecord>>,
}

impl MemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, replacing any previous row with the same kind and id
    pub async fn insert(&self, record: ResourceRecord) {
        let mut resources = self.resources.write().await;
        resources.retain(|r| !(r.kind == record.kind && r.id == record.id));
        resources.push(record);
        resources.sort_by(|a, b| (a.kind, &a.name, &a.id).cmp(&(b.kind, &b.name, &b.id)));
    }

    pub async fn remove(&self, kind: Kind, id: &str) {
        self.resources
            .write()
            .await
            .retain(|r| !(r.kind == kind && r.id == id));
    }
}

#[async_trait]
impl ResourceRepository for MemoryResourceRepository {
    #[instrument(skip(self))]
    async fn list_resources(
        &self,
        filter: &LimitOffsetPagination,
        name_prefix: Option<&str>,
        kind: Option<Kind>,
    ) -> Result<Vec<ResourceRecord>> {
        let prefix = name_prefix.map(str::to_lowercase);
        let resources = self.resources.read().await;
        let matching = resources.iter().filter(|r| {
            kind.map_or(true, |k| r.kind == k)
                && prefix
                    .as_deref()
                    .map_or(true, |p| r.name.to_lowercase().starts_with(p))
        });
        Ok(page(matching.cloned(), filter))
    }
}
