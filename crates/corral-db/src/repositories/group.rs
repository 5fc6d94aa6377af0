//! Group repository implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use corral_core::{CorralError, Group, GroupId, GroupRepository, LimitOffsetPagination, Result};

use super::page;

/// Groups held in memory and listed by name
#[derive(Default)]
pub struct MemoryGroupRepository {
    groups: RwLock<HashMap<GroupId, Group>>,
}

impl MemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted<'a>(groups: impl Iterator<Item = &'a Group>, name_filter: Option<&str>) -> Vec<Group> {
        let needle = name_filter.map(str::to_lowercase);
        let mut matching: Vec<Group> = groups
            .filter(|g| match &needle {
                Some(needle) => g.name.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        matching
    }
}

#[async_trait]
impl GroupRepository for MemoryGroupRepository {
    #[instrument(skip(self))]
    async fn count_groups(&self, name_filter: Option<&str>) -> Result<i64> {
        let groups = self.groups.read().await;
        Ok(Self::sorted(groups.values(), name_filter).len() as i64)
    }

    #[instrument(skip(self))]
    async fn list_groups(&self, filter: &LimitOffsetPagination, name_filter: Option<&str>) -> Result<Vec<Group>> {
        let groups = self.groups.read().await;
        Ok(page(Self::sorted(groups.values(), name_filter).into_iter(), filter))
    }

    #[instrument(skip(self))]
    async fn get_group(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.groups.read().await.get(&id).cloned())
    }

    #[instrument(skip(self))]
    async fn get_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        Ok(self
            .groups
            .read()
            .await
            .values()
            .find(|g| g.name == name)
            .cloned())
    }

    #[instrument(skip(self))]
    async fn add_group(&self, name: &str) -> Result<Group> {
        let mut groups = self.groups.write().await;
        if groups.values().any(|g| g.name == name) {
            return Err(CorralError::already_exists(format!("group {} already exists", name)));
        }
        let group = Group::new(name);
        groups.insert(group.id, group.clone());
        info!(group_id = %group.id, name, "Created group");
        Ok(group)
    }

    #[instrument(skip(self))]
    async fn rename_group(&self, id: GroupId, name: &str) -> Result<Group> {
        let mut groups = self.groups.write().await;
        if groups.values().any(|g| g.name == name && g.id != id) {
            return Err(CorralError::already_exists(format!("group {} already exists", name)));
        }
        let group = groups
            .get_mut(&id)
            .ok_or_else(|| CorralError::not_found("group", id.to_string()))?;
        group.name = name.to_string();
        group.updated_at = Utc::now();
        info!(group_id = %id, name, "Renamed group");
        Ok(group.clone())
    }

    #[instrument(skip(self))]
    async fn remove_group(&self, id: GroupId) -> Result<()> {
        self.groups
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CorralError::not_found("group", id.to_string()))
    }
}
