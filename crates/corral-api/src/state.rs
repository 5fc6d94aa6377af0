//! Application state for API handlers

use std::sync::Arc;

use corral_core::{
    Authenticator, Entity, GroupRepository, IdentityRepository, ResourceRepository, TupleStore,
};
use corral_openfga::RelationService;

/// Default mount point of the ReBAC admin routes
pub const DEFAULT_BASE_PATH: &str = "/rebac/v1";

/// Shared handles every handler and middleware reads from
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TupleStore>,
    pub relations: RelationService,
    pub authenticator: Arc<dyn Authenticator>,
    pub identities: Arc<dyn IdentityRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub resources: Arc<dyn ResourceRepository>,
    /// The controller this control plane fronts
    pub controller: Entity,
    /// Mount point of the ReBAC admin routes, without a trailing slash
    pub base_path: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TupleStore>,
        authenticator: Arc<dyn Authenticator>,
        identities: Arc<dyn IdentityRepository>,
        groups: Arc<dyn GroupRepository>,
        resources: Arc<dyn ResourceRepository>,
        controller: Entity,
    ) -> Self {
        Self {
            relations: RelationService::new(store.clone()),
            store,
            authenticator,
            identities,
            groups,
            resources,
            controller,
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }

    /// Mount the admin routes somewhere other than [`DEFAULT_BASE_PATH`]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = normalize_base_path(base_path);
        self
    }
}

fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_BASE_PATH.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
