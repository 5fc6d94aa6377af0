//! Collaborator traits at the seams of the authorization core

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BrowserSession, Group, Identity, ResourceRecord};
use crate::ids::GroupId;
use crate::pagination::{LimitOffsetPagination, TokenPagination};
use crate::principal::Principal;
use crate::tuple::{Entity, Kind, ReadResponse, Relation, Tuple, TupleFilter};

// =============================================================================
// Tuple Store
// =============================================================================

/// Typed access to the relationship tuple store.
///
/// Adding a tuple that already exists and removing one that does not are
/// both successful no-ops.
#[async_trait]
pub trait TupleStore: Send + Sync {
    async fn add_relation(&self, tuples: &[Tuple]) -> Result<()>;

    async fn remove_relation(&self, tuples: &[Tuple]) -> Result<()>;

    /// Check `tuple` against the stored graph plus `contextual` tuples that
    /// are considered for this check only
    async fn check_relation(&self, tuple: &Tuple, contextual: &[Tuple]) -> Result<bool>;

    /// Read directly stored tuples matching every populated field of `filter`
    async fn list_relations(&self, filter: &TupleFilter, page: &TokenPagination) -> Result<ReadResponse>;

    /// Every entity of `kind` that `object` has `relation` to
    async fn list_objects(&self, object: &Entity, relation: Relation, kind: Kind) -> Result<Vec<Entity>>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Repositories
// =============================================================================

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn count_identities(&self) -> Result<i64>;
    async fn list_identities(&self, filter: &LimitOffsetPagination) -> Result<Vec<Identity>>;
    async fn fetch_identity(&self, name: &str) -> Result<Option<Identity>>;
    /// Fetch an identity, creating it on first login
    async fn get_or_create_identity(&self, name: &str) -> Result<Identity>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn count_groups(&self, name_filter: Option<&str>) -> Result<i64>;
    async fn list_groups(&self, filter: &LimitOffsetPagination, name_filter: Option<&str>) -> Result<Vec<Group>>;
    async fn get_group(&self, id: GroupId) -> Result<Option<Group>>;
    async fn get_group_by_name(&self, name: &str) -> Result<Option<Group>>;
    async fn add_group(&self, name: &str) -> Result<Group>;
    async fn rename_group(&self, id: GroupId, name: &str) -> Result<Group>;
    async fn remove_group(&self, id: GroupId) -> Result<()>;
}

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Resources ordered by kind then name, optionally restricted by kind and
    /// by a case-insensitive name prefix
    async fn list_resources(
        &self,
        filter: &LimitOffsetPagination,
        name_prefix: Option<&str>,
        kind: Option<Kind>,
    ) -> Result<Vec<ResourceRecord>>;
}

// =============================================================================
// Authentication
// =============================================================================

/// Resolves credentials carried by a request to an identity or principal
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Validate the browser session named in a `Cookie` header
    async fn authenticate_browser_session(&self, cookie_header: Option<&str>) -> Result<BrowserSession>;

    /// Open a browser session for an identity, returning the `Set-Cookie` value
    async fn start_browser_session(&self, identity_name: &str) -> Result<String>;

    /// Exchange a session token for a principal
    async fn login_with_session_token(&self, token: &str) -> Result<Principal>;

    /// Resolve an already authenticated identity name to a principal
    async fn user_login(&self, identity_name: &str) -> Result<Principal>;
}
