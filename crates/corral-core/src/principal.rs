//! The authenticated actor of a request and its capability checks
//!
//! Every predicate issues exactly one relation check. Implied relations
//! (an administrator is also a writer) are resolved by the tuple store's
//! authorization model, never here.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::{CorralError, Result};
use crate::ids::{ControllerId, ModelId, OfferId};
use crate::models::Identity;
use crate::schema::is_grantable;
use crate::traits::TupleStore;
use crate::tuple::{Entity, Kind, Relation, Tuple};

/// A capability a route can require on its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Reader,
    Writer,
    Administrator,
}

impl Capability {
    pub fn relation(&self) -> Relation {
        match self {
            Capability::Reader => Relation::Reader,
            Capability::Writer => Relation::Writer,
            Capability::Administrator => Relation::Administrator,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.relation().as_str())
    }
}

impl FromStr for Capability {
    type Err = CorralError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reader" => Ok(Capability::Reader),
            "writer" => Ok(Capability::Writer),
            "administrator" => Ok(Capability::Administrator),
            other => Err(CorralError::invalid_input(format!("unknown capability {:?}", other))),
        }
    }
}

/// An identity bound to the tuple store for the duration of one request
#[derive(Clone)]
pub struct Principal {
    identity: Identity,
    is_admin: bool,
    store: Arc<dyn TupleStore>,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("identity", &self.identity.name)
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

impl Principal {
    pub fn new(identity: Identity, is_admin: bool, store: Arc<dyn TupleStore>) -> Self {
        Self {
            identity,
            is_admin,
            store,
        }
    }

    /// Build a principal, deriving the admin flag from the administrator
    /// relation on the local controller
    #[instrument(skip(identity, store), fields(identity = %identity.name))]
    pub async fn login(identity: Identity, controller: &Entity, store: Arc<dyn TupleStore>) -> Result<Self> {
        let tuple = Tuple::new(identity.entity(), Relation::Administrator, controller.clone());
        let is_admin = store.check_relation(&tuple, &[]).await?;
        debug!(is_admin, "Resolved principal");
        Ok(Self::new(identity, is_admin, store))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// The principal as a tuple subject
    pub fn entity(&self) -> Entity {
        self.identity.entity()
    }

    /// Check one relation between the principal and `target`
    #[instrument(skip(self), fields(identity = %self.identity.name))]
    pub async fn check(&self, relation: Relation, target: &Entity) -> Result<bool> {
        let tuple = Tuple::new(self.entity(), relation, target.clone());
        self.store.check_relation(&tuple, &[]).await
    }

    pub async fn has_capability(&self, capability: Capability, target: &Entity) -> Result<bool> {
        self.check(capability.relation(), target).await
    }

    pub async fn is_reader(&self, target: &Entity) -> Result<bool> {
        self.check(Relation::Reader, target).await
    }

    pub async fn is_writer(&self, target: &Entity) -> Result<bool> {
        self.check(Relation::Writer, target).await
    }

    pub async fn is_administrator(&self, target: &Entity) -> Result<bool> {
        self.check(Relation::Administrator, target).await
    }

    pub async fn is_model_reader(&self, model: ModelId) -> Result<bool> {
        self.is_reader(&model.entity()).await
    }

    pub async fn is_model_writer(&self, model: ModelId) -> Result<bool> {
        self.is_writer(&model.entity()).await
    }

    pub async fn is_application_offer_consumer(&self, offer: OfferId) -> Result<bool> {
        self.check(Relation::Consumer, &offer.entity()).await
    }

    pub async fn is_audit_log_viewer(&self, controller: ControllerId) -> Result<bool> {
        self.check(Relation::AuditLogViewer, &controller.entity()).await
    }

    pub async fn can_add_model(&self, cloud: &str) -> Result<bool> {
        self.check(Relation::CanAddModel, &Entity::new(Kind::Cloud, cloud)).await
    }

    /// The strongest of administrator, writer and reader held on the model
    pub async fn model_access(&self, model: ModelId) -> Result<Option<Relation>> {
        let target = model.entity();
        for relation in [Relation::Administrator, Relation::Writer, Relation::Reader] {
            if self.check(relation, &target).await? {
                return Ok(Some(relation));
            }
        }
        Ok(None)
    }

    /// Grant the principal `relation` on a model
    #[instrument(skip(self), fields(identity = %self.identity.name))]
    pub async fn set_model_access(&self, model: ModelId, relation: Relation) -> Result<()> {
        self.set_access(relation, model.entity()).await
    }

    #[instrument(skip(self), fields(identity = %self.identity.name))]
    pub async fn unset_model_access(&self, model: ModelId, relation: Relation) -> Result<()> {
        self.unset_access(relation, model.entity()).await
    }

    #[instrument(skip(self), fields(identity = %self.identity.name))]
    pub async fn set_controller_access(&self, controller: ControllerId, relation: Relation) -> Result<()> {
        self.set_access(relation, controller.entity()).await
    }

    async fn set_access(&self, relation: Relation, target: Entity) -> Result<()> {
        if !is_grantable(target.kind, relation) {
            return Err(CorralError::invalid_input(format!(
                "relation {} cannot be granted on {}",
                relation, target.kind
            )));
        }
        let tuple = Tuple::new(self.entity(), relation, target);
        self.store.add_relation(std::slice::from_ref(&tuple)).await?;
        info!(tuple = %tuple, "Granted access");
        Ok(())
    }

    async fn unset_access(&self, relation: Relation, target: Entity) -> Result<()> {
        let tuple = Tuple::new(self.entity(), relation, target);
        self.store.remove_relation(std::slice::from_ref(&tuple)).await?;
        info!(tuple = %tuple, "Revoked access");
        Ok(())
    }
}
