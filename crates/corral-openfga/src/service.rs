//! Relation maintenance built on a tuple store
//!
//! Cleans up the tuples that reference a removed entity and records the
//! structural relations that tie resources to their parents.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use corral_core::{
    ControllerId, Entity, GroupId, Kind, ModelId, OfferId, Relation, Result, TokenPagination, Tuple,
    TupleFilter, TupleStore, ENTITLEMENT_RESOURCES,
};

/// Page size used while deleting matching tuples
const REMOVE_PAGE_SIZE: i64 = 50;

#[derive(Clone)]
pub struct RelationService {
    store: Arc<dyn TupleStore>,
}

impl RelationService {
    pub fn new(store: Arc<dyn TupleStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TupleStore> {
        &self.store
    }

    /// Delete every tuple matching `filter`, returning how many were removed.
    ///
    /// Each round reads the first page again: deleted tuples shift the
    /// store's cursor, so continuation tokens are not reused.
    #[instrument(skip(self))]
    pub async fn remove_tuples(&self, filter: &TupleFilter) -> Result<usize> {
        let mut removed = 0;
        loop {
            let page = self
                .store
                .list_relations(filter, &TokenPagination::new(REMOVE_PAGE_SIZE, ""))
                .await?;
            if page.tuples.is_empty() {
                break;
            }
            self.store.remove_relation(&page.tuples).await?;
            removed += page.tuples.len();
        }
        debug!(removed, "Removed matching tuples");
        Ok(removed)
    }

    /// Remove a model's access tuples and its links to offers
    #[instrument(skip(self))]
    pub async fn remove_model(&self, model: ModelId) -> Result<usize> {
        let entity = model.entity();
        let mut removed = self
            .remove_tuples(&TupleFilter::new().target(entity.clone()))
            .await?;
        removed += self
            .remove_tuples(
                &TupleFilter::new()
                    .object(entity)
                    .target(Entity::of_kind(Kind::ApplicationOffer)),
            )
            .await?;
        info!(%model, removed, "Removed model relations");
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub async fn remove_application_offer(&self, offer: OfferId) -> Result<usize> {
        let removed = self
            .remove_tuples(&TupleFilter::new().target(offer.entity()))
            .await?;
        info!(%offer, removed, "Removed application offer relations");
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub async fn remove_cloud(&self, cloud: &str) -> Result<usize> {
        let removed = self
            .remove_tuples(&TupleFilter::new().target(Entity::new(Kind::Cloud, cloud)))
            .await?;
        info!(cloud, removed, "Removed cloud relations");
        Ok(removed)
    }

    /// Remove a group's memberships and every entitlement granted to its members
    #[instrument(skip(self))]
    pub async fn remove_group(&self, group: GroupId) -> Result<usize> {
        let mut removed = self
            .remove_tuples(&TupleFilter::new().target(group.entity()))
            .await?;
        for kind in ENTITLEMENT_RESOURCES {
            removed += self
                .remove_tuples(
                    &TupleFilter::new()
                        .object(group.members())
                        .target(Entity::of_kind(kind)),
                )
                .await?;
        }
        info!(%group, removed, "Removed group relations");
        Ok(removed)
    }

    pub async fn add_controller_model(&self, controller: ControllerId, model: ModelId) -> Result<()> {
        self.add_link(controller.entity(), Relation::Controller, model.entity()).await
    }

    pub async fn add_cloud_controller(&self, cloud: &str, controller: ControllerId) -> Result<()> {
        self.add_link(controller.entity(), Relation::Controller, Entity::new(Kind::Cloud, cloud))
            .await
    }

    pub async fn add_model_application_offer(&self, model: ModelId, offer: OfferId) -> Result<()> {
        self.add_link(model.entity(), Relation::Model, offer.entity()).await
    }

    /// Grant `relation` on the controller to an identity
    #[instrument(skip(self))]
    pub async fn set_controller_access(
        &self,
        identity: &str,
        controller: ControllerId,
        relation: Relation,
    ) -> Result<()> {
        let tuple = Tuple::new(Entity::user(identity), relation, controller.entity());
        self.store.add_relation(std::slice::from_ref(&tuple)).await?;
        info!(tuple = %tuple, "Granted controller access");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_link(&self, object: Entity, relation: Relation, target: Entity) -> Result<()> {
        let tuple = Tuple::new(object, relation, target);
        self.store.add_relation(std::slice::from_ref(&tuple)).await?;
        debug!(tuple = %tuple, "Linked resources");
        Ok(())
    }
}
