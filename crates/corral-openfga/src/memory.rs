//! In-process tuple store evaluating the control plane's authorization model
//!
//! Used for local development and tests. It mirrors the relation graph the
//! OpenFGA model declares:
//!
//! - `administrator` on a model implies `writer`, which implies `reader`
//! - `administrator` on an offer implies `consumer`, which implies `reader`
//! - `administrator` on a cloud implies `can_addmodel`
//! - `administrator` on a controller implies `audit_log_viewer`
//! - administrators of a controller administer its clouds and models, and
//!   administrators of a model administer its offers
//! - `group:<id>#member` subjects grant to every member, and `user:*` to
//!   every user

use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use corral_core::{
    CorralError, Entity, Kind, ReadResponse, Relation, Result, TokenPagination, Tuple, TupleFilter,
    TupleStore,
};

/// Checks deeper than this resolve to "not allowed"
const MAX_CHECK_DEPTH: usize = 16;

/// Relations that imply `relation` on an entity of `kind`
fn implied_by(kind: Kind, relation: Relation) -> &'static [Relation] {
    match (kind, relation) {
        (Kind::Model, Relation::Reader) => &[Relation::Writer],
        (Kind::Model, Relation::Writer) => &[Relation::Administrator],
        (Kind::ApplicationOffer, Relation::Reader) => &[Relation::Consumer],
        (Kind::ApplicationOffer, Relation::Consumer) => &[Relation::Administrator],
        (Kind::Cloud, Relation::CanAddModel) => &[Relation::Administrator],
        (Kind::Controller, Relation::AuditLogViewer) => &[Relation::Administrator],
        _ => &[],
    }
}

/// The structural relation linking an entity of `kind` to the parent whose
/// administrators also administer it
fn parent_relation(kind: Kind) -> Option<Relation> {
    match kind {
        Kind::Model | Kind::Cloud => Some(Relation::Controller),
        Kind::ApplicationOffer => Some(Relation::Model),
        _ => None,
    }
}

struct Graph<'a> {
    stored: &'a BTreeSet<Tuple>,
    contextual: &'a [Tuple],
}

impl Graph<'_> {
    fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.stored.iter().chain(self.contextual.iter())
    }

    fn check(&self, object: &Entity, relation: Relation, target: &Entity, depth: usize) -> bool {
        if depth > MAX_CHECK_DEPTH {
            return false;
        }

        for tuple in self.tuples() {
            if tuple.relation != relation || &tuple.target != target {
                continue;
            }
            if &tuple.object == object {
                return true;
            }
            if tuple.object.kind == Kind::User && tuple.object.id == "*" && object.kind == Kind::User {
                return true;
            }
            if let Some(userset) = tuple.object.relation {
                let holder = tuple.object.without_relation();
                if self.check(object, userset, &holder, depth + 1) {
                    return true;
                }
            }
        }

        if implied_by(target.kind, relation)
            .iter()
            .any(|stronger| self.check(object, *stronger, target, depth + 1))
        {
            return true;
        }

        if relation == Relation::Administrator {
            if let Some(link) = parent_relation(target.kind) {
                let parents: Vec<Entity> = self
                    .tuples()
                    .filter(|t| t.relation == link && &t.target == target && t.object.relation.is_none())
                    .map(|t| t.object.clone())
                    .collect();
                if parents
                    .iter()
                    .any(|parent| self.check(object, Relation::Administrator, parent, depth + 1))
                {
                    return true;
                }
            }
        }

        false
    }
}

/// Tuple store held in memory, ordered so that reads page deterministically
#[derive(Default)]
pub struct MemoryTupleStore {
    tuples: RwLock<BTreeSet<Tuple>>,
}

impl MemoryTupleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `tuples`
    pub fn with_tuples(tuples: impl IntoIterator<Item = Tuple>) -> Self {
        Self {
            tuples: RwLock::new(tuples.into_iter().collect()),
        }
    }

    pub async fn len(&self) -> usize {
        self.tuples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tuples.read().await.is_empty()
    }
}

fn parse_cursor(token: &str) -> Result<usize> {
    if token.is_empty() {
        return Ok(0);
    }
    token
        .parse()
        .map_err(|_| CorralError::pagination(format!("invalid continuation token {:?}", token)))
}

#[async_trait]
impl TupleStore for MemoryTupleStore {
    #[instrument(skip(self, tuples), fields(count = tuples.len()))]
    async fn add_relation(&self, tuples: &[Tuple]) -> Result<()> {
        let mut stored = self.tuples.write().await;
        for tuple in tuples {
            if tuple.object.is_kind_only() || tuple.target.is_kind_only() {
                return Err(CorralError::invalid_input(format!("incomplete tuple {}", tuple)));
            }
        }
        stored.extend(tuples.iter().cloned());
        Ok(())
    }

    #[instrument(skip(self, tuples), fields(count = tuples.len()))]
    async fn remove_relation(&self, tuples: &[Tuple]) -> Result<()> {
        let mut stored = self.tuples.write().await;
        for tuple in tuples {
            stored.remove(tuple);
        }
        Ok(())
    }

    #[instrument(skip(self, contextual), fields(tuple = %tuple))]
    async fn check_relation(&self, tuple: &Tuple, contextual: &[Tuple]) -> Result<bool> {
        let stored = self.tuples.read().await;
        let graph = Graph {
            stored: &stored,
            contextual,
        };
        let allowed = graph.check(&tuple.object, tuple.relation, &tuple.target, 0);
        debug!(allowed, "Checked relation");
        Ok(allowed)
    }

    #[instrument(skip(self))]
    async fn list_relations(&self, filter: &TupleFilter, page: &TokenPagination) -> Result<ReadResponse> {
        let offset = parse_cursor(page.token())?;
        let limit = page.limit() as usize;
        let stored = self.tuples.read().await;
        let mut matching = stored.iter().filter(|t| filter.matches(t)).skip(offset);
        let tuples: Vec<Tuple> = matching.by_ref().take(limit).cloned().collect();
        let continuation_token = if matching.next().is_some() {
            (offset + tuples.len()).to_string()
        } else {
            String::new()
        };
        Ok(ReadResponse {
            tuples,
            continuation_token,
        })
    }

    #[instrument(skip(self))]
    async fn list_objects(&self, object: &Entity, relation: Relation, kind: Kind) -> Result<Vec<Entity>> {
        let stored = self.tuples.read().await;
        let candidates: BTreeSet<Entity> = stored
            .iter()
            .flat_map(|t| [t.target.without_relation(), t.object.without_relation()])
            .filter(|e| e.kind == kind)
            .collect();
        let graph = Graph {
            stored: &stored,
            contextual: &[],
        };
        Ok(candidates
            .into_iter()
            .filter(|candidate| graph.check(object, relation, candidate, 0))
            .collect())
    }
}
