//! API request handlers

pub mod entitlements;
pub mod groups;
pub mod health;
pub mod identities;
pub mod relations;
pub mod resources;
pub mod session;
pub mod swagger;

use axum::http::StatusCode;

use corral_core::{CorralError, Tuple, TupleStore};

use crate::dto::{ApiFailure, PatchOp};

pub use health::{health_check, liveness, readiness};

/// Split validated patches into one add batch and one remove batch and
/// write them.
pub(crate) async fn apply_patches(
    store: &dyn TupleStore,
    patches: Vec<(PatchOp, Tuple)>,
) -> Result<(), CorralError> {
    let (adds, removes): (Vec<_>, Vec<_>) = patches
        .into_iter()
        .partition(|(op, _)| *op == PatchOp::Add);
    let adds: Vec<Tuple> = adds.into_iter().map(|(_, t)| t).collect();
    let removes: Vec<Tuple> = removes.into_iter().map(|(_, t)| t).collect();

    if !adds.is_empty() {
        store.add_relation(&adds).await?;
    }
    if !removes.is_empty() {
        store.remove_relation(&removes).await?;
    }
    Ok(())
}

/// Parse a path id, answering 400 when it is malformed
pub(crate) fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, ApiFailure> {
    raw.parse().map_err(|_| {
        ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "INVALID_ID",
            format!("Invalid {} ID format", what),
        )
    })
}
