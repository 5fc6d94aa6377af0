//! Raw relation management for admin principals

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::{info, warn};

use corral_core::{CorralError, Entity, Principal, Relation, TokenPagination, TupleFilter};

use crate::dto::{
    ApiFailure, ApiResponse, ApiResult, CheckRelationRequest, CheckRelationResponse,
    RelationsQuery, RelationsRequest, RelationsResponse,
};
use crate::middleware::CurrentPrincipal;
use crate::state::AppState;

fn require_admin(principal: &Principal) -> Result<(), ApiFailure> {
    if principal.is_admin() {
        Ok(())
    } else {
        warn!(identity = %principal.name(), "Non-admin attempted relation management");
        Err(CorralError::permission_denied("manage relations", "controller").into())
    }
}

/// POST /api/v1/relations
pub async fn add_relations(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(request): Json<RelationsRequest>,
) -> ApiResult<ApiResponse<usize>> {
    require_admin(&principal)?;
    state.store.add_relation(&request.tuples).await?;
    info!(identity = %principal.name(), count = request.tuples.len(), "Added relations");
    Ok(Json(ApiResponse::ok(request.tuples.len())))
}

/// DELETE /api/v1/relations
pub async fn remove_relations(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(request): Json<RelationsRequest>,
) -> ApiResult<ApiResponse<usize>> {
    require_admin(&principal)?;
    state.store.remove_relation(&request.tuples).await?;
    info!(identity = %principal.name(), count = request.tuples.len(), "Removed relations");
    Ok(Json(ApiResponse::ok(request.tuples.len())))
}

/// POST /api/v1/relations/check
pub async fn check_relation(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(request): Json<CheckRelationRequest>,
) -> ApiResult<ApiResponse<CheckRelationResponse>> {
    require_admin(&principal)?;
    let allowed = state
        .store
        .check_relation(&request.tuple, &request.contextual_tuples)
        .await?;
    Ok(Json(ApiResponse::ok(CheckRelationResponse { allowed })))
}

/// GET /api/v1/relations?object&relation&target&size&token
pub async fn list_relations(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(query): Query<RelationsQuery>,
) -> ApiResult<ApiResponse<RelationsResponse>> {
    require_admin(&principal)?;

    let mut filter = TupleFilter::new();
    if let Some(object) = query.object.as_deref().filter(|s| !s.is_empty()) {
        filter = filter.object(object.parse::<Entity>()?);
    }
    if let Some(relation) = query.relation.as_deref().filter(|s| !s.is_empty()) {
        filter = filter.relation(relation.parse::<Relation>()?);
    }
    if let Some(target) = query.target.as_deref().filter(|s| !s.is_empty()) {
        filter = filter.target(target.parse::<Entity>()?);
    }
    let page = TokenPagination::new(
        query.size.unwrap_or_default(),
        query.token.unwrap_or_default(),
    );

    let response = state.store.list_relations(&filter, &page).await?;
    Ok(Json(ApiResponse::ok(RelationsResponse {
        tuples: response.tuples,
        continuation_token: response.continuation_token,
    })))
}
