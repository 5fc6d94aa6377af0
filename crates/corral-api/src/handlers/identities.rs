//! Identity handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;

use corral_core::{
    create_pagination, CorralError, Entity, GroupId, Identity, Kind, Relation, TokenPagination,
    Tuple, TupleFilter,
};

use crate::dto::{
    ApiFailure, ApiResponse, ApiResult, EntitlementPatch, EntitlementQuery, EntityEntitlement,
    GroupPatch, GroupRef, IdentityResponse, MembershipQuery, OffsetQuery, Page, PageMeta,
    PageNext, PatchRequest,
};
use crate::handlers::apply_patches;
use crate::handlers::entitlements::{patch_subject_entitlements, subject_entitlements};
use crate::handlers::groups::fetch_group;
use crate::state::AppState;
use crate::validation::{patch_field, Validator};

async fn fetch_identity(state: &AppState, name: &str) -> Result<Identity, ApiFailure> {
    state
        .identities
        .fetch_identity(name)
        .await?
        .ok_or_else(|| CorralError::not_found("identity", name).into())
}

/// GET /identities?size&page
pub async fn list_identities(
    State(state): State<AppState>,
    Query(query): Query<OffsetQuery>,
) -> ApiResult<Page<IdentityResponse>> {
    let total = state.identities.count_identities().await?;
    let (info, pagination) = create_pagination(query.size, query.page, total);
    let identities = state.identities.list_identities(&pagination).await?;

    Ok(Json(Page {
        data: identities.into_iter().map(IdentityResponse::from).collect(),
        meta: PageMeta {
            page: Some(info.page),
            size: pagination.limit(),
            total: Some(total),
            page_token: None,
        },
        next: PageNext {
            page: info.next_page,
            page_token: None,
        },
    }))
}

/// GET /identities/{id}
pub async fn get_identity(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<ApiResponse<IdentityResponse>> {
    let identity = fetch_identity(&state, &name).await?;
    Ok(Json(ApiResponse::ok(IdentityResponse::from(identity))))
}

/// GET /identities/{id}/groups?size&nextToken
pub async fn get_identity_groups(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<MembershipQuery>,
) -> ApiResult<Page<GroupRef>> {
    let identity = fetch_identity(&state, &name).await?;

    let token = query.next_token.unwrap_or_default();
    let page = TokenPagination::new(query.size.unwrap_or_default(), token.clone());
    let filter = TupleFilter::new()
        .object(identity.entity())
        .relation(Relation::Member)
        .target(Entity::of_kind(Kind::Group));
    let response = state.store.list_relations(&filter, &page).await?;

    let mut data = Vec::with_capacity(response.tuples.len());
    for tuple in response.tuples {
        let name = match tuple.target.id.parse::<GroupId>() {
            Ok(id) => state.groups.get_group(id).await?.map(|g| g.name),
            Err(_) => None,
        };
        data.push(GroupRef {
            id: tuple.target.id,
            name,
        });
    }

    Ok(Json(Page {
        data,
        meta: PageMeta {
            size: page.limit(),
            page_token: (!token.is_empty()).then_some(token),
            ..Default::default()
        },
        next: PageNext::token(&response.continuation_token),
    }))
}

/// PATCH /identities/{id}/groups
///
/// Every referenced group must exist before any membership is written.
pub async fn patch_identity_groups(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<PatchRequest<GroupPatch>>,
) -> ApiResult<ApiResponse<bool>> {
    let identity = fetch_identity(&state, &name).await?;

    let mut validator = Validator::new();
    let mut parsed = Vec::with_capacity(request.patches.len());
    for (index, patch) in request.patches.iter().enumerate() {
        if let Some(id) = validator.group_id(&patch_field(index, "group"), &patch.group) {
            parsed.push((patch.op, id));
        }
    }
    validator.validate()?;

    let mut patches = Vec::with_capacity(parsed.len());
    for (op, id) in parsed {
        let group = fetch_group(&state, id).await?;
        patches.push((
            op,
            Tuple::new(identity.entity(), Relation::Member, group.id.entity()),
        ));
    }
    let count = patches.len();
    apply_patches(state.store.as_ref(), patches).await?;
    info!(identity = %identity.name, count, "Patched identity groups");

    Ok(Json(ApiResponse::ok(true)))
}

/// GET /identities/{id}/entitlements?size&nextPageToken
pub async fn get_identity_entitlements(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<EntitlementQuery>,
) -> ApiResult<Page<EntityEntitlement>> {
    let identity = fetch_identity(&state, &name).await?;
    let page = subject_entitlements(state.store.as_ref(), &identity.entity(), query).await?;
    Ok(Json(page))
}

/// PATCH /identities/{id}/entitlements
pub async fn patch_identity_entitlements(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<PatchRequest<EntitlementPatch>>,
) -> ApiResult<ApiResponse<bool>> {
    let identity = fetch_identity(&state, &name).await?;
    patch_subject_entitlements(state.store.as_ref(), &identity.entity(), request).await?;
    Ok(Json(ApiResponse::ok(true)))
}
