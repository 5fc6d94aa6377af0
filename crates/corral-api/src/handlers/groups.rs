//! Group management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use corral_core::{
    create_pagination, CorralError, Entity, Group, GroupId, Kind, Relation, TokenPagination, Tuple,
    TupleFilter,
};

use crate::dto::{
    ApiFailure, ApiResponse, ApiResult, EntitlementPatch, EntitlementQuery, EntityEntitlement,
    GroupRequest, GroupResponse, IdentityPatch, IdentityRef, MembershipQuery, OffsetQuery, Page,
    PageMeta, PageNext, PatchRequest,
};
use crate::handlers::entitlements::{patch_subject_entitlements, subject_entitlements};
use crate::handlers::{apply_patches, parse_id};
use crate::state::AppState;
use crate::validation::{patch_field, Validator};

pub(crate) async fn fetch_group(state: &AppState, id: GroupId) -> Result<Group, ApiFailure> {
    state
        .groups
        .get_group(id)
        .await?
        .ok_or_else(|| CorralError::not_found("group", id.to_string()).into())
}

/// GET /groups?size&page&filter
pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<OffsetQuery>,
) -> ApiResult<Page<GroupResponse>> {
    let name_filter = query.filter.as_deref().filter(|f| !f.is_empty());
    let total = state.groups.count_groups(name_filter).await?;
    let (info, pagination) = create_pagination(query.size, query.page, total);
    let groups = state.groups.list_groups(&pagination, name_filter).await?;

    Ok(Json(Page {
        data: groups.into_iter().map(GroupResponse::from).collect(),
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

/// POST /groups
pub async fn create_group(
    State(state): State<AppState>,
    Json(request): Json<GroupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GroupResponse>>), ApiFailure> {
    let mut validator = Validator::new();
    validator.group_name("name", &request.name);
    validator.validate()?;

    let group = state.groups.add_group(&request.name).await?;
    info!(group = %group.id, name = %group.name, "Created group");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(GroupResponse::from(group))),
    ))
}

/// GET /groups/{id}
pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<GroupResponse>> {
    let id: GroupId = parse_id(&id, "group")?;
    let group = fetch_group(&state, id).await?;
    Ok(Json(ApiResponse::ok(GroupResponse::from(group))))
}

/// PUT /groups/{id}
pub async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<GroupRequest>,
) -> ApiResult<ApiResponse<GroupResponse>> {
    let id: GroupId = parse_id(&id, "group")?;
    let mut validator = Validator::new();
    validator.group_name("name", &request.name);
    validator.validate()?;

    let group = state.groups.rename_group(id, &request.name).await?;
    info!(group = %group.id, name = %group.name, "Renamed group");
    Ok(Json(ApiResponse::ok(GroupResponse::from(group))))
}

/// DELETE /groups/{id}
///
/// Relations naming the group go first so a failure leaves the group in
/// place for a retry.
pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let id: GroupId = parse_id(&id, "group")?;
    fetch_group(&state, id).await?;

    let removed = state.relations.remove_group(id).await?;
    state.groups.remove_group(id).await?;
    info!(group = %id, removed, "Deleted group");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /groups/{id}/identities?size&nextToken
pub async fn get_group_identities(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MembershipQuery>,
) -> ApiResult<Page<IdentityRef>> {
    let id: GroupId = parse_id(&id, "group")?;
    let group = fetch_group(&state, id).await?;

    let token = query.next_token.unwrap_or_default();
    let page = TokenPagination::new(query.size.unwrap_or_default(), token.clone());
    let filter = TupleFilter::new()
        .relation(Relation::Member)
        .target(group.id.entity());
    let response = state.store.list_relations(&filter, &page).await?;

    // Nested groups and the public wildcard are members too; only users are
    // listed here.
    let data = response
        .tuples
        .into_iter()
        .filter(|t| t.object.kind == Kind::User && t.object.relation.is_none() && t.object.id != "*")
        .map(|t| IdentityRef { name: t.object.id })
        .collect();

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

/// PATCH /groups/{id}/identities
pub async fn patch_group_identities(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PatchRequest<IdentityPatch>>,
) -> ApiResult<ApiResponse<bool>> {
    let id: GroupId = parse_id(&id, "group")?;

    let mut validator = Validator::new();
    for (index, patch) in request.patches.iter().enumerate() {
        validator.identity_name(&patch_field(index, "identity"), &patch.identity);
    }
    validator.validate()?;

    let group = fetch_group(&state, id).await?;
    let patches: Vec<_> = request
        .patches
        .into_iter()
        .map(|p| {
            (
                p.op,
                Tuple::new(Entity::user(p.identity), Relation::Member, group.id.entity()),
            )
        })
        .collect();
    let count = patches.len();
    apply_patches(state.store.as_ref(), patches).await?;
    info!(group = %group.id, count, "Patched group identities");

    Ok(Json(ApiResponse::ok(true)))
}

/// GET /groups/{id}/entitlements?size&nextPageToken
pub async fn get_group_entitlements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<EntitlementQuery>,
) -> ApiResult<Page<EntityEntitlement>> {
    let id: GroupId = parse_id(&id, "group")?;
    let group = fetch_group(&state, id).await?;
    let page = subject_entitlements(state.store.as_ref(), &group.id.members(), query).await?;
    Ok(Json(page))
}

/// PATCH /groups/{id}/entitlements
pub async fn patch_group_entitlements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PatchRequest<EntitlementPatch>>,
) -> ApiResult<ApiResponse<bool>> {
    let id: GroupId = parse_id(&id, "group")?;
    let group = fetch_group(&state, id).await?;
    patch_subject_entitlements(state.store.as_ref(), &group.id.members(), request).await?;
    Ok(Json(ApiResponse::ok(true)))
}
