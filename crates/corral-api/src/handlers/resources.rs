//! Cross-kind resource listing

use axum::{
    extract::{Query, State},
    Json,
};

use corral_core::{create_pagination_without_total, Kind};

use crate::dto::{ApiResult, Page, PageMeta, PageNext, ResourceQuery, ResourceResponse};
use crate::state::AppState;

/// GET /resources?size&page&entityType&nameFilter
///
/// The total is not counted; one extra row is fetched to learn whether a
/// further page exists.
pub async fn list_resources(
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Page<ResourceResponse>> {
    let kind = match query.entity_type.as_deref().filter(|t| !t.is_empty()) {
        Some(raw) => Some(raw.parse::<Kind>()?),
        None => None,
    };
    let name_prefix = query.name_filter.as_deref().filter(|f| !f.is_empty());

    let probe = create_pagination_without_total(query.size, query.page);
    let rows = state
        .resources
        .list_resources(&probe.filter, name_prefix, kind)
        .await?;
    let (rows, next_page) = probe.finish(rows);

    Ok(Json(Page {
        data: rows.into_iter().map(ResourceResponse::from).collect(),
        meta: PageMeta {
            page: Some(probe.page),
            size: probe.size,
            ..Default::default()
        },
        next: PageNext {
            page: next_page,
            page_token: None,
        },
    }))
}
