//! Entitlement listing and patching shared by groups and identities, and the
//! static entitlement schema

use axum::Json;
use tracing::info;

use corral_core::{
    list_entitlements, Entity, EntitlementSchemaEntry, EntitlementToken, TokenPagination, Tuple,
    TupleStore, ENTITLEMENT_SCHEMA,
};

use crate::dto::{
    ApiFailure, EntitlementPatch, EntitlementQuery, EntityEntitlement, Page, PageMeta, PageNext,
    PatchRequest,
};
use crate::handlers::apply_patches;
use crate::validation::{patch_field, Validator};

/// GET /entitlements
pub async fn list_entitlement_schema() -> Json<Page<EntitlementSchemaEntry>> {
    let total = ENTITLEMENT_SCHEMA.len() as i64;
    Json(Page {
        data: ENTITLEMENT_SCHEMA.to_vec(),
        meta: PageMeta {
            size: total,
            total: Some(total),
            ..Default::default()
        },
        next: PageNext::default(),
    })
}

/// One page of the relations `subject` holds directly
pub(crate) async fn subject_entitlements(
    store: &dyn TupleStore,
    subject: &Entity,
    query: EntitlementQuery,
) -> Result<Page<EntityEntitlement>, ApiFailure> {
    let token = EntitlementToken::new(query.next_page_token.unwrap_or_default());
    let size = TokenPagination::new(query.size.unwrap_or_default(), "").limit();

    let page = list_entitlements(store, subject, size, &token).await?;

    Ok(Page {
        data: page.tuples.iter().map(EntityEntitlement::from).collect(),
        meta: PageMeta {
            size,
            page_token: (!token.is_empty()).then(|| token.to_string()),
            ..Default::default()
        },
        next: PageNext::token(page.next_token.as_str()),
    })
}

/// Validate every entitlement patch, then grant or revoke them for `subject`
pub(crate) async fn patch_subject_entitlements(
    store: &dyn TupleStore,
    subject: &Entity,
    request: PatchRequest<EntitlementPatch>,
) -> Result<(), ApiFailure> {
    let mut validator = Validator::new();
    let mut patches = Vec::with_capacity(request.patches.len());
    for (index, patch) in request.patches.iter().enumerate() {
        let field = patch_field(index, "entitlement");
        if let Some((relation, resource)) = validator.entitlement(&field, &patch.entitlement) {
            patches.push((patch.op, Tuple::new(subject.clone(), relation, resource)));
        }
    }
    validator.validate()?;

    let count = patches.len();
    apply_patches(store, patches).await?;
    info!(%subject, count, "Patched entitlements");
    Ok(())
}
