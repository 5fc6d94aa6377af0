//! API route definitions

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};

use corral_core::{Capability, Kind};

use crate::handlers;
use crate::middleware::{
    authenticate_browser_session, authenticate_rebac_admin, authenticate_session_token, authorize,
    logging_middleware, request_id_middleware, ResourceGuard,
};
use crate::state::AppState;

/// Create the full API router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    let base_path = state.base_path.clone();
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        .nest(&base_path, rebac_routes(state.clone()))
        .nest("/api/v1", api_v1_routes(state.clone()))
        .with_state(state)
        .layer(from_fn(logging_middleware))
        .layer(from_fn(request_id_middleware))
}

/// ReBAC admin routes: browser session plus admin
fn rebac_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/swagger.json", get(handlers::swagger::swagger))
        .route(
            "/groups",
            get(handlers::groups::list_groups).post(handlers::groups::create_group),
        )
        .route(
            "/groups/{id}",
            get(handlers::groups::get_group)
                .put(handlers::groups::update_group)
                .delete(handlers::groups::delete_group),
        )
        .route(
            "/groups/{id}/identities",
            get(handlers::groups::get_group_identities)
                .patch(handlers::groups::patch_group_identities),
        )
        .route(
            "/groups/{id}/entitlements",
            get(handlers::groups::get_group_entitlements)
                .patch(handlers::groups::patch_group_entitlements),
        )
        .route("/identities", get(handlers::identities::list_identities))
        .route("/identities/{id}", get(handlers::identities::get_identity))
        .route(
            "/identities/{id}/groups",
            get(handlers::identities::get_identity_groups)
                .patch(handlers::identities::patch_identity_groups),
        )
        .route(
            "/identities/{id}/entitlements",
            get(handlers::identities::get_identity_entitlements)
                .patch(handlers::identities::patch_identity_entitlements),
        )
        .route(
            "/entitlements",
            get(handlers::entitlements::list_entitlement_schema),
        )
        .route("/resources", get(handlers::resources::list_resources))
        .layer(from_fn_with_state(state, authenticate_rebac_admin))
}

/// Session-token routes and the browser session probe
fn api_v1_routes(state: AppState) -> Router<AppState> {
    let token_routes = Router::new()
        .route("/whoami", get(handlers::session::whoami))
        .route("/login/browser", post(handlers::session::browser_login))
        .route(
            "/models/{uuid}/access",
            get(handlers::session::model_access).route_layer(from_fn_with_state(
                ResourceGuard::new(Kind::Model, Capability::Reader),
                authorize,
            )),
        )
        .route(
            "/models/{uuid}/check-write",
            post(handlers::session::check_model_write).route_layer(from_fn_with_state(
                ResourceGuard::new(Kind::Model, Capability::Writer),
                authorize,
            )),
        )
        .route(
            "/controllers/{uuid}/summary",
            get(handlers::session::controller_summary).route_layer(from_fn_with_state(
                ResourceGuard::new(Kind::Controller, Capability::Administrator),
                authorize,
            )),
        )
        .route(
            "/relations",
            get(handlers::relations::list_relations)
                .post(handlers::relations::add_relations)
                .delete(handlers::relations::remove_relations),
        )
        .route("/relations/check", post(handlers::relations::check_relation))
        .layer(from_fn_with_state(state.clone(), authenticate_session_token));

    let browser_routes = Router::new()
        .route("/browser/whoami", get(handlers::session::browser_whoami))
        .layer(from_fn_with_state(state, authenticate_browser_session));

    token_routes.merge(browser_routes)
}
