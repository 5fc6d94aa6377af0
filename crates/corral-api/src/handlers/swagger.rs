//! OpenAPI description of the ReBAC admin routes

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /swagger.json, served without authentication
pub async fn swagger(State(state): State<AppState>) -> Json<Value> {
    let list = |summary: &str| json!({ "get": { "summary": summary } });
    Json(json!({
        "openapi": "3.0.3",
        "info": {
            "title": "corral ReBAC admin",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{ "url": state.base_path }],
        "paths": {
            "/groups": {
                "get": { "summary": "List groups" },
                "post": { "summary": "Create a group" },
            },
            "/groups/{id}": {
                "get": { "summary": "Get a group" },
                "put": { "summary": "Rename a group" },
                "delete": { "summary": "Delete a group and its relations" },
            },
            "/groups/{id}/identities": {
                "get": { "summary": "List group members" },
                "patch": { "summary": "Add or remove group members" },
            },
            "/groups/{id}/entitlements": {
                "get": { "summary": "List group entitlements" },
                "patch": { "summary": "Grant or revoke group entitlements" },
            },
            "/identities": list("List identities"),
            "/identities/{id}": list("Get an identity"),
            "/identities/{id}/groups": {
                "get": { "summary": "List the groups of an identity" },
                "patch": { "summary": "Add or remove group memberships" },
            },
            "/identities/{id}/entitlements": {
                "get": { "summary": "List identity entitlements" },
                "patch": { "summary": "Grant or revoke identity entitlements" },
            },
            "/entitlements": list("List the entitlement schema"),
            "/resources": list("List resources across kinds"),
        },
    }))
}
