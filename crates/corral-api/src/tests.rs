//! Router-level tests for corral-api

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, StatusCode},
    middleware::{from_fn, from_fn_with_state, Next},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use tower::ServiceExt;

use corral_auth::{BrowserSessionStore, SessionAuthenticator, SessionConfig, SessionTokenService};
use corral_core::{
    Capability, ControllerId, Entity, GroupId, Identity, Kind, ModelId, Principal, Relation,
    ResourceRecord, Tuple, TupleStore,
};
use corral_db::{MemoryGroupRepository, MemoryIdentityRepository, MemoryResourceRepository};
use corral_openfga::MemoryTupleStore;

use crate::middleware::{authorize, ResourceGuard};
use crate::{create_router_with_state, AppState};

const SECRET: &str = "a-test-secret-that-is-at-least-32-bytes";

struct Harness {
    app: Router,
    store: Arc<MemoryTupleStore>,
    identities: Arc<MemoryIdentityRepository>,
    resources: Arc<MemoryResourceRepository>,
    auth: Arc<SessionAuthenticator>,
}

fn harness(tuples: Vec<Tuple>) -> Harness {
    let controller = ControllerId::new();
    let mut seeded = vec![Tuple::new(
        Entity::user("admin"),
        Relation::Administrator,
        controller.entity(),
    )];
    seeded.extend(tuples);

    let store = Arc::new(MemoryTupleStore::with_tuples(seeded));
    let identities = Arc::new(MemoryIdentityRepository::new());
    let groups = Arc::new(MemoryGroupRepository::new());
    let resources = Arc::new(MemoryResourceRepository::new());
    let auth = Arc::new(SessionAuthenticator::new(
        BrowserSessionStore::new(SessionConfig {
            cookie_name: "session".to_string(),
            max_age_secs: 600,
            secure: false,
            max_sessions: 100,
        }),
        SessionTokenService::new(SECRET.to_string(), "corral".to_string(), 3600),
        identities.clone(),
        store.clone(),
        controller.entity(),
    ));

    let state = AppState::new(
        store.clone(),
        auth.clone(),
        identities.clone(),
        groups,
        resources.clone(),
        controller.entity(),
    );

    Harness {
        app: create_router_with_state(state),
        store,
        identities,
        resources,
        auth,
    }
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Cookie header for a fresh browser session of `identity`
    async fn cookie(&self, identity: &str) -> String {
        let set_cookie = self.auth.sessions().create(identity).await;
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn basic(&self, identity: &str) -> String {
        let token = self.auth.tokens().issue(identity).unwrap().token;
        format!("Basic {}", BASE64.encode(format!(":{}", token)))
    }

    async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let cookie = self.cookie("admin").await;
        self.send(json_request(method, uri, body).header(header::COOKIE, cookie).body_json())
            .await
    }
}

/// Request builder that remembers an optional JSON body
struct PendingRequest {
    builder: axum::http::request::Builder,
    body: Option<Value>,
}

impl PendingRequest {
    fn header(mut self, name: header::HeaderName, value: String) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    fn body_json(self) -> Request<Body> {
        match self.body {
            Some(body) => self
                .builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => self.builder.body(Body::empty()).unwrap(),
        }
    }
}

fn json_request(method: &str, uri: &str, body: Option<Value>) -> PendingRequest {
    PendingRequest {
        builder: axum::http::Request::builder().method(method).uri(uri),
        body,
    }
}

/// Percent-encode the base64 characters that are not safe in a query value
fn query_escape(value: &str) -> String {
    value
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}

fn get_request(uri: &str) -> Request<Body> {
    json_request("GET", uri, None).body_json()
}

#[cfg(test)]
mod authorization_tests {
    use super::*;

    #[tokio::test]
    async fn test_reader_can_read_but_not_write() {
        let model = ModelId::new();
        let h = harness(vec![Tuple::new(
            Entity::user("alice"),
            Relation::Reader,
            model.entity(),
        )]);
        let auth = h.basic("alice");

        let (status, body) = h
            .send(
                json_request("GET", &format!("/api/v1/models/{}/access", model), None)
                    .header(header::AUTHORIZATION, auth.clone())
                    .body_json(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["access"], "reader");

        let (status, body) = h
            .send(
                json_request("POST", &format!("/api/v1/models/{}/check-write", model), None)
                    .header(header::AUTHORIZATION, auth)
                    .body_json(),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "no access to the resource");
    }

    #[tokio::test]
    async fn test_administrator_route_scoped_to_controller() {
        let h = harness(vec![]);
        let other = ControllerId::new();
        let (status, _) = h
            .send(
                json_request("GET", &format!("/api/v1/controllers/{}/summary", other), None)
                    .header(header::AUTHORIZATION, h.basic("admin"))
                    .body_json(),
            )
            .await;
        // admin of one controller holds nothing on another
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    fn guarded(guard: ResourceGuard, principal: Principal) -> Router {
        Router::new()
            .route("/things", get(|| async { "ok" }))
            .route("/things/{uuid}", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(guard, authorize))
            .layer(from_fn(move |mut request: Request, next: Next| {
                let principal = principal.clone();
                async move {
                    request.extensions_mut().insert(principal);
                    next.run(request).await
                }
            }))
    }

    fn reader_of(model: ModelId) -> Principal {
        let store = Arc::new(MemoryTupleStore::with_tuples([Tuple::new(
            Entity::user("alice"),
            Relation::Reader,
            model.entity(),
        )]));
        Principal::new(Identity::new("alice"), true, store)
    }

    async fn status_of(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app.oneshot(get_request(uri)).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_missing_resource_id_is_unauthorized_not_forbidden() {
        let model = ModelId::new();
        let app = guarded(
            ResourceGuard::new(Kind::Model, Capability::Writer),
            reader_of(model),
        );
        let (status, body) = status_of(app, "/things").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "cannot find uuid in URL path");
    }

    #[tokio::test]
    async fn test_unknown_capability_fails_closed() {
        let model = ModelId::new();
        let app = guarded(
            ResourceGuard::from_name(Kind::Model, "owner"),
            reader_of(model),
        );
        let (status, _) = status_of(app, &format!("/things/{}", model)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_guard_reads_named_path_parameter() {
        let model = ModelId::new();
        let app = Router::new()
            .route("/models/{id}", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(
                ResourceGuard::new(Kind::Model, Capability::Reader).with_param("id"),
                authorize,
            ))
            .layer(from_fn(move |mut request: Request, next: Next| {
                let principal = reader_of(model);
                async move {
                    request.extensions_mut().insert(principal);
                    next.run(request).await
                }
            }));

        let (status, _) = status_of(app.clone(), &format!("/models/{}", model)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = status_of(app, &format!("/models/{}", ModelId::new())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_configured_capability_name_is_honoured() {
        let model = ModelId::new();
        let app = guarded(
            ResourceGuard::from_name(Kind::Model, "reader"),
            reader_of(model),
        );
        let (status, _) = status_of(app, &format!("/things/{}", model)).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[cfg(test)]
mod authentication_tests {
    use super::*;

    #[tokio::test]
    async fn test_session_token_missing() {
        let h = harness(vec![]);
        let (status, body) = h.send(get_request("/api/v1/whoami")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "authentication missing");
    }

    #[tokio::test]
    async fn test_session_token_invalid() {
        let h = harness(vec![]);
        let garbage = format!("Basic {}", BASE64.encode(":not-a-token"));
        let (status, body) = h
            .send(
                json_request("GET", "/api/v1/whoami", None)
                    .header(header::AUTHORIZATION, garbage)
                    .body_json(),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "error authenticating the user");
    }

    #[tokio::test]
    async fn test_whoami() {
        let h = harness(vec![]);
        let (status, body) = h
            .send(
                json_request("GET", "/api/v1/whoami", None)
                    .header(header::AUTHORIZATION, h.basic("admin"))
                    .body_json(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "admin");
        assert_eq!(body["data"]["is_admin"], true);
    }

    #[tokio::test]
    async fn test_admin_routes_require_cookie() {
        let h = harness(vec![]);
        let (status, body) = h.send(get_request("/rebac/v1/groups")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "failed to authenticate");
    }

    #[tokio::test]
    async fn test_admin_routes_reject_non_admin() {
        let h = harness(vec![]);
        let cookie = h.cookie("alice").await;
        let (status, body) = h
            .send(
                json_request("GET", "/rebac/v1/groups", None)
                    .header(header::COOKIE, cookie)
                    .body_json(),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "user is not an admin");
    }

    #[tokio::test]
    async fn test_swagger_is_allow_listed() {
        let h = harness(vec![]);
        let (status, body) = h.send(get_request("/rebac/v1/swagger.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["servers"][0]["url"], "/rebac/v1");
    }

    #[tokio::test]
    async fn test_browser_login_sets_usable_cookie() {
        let h = harness(vec![]);
        let response = h
            .app
            .clone()
            .oneshot(
                json_request("POST", "/api/v1/login/browser", None)
                    .header(header::AUTHORIZATION, h.basic("alice"))
                    .body_json(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("session="));

        let cookie = set_cookie.split(';').next().unwrap().to_string();
        let (status, body) = h
            .send(
                json_request("GET", "/api/v1/browser/whoami", None)
                    .header(header::COOKIE, cookie)
                    .body_json(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "alice");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let h = harness(vec![]);
        let response = h
            .app
            .clone()
            .oneshot(
                json_request("GET", "/health/live", None)
                    .header(
                        header::HeaderName::from_static("x-request-id"),
                        "req-123".to_string(),
                    )
                    .body_json(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-123");
    }
}

#[cfg(test)]
mod admin_tests {
    use super::*;

    async fn create_group(h: &Harness, name: &str) -> String {
        let (status, body) = h
            .admin("POST", "/rebac/v1/groups", Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_group_list_pagination() {
        let h = harness(vec![]);
        for name in ["alpha", "bravo", "charlie"] {
            create_group(&h, name).await;
        }

        let (status, body) = h.admin("GET", "/rebac/v1/groups?size=2&page=0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["meta"]["total"], 3);
        assert_eq!(body["next"]["page"], 1);

        let (_, body) = h.admin("GET", "/rebac/v1/groups?size=2&page=1", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "charlie");
        assert!(body["next"].get("page").is_none());
    }

    #[tokio::test]
    async fn test_group_list_beyond_last_page_number() {
        let h = harness(vec![]);
        create_group(&h, "alpha").await;

        let uri = format!("/rebac/v1/groups?size=10&page={}", i64::MAX);
        let (status, body) = h.admin("GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
        assert!(body["next"].get("page").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_group_conflicts() {
        let h = harness(vec![]);
        create_group(&h, "ops").await;
        let (status, _) = h
            .admin("POST", "/rebac/v1/groups", Some(json!({ "name": "ops" })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_group_is_not_found() {
        let h = harness(vec![]);
        let uri = format!("/rebac/v1/groups/{}", GroupId::new());
        let (status, _) = h.admin("GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = h.admin("GET", "/rebac/v1/groups/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_patch_entry_rejects_whole_batch() {
        let h = harness(vec![]);
        let id = create_group(&h, "ops").await;
        let before = h.store.len().await;

        let uri = format!("/rebac/v1/groups/{}/identities", id);
        let (status, body) = h
            .admin(
                "PATCH",
                &uri,
                Some(json!({ "patches": [
                    { "identity": "alice@canonical.com", "op": "add" },
                    { "identity": "not a name", "op": "add" },
                ]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["details"].get("patches[1].identity").is_some());
        assert_eq!(h.store.len().await, before);
    }

    #[tokio::test]
    async fn test_group_membership_patch_and_list() {
        let h = harness(vec![]);
        let id = create_group(&h, "ops").await;
        let uri = format!("/rebac/v1/groups/{}/identities", id);

        let (status, _) = h
            .admin(
                "PATCH",
                &uri,
                Some(json!({ "patches": [
                    { "identity": "alice", "op": "add" },
                    { "identity": "bob", "op": "add" },
                ]})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = h
            .admin(
                "PATCH",
                &uri,
                Some(json!({ "patches": [{ "identity": "bob", "op": "remove" }] })),
            )
            .await;
        assert_eq!(body["data"], true);

        let group: GroupId = id.parse().unwrap();
        h.store
            .add_relation(&[Tuple::new(Entity::user("*"), Relation::Member, group.entity())])
            .await
            .unwrap();

        let (status, body) = h.admin("GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["alice"]);
    }

    #[tokio::test]
    async fn test_group_entitlements_page_through_kinds() {
        let h = harness(vec![]);
        let id = create_group(&h, "ops").await;
        let model = ModelId::new();
        let controller = ControllerId::new();

        let uri = format!("/rebac/v1/groups/{}/entitlements", id);
        let (status, _) = h
            .admin(
                "PATCH",
                &uri,
                Some(json!({ "patches": [
                    { "op": "add", "entitlement": {
                        "entitlement": "writer", "entity_type": "model", "entity_id": model.to_string() } },
                    { "op": "add", "entitlement": {
                        "entitlement": "audit_log_viewer", "entity_type": "controller", "entity_id": controller.to_string() } },
                ]})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let mut seen = Vec::new();
        let mut next = String::new();
        for _ in 0..20 {
            let page_uri = if next.is_empty() {
                format!("{}?size=10", uri)
            } else {
                format!("{}?size=10&nextPageToken={}", uri, query_escape(&next))
            };
            let (status, body) = h.admin("GET", &page_uri, None).await;
            assert_eq!(status, StatusCode::OK);
            for entry in body["data"].as_array().unwrap() {
                seen.push(entry["entitlement"].as_str().unwrap().to_string());
            }
            match body["next"]["pageToken"].as_str() {
                Some(token) => next = token.to_string(),
                None => break,
            }
        }
        seen.sort();
        assert_eq!(seen, vec!["audit_log_viewer", "writer"]);
    }

    #[tokio::test]
    async fn test_ungrantable_entitlement_rejected() {
        let h = harness(vec![]);
        h.identities.insert(Identity::new("bob")).await;
        let (status, _) = h
            .admin(
                "PATCH",
                "/rebac/v1/identities/bob/entitlements",
                Some(json!({ "patches": [{ "op": "add", "entitlement": {
                    "entitlement": "controller", "entity_type": "model",
                    "entity_id": ModelId::new().to_string() } }] })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_identity_groups_patch_requires_existing_groups() {
        let h = harness(vec![]);
        h.identities.insert(Identity::new("bob")).await;
        let id = create_group(&h, "ops").await;

        let (status, _) = h
            .admin(
                "PATCH",
                "/rebac/v1/identities/bob/groups",
                Some(json!({ "patches": [
                    { "group": id, "op": "add" },
                    { "group": GroupId::new().to_string(), "op": "add" },
                ]})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = h
            .admin(
                "PATCH",
                "/rebac/v1/identities/bob/groups",
                Some(json!({ "patches": [{ "group": id, "op": "add" }] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = h.admin("GET", "/rebac/v1/identities/bob/groups", None).await;
        assert_eq!(body["data"][0]["name"], "ops");
    }

    #[tokio::test]
    async fn test_delete_group_removes_relations() {
        let model = ModelId::new();
        let h = harness(vec![]);
        let id = create_group(&h, "ops").await;
        let group: GroupId = id.parse().unwrap();
        h.store
            .add_relation(&[
                Tuple::new(Entity::user("alice"), Relation::Member, group.entity()),
                Tuple::new(group.members(), Relation::Reader, model.entity()),
            ])
            .await
            .unwrap();
        let before = h.store.len().await;

        let (status, _) = h.admin("DELETE", &format!("/rebac/v1/groups/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(h.store.len().await, before - 2);

        let (status, _) = h.admin("GET", &format!("/rebac/v1/groups/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resources_probe_pagination() {
        let h = harness(vec![]);
        for name in ["aws", "azure", "gce"] {
            h.resources
                .insert(ResourceRecord {
                    kind: Kind::Cloud,
                    id: name.to_string(),
                    name: name.to_string(),
                    parent: None,
                })
                .await;
        }

        let (status, body) = h
            .admin("GET", "/rebac/v1/resources?size=2&page=0&entityType=cloud", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["next"]["page"], 1);

        let (_, body) = h
            .admin("GET", "/rebac/v1/resources?size=2&page=0&nameFilter=AZ", None)
            .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["entity"]["type"], "cloud");

        let (status, _) = h
            .admin("GET", "/rebac/v1/resources?entityType=planet", None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_entitlement_schema() {
        let h = harness(vec![]);
        let (status, body) = h.admin("GET", "/rebac/v1/entitlements", None).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body["data"].as_array().unwrap();
        assert!(entries.iter().any(|e| e["entitlement_type"] == "can_addmodel"
            && e["entity_type"] == "cloud"
            && e["entity_name"] == "user"));
    }
}

#[cfg(test)]
mod relation_api_tests {
    use super::*;

    #[tokio::test]
    async fn test_relations_require_admin() {
        let h = harness(vec![]);
        let (status, _) = h
            .send(
                json_request(
                    "POST",
                    "/api/v1/relations/check",
                    Some(json!({ "tuple": {
                        "object": "user:alice", "relation": "reader",
                        "target": format!("model:{}", ModelId::new()) } })),
                )
                .header(header::AUTHORIZATION, h.basic("alice"))
                .body_json(),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_adds_and_reads_relations() {
        let h = harness(vec![]);
        let model = ModelId::new();
        let tuple = json!({
            "object": "user:alice", "relation": "writer", "target": format!("model:{}", model)
        });

        let (status, body) = h
            .send(
                json_request("POST", "/api/v1/relations", Some(json!({ "tuples": [tuple] })))
                    .header(header::AUTHORIZATION, h.basic("admin"))
                    .body_json(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], 1);

        let (status, body) = h
            .send(
                json_request(
                    "GET",
                    &format!("/api/v1/relations?target=model:{}", model),
                    None,
                )
                .header(header::AUTHORIZATION, h.basic("admin"))
                .body_json(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tuples"][0]["object"], "user:alice");

        // writer implies reader in the model
        let (_, body) = h
            .send(
                json_request(
                    "POST",
                    "/api/v1/relations/check",
                    Some(json!({ "tuple": {
                        "object": "user:alice", "relation": "reader",
                        "target": format!("model:{}", model) } })),
                )
                .header(header::AUTHORIZATION, h.basic("admin"))
                .body_json(),
            )
            .await;
        assert_eq!(body["data"]["allowed"], true);
    }

    #[tokio::test]
    async fn test_malformed_filter_is_bad_request() {
        let h = harness(vec![]);
        let (status, _) = h
            .send(
                json_request("GET", "/api/v1/relations?relation=owner", None)
                    .header(header::AUTHORIZATION, h.basic("admin"))
                    .body_json(),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[cfg(test)]
mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_with_memory_store() {
        let h = harness(vec![]);
        let (status, body) = h.send(get_request("/health/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");

        let (status, body) = h.send(get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}

#[cfg(test)]
mod invariant_tests {
    use super::*;
    use async_trait::async_trait;
    use corral_core::{Authenticator, BrowserSession, CorralError, Result};

    /// Authenticator whose browser sessions resolve to a fixed identity and
    /// whose user lookups always fail
    struct BrokenAuthenticator {
        identity: String,
    }

    #[async_trait]
    impl Authenticator for BrokenAuthenticator {
        async fn authenticate_browser_session(&self, _: Option<&str>) -> Result<BrowserSession> {
            Ok(BrowserSession {
                identity: self.identity.clone(),
                refreshed_cookie: None,
            })
        }

        async fn start_browser_session(&self, _: &str) -> Result<String> {
            Err(CorralError::internal_error("unsupported"))
        }

        async fn login_with_session_token(&self, _: &str) -> Result<Principal> {
            Err(CorralError::unauthenticated("unsupported"))
        }

        async fn user_login(&self, _: &str) -> Result<Principal> {
            Err(CorralError::database_error("identity table unavailable"))
        }
    }

    fn app_with(identity: &str) -> Router {
        let store = Arc::new(MemoryTupleStore::new());
        let state = AppState::new(
            store,
            Arc::new(BrokenAuthenticator {
                identity: identity.to_string(),
            }),
            Arc::new(MemoryIdentityRepository::new()),
            Arc::new(MemoryGroupRepository::new()),
            Arc::new(MemoryResourceRepository::new()),
            ControllerId::new().entity(),
        );
        create_router_with_state(state)
    }

    async fn status_and_message(app: Router) -> (StatusCode, Value) {
        let response = app.oneshot(get_request("/rebac/v1/groups")).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_session_without_identity_is_internal_error() {
        let (status, body) = status_and_message(app_with("")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "internal authentication error");
    }

    #[tokio::test]
    async fn test_unresolvable_identity_is_internal_error() {
        let (status, _) = status_and_message(app_with("alice")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_custom_base_path() {
        let store = Arc::new(MemoryTupleStore::new());
        let state = AppState::new(
            store,
            Arc::new(BrokenAuthenticator {
                identity: String::new(),
            }),
            Arc::new(MemoryIdentityRepository::new()),
            Arc::new(MemoryGroupRepository::new()),
            Arc::new(MemoryResourceRepository::new()),
            ControllerId::new().entity(),
        )
        .with_base_path("/admin/rebac/");
        let app = create_router_with_state(state);
        let response = app
            .oneshot(get_request("/admin/rebac/swagger.json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
