//! Data Transfer Objects for API requests and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::error;

use corral_core::{CorralError, Group, Identity, ResourceRecord, Tuple};

// ============================================================================
// Generic Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

/// A failed request, rendered as an `ApiResponse` with no data
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub error: ApiError,
}

impl ApiFailure {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ApiError {
                code: code.to_string(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: HashMap<String, String>) -> Self {
        self.error.details = Some(details);
        self
    }
}

impl From<CorralError> for ApiFailure {
    fn from(err: CorralError) -> Self {
        let (status, code) = match &err {
            CorralError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            CorralError::AlreadyExists { .. } => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
            CorralError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            CorralError::Pagination { .. } => (StatusCode::BAD_REQUEST, "INVALID_PAGINATION"),
            CorralError::Unauthenticated { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            CorralError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            _ => {
                error!(error = %err, "Request failed with an internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        Self::new(status, code, err.to_string())
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.error),
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiFailure>;

// ============================================================================
// Paginated Envelope
// ============================================================================

/// List response: `{data, meta, next}`
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
    pub next: PageNext,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl PageNext {
    /// Next-page pointer for token pagination; an empty token ends the listing
    pub fn token(token: &str) -> Self {
        Self {
            page: None,
            page_token: (!token.is_empty()).then(|| token.to_string()),
        }
    }
}

/// `?size&page&filter` for offset-paginated lists
#[derive(Debug, Default, Deserialize)]
pub struct OffsetQuery {
    pub size: Option<i64>,
    pub page: Option<i64>,
    pub filter: Option<String>,
}

/// `?size&nextToken` for membership listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipQuery {
    pub size: Option<i64>,
    pub next_token: Option<String>,
}

/// `?size&nextPageToken` for entitlement listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementQuery {
    pub size: Option<i64>,
    pub next_page_token: Option<String>,
}

/// `?size&page&entityType&nameFilter` for the resource listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuery {
    pub size: Option<i64>,
    pub page: Option<i64>,
    pub entity_type: Option<String>,
    pub name_filter: Option<String>,
}

// ============================================================================
// Patch DTOs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatchRequest<T> {
    pub patches: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityPatch {
    pub identity: String,
    pub op: PatchOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPatch {
    pub group: String,
    pub op: PatchOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementPatch {
    pub entitlement: EntityEntitlement,
    pub op: PatchOp,
}

// ============================================================================
// Group & Identity DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GroupRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Group> for GroupResponse {
    fn from(group: Group) -> Self {
        Self {
            id: group.id.to_string(),
            name: group.name,
            created_at: group.created_at.to_rfc3339(),
            updated_at: group.updated_at.to_rfc3339(),
        }
    }
}

/// A group a user belongs to; `name` is absent for dangling memberships
#[derive(Debug, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub service_account: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        Self {
            service_account: identity.is_service_account(),
            name: identity.name,
            display_name: identity.display_name,
            created_at: identity.created_at.to_rfc3339(),
            last_login: identity.last_login.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityRef {
    pub name: String,
}

/// A relation held on one resource, as listed and patched by administrators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEntitlement {
    pub entitlement: String,
    pub entity_type: String,
    pub entity_id: String,
}

impl From<&Tuple> for EntityEntitlement {
    fn from(tuple: &Tuple) -> Self {
        Self {
            entitlement: tuple.relation.to_string(),
            entity_type: tuple.target.kind.to_string(),
            entity_id: tuple.target.id.clone(),
        }
    }
}

// ============================================================================
// Resource DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceEntity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub entity: ResourceEntity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceEntity>,
}

impl From<ResourceRecord> for ResourceResponse {
    fn from(record: ResourceRecord) -> Self {
        Self {
            entity: ResourceEntity {
                id: record.id,
                name: record.name,
                kind: record.kind.to_string(),
            },
            parent: record.parent.map(|p| ResourceEntity {
                id: p.id,
                name: p.name,
                kind: p.kind.to_string(),
            }),
        }
    }
}

// ============================================================================
// Session API DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct WhoamiResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelAccessResponse {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ControllerSummaryResponse {
    pub controller: String,
    /// Models hosted by the controller
    pub models: Vec<String>,
}

// ============================================================================
// Relation DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RelationsRequest {
    pub tuples: Vec<Tuple>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckRelationRequest {
    pub tuple: Tuple,
    #[serde(default)]
    pub contextual_tuples: Vec<Tuple>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckRelationResponse {
    pub allowed: bool,
}

/// `?object&relation&target&size&token` for raw tuple reads
#[derive(Debug, Default, Deserialize)]
pub struct RelationsQuery {
    pub object: Option<String>,
    pub relation: Option<String>,
    pub target: Option<String>,
    pub size: Option<i64>,
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelationsResponse {
    pub tuples: Vec<Tuple>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub continuation_token: String,
}
