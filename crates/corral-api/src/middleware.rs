//! Request middleware: request ids, logging, authentication and
//! per-route authorization
//!
//! Two independent authentication strategies exist:
//! - Browser sessions, read from the session cookie. The ReBAC admin routes
//!   additionally resolve the identity to a principal and require admin.
//! - Session tokens, carried as the password of HTTP Basic auth.
//!
//! Both leave a [`Principal`] in the request extensions for [`authorize`] and
//! for handlers, which read it through [`CurrentPrincipal`].

use axum::{
    extract::{FromRequestParts, OriginalUri, RawPathParams, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use corral_core::{Capability, Entity, Kind, Principal};

use crate::state::AppState;

// =============================================================================
// Types
// =============================================================================

/// Identity name resolved from a browser session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity(pub String);

/// Error response for auth failures
#[derive(Debug, Serialize)]
pub struct AuthError {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

type AuthRejection = (StatusCode, Json<AuthError>);

fn reject(
    status: StatusCode,
    error: &str,
    message: &str,
    request_id: Option<String>,
) -> AuthRejection {
    (
        status,
        Json(AuthError {
            error: error.to_string(),
            message: message.to_string(),
            request_id,
        }),
    )
}

/// Paths under the admin base path that skip authentication
pub const UNAUTHENTICATED_ENDPOINTS: &[&str] = &["/swagger.json"];

// =============================================================================
// Request ID Middleware
// =============================================================================

/// Request ID wrapper for extensions
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Honour an incoming `x-request-id` or assign a new one
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

fn request_id_of(request: &Request) -> Option<String> {
    request.extensions().get::<RequestId>().map(|r| r.0.clone())
}

// =============================================================================
// Browser Session Authentication
// =============================================================================

/// All `Cookie` headers of a request folded into one
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let cookies: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if cookies.is_empty() {
        None
    } else {
        Some(cookies.join("; "))
    }
}

fn append_cookie(response: &mut Response, cookie: Option<String>) {
    let Some(cookie) = cookie else {
        return;
    };
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => warn!(error = %e, "Dropping unencodable session cookie"),
    }
}

/// Authenticate the browser session cookie and record the session identity.
///
/// A refreshed session cookie is appended to the response.
pub async fn authenticate_browser_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let request_id = request_id_of(&request);
    let cookies = cookie_header(request.headers());

    let session = state
        .authenticator
        .authenticate_browser_session(cookies.as_deref())
        .await
        .map_err(|e| {
            warn!(error = %e, "Browser session authentication failed");
            reject(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "failed to authenticate",
                request_id,
            )
        })?;

    debug!(identity = %session.identity, "Browser session authenticated");
    request
        .extensions_mut()
        .insert(SessionIdentity(session.identity));

    let mut response = next.run(request).await;
    append_cookie(&mut response, session.refreshed_cookie);
    Ok(response)
}

fn request_path(request: &Request) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Whether `path` is one of the allow-listed endpoints under `base_path`
pub fn is_unauthenticated_endpoint(base_path: &str, path: &str) -> bool {
    path.strip_prefix(base_path.trim_end_matches('/'))
        .is_some_and(|relative| UNAUTHENTICATED_ENDPOINTS.contains(&relative))
}

/// Gate for the ReBAC admin routes: browser session, then principal, then admin.
pub async fn authenticate_rebac_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    if is_unauthenticated_endpoint(&state.base_path, &request_path(&request)) {
        return Ok(next.run(request).await);
    }

    let request_id = request_id_of(&request);
    let cookies = cookie_header(request.headers());

    let session = state
        .authenticator
        .authenticate_browser_session(cookies.as_deref())
        .await
        .map_err(|e| {
            warn!(error = %e, "Browser session authentication failed");
            reject(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "failed to authenticate",
                request_id.clone(),
            )
        })?;

    // A session that authenticated without an identity is a broken invariant.
    if session.identity.is_empty() {
        error!("Browser session authenticated without an identity");
        return Err(reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal authentication error",
            request_id,
        ));
    }

    let principal = state
        .authenticator
        .user_login(&session.identity)
        .await
        .map_err(|e| {
            error!(identity = %session.identity, error = %e, "Failed to resolve session identity");
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal authentication error",
                request_id.clone(),
            )
        })?;

    if !principal.is_admin() {
        warn!(identity = %principal.name(), "Non-admin rejected from admin routes");
        return Err(reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "user is not an admin",
            request_id,
        ));
    }

    debug!(identity = %principal.name(), "Admin principal resolved");
    request
        .extensions_mut()
        .insert(SessionIdentity(session.identity));
    request.extensions_mut().insert(principal);

    let mut response = next.run(request).await;
    append_cookie(&mut response, session.refreshed_cookie);
    Ok(response)
}

// =============================================================================
// Session Token (Basic Auth) Authentication
// =============================================================================

/// The password half of an HTTP Basic `Authorization` header
fn basic_auth_password(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (_, password) = credentials.split_once(':')?;
    Some(password.to_string())
}

/// Exchange the session token in the Basic auth password for a principal
pub async fn authenticate_session_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let request_id = request_id_of(&request);

    let Some(token) = basic_auth_password(request.headers()) else {
        warn!("Request without basic auth credentials");
        return Err(reject(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "authentication missing",
            request_id,
        ));
    };

    let principal = state
        .authenticator
        .login_with_session_token(&token)
        .await
        .map_err(|e| {
            warn!(error = %e, "Session token login failed");
            reject(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "error authenticating the user",
                request_id,
            )
        })?;

    debug!(identity = %principal.name(), "Session token authenticated");
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

// =============================================================================
// Authorization
// =============================================================================

/// The capability a route requires on the resource named by its path
#[derive(Debug, Clone)]
pub struct ResourceGuard {
    kind: Kind,
    capability: Option<Capability>,
    param: &'static str,
}

impl ResourceGuard {
    pub fn new(kind: Kind, capability: Capability) -> Self {
        Self {
            kind,
            capability: Some(capability),
            param: "uuid",
        }
    }

    /// Build a guard from a configured capability name.
    ///
    /// An unknown name yields a guard that denies every request.
    pub fn from_name(kind: Kind, capability: &str) -> Self {
        let capability = match capability.parse() {
            Ok(capability) => Some(capability),
            Err(e) => {
                error!(%kind, error = %e, "Route configured with an unknown capability");
                None
            }
        };
        Self {
            kind,
            capability,
            param: "uuid",
        }
    }

    /// Read the resource id from a path parameter other than `uuid`
    pub fn with_param(mut self, param: &'static str) -> Self {
        self.param = param;
        self
    }
}

/// Enforce a [`ResourceGuard`] for the authenticated principal
pub async fn authorize(
    State(guard): State<ResourceGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let request_id = request_id_of(&request);
    let (mut parts, body) = request.into_parts();

    let resource_id = RawPathParams::from_request_parts(&mut parts, &())
        .await
        .ok()
        .and_then(|params| {
            params
                .iter()
                .find(|(name, _)| *name == guard.param)
                .map(|(_, value)| value.to_string())
        })
        .filter(|id| !id.is_empty());
    let principal = parts.extensions.get::<Principal>().cloned();
    let request = Request::from_parts(parts, body);

    let Some(resource_id) = resource_id else {
        warn!(param = guard.param, "Route resource id missing");
        return Err(reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "cannot find uuid in URL path",
            request_id,
        ));
    };

    let Some(principal) = principal else {
        error!("Authorization reached without an authenticated principal");
        return Err(reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal authentication error",
            request_id,
        ));
    };

    let denied = || {
        reject(
            StatusCode::FORBIDDEN,
            "forbidden",
            "no access to the resource",
            request_id.clone(),
        )
    };

    let Some(capability) = guard.capability else {
        return Err(denied());
    };

    let resource = Entity::new(guard.kind, resource_id);
    match principal.has_capability(capability, &resource).await {
        Ok(true) => {
            debug!(identity = %principal.name(), %resource, %capability, "Access granted");
            Ok(next.run(request).await)
        }
        Ok(false) => {
            info!(identity = %principal.name(), %resource, %capability, "Access denied");
            Err(denied())
        }
        Err(e) => {
            warn!(identity = %principal.name(), %resource, error = %e, "Capability check failed");
            Err(denied())
        }
    }
}

/// Handler access to the principal left by the authentication middleware
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| {
                error!("Handler reached without an authenticated principal");
                let request_id = parts.extensions.get::<RequestId>().map(|r| r.0.clone());
                reject(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal authentication error",
                    request_id,
                )
            })
    }
}

// =============================================================================
// Logging Middleware
// =============================================================================

/// Request logging middleware with request ID
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request_id_of(&request).unwrap_or_else(|| "unknown".to_string());

    let start = std::time::Instant::now();

    let response = next.run(request).await;

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        latency_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}
