//! Session-token API: the caller's own identity and model access

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::{info, warn};

use corral_core::{ControllerId, Kind, ModelId, Principal, Relation};

use crate::dto::{
    ApiFailure, ApiResponse, ApiResult, CheckRelationResponse, ControllerSummaryResponse,
    IdentityRef, ModelAccessResponse, WhoamiResponse,
};
use crate::handlers::parse_id;
use crate::middleware::{CurrentPrincipal, SessionIdentity};
use crate::state::AppState;

fn whoami_response(principal: &Principal) -> WhoamiResponse {
    WhoamiResponse {
        name: principal.name().to_string(),
        display_name: principal.identity().display_name.clone(),
        is_admin: principal.is_admin(),
    }
}

/// GET /api/v1/whoami
pub async fn whoami(CurrentPrincipal(principal): CurrentPrincipal) -> Json<ApiResponse<WhoamiResponse>> {
    Json(ApiResponse::ok(whoami_response(&principal)))
}

/// GET /api/v1/browser/whoami
pub async fn browser_whoami(
    Extension(SessionIdentity(name)): Extension<SessionIdentity>,
) -> Json<ApiResponse<IdentityRef>> {
    Json(ApiResponse::ok(IdentityRef { name }))
}

/// POST /api/v1/login/browser
///
/// Trades a session token for a browser session cookie.
pub async fn browser_login(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Response, ApiFailure> {
    let cookie = state
        .authenticator
        .start_browser_session(principal.name())
        .await?;
    info!(identity = %principal.name(), "Started browser session");

    let mut response = Json(ApiResponse::ok(whoami_response(&principal))).into_response();
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => {
            warn!(error = %e, "Session cookie is not a valid header value");
            return Err(ApiFailure::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "failed to start browser session",
            ));
        }
    }
    Ok(response)
}

/// GET /api/v1/models/{uuid}/access
pub async fn model_access(
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(uuid): Path<String>,
) -> ApiResult<ApiResponse<ModelAccessResponse>> {
    let model: ModelId = parse_id(&uuid, "model")?;
    let access = principal.model_access(model).await?;
    Ok(Json(ApiResponse::ok(ModelAccessResponse {
        model: model.to_string(),
        access: access.map(|r| r.to_string()),
    })))
}

/// POST /api/v1/models/{uuid}/check-write
pub async fn check_model_write(
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(uuid): Path<String>,
) -> ApiResult<ApiResponse<CheckRelationResponse>> {
    let model: ModelId = parse_id(&uuid, "model")?;
    let allowed = principal.is_model_writer(model).await?;
    Ok(Json(ApiResponse::ok(CheckRelationResponse { allowed })))
}

/// GET /api/v1/controllers/{uuid}/summary
pub async fn controller_summary(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> ApiResult<ApiResponse<ControllerSummaryResponse>> {
    let controller: ControllerId = parse_id(&uuid, "controller")?;
    let models = state
        .store
        .list_objects(&controller.entity(), Relation::Controller, Kind::Model)
        .await?;
    Ok(Json(ApiResponse::ok(ControllerSummaryResponse {
        controller: controller.to_string(),
        models: models.into_iter().map(|m| m.id).collect(),
    })))
}
