use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::Principal;
use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::AuthContext;

/// Identity bound to the presented token
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub principal: Principal,
    pub request_id: String,
}

/// The caller's identity, used by the operator widget on load
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Caller identity", body = ProfileResponse),
        (status = 401, description = "Missing or invalid api_access_token")
    ),
    security(("api_access_token" = []))
)]
pub async fn get_profile(auth: AuthContext) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    Ok(Json(api_success(ProfileResponse {
        request_id: auth.request_id().to_string(),
        principal: auth.principal,
    })))
}
