use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::info;

use corkboard_types::api::{Envelope, LoginRequest, RegisterRequest};

use crate::error::{ApiError, run_blocking};
use crate::session;
use crate::state::AppState;
use crate::users::user_json;

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.auth.clone();
    let user = run_blocking(move || {
        auth.create_user(&req.username, &req.email, &req.password)
    })
    .await?;

    info!("Registered user {} ({})", user.username, user.id);
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(
            "registration successful",
            Some(user_json(&user)),
        )),
    ))
}

/// POST /api/auth/login — returns the signed session token as the
/// placeholder credential.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.auth.clone();
    let user = run_blocking(move || auth.authenticate(&req.username, &req.password)).await?;

    let token = session::issue_token(&state.secret_key, &user.id, &user.username);

    info!("User {} logged in", user.username);
    Ok(Json(Envelope::ok(
        "login successful",
        Some(json!({
            "user": user_json(&user),
            "token": token,
        })),
    )))
}

/// GET /api/auth/user/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.auth.clone();
    let user = run_blocking(move || auth.get_user(&id)).await?;
    Ok(Json(Envelope::ok("ok", Some(user_json(&user)))))
}
