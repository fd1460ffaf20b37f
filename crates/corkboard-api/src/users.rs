use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value, json};
use tracing::info;

use corkboard_db::models::UserRow;
use corkboard_types::api::{CreateUserRequest, Envelope, UpdateUserRequest, UserResponse};

use crate::error::{ApiError, run_blocking};
use crate::state::AppState;

/// Serialize a user row for the envelope. The password hash never leaves
/// the service layer.
pub fn user_json(user: &UserRow) -> Value {
    json!(UserResponse {
        id: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        created_at: user.created_at.clone(),
        avatar: user.avatar.clone(),
        avatar_url: user
            .avatar
            .as_ref()
            .map(|name| format!("/uploads/avatars/{}", name)),
    })
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let auth = state.auth.clone();
    let users = run_blocking(move || auth.list_users()).await?;
    let data: Vec<Value> = users.iter().map(user_json).collect();
    Ok(Json(Envelope::ok("ok", Some(Value::Array(data)))))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.auth.clone();
    let user = run_blocking(move || auth.get_user(&id)).await?;
    Ok(Json(Envelope::ok("ok", Some(user_json(&user)))))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.auth.clone();
    let user = run_blocking(move || {
        auth.create_user(&req.username, &req.email, &req.password)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok("user created", Some(user_json(&user)))),
    ))
}

/// PUT /api/users/{id} — partial update; only present fields are applied.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.auth.clone();
    let user = run_blocking(move || {
        auth.update_user(
            &id,
            req.username.as_deref(),
            req.email.as_deref(),
            req.password.as_deref(),
        )
    })
    .await?;

    Ok(Json(Envelope::ok("user updated", Some(user_json(&user)))))
}

/// DELETE /api/users/{id} — removes the avatar file too; contact
/// messages survive with a nulled owner.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let user = run_blocking(move || {
        let user = st.auth.get_user(&id)?;
        if let Some(avatar) = &user.avatar {
            st.avatars.remove(avatar).ok();
        }
        st.auth.delete_user(&id)
    })
    .await?;

    info!("Deleted user {} ({})", user.username, user.id);
    Ok(Json(Envelope::ok("user deleted", None)))
}

/// POST /api/users/{id}/avatar — multipart upload, field name `avatar`.
///
/// Ordering on success: write the new thumbnail, drop the superseded
/// file, then commit the avatar-field update. A pipeline failure leaves
/// the prior avatar file and field untouched.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart body".into()))?
    {
        if field.name() == Some("avatar") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("failed to read upload".into()))?;
            upload = Some((filename, bytes));
            break;
        }
    }
    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::Validation("missing avatar field".into()))?;

    let st = state.clone();
    let user = run_blocking(move || {
        let user = st.auth.get_user(&id)?;
        let stored = st.avatars.store(&filename, &bytes)?;
        if let Some(old) = &user.avatar {
            st.avatars.remove(old).ok();
        }
        st.auth.set_avatar(&id, Some(&stored))?;
        st.auth.get_user(&id)
    })
    .await?;

    info!("Updated avatar for user {}", user.username);
    Ok(Json(Envelope::ok("avatar updated", Some(user_json(&user)))))
}

/// DELETE /api/users/{id}/avatar
pub async fn delete_avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let st = state.clone();
    let user = run_blocking(move || {
        let user = st.auth.get_user(&id)?;
        let avatar = user
            .avatar
            .ok_or_else(|| ApiError::NotFound("no avatar set".into()))?;

        // Missing file on disk is tolerated; the field is cleared either way
        st.avatars.remove(&avatar)?;
        st.auth.set_avatar(&id, None)?;
        st.auth.get_user(&id)
    })
    .await?;

    Ok(Json(Envelope::ok("avatar deleted", Some(user_json(&user)))))
}
