use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Value, json};

use corkboard_db::models::ContactRow;
use corkboard_types::api::{ContactResponse, CreateContactRequest, Envelope};

use crate::error::{ApiError, run_blocking};
use crate::state::AppState;

pub fn contact_json(contact: &ContactRow) -> Value {
    json!(ContactResponse {
        id: contact.id.clone(),
        name: contact.name.clone(),
        email: contact.email.clone(),
        message: contact.message.clone(),
        user_id: contact.user_id.clone(),
        created_at: contact.created_at.clone(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ContactQuery {
    pub user_id: Option<String>,
}

/// GET /api/contacts — optionally filtered to one owner via `?user_id=`.
pub async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ContactQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = state.contacts.clone();
    let rows = run_blocking(move || match query.user_id.as_deref() {
        Some(uid) => contacts.list_by_user(uid),
        None => contacts.list_all(),
    })
    .await?;

    let data: Vec<Value> = rows.iter().map(contact_json).collect();
    Ok(Json(Envelope::ok("ok", Some(Value::Array(data)))))
}

/// GET /api/contacts/{id}
pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = state.contacts.clone();
    let row = run_blocking(move || contacts.get(&id)).await?;
    Ok(Json(Envelope::ok("ok", Some(contact_json(&row)))))
}

/// POST /api/contacts
pub async fn create_contact(
    State(state): State<AppState>,
    Json(req): Json<CreateContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = state.contacts.clone();
    let row = run_blocking(move || {
        contacts.create_message(&req.name, &req.email, &req.message, req.user_id.as_deref())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok("message received", Some(contact_json(&row)))),
    ))
}
