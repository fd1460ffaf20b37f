use axum::Json;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower_http::services::ServeDir;

use corkboard_types::api::Envelope;

use crate::state::AppState;
use crate::{auth, contacts, pages, users};

/// GET /api/test
async fn test_endpoint() -> impl IntoResponse {
    Json(Envelope::ok(
        "API is working!",
        Some(json!({"version": "1.0", "status": "running"})),
    ))
}

/// Assemble the full application router: JSON API under `/api`, HTML
/// pages at the root, and static passthrough for uploaded media.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/test", get(test_endpoint))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/users/{id}/avatar",
            post(users::upload_avatar).delete(users::delete_avatar),
        )
        .route(
            "/contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route("/contacts/{id}", get(contacts::get_contact))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/user/{id}", get(auth::get_user));

    let site = Router::new()
        .route("/", get(pages::index))
        .route("/search", get(pages::search))
        .route("/user/{username}/{user_id}", get(pages::user_profile))
        .route(
            "/register",
            get(pages::register_form).post(pages::register_submit),
        )
        .route("/login", get(pages::login_form).post(pages::login_submit))
        .route("/logout", get(pages::logout))
        .route(
            "/contact",
            get(pages::contact_form).post(pages::contact_submit),
        )
        .route("/messages", get(pages::messages));

    let uploads = ServeDir::new(&state.upload_root);

    Router::new()
        .nest("/api", api)
        .merge(site)
        .nest_service("/uploads", uploads)
        .with_state(state)
}
