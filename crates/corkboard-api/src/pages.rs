use axum::Form;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect};
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, run_blocking};
use crate::session::{self, SessionUser};
use crate::state::AppState;

// ── Rendering helpers ───────────────────────────────────────────────────

/// Escape text interpolated into HTML. Presence checks aside, stored
/// content is arbitrary and must not break the markup.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn layout(title: &str, user: Option<&SessionUser>, body: &str) -> Html<String> {
    let nav_auth = match user {
        Some(u) => format!(
            r#"<span>Signed in as {}</span> <a href="/logout">Log out</a>"#,
            escape(&u.username)
        ),
        None => r#"<a href="/login">Log in</a> <a href="/register">Register</a>"#.to_string(),
    };
    Html(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>{title} - corkboard</title></head>
<body>
<nav>
  <a href="/">Home</a>
  <a href="/contact">Contact</a>
  <a href="/messages">Messages</a>
  {nav_auth}
</nav>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        nav_auth = nav_auth,
        body = body,
    ))
}

fn flash(message: &str) -> String {
    format!("<p class=\"flash\">{}</p>", escape(message))
}

// ── Plain pages ─────────────────────────────────────────────────────────

/// GET /
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let user = session::current_user(&headers, &state.secret_key);
    let greeting = match &user {
        Some(u) => format!("<h1>Hello, {}!</h1>", escape(&u.username)),
        None => "<h1>Hello, World!</h1>".to_string(),
    };
    layout("Home", user.as_ref(), &greeting)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /search?q=
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Html<String> {
    let user = session::current_user(&headers, &state.secret_key);
    let q = query.q.unwrap_or_else(|| "no search term".to_string());
    let body = format!("<h1>Search</h1><p>You searched for: {}</p>", escape(&q));
    layout("Search", user.as_ref(), &body)
}

/// GET /user/{username}/{id}
pub async fn user_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((username, user_id)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let viewer = session::current_user(&headers, &state.secret_key);

    let st = state.clone();
    let uid = user_id.clone();
    let (user, messages) = run_blocking(move || {
        let user = st.auth.get_user(&uid)?;
        let messages = st.contacts.list_by_user(&uid)?;
        Ok((user, messages))
    })
    .await?;

    let avatar = match &user.avatar {
        Some(name) => format!(
            r#"<img src="/uploads/avatars/{}" alt="avatar" width="150" height="150">"#,
            escape(name)
        ),
        None => "<p>No avatar set.</p>".to_string(),
    };

    let mut rows = String::new();
    for m in &messages {
        rows.push_str(&format!(
            "<li>{} <small>{}</small></li>",
            escape(&m.message),
            escape(&m.created_at)
        ));
    }
    let body = format!(
        "<h1>Profile: {}</h1>{}<p>Member since {}</p><h2>Messages</h2><ul>{}</ul>",
        escape(&username),
        avatar,
        escape(&user.created_at),
        rows
    );
    Ok(layout(&user.username, viewer.as_ref(), &body))
}

// ── Registration ────────────────────────────────────────────────────────

const REGISTER_FORM: &str = r#"<h1>Register</h1>
<form method="post" action="/register">
  <label>Username <input name="username"></label>
  <label>Email <input name="email" type="email"></label>
  <label>Password <input name="password" type="password"></label>
  <label>Confirm password <input name="confirm_password" type="password"></label>
  <button type="submit">Register</button>
</form>"#;

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// GET /register
pub async fn register_form(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let user = session::current_user(&headers, &state.secret_key);
    layout("Register", user.as_ref(), REGISTER_FORM)
}

/// POST /register
pub async fn register_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Result<Html<String>, ApiError> {
    let user = session::current_user(&headers, &state.secret_key);

    if form.username.is_empty()
        || form.email.is_empty()
        || form.password.is_empty()
        || form.confirm_password.is_empty()
    {
        let body = format!("{}{}", flash("please fill in every field"), REGISTER_FORM);
        return Ok(layout("Register", user.as_ref(), &body));
    }
    if form.password != form.confirm_password {
        let body = format!("{}{}", flash("passwords do not match"), REGISTER_FORM);
        return Ok(layout("Register", user.as_ref(), &body));
    }

    let auth = state.auth.clone();
    let result =
        run_blocking(move || auth.create_user(&form.username, &form.email, &form.password)).await;

    let body = match result {
        Ok(created) => {
            info!("Registered user {} via form", created.username);
            flash("registration successful, please log in")
        }
        // Business failures re-render the form with the message
        Err(ApiError::Validation(msg)) | Err(ApiError::Conflict(msg)) => {
            format!("{}{}", flash(&msg), REGISTER_FORM)
        }
        Err(other) => return Err(other),
    };
    Ok(layout("Register", user.as_ref(), &body))
}

// ── Login / logout ──────────────────────────────────────────────────────

const LOGIN_FORM: &str = r#"<h1>Log in</h1>
<form method="post" action="/login">
  <label>Username <input name="username"></label>
  <label>Password <input name="password" type="password"></label>
  <button type="submit">Log in</button>
</form>"#;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET /login
pub async fn login_form(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let user = session::current_user(&headers, &state.secret_key);
    layout("Log in", user.as_ref(), LOGIN_FORM)
}

/// POST /login — sets the signed session cookie and redirects home.
pub async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<axum::response::Response, ApiError> {
    if form.username.is_empty() || form.password.is_empty() {
        let body = format!("{}{}", flash("please enter username and password"), LOGIN_FORM);
        return Ok(layout("Log in", None, &body).into_response());
    }

    let auth = state.auth.clone();
    let result = run_blocking(move || auth.authenticate(&form.username, &form.password)).await;

    match result {
        Ok(user) => {
            let token = session::issue_token(&state.secret_key, &user.id, &user.username);
            info!("User {} logged in via form", user.username);
            Ok((
                AppendHeaders([(header::SET_COOKIE, session::login_cookie(&token))]),
                Redirect::to("/"),
            )
                .into_response())
        }
        Err(ApiError::Unauthorized) => {
            let body = format!("{}{}", flash("invalid username or password"), LOGIN_FORM);
            Ok(layout("Log in", None, &body).into_response())
        }
        Err(other) => Err(other),
    }
}

/// GET /logout
pub async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, session::logout_cookie())]),
        Redirect::to("/"),
    )
}

// ── Contact board ───────────────────────────────────────────────────────

const CONTACT_FORM: &str = r#"<h1>Contact</h1>
<form method="post" action="/contact">
  <label>Name <input name="name"></label>
  <label>Email <input name="email" type="email"></label>
  <label>Message <textarea name="message"></textarea></label>
  <button type="submit">Send</button>
</form>"#;

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// GET /contact
pub async fn contact_form(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let user = session::current_user(&headers, &state.secret_key);
    layout("Contact", user.as_ref(), CONTACT_FORM)
}

/// POST /contact — a logged-in sender owns the message; anonymous
/// submissions are allowed.
pub async fn contact_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ContactForm>,
) -> Result<Html<String>, ApiError> {
    let user = session::current_user(&headers, &state.secret_key);
    let owner_id = user.as_ref().map(|u| u.id.clone());

    let contacts = state.contacts.clone();
    let name = form.name.clone();
    let result = run_blocking(move || {
        contacts.create_message(&form.name, &form.email, &form.message, owner_id.as_deref())
    })
    .await;

    let body = match result {
        Ok(_) => flash(&format!(
            "Thanks {}! Your message has been saved.",
            name
        )),
        Err(ApiError::Validation(msg)) => format!("{}{}", flash(&msg), CONTACT_FORM),
        Err(other) => return Err(other),
    };
    Ok(layout("Contact", user.as_ref(), &body))
}

/// GET /messages
pub async fn messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    let user = session::current_user(&headers, &state.secret_key);

    let contacts = state.contacts.clone();
    let all = run_blocking(move || contacts.list_all()).await?;

    let mut rows = String::new();
    for m in &all {
        rows.push_str(&format!(
            "<li><strong>{}</strong> &lt;{}&gt;: {} <small>{}</small></li>",
            escape(&m.name),
            escape(&m.email),
            escape(&m.message),
            escape(&m.created_at)
        ));
    }
    let body = format!("<h1>Messages</h1><ul>{}</ul>", rows);
    Ok(layout("Messages", user.as_ref(), &body))
}
