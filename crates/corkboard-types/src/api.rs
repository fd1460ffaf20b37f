use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Response envelope --

/// Uniform JSON envelope returned by every `/api` endpoint. Success
/// responses omit `errors` entirely; error responses always carry the
/// key, `null` when there is no structured detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            errors: None,
        }
    }

    pub fn err(message: impl Into<String>, errors: Option<Value>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            errors: Some(errors.unwrap_or(Value::Null)),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub avatar: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Partial update — only present fields are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

// -- Contacts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    pub user_id: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_envelope_always_carries_errors_key() {
        let plain = serde_json::to_value(Envelope::err("bad input", None)).unwrap();
        assert_eq!(plain["errors"], Value::Null);
        assert!(plain.as_object().unwrap().contains_key("errors"));

        let detailed = serde_json::to_value(Envelope::err(
            "bad input",
            Some(json!({"email": "already registered"})),
        ))
        .unwrap();
        assert_eq!(detailed["errors"]["email"], "already registered");
    }

    #[test]
    fn success_envelope_omits_errors_key() {
        let ok = serde_json::to_value(Envelope::ok("done", Some(json!({"id": "u1"})))).unwrap();
        assert!(!ok.as_object().unwrap().contains_key("errors"));
        assert_eq!(ok["data"]["id"], "u1");
    }
}
