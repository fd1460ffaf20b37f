use axum::http::{HeaderMap, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";

/// Identity carried by a signed session token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
}

/// Issue a signed token: `base64(id:username).hex(hmac-sha256(payload))`.
/// This is a placeholder credential, not a hardened session scheme.
pub fn issue_token(secret: &str, user_id: &str, username: &str) -> String {
    let payload = format!("{}:{}", user_id, username);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    let sig = mac.finalize().into_bytes();
    format!("{}.{}", B64.encode(payload.as_bytes()), hex::encode(sig))
}

/// Verify a token and recover the identity it names. Any malformed or
/// tampered token yields None.
pub fn verify_token(secret: &str, token: &str) -> Option<SessionUser> {
    let (payload_b64, sig_hex) = token.split_once('.')?;
    let payload = B64.decode(payload_b64).ok()?;
    let sig = hex::decode(sig_hex).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(&payload);
    mac.verify_slice(&sig).ok()?;

    let payload = String::from_utf8(payload).ok()?;
    // User ids are UUIDs, so the first ':' always ends the id.
    let (id, username) = payload.split_once(':')?;
    Some(SessionUser {
        id: id.to_string(),
        username: username.to_string(),
    })
}

/// Resolve the logged-in user from the request's Cookie header, if any.
pub fn current_user(headers: &HeaderMap, secret: &str) -> Option<SessionUser> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=')
            && name == SESSION_COOKIE
        {
            return verify_token(secret, value);
        }
    }
    None
}

pub fn login_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, token)
}

pub fn logout_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token = issue_token("secret", "abc-123", "alice");
        let user = verify_token("secret", &token).unwrap();
        assert_eq!(user.id, "abc-123");
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = issue_token("secret", "abc-123", "alice");
        let mut forged = token.clone();
        forged.replace_range(..4, "AAAA");
        assert!(verify_token("secret", &forged).is_none());
        assert!(verify_token("other-secret", &token).is_none());
        assert!(verify_token("secret", "not-a-token").is_none());
    }

    #[test]
    fn cookie_header_parsing() {
        let token = issue_token("secret", "u1", "alice");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("theme=dark; session={}", token).parse().unwrap(),
        );
        let user = current_user(&headers, "secret").unwrap();
        assert_eq!(user.username, "alice");

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, "theme=dark".parse().unwrap());
        assert!(current_user(&empty, "secret").is_none());
    }
}
