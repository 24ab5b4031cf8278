use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

pub const ROLE_SPONSOR: &str = "SPONSOR";
pub const ROLE_GUEST: &str = "GUEST";
pub const ROLE_CREATOR: &str = "CREATOR";

// ============================================================================
// JWT Claims
// ============================================================================

/// Issued by the identity provider (or `/v1/auth/guest`). `sub` doubles as the
/// hold session id and the booking owner.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

fn decode_claims(headers: &HeaderMap, secret: &str) -> Result<Claims, StatusCode> {
    let token = bearer_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    Ok(token_data.claims)
}

// ============================================================================
// Sponsor Authentication Middleware
// ============================================================================

pub async fn sponsor_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = decode_claims(req.headers(), &state.auth.secret)?;

    if claims.role != ROLE_SPONSOR && claims.role != ROLE_GUEST {
        return Err(StatusCode::FORBIDDEN);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

// ============================================================================
// Creator Authentication Middleware
// ============================================================================

pub async fn creator_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = decode_claims(req.headers(), &state.auth.secret)?;

    if claims.role != ROLE_CREATOR {
        return Err(StatusCode::FORBIDDEN);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

// ============================================================================
// Scheduler Token
// ============================================================================

/// Static bearer token for the external cron. No token configured means the
/// internal endpoints do not exist.
pub async fn scheduler_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let expected = state.scheduler_token.as_deref().ok_or(StatusCode::NOT_FOUND)?;
    let presented = bearer_token(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"cron-token", b"cron-token"));
        assert!(!constant_time_eq(b"cron-token", b"cron-tokem"));
        assert!(!constant_time_eq(b"cron", b"cron-token"));
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert("authorization", "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert("authorization", "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn test_identity_provider_extra_claims_are_ignored() {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
        let external = serde_json::json!({
            "sub": "creator-1",
            "email": "creator@example.com",
            "role": ROLE_CREATOR,
            "exp": exp,
        });
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &external,
            &jsonwebtoken::EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("authorization", format!("Bearer {}", token).parse().unwrap());
        let claims = decode_claims(&headers, "secret").unwrap();
        assert_eq!(claims.sub, "creator-1");
        assert_eq!(claims.role, ROLE_CREATOR);
    }
}
