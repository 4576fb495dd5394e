use axum::{
    extract::Request,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use forked_types::api::Claims;

use crate::error::ApiError;

pub fn jwt_secret() -> String {
    std::env::var("FORKED_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into())
}

pub(crate) fn decode_claims(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

fn bearer_claims(headers: &HeaderMap) -> Option<Claims> {
    let auth_header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_header.strip_prefix("Bearer ")?;
    decode_claims(token, &jwt_secret())
}

/// Extract and validate JWT from the Authorization header.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = bearer_claims(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Claims attached by [`optional_auth`]; routes that serve both anonymous
/// and authenticated callers read this and decide per handler.
#[derive(Debug, Clone)]
pub struct OptionalClaims(pub Option<Claims>);

impl OptionalClaims {
    pub fn require(&self) -> Result<&Claims, ApiError> {
        self.0
            .as_ref()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))
    }
}

/// Like [`require_auth`] but never rejects: a valid bearer token yields
/// `Some`, anything else `None`.
pub async fn optional_auth(mut req: Request, next: Next) -> Response {
    let claims = bearer_claims(req.headers());
    req.extensions_mut().insert(OptionalClaims(claims));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn garbage_token_yields_nothing() {
        assert!(decode_claims("not-a-jwt", "secret").is_none());
    }

    #[test]
    fn token_round_trips_with_matching_secret() {
        let user_id = Uuid::new_v4();
        let token = crate::auth::create_token("secret", user_id, "alice").unwrap();

        let claims = decode_claims(&token, "secret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");

        assert!(decode_claims(&token, "other-secret").is_none());
    }

    #[test]
    fn require_refuses_missing_claims() {
        let optional = OptionalClaims(None);
        assert!(optional.require().is_err());
    }
}
