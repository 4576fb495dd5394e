use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::Redirect,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use forked_db::Database;
use forked_db::models::GithubProfile;
use forked_types::api::{AuthUserResponse, Claims, MessageResponse};

use crate::error::ApiError;
use crate::users::user_response;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub github: GitHubConfig,
    pub frontend_url: String,
    pub http: reqwest::Client,
}

/// GitHub OAuth app credentials and the registered callback URL.
#[derive(Clone)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";

/// Redirect to GitHub's authorization URL.
/// GET /auth/github
pub async fn github_login(State(state): State<AppState>) -> Redirect {
    let state_token = hex::encode(rand::rng().random::<[u8; 16]>());
    let url = format!(
        "{}?client_id={}&redirect_uri={}&scope={}&state={}",
        GITHUB_AUTHORIZE_URL,
        urlencoded(&state.github.client_id),
        urlencoded(&state.github.callback_url),
        urlencoded("user:email"),
        state_token,
    );
    Redirect::temporary(&url)
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: String,
    #[allow(dead_code)]
    #[serde(default)]
    state: String,
}

/// OAuth callback — exchange the code, find-or-create the user, hand the
/// frontend a bearer JWT in the redirect query string.
/// GET /auth/github/callback?code=...&state=...
pub async fn github_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    let profile = match fetch_github_user(&state, &params.code).await {
        Ok(profile) => profile,
        Err(err) => {
            warn!("GitHub OAuth failed: {:#}", err);
            return Ok(Redirect::temporary(&format!(
                "{}/login?error=auth_failed",
                state.frontend_url
            )));
        }
    };

    let github_id = profile.id.to_string();
    let user = state.db.upsert_github_user(
        &Uuid::new_v4().to_string(),
        &GithubProfile {
            github_id: &github_id,
            username: &profile.login,
            display_name: profile.name.as_deref().or(Some(profile.login.as_str())),
            avatar_url: profile.avatar_url.as_deref(),
            profile_url: profile.html_url.as_deref(),
            email: profile.email.as_deref(),
        },
    )?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|_| ApiError::Internal("Internal server error".into()))?;
    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Redirect::temporary(&format!(
        "{}?auth_token={}",
        state.frontend_url, token
    )))
}

/// GET /auth/user
pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AuthUserResponse>, ApiError> {
    let user = state
        .db
        .get_user(&claims.sub.to_string())?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(AuthUserResponse {
        user: user_response(user),
    }))
}

/// GET /auth/logout — bearer tokens are discarded client-side; nothing is
/// stored server-side to revoke.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse::new("Logged out"))
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
    html_url: Option<String>,
    email: Option<String>,
}

/// Exchange an authorization code for an access token, then fetch the
/// user's GitHub profile with it.
async fn fetch_github_user(state: &AppStateInner, code: &str) -> anyhow::Result<GitHubUser> {
    let token_resp = state
        .http
        .post(GITHUB_TOKEN_URL)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&[
            ("client_id", state.github.client_id.as_str()),
            ("client_secret", state.github.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", state.github.callback_url.as_str()),
        ])
        .send()
        .await?;

    if !token_resp.status().is_success() {
        anyhow::bail!("token exchange returned {}", token_resp.status());
    }

    let token_json: serde_json::Value = token_resp.json().await?;
    let access_token = token_json["access_token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("missing access_token in response"))?;

    let user_resp = state
        .http
        .get(GITHUB_USER_URL)
        .bearer_auth(access_token)
        // GitHub rejects requests without a User-Agent.
        .header(reqwest::header::USER_AGENT, "forked")
        .send()
        .await?;

    if !user_resp.status().is_success() {
        anyhow::bail!("user fetch returned {}", user_resp.status());
    }

    Ok(user_resp.json().await?)
}

pub(crate) fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(7)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn urlencoded(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => result.push(ch),
            _ => {
                let mut buf = [0u8; 4];
                let encoded = ch.encode_utf8(&mut buf);
                for byte in encoded.bytes() {
                    result.push('%');
                    result.push_str(&format!("{:02X}", byte));
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencoded_escapes_reserved_characters() {
        assert_eq!(urlencoded("abc-123_~."), "abc-123_~.");
        assert_eq!(
            urlencoded("http://localhost:3000/auth/github/callback"),
            "http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fgithub%2Fcallback"
        );
        assert_eq!(urlencoded("user:email"), "user%3Aemail");
    }
}
