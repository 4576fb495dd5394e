use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{NotificationKind, PostStats};

// -- JWT Claims --

/// JWT claims issued at the OAuth callback and validated by the REST
/// middleware. Canonical definition lives here in forked-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Pagination --

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

// -- Users --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub github_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub banner_url: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Author info embedded in posts, likes, and notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
}

// -- Auth --

#[derive(Debug, Serialize)]
pub struct AuthUserResponse {
    pub user: UserResponse,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePostRequest {
    pub content: String,
    /// Parent reference for a reply.
    pub parent_id: Option<String>,
    /// Parent reference for a fork. Takes precedence over `parent_id`.
    pub forked_from: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub content: String,
    pub author: AuthorSummary,
    pub parent_id: Option<String>,
    pub seed_id: Option<String>,
    pub kind: String,
    pub image: Option<String>,
    pub stats: PostStats,
    pub created_at: String,
    pub updated_at: String,
}

/// A post with its surrounding thread context: the parent (if any) and the
/// direct children ("branches").
#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub parent: Option<PostResponse>,
    pub branches: Vec<PostResponse>,
}

// -- Likes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LikeRequest {
    /// "like" or "unlike"; anything else is a validation error.
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct LikeCountResponse {
    pub likes: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedPostEntry {
    pub id: String,
    pub created_at: String,
    pub post: PostResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostLikerEntry {
    pub id: String,
    pub user: AuthorSummary,
    pub created_at: String,
}

// -- Follows --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub id: String,
    pub follower: String,
    pub following: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct FollowedResponse {
    pub message: String,
    pub follow: FollowResponse,
}

/// One user in a followers/following listing, with the caller's own follow
/// status when authenticated.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUserEntry {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub is_following: bool,
    pub followed_at: String,
}

#[derive(Debug, Serialize)]
pub struct FollowersResponse {
    pub followers: Vec<FollowUserEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct FollowingResponse {
    pub following: Vec<FollowUserEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowCheckResponse {
    pub is_following: bool,
}

// -- Notifications --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub sender: AuthorSummary,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub post_id: Option<String>,
    pub post_content: Option<String>,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsPage {
    pub notifications: Vec<NotificationResponse>,
    pub unread_count: i64,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

// -- Generic acks --

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
