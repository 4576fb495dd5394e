/// Database row types — these map directly to SQLite rows.
/// Distinct from forked-types API models to keep the DB layer independent.

pub struct UserRow {
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

/// Profile fields imported from the OAuth provider on login.
pub struct GithubProfile<'a> {
    pub github_id: &'a str,
    pub username: &'a str,
    pub display_name: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
    pub profile_url: Option<&'a str>,
    pub email: Option<&'a str>,
}

/// Partial profile edit; only `Some` fields are written.
#[derive(Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
}

/// Post joined with its author's summary columns.
pub struct PostRow {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub parent_id: Option<String>,
    pub seed_id: Option<String>,
    pub kind: String,
    pub image: Option<String>,
    pub replies: i64,
    pub forks: i64,
    pub likes: i64,
    pub bookmarks: i64,
    pub created_at: String,
    pub updated_at: String,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
}

pub struct FollowRow {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: String,
}

/// One side of a follow edge joined with that user's profile columns.
pub struct FollowUserRow {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub followed_at: String,
}

/// A like joined with the liked post (and the post's author).
pub struct LikedPostRow {
    pub like_id: String,
    pub liked_at: String,
    pub post: PostRow,
}

/// A like joined with the liking user's summary columns.
pub struct LikerRow {
    pub like_id: String,
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub liked_at: String,
}

/// Notification joined with sender summary and post content preview.
pub struct NotificationRow {
    pub id: String,
    pub recipient_id: String,
    pub sender_id: String,
    pub kind: String,
    pub post_id: Option<String>,
    pub read: bool,
    pub created_at: String,
    pub sender_username: String,
    pub sender_display_name: Option<String>,
    pub sender_avatar_url: Option<String>,
    pub post_content: Option<String>,
}
