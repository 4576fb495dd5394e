use serde::{Deserialize, Serialize};

/// How a post relates to its parent. Roots have no parent; replies and
/// forks both point at one, but bump different counters on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Root,
    Reply,
    Fork,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Root => "root",
            PostKind::Reply => "reply",
            PostKind::Fork => "fork",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "root" => Some(PostKind::Root),
            "reply" => Some(PostKind::Reply),
            "fork" => Some(PostKind::Fork),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Reply,
    Fork,
    Like,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Reply => "reply",
            NotificationKind::Fork => "fork",
            NotificationKind::Like => "like",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "follow" => Some(NotificationKind::Follow),
            "reply" => Some(NotificationKind::Reply),
            "fork" => Some(NotificationKind::Fork),
            "like" => Some(NotificationKind::Like),
            _ => None,
        }
    }
}

/// Denormalized per-post counters. `bookmarks` is carried in the schema but
/// nothing increments it yet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PostStats {
    pub replies: i64,
    pub forks: i64,
    pub likes: i64,
    pub bookmarks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [PostKind::Root, PostKind::Reply, PostKind::Fork] {
            assert_eq!(PostKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(PostKind::parse("banana"), None);
    }

    #[test]
    fn notification_kind_round_trips_through_str() {
        for kind in [
            NotificationKind::Follow,
            NotificationKind::Reply,
            NotificationKind::Fork,
            NotificationKind::Like,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationKind::parse(""), None);
    }
}
