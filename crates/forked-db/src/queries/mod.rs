pub mod follows;
pub mod likes;
pub mod notifications;
pub mod posts;
pub mod users;
