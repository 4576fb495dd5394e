pub mod auth;
pub mod error;
pub mod follows;
pub mod likes;
pub mod middleware;
pub mod notifications;
pub mod posts;
pub mod users;

use forked_types::api::Pagination;

pub(crate) fn page_meta(page: u32, limit: u32, total: u64) -> Pagination {
    Pagination {
        page,
        limit,
        total,
        pages: total.div_ceil(limit.max(1) as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::page_meta;

    #[test]
    fn pages_round_up() {
        assert_eq!(page_meta(1, 20, 0).pages, 0);
        assert_eq!(page_meta(1, 20, 20).pages, 1);
        assert_eq!(page_meta(1, 20, 21).pages, 2);
    }
}
