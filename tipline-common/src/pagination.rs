//! Pagination utilities for list endpoints

/// Page size applied when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Upper bound on client-requested page sizes
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page after clamping
    pub page_size: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Calculate pagination metadata from total results and client request
///
/// Ensures page is within valid bounds [1, total_pages] and page size
/// within [1, MAX_PAGE_SIZE]. Out-of-range values are clamped rather than
/// rejected, so a stale bookmark never turns into an error.
///
/// # Examples
/// ```
/// use tipline_common::pagination::calculate_pagination;
///
/// // 50 total results at 20/page = 3 pages (20 + 20 + 10)
/// let p = calculate_pagination(50, 2, None);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 20);
///
/// // Requesting an out-of-bounds page gets clamped to the last page
/// let p = calculate_pagination(50, 99, None);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 40);
///
/// // Oversized page sizes get clamped to the maximum
/// let p = calculate_pagination(500, 1, Some(10_000));
/// assert_eq!(p.page_size, 100);
/// ```
pub fn calculate_pagination(
    total_results: i64,
    requested_page: i64,
    requested_page_size: Option<i64>,
) -> Pagination {
    let page_size = requested_page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let total_pages = (total_results + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        page_size,
        total_pages,
        offset,
    }
}
