// src/utils/pagination.rs

//! Pagination assembler.
//!
//! Pure slicing of an ordered result set into a page plus count metadata.
//! Malformed `page`/`limit` inputs are coerced to defaults rather than
//! rejected, matching the lenient contract of the request layer.
//!
//! Policy: `total_pages = ceil(total_count / limit)`, which is 0 for an
//! empty set. Out-of-range pages yield an empty slice, never an error.

/// Page number used when the caller's value is non-positive.
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when the caller's value is non-positive.
pub const DEFAULT_LIMIT: usize = 10;

/// One page of an ordered result set, plus count metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub total_pages: usize,
    pub current_page: usize,
    /// The coerced page size actually applied
    pub per_page: usize,
}

/// Coerce a possibly-malformed page/limit pair to valid values.
pub fn coerce(page: i64, limit: i64) -> (usize, usize) {
    let page = if page >= 1 {
        page as usize
    } else {
        DEFAULT_PAGE
    };
    let limit = if limit >= 1 {
        limit as usize
    } else {
        DEFAULT_LIMIT
    };
    (page, limit)
}

/// Slice an ordered set into the requested page.
pub fn paginate<T: Clone>(items: &[T], page: i64, limit: i64) -> PageSlice<T> {
    paginate_capped(items, page, limit, usize::MAX)
}

/// Slice an ordered set into the requested page, capping the reported
/// total count (and the sliceable view) at `cap`.
///
/// Capping the view as well as the count keeps the two consistent: a page
/// the metadata says does not exist is never served.
pub fn paginate_capped<T: Clone>(items: &[T], page: i64, limit: i64, cap: usize) -> PageSlice<T> {
    let (page, limit) = coerce(page, limit);

    let view = &items[..items.len().min(cap)];
    let total_count = view.len();
    let total_pages = total_count.div_ceil(limit);

    let offset = (page - 1).saturating_mul(limit);
    let slice = if offset >= view.len() {
        Vec::new()
    } else {
        view[offset..(offset + limit).min(view.len())].to_vec()
    };

    PageSlice {
        items: slice,
        total_count,
        total_pages,
        current_page: page,
        per_page: limit,
    }
}
