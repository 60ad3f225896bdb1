//! Prev/next pager for paginated listings.

use aiq_core::Pagination;

/// Pager state for templates.
///
/// Links are `None` at the bounds, rendering as disabled buttons.
#[derive(Debug, Clone)]
pub struct PagerView {
    pub page: u32,
    pub pages: u32,
    pub total: u64,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

impl PagerView {
    /// Build a pager, producing links with `href_for(page)`.
    pub fn new(pagination: &Pagination, href_for: impl Fn(u32) -> String) -> Self {
        Self {
            page: pagination.page,
            pages: pagination.pages.max(1),
            total: pagination.total,
            prev_href: pagination
                .has_prev()
                .then(|| href_for(pagination.page.saturating_sub(1))),
            next_href: pagination
                .has_next()
                .then(|| href_for(pagination.page.saturating_add(1))),
        }
    }
}
