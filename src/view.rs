use crate::model::Article;

/// One page of the filtered list, as the UI renders it.
#[derive(Debug, PartialEq)]
pub struct PageView<'a> {
    pub items: Vec<&'a Article>,
    /// 1-based, already clamped.
    pub page: usize,
    pub total_pages: usize,
    pub matched: usize,
}

impl PageView<'_> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Filters by case-insensitive title substring, then slices out `page`.
///
/// `page` is clamped to `1..=max(total_pages, 1)`, so a page left empty by a
/// delete falls back to the last one that still has entries. With no matches
/// the result is page 1 of 0.
pub fn derive<'a>(list: &'a [Article], query: &str, page: usize, page_size: usize) -> PageView<'a> {
    let page_size = page_size.max(1);
    let q = query.to_lowercase();
    let filtered: Vec<&Article> = list
        .iter()
        .filter(|a| q.is_empty() || a.title.to_lowercase().contains(&q))
        .collect();

    let matched = filtered.len();
    let total_pages = matched.div_ceil(page_size);
    let page = page.clamp(1, total_pages.max(1));
    let items = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    PageView { items, page, total_pages, matched }
}
