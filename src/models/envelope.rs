use serde::{Deserialize, Serialize};

/// Response envelope shared by every backend endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub meta: Option<PaginationMeta>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Page metadata reported by the backend.
///
/// Trusted verbatim: `total_pages` is authoritative, a short page does not
/// imply the last page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub count: u64,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    /// Whether the metadata satisfies the paging invariants
    pub fn is_consistent(&self) -> bool {
        if self.page_size == 0 {
            return false;
        }
        let expected_pages = self.total.div_ceil(self.page_size);
        self.total_pages == expected_pages
            && self.count <= self.page_size
            && self.page >= 1
            && self.page <= expected_pages.max(1)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}
