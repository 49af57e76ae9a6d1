// Pagination and the response envelope shared by the CLI and the HTTP API

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Offset/limit window. Only built when the caller asked for a limit;
/// no window means the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        PageRequest {
            page: page.max(1),
            limit: if limit == 0 { DEFAULT_PAGE_SIZE } else { limit },
        }
    }

    /// Lenient parsing of query-string values: unparsable page -> 1,
    /// unparsable or zero limit -> `default_limit`. No `limit` -> no paging.
    pub fn from_params(page: Option<&str>, limit: Option<&str>, default_limit: u32) -> Option<Self> {
        let limit = limit?;
        let page = page
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|l| *l > 0)
            .unwrap_or(default_limit.max(1));

        Some(PageRequest { page, limit })
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    pub fn total_pages(&self, total_count: i64) -> i64 {
        let limit = self.limit as i64;
        (total_count + limit - 1) / limit
    }
}

/// `{message, total_count, total_pages?, current_page?, page_size?, data}`
#[derive(Debug, Clone, Serialize)]
pub struct ListEnvelope<T> {
    pub message: String,
    pub total_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    pub data: Vec<T>,
}

impl<T> ListEnvelope<T> {
    pub fn new(message: impl Into<String>, data: Vec<T>, total_count: i64, page: Option<PageRequest>) -> Self {
        ListEnvelope {
            message: message.into(),
            total_count,
            total_pages: page.map(|p| p.total_pages(total_count)),
            current_page: page.map(|p| p.page),
            page_size: page.map(|p| p.limit),
            data,
        }
    }
}
