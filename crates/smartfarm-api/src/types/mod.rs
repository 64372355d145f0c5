// Wire types for the SmartFarm REST API.
//
// Resource payloads are camelCase JSON. Every entity keeps unknown
// fields in a flattened `extra` map so nothing the backend adds is lost.

mod auth;
mod crop;
mod dashboard;
mod farmer;
mod market;
mod recommendation;
mod report;
mod supplier;

use serde::{Deserialize, Serialize};

pub use auth::*;
pub use crop::*;
pub use dashboard::*;
pub use farmer::*;
pub use market::*;
pub use recommendation::*;
pub use report::*;
pub use supplier::*;

/// Extra fields captured from a payload.
pub type Extra = serde_json::Map<String, serde_json::Value>;

// ── Pagination ───────────────────────────────────────────────────────

/// Paginated list envelope: `{data, total, page, limit, totalPages}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Common list query: pagination, free-text search, status filter and
/// sort. Domain-specific filters go in `filters` and are flattened into
/// the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(flatten)]
    pub filters: std::collections::BTreeMap<String, String>,
}

impl ListParams {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

/// `{status, count}` bucket used by several stats endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

/// `{type, count}` bucket used by several stats endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn list_params_skip_unset_fields() {
        let params = ListParams::page(2, 25)
            .with_search("maize")
            .with_filter("farmerId", "f-1");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"page": 2, "limit": 25, "search": "maize", "farmerId": "f-1"})
        );
    }

    #[test]
    fn page_envelope_deserializes() {
        let page: Page<serde_json::Value> = serde_json::from_value(serde_json::json!({
            "data": [{"id": "1"}], "total": 11, "page": 1, "limit": 10, "totalPages": 2
        }))
        .unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(page.has_next());
    }
}
