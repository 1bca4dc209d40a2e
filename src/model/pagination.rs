use serde::{Deserialize, Serialize};

/// Pagination metadata attached to every list response. Read-only on the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    #[serde(default)]
    pub total_items: Option<u64>,
    #[serde(default)]
    pub items_per_page: Option<u64>,
    #[serde(default)]
    pub current_page: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u64>,
    #[serde(default)]
    pub has_prev_page: Option<bool>,
    #[serde(default)]
    pub has_next_page: Option<bool>,
    #[serde(default)]
    pub prev_page: Option<u64>,
    #[serde(default)]
    pub next_page: Option<u64>,
}

/// `data` payload of a paginated endpoint: the items plus flattened pagination fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(flatten)]
    pub info: PaginationInfo,
}

/// Response envelope shared by every endpoint of the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}
