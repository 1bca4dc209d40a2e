use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::model::conversation::Conversation;
use crate::model::message::Message;
use crate::model::pagination::{ApiEnvelope, Page};

use super::error::ApiError;

/// Server-side ordering requested for message history.
const MESSAGE_SORT: &str = "updatedAt,DESC";

/// Bearer-authenticated client for the remote REST API.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::Url(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Url(base_url.to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            token: token.into(),
        })
    }

    /// `GET /message/conversation/{id}?page=&pageSize=&sort=updatedAt,DESC`
    pub async fn conversation_messages(
        &self,
        conversation_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Message>, ApiError> {
        let url = self.endpoint(&["message", "conversation", conversation_id])?;
        self.get_page(
            url,
            &[
                ("page", page.to_string()),
                ("pageSize", page_size.to_string()),
                ("sort", MESSAGE_SORT.to_string()),
            ],
        )
        .await
    }

    /// `GET /conversation?page=&pageSize=`
    pub async fn conversations(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Conversation>, ApiError> {
        let url = self.endpoint(&["conversation"])?;
        self.get_page(
            url,
            &[("page", page.to_string()), ("pageSize", page_size.to_string())],
        )
        .await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Page<T>, ApiError> {
        debug!(url = url.as_str(), "api request");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "api request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiEnvelope<Page<T>> = response.json().await?;
        if !envelope.success {
            return Err(ApiError::Rejected {
                status: envelope.status,
                message: envelope.message.unwrap_or_default(),
            });
        }
        envelope.data.ok_or(ApiError::MissingData)
    }
}
