//! JSON-over-HTTP client for a remote search service

use super::traits::{LogSearch, SearchRequest, SearchResponse};
use crate::config::SearchConfig;
use crate::error::{Error, Result, SearchError};
use async_trait::async_trait;
use url::Url;

/// Longest upstream error body kept in a [`SearchError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Log search backed by an HTTP endpoint
///
/// Each search is a `POST {endpoint}` with the [`SearchRequest`] as JSON body;
/// the response body must decode as a [`SearchResponse`].
#[derive(Clone, Debug)]
pub struct HttpLogSearch {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpLogSearch {
    /// Build a client from configuration
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build search client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Endpoint searches are sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl LogSearch for HttpLogSearch {
    async fn search(
        &self,
        request: &SearchRequest,
    ) -> std::result::Result<SearchResponse, SearchError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let page = response.json::<SearchResponse>().await?;
        tracing::trace!(
            endpoint = %self.endpoint,
            entries = page.entries.len(),
            from = page.from,
            to = page.to,
            "search page received"
        );
        Ok(page)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
