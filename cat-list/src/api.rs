//! HTTP implementation of [`CatFetcher`] for TheCatAPI.

use crate::config::CatApiConfig;
use catalog_core::model::Cat;
use catalog_core::ports::{CatFetcher, NetworkError, PortFuture};
use futures::FutureExt;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::Instrument;

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-api-key";

/// TheCatAPI client
///
/// Requests `GET {base_url}/images/search` in ascending order, restricted to
/// images that have breed metadata. Every decoded cat gets a fresh surrogate
/// identity, even when its external id was seen before.
#[derive(Clone, Debug)]
pub struct CatApiClient {
    client: Client,
    search_url: Url,
    api_key: Option<String>,
}

impl CatApiClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidRequest`] if the base URL does not
    /// parse, or [`NetworkError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &CatApiConfig) -> Result<Self, NetworkError> {
        let search_url = Url::parse(&format!(
            "{}/images/search",
            config.base_url.trim_end_matches('/')
        ))
        .map_err(|e| NetworkError::InvalidRequest(format!("{}: {e}", config.base_url)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            search_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Endpoint pages are requested from
    #[must_use]
    pub const fn search_url(&self) -> &Url {
        &self.search_url
    }

    /// Fetch and decode one page
    ///
    /// # Errors
    ///
    /// See [`CatFetcher::fetch_page`].
    pub async fn search(&self, page: u32, limit: u32) -> Result<Vec<Cat>, NetworkError> {
        if page == 0 || limit == 0 {
            return Err(NetworkError::InvalidRequest(format!(
                "page and limit must be positive (page={page}, limit={limit})"
            )));
        }

        let mut request = self.client.get(self.search_url.clone()).query(&[
            ("limit", limit.to_string()),
            ("page", page.to_string()),
            ("order", "ASC".to_string()),
            ("has_breeds", "1".to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %body, "Cat API returned an error status");
            return Err(NetworkError::Transport(format!("HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        let cats: Vec<Cat> =
            serde_json::from_slice(&body).map_err(|e| NetworkError::Decode(e.to_string()))?;

        tracing::debug!(count = cats.len(), "Page decoded");
        Ok(cats)
    }
}

impl CatFetcher for CatApiClient {
    fn fetch_page(&self, page: u32, limit: u32) -> PortFuture<'_, Result<Vec<Cat>, NetworkError>> {
        let span = tracing::info_span!("fetch_page", page, limit);
        self.search(page, limit).instrument(span).boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_joins_base() {
        let client = CatApiClient::new(&CatApiConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..CatApiConfig::default()
        })
        .unwrap();

        assert_eq!(
            client.search_url().as_str(),
            "http://localhost:8080/v1/images/search"
        );
    }

    #[test]
    fn test_unparseable_base_url() {
        let err = CatApiClient::new(&CatApiConfig {
            base_url: "not a url".to_string(),
            ..CatApiConfig::default()
        })
        .unwrap_err();

        assert!(matches!(err, NetworkError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_zero_page_is_rejected_before_sending() {
        let client = CatApiClient::new(&CatApiConfig::default()).unwrap();

        let err = client.fetch_page(0, 20).await.unwrap_err();
        assert!(matches!(err, NetworkError::InvalidRequest(_)));

        let err = client.fetch_page(1, 0).await.unwrap_err();
        assert!(matches!(err, NetworkError::InvalidRequest(_)));
    }
}
