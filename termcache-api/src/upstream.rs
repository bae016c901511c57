//! HTTP upstream term source.
//!
//! Requests `{upstream_url}?maximumRecords={page_size}&startRecord={offset}`
//! and decodes a JSON array of raw terms. Transport errors, non-success
//! statuses and undecodable bodies all surface as `UpstreamError::FetchFailed`.
//! There is no retry here; a failed page fails the load pass.

use std::time::Duration;

use async_trait::async_trait;
use termcache_core::{RawTerm, TermSource, UpstreamError};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

pub struct HttpTermSource {
    client: reqwest::Client,
    url: String,
    page_size: usize,
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
}

impl HttpTermSource {
    pub fn new(config: &ApiConfig, page_size: usize) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::internal_error(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.upstream_url.clone(),
            page_size,
            username: config.upstream_username.clone(),
            password: config.upstream_password.clone(),
            token: config.upstream_token.clone(),
        })
    }
}

#[async_trait]
impl TermSource for HttpTermSource {
    async fn fetch_page(&self, offset: usize) -> Result<Vec<RawTerm>, UpstreamError> {
        let failed = move |reason: String| UpstreamError::FetchFailed { offset, reason };

        let mut request = self.client.get(&self.url).query(&[
            ("maximumRecords", self.page_size),
            ("startRecord", offset),
        ]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        } else if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?
            .error_for_status()
            .map_err(|e| failed(e.to_string()))?;

        let terms: Vec<RawTerm> = response
            .json()
            .await
            .map_err(|e| failed(format!("invalid page body: {}", e)))?;

        tracing::debug!(offset, terms = terms.len(), "Upstream page received");
        Ok(terms)
    }
}
