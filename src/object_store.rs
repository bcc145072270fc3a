//! HTTP object-store client: token-authenticated PUT with stable public
//! URLs, the shape exposed by the bucket gateway the feed is served from.

use async_trait::async_trait;
use tracing::info;

use crate::contract::ObjectStore;
use crate::error::UploadError;

pub struct HttpObjectStore {
    http: reqwest::Client,
    endpoint: String,
    public_base: String,
    token: String,
}

impl HttpObjectStore {
    pub fn new(endpoint: String, public_base: String, token: String) -> Self {
        HttpObjectStore {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            public_base: public_base.trim_end_matches('/').to_owned(),
            token,
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, UploadError> {
        let url = format!("{}/{}", self.endpoint, key);
        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| UploadError {
                key: key.to_owned(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError {
                key: key.to_owned(),
                reason: format!("{status}: {body}"),
            });
        }
        info!(key, bytes = bytes.len(), content_type, "object uploaded");
        Ok(self.public_url(key))
    }
}
