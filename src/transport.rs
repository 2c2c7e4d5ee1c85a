use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::{Result, SqleanError};
use crate::models::{GenerateRequest, GenerateResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate(&self, model: &str, req: &GenerateRequest) -> Result<GenerateResponse>;
}

/// Gemini `generateContent` over HTTPS. One request per call, no retries.
pub struct GeminiTransport {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiTransport {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn generate(&self, model: &str, req: &GenerateRequest) -> Result<GenerateResponse> {
        let url = self.endpoint(model);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SqleanError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
