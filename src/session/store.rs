// src/session/store.rs

use async_trait::async_trait;

use crate::models::exam_record::{ExamResult, SaveResultResponse};
use crate::session::error::StoreError;

/// Durable sink for exam results. Returns the user's updated streak.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save_exam_result(&self, result: &ExamResult) -> Result<SaveResultResponse, StoreError>;
}

/// Result store backed by the `POST /api/exam/save-result` endpoint.
#[derive(Debug, Clone)]
pub struct HttpResultStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpResultStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl ResultStore for HttpResultStore {
    async fn save_exam_result(&self, result: &ExamResult) -> Result<SaveResultResponse, StoreError> {
        let response = self
            .client
            .post(format!("{}/api/exam/save-result", self.base_url))
            .bearer_auth(&self.token)
            .json(result)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::HttpStatus(status));
        }

        Ok(response.json::<SaveResultResponse>().await?)
    }
}
