use super::{ClientError, RequestParent, SingularityClient, TaskHistory, TaskIdHistory};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// `SingularityClient` backed by the scheduler's HTTP API
#[derive(Debug, Clone)]
pub struct HttpSingularity {
    client: Client,
    base_url: String,
    api_root: Url,
}

impl HttpSingularity {
    /// Creates a client for the scheduler at `base_url`
    ///
    /// # Arguments
    /// * `base_url` - Root URL of the Singularity service (e.g. "http://singularity:7099/singularity")
    /// * `timeout` - Timeout applied to every HTTP request
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let trimmed = base_url.trim_end_matches('/');
        let api_root = Url::parse(&format!("{}/api/", trimmed))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(HttpSingularity {
            client,
            base_url: trimmed.to_string(),
            api_root,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.api_root.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(response.url().to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(status.as_u16(), text));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SingularityClient for HttpSingularity {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_requests(&self) -> Result<Vec<RequestParent>, ClientError> {
        self.get_json(self.endpoint("requests")?).await
    }

    async fn get_request(&self, request_id: &str) -> Result<RequestParent, ClientError> {
        let url = self.endpoint(&format!("requests/request/{}", request_id))?;
        self.get_json(url).await
    }

    async fn list_active_task_history(
        &self,
        request_id: &str,
    ) -> Result<Vec<TaskIdHistory>, ClientError> {
        let url = self.endpoint(&format!("history/request/{}/tasks/active", request_id))?;
        self.get_json(url).await
    }

    async fn list_recent_task_history(
        &self,
        request_id: &str,
        count: u32,
        page: u32,
    ) -> Result<Vec<TaskIdHistory>, ClientError> {
        let mut url = self.endpoint(&format!("history/request/{}/tasks", request_id))?;
        url.query_pairs_mut()
            .append_pair("count", &count.to_string())
            .append_pair("page", &page.to_string());
        self.get_json(url).await
    }

    async fn get_task_history(&self, task_id: &str) -> Result<TaskHistory, ClientError> {
        let url = self.endpoint(&format!("history/task/{}", task_id))?;
        self.get_json(url).await
    }
}
