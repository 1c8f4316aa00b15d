mod error;
mod http;
#[cfg(test)]
pub mod mock;
mod models;

use async_trait::async_trait;
use std::fmt::Debug;

pub use error::*;
pub use http::*;
pub use models::*;

/// Capability the collector needs from a Singularity scheduler.
///
/// Every call may fail; callers treat failures as retryable.
#[async_trait]
pub trait SingularityClient: Debug + Send + Sync {
    /// Base URL identifying the scheduler, recorded in the cache
    fn base_url(&self) -> &str;

    async fn list_requests(&self) -> Result<Vec<RequestParent>, ClientError>;

    /// Fetches a single request including its active and pending deploys
    async fn get_request(&self, request_id: &str) -> Result<RequestParent, ClientError>;

    async fn list_active_task_history(
        &self,
        request_id: &str,
    ) -> Result<Vec<TaskIdHistory>, ClientError>;

    /// Lists the most recent tasks of a request, active or not
    async fn list_recent_task_history(
        &self,
        request_id: &str,
        count: u32,
        page: u32,
    ) -> Result<Vec<TaskIdHistory>, ClientError>;

    async fn get_task_history(&self, task_id: &str) -> Result<TaskHistory, ClientError>;
}
