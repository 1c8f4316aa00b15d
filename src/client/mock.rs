//! In-memory scheduler used by the collector tests.

use super::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MockSingularity {
    pub requests: Vec<RequestParent>,
    pub active: HashMap<String, Vec<TaskIdHistory>>,
    pub recent: HashMap<String, Vec<TaskIdHistory>>,
    pub histories: HashMap<String, TaskHistory>,
    /// Number of leading `get_task_history` calls that fail, per task id
    pub failures: Mutex<HashMap<String, usize>>,
    /// Number of `get_task_history` calls made, per task id
    pub fetches: Mutex<HashMap<String, usize>>,
    /// Requests whose active and recent listings always fail
    pub failing_listings: HashSet<String>,
    /// Every `list_requests` call fails while set
    pub requests_unavailable: bool,
    pub request_listings: AtomicUsize,
}

pub fn task_id(request_id: &str, deploy_id: &str, id: &str) -> TaskId {
    TaskId {
        request_id: request_id.to_string(),
        deploy_id: deploy_id.to_string(),
        id: id.to_string(),
    }
}

pub fn request(id: &str, state: &str) -> RequestParent {
    RequestParent {
        request: Some(Request {
            id: id.to_string(),
            instances: Some(1),
            request_type: Some("SERVICE".to_string()),
        }),
        state: Some(state.to_string()),
        ..RequestParent::default()
    }
}

pub fn listing(id: &TaskId) -> TaskIdHistory {
    TaskIdHistory {
        task_id: id.clone(),
    }
}

pub fn history(id: &TaskId, env: &[(&str, &str)], updates: &[(i64, TaskState)]) -> TaskHistory {
    TaskHistory {
        task: Some(Task {
            task_id: id.clone(),
            mesos_task: Some(MesosTask {
                command: Some(Command {
                    environment: Some(Environment {
                        variables: env.iter().map(|(n, v)| EnvVar::new(n, v)).collect(),
                    }),
                }),
                container: None,
            }),
        }),
        task_updates: updates
            .iter()
            .map(|(timestamp, task_state)| TaskHistoryUpdate {
                timestamp: *timestamp,
                task_state: *task_state,
            })
            .collect(),
    }
}

impl MockSingularity {
    /// Registers a request with one active task running `TASK_RUNNING`
    pub fn with_running_task(mut self, request_id: &str, task: &str) -> Self {
        let id = task_id(request_id, "d1", task);
        self.requests.push(request(request_id, "ACTIVE"));
        self.active
            .entry(request_id.to_string())
            .or_default()
            .push(listing(&id));
        self.histories.insert(
            task.to_string(),
            history(&id, &[("TASK_HOST", "host")], &[(1, TaskState::TaskRunning)]),
        );
        self
    }

    pub fn fail_first(&self, task_id: &str, times: usize) {
        self.failures
            .lock()
            .unwrap()
            .insert(task_id.to_string(), times);
    }

    pub fn fetch_count(&self, task_id: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl SingularityClient for MockSingularity {
    fn base_url(&self) -> &str {
        "http://mock-singularity"
    }

    async fn list_requests(&self) -> Result<Vec<RequestParent>, ClientError> {
        self.request_listings.fetch_add(1, Ordering::SeqCst);
        if self.requests_unavailable {
            return Err(ClientError::api_error(503, "unavailable"));
        }
        Ok(self.requests.clone())
    }

    async fn get_request(&self, request_id: &str) -> Result<RequestParent, ClientError> {
        self.requests
            .iter()
            .find(|r| r.request.as_ref().map(|x| x.id.as_str()) == Some(request_id))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(request_id.to_string()))
    }

    async fn list_active_task_history(
        &self,
        request_id: &str,
    ) -> Result<Vec<TaskIdHistory>, ClientError> {
        if self.failing_listings.contains(request_id) {
            return Err(ClientError::api_error(500, "listing failed"));
        }
        Ok(self.active.get(request_id).cloned().unwrap_or_default())
    }

    async fn list_recent_task_history(
        &self,
        request_id: &str,
        count: u32,
        _page: u32,
    ) -> Result<Vec<TaskIdHistory>, ClientError> {
        if self.failing_listings.contains(request_id) {
            return Err(ClientError::api_error(500, "listing failed"));
        }
        let mut tasks = self.recent.get(request_id).cloned().unwrap_or_default();
        tasks.truncate(count as usize);
        Ok(tasks)
    }

    async fn get_task_history(&self, task_id: &str) -> Result<TaskHistory, ClientError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default() += 1;

        if let Some(remaining) = self.failures.lock().unwrap().get_mut(task_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ClientError::api_error(503, "unavailable"));
            }
        }

        self.histories
            .get(task_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(task_id.to_string()))
    }
}
