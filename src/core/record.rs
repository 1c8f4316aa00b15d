use crate::client::{EnvVar, RequestParent, TaskId, TaskState};

/// Identity of a task as reported by the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskIdentifier {
    pub request_id: String,
    pub deploy_id: String,
    pub task_id: String,
}

impl From<TaskId> for TaskIdentifier {
    fn from(id: TaskId) -> Self {
        TaskIdentifier {
            request_id: id.request_id,
            deploy_id: id.deploy_id,
            task_id: id.id,
        }
    }
}

/// The request a task runs under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub instances: i32,
    pub request_type: String,
    pub state: String,
}

impl RequestContext {
    /// Builds a context from an upstream request parent, or `None` when the
    /// parent carries no request definition.
    pub fn from_parent(parent: &RequestParent) -> Option<Self> {
        let request = parent.request.as_ref()?;
        Some(RequestContext {
            request_id: request.id.clone(),
            instances: request.instances.unwrap_or(0),
            request_type: request.request_type.clone().unwrap_or_default(),
            state: parent.state.clone().unwrap_or_default(),
        })
    }
}

/// A task fetched from the scheduler before it is joined with its request
#[derive(Debug, Clone)]
pub struct ResolvedTask {
    pub id: TaskIdentifier,
    pub status: Option<TaskState>,
    pub env: Vec<EnvVar>,
    pub docker_image: Option<String>,
}

/// Everything the report and the cache know about one task
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: TaskIdentifier,
    pub status: Option<TaskState>,
    pub env: Vec<EnvVar>,
    pub request: Option<RequestContext>,
    pub docker_image: Option<String>,
}

/// Which deploy of a request a deploy record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMarker {
    Active,
    Pending,
}

impl DeployMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployMarker::Active => "active",
            DeployMarker::Pending => "pending",
        }
    }
}

/// A deploy of a request, as listed by the deploy report
#[derive(Debug, Clone)]
pub struct DeployRecord {
    pub request_id: String,
    pub deploy_id: String,
    pub marker: DeployMarker,
    pub env: Vec<EnvVar>,
    pub docker_image: Option<String>,
}

/// Returns the value of the first variable called `name`
pub fn resolve_env<'a>(env: &'a [EnvVar], name: &str) -> Option<&'a str> {
    env.iter()
        .find(|var| var.name == name)
        .map(|var| var.value.as_str())
}
