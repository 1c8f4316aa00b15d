//! Wire shapes of the Singularity API responses the collector consumes.
//!
//! Only the fields the report and the cache need are modelled; everything else
//! in the upstream payloads is ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A request together with its scheduler state and deploys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParent {
    pub request: Option<Request>,
    pub state: Option<String>,
    #[serde(default)]
    pub active_deploy: Option<Deploy>,
    #[serde(default)]
    pub pending_deploy: Option<Deploy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,
    #[serde(default)]
    pub instances: Option<i32>,
    #[serde(default)]
    pub request_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deploy {
    pub id: String,
    #[serde(default)]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub container_info: Option<ContainerInfo>,
}

/// Identifier of one task instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskId {
    pub request_id: String,
    pub deploy_id: String,
    pub id: String,
}

/// Entry of the active or recent task history listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdHistory {
    pub task_id: TaskId,
}

/// Full history of a single task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHistory {
    #[serde(default)]
    pub task: Option<Task>,
    #[serde(default)]
    pub task_updates: Vec<TaskHistoryUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: TaskId,
    #[serde(default)]
    pub mesos_task: Option<MesosTask>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MesosTask {
    #[serde(default)]
    pub command: Option<Command>,
    #[serde(default)]
    pub container: Option<ContainerInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    #[serde(default)]
    pub environment: Option<Environment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub variables: Vec<EnvVar>,
}

/// A single environment variable of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl EnvVar {
    pub fn new(name: &str, value: &str) -> Self {
        EnvVar {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerInfo {
    #[serde(default)]
    pub docker: Option<DockerInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockerInfo {
    pub image: String,
}

/// A timestamped status transition of a task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHistoryUpdate {
    pub timestamp: i64,
    pub task_state: TaskState,
}

/// Scheduler state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    TaskLaunched,
    TaskStaging,
    TaskStarting,
    TaskRunning,
    TaskCleaning,
    TaskKilling,
    TaskFinished,
    TaskFailed,
    TaskKilled,
    TaskLost,
    TaskLostWhileDown,
    TaskError,
    TaskDropped,
    TaskGone,
    TaskUnreachable,
    TaskGoneByOperator,
    #[serde(other)]
    TaskUnknown,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::TaskLaunched => "TASK_LAUNCHED",
            TaskState::TaskStaging => "TASK_STAGING",
            TaskState::TaskStarting => "TASK_STARTING",
            TaskState::TaskRunning => "TASK_RUNNING",
            TaskState::TaskCleaning => "TASK_CLEANING",
            TaskState::TaskKilling => "TASK_KILLING",
            TaskState::TaskFinished => "TASK_FINISHED",
            TaskState::TaskFailed => "TASK_FAILED",
            TaskState::TaskKilled => "TASK_KILLED",
            TaskState::TaskLost => "TASK_LOST",
            TaskState::TaskLostWhileDown => "TASK_LOST_WHILE_DOWN",
            TaskState::TaskError => "TASK_ERROR",
            TaskState::TaskDropped => "TASK_DROPPED",
            TaskState::TaskGone => "TASK_GONE",
            TaskState::TaskUnreachable => "TASK_UNREACHABLE",
            TaskState::TaskGoneByOperator => "TASK_GONE_BY_OPERATOR",
            TaskState::TaskUnknown => "TASK_UNKNOWN",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_task_history_payload() {
        let payload = r#"{
            "task": {
                "taskId": {"requestId": "web", "deployId": "d1", "id": "web-d1-1", "instanceNo": 1},
                "mesosTask": {
                    "command": {"environment": {"variables": [
                        {"name": "TASK_HOST", "value": "10.0.0.1"},
                        {"name": "PORT0", "value": "31000"}
                    ]}},
                    "container": {"type": "DOCKER", "docker": {"image": "registry/web:1"}}
                }
            },
            "taskUpdates": [
                {"timestamp": 10, "taskState": "TASK_STARTING"},
                {"timestamp": 20, "taskState": "TASK_RUNNING"}
            ]
        }"#;

        let history: TaskHistory = serde_json::from_str(payload).unwrap();
        let task = history.task.unwrap();
        assert_eq!(task.task_id.request_id, "web");
        let mesos = task.mesos_task.unwrap();
        let env = mesos.command.unwrap().environment.unwrap();
        assert_eq!(env.variables[1], EnvVar::new("PORT0", "31000"));
        assert_eq!(mesos.container.unwrap().docker.unwrap().image, "registry/web:1");
        assert_eq!(history.task_updates[1].task_state, TaskState::TaskRunning);
    }

    #[test]
    fn unrecognised_state_decodes_as_unknown() {
        let update: TaskHistoryUpdate =
            serde_json::from_str(r#"{"timestamp": 1, "taskState": "TASK_SOMETHING_NEW"}"#)
                .unwrap();
        assert_eq!(update.task_state, TaskState::TaskUnknown);
        assert_eq!(TaskState::TaskLostWhileDown.to_string(), "TASK_LOST_WHILE_DOWN");
    }
}
