use crate::client::{ClientError, SingularityClient, TaskHistory, TaskHistoryUpdate};
use crate::core::{ResolvedTask, TaskIdentifier};
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a task could not be resolved. Both variants are soft failures: the task
/// is dropped from the run and the rest of the run carries on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{what} failed after {attempts} attempts: {source}")]
    Exhausted {
        what: String,
        attempts: usize,
        source: ClientError,
    },
    #[error("task {task_id} has no {missing}")]
    MissingMetadata {
        task_id: String,
        missing: &'static str,
    },
}

/// Runs `call` up to `attempts` times, returning the first success.
///
/// Attempts are strictly sequential with no delay between them. Every failed
/// attempt is logged once.
pub async fn with_retries<T, F, Fut>(
    attempts: usize,
    what: &str,
    mut call: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                if attempt >= attempts {
                    return Err(FetchError::Exhausted {
                        what: what.to_string(),
                        attempts,
                        source: e,
                    });
                }
            }
        }
    }
}

/// Picks the update with the greatest timestamp; the first one wins on ties.
pub fn latest_update(updates: &[TaskHistoryUpdate]) -> Option<&TaskHistoryUpdate> {
    updates.iter().fold(None, |best, update| match best {
        Some(current) if current.timestamp >= update.timestamp => Some(current),
        _ => Some(update),
    })
}

/// Fetches the full history of a task and resolves its status, environment and
/// container image.
pub async fn fetch_task(
    client: &dyn SingularityClient,
    id: &TaskIdentifier,
    attempts: usize,
) -> Result<ResolvedTask, FetchError> {
    let what = format!("history for task {}", id.task_id);
    let history = with_retries(attempts, &what, || client.get_task_history(&id.task_id)).await?;
    resolve_history(id, history)
}

fn resolve_history(id: &TaskIdentifier, history: TaskHistory) -> Result<ResolvedTask, FetchError> {
    let missing = |what: &'static str| FetchError::MissingMetadata {
        task_id: id.task_id.clone(),
        missing: what,
    };

    let status = latest_update(&history.task_updates).map(|u| u.task_state);
    if status.is_none() {
        debug!("No history updates for task {}", id.task_id);
    }

    let task = history.task.ok_or_else(|| missing("task details"))?;
    let mesos = task.mesos_task.ok_or_else(|| missing("mesos task info"))?;
    let command = mesos.command.ok_or_else(|| missing("command"))?;
    let environment = command.environment.ok_or_else(|| missing("environment"))?;
    let docker_image = mesos
        .container
        .and_then(|c| c.docker)
        .map(|docker| docker.image);

    Ok(ResolvedTask {
        id: id.clone(),
        status,
        env: environment.variables,
        docker_image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{history, task_id, MockSingularity};
    use crate::client::TaskState;

    fn update(timestamp: i64, task_state: TaskState) -> TaskHistoryUpdate {
        TaskHistoryUpdate {
            timestamp,
            task_state,
        }
    }

    fn identifier(task: &str) -> TaskIdentifier {
        task_id("web", "d1", task).into()
    }

    #[test]
    fn latest_update_picks_max_timestamp() {
        let updates = vec![
            update(5, TaskState::TaskStarting),
            update(30, TaskState::TaskRunning),
            update(20, TaskState::TaskStaging),
        ];
        assert_eq!(
            latest_update(&updates).unwrap().task_state,
            TaskState::TaskRunning
        );
    }

    #[test]
    fn latest_update_keeps_first_on_ties() {
        let updates = vec![
            update(1, TaskState::TaskStarting),
            update(9, TaskState::TaskKilling),
            update(9, TaskState::TaskKilled),
        ];
        assert_eq!(
            latest_update(&updates).unwrap().task_state,
            TaskState::TaskKilling
        );
        assert!(latest_update(&[]).is_none());
    }

    #[tokio::test]
    async fn empty_updates_leave_status_unresolved() {
        let id = task_id("web", "d1", "t1");
        let mut mock = MockSingularity::default();
        mock.histories
            .insert("t1".to_string(), history(&id, &[("PORT0", "80")], &[]));

        let task = fetch_task(&mock, &identifier("t1"), 3).await.unwrap();
        assert!(task.status.is_none());
        assert_eq!(task.env.len(), 1);
    }

    #[tokio::test]
    async fn retries_until_first_success() {
        let id = task_id("web", "d1", "t1");
        let mut mock = MockSingularity::default();
        mock.histories.insert(
            "t1".to_string(),
            history(&id, &[], &[(3, TaskState::TaskRunning)]),
        );
        mock.fail_first("t1", 2);

        let task = fetch_task(&mock, &identifier("t1"), 3).await.unwrap();
        assert_eq!(task.status, Some(TaskState::TaskRunning));
        assert_eq!(mock.fetch_count("t1"), 3);
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let id = task_id("web", "d1", "t1");
        let mut mock = MockSingularity::default();
        mock.histories
            .insert("t1".to_string(), history(&id, &[], &[]));
        mock.fail_first("t1", 5);

        let err = fetch_task(&mock, &identifier("t1"), 3).await.unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
        assert_eq!(mock.fetch_count("t1"), 3);
    }

    #[tokio::test]
    async fn missing_environment_is_a_soft_failure() {
        let id = task_id("web", "d1", "t1");
        let mut bare = history(&id, &[], &[]);
        if let Some(mesos) = bare.task.as_mut().and_then(|t| t.mesos_task.as_mut()) {
            mesos.command = None;
        }
        let mut mock = MockSingularity::default();
        mock.histories.insert("t1".to_string(), bare);

        let err = fetch_task(&mock, &identifier("t1"), 3).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::MissingMetadata {
                missing: "command",
                ..
            }
        ));
        assert_eq!(mock.fetch_count("t1"), 1);
    }
}
