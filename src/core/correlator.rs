use crate::core::{RequestContext, ResolvedTask, TaskRecord};

/// Joins a resolved task with the request it runs under.
///
/// The first request whose id matches wins; when none matches the record is
/// built without request context.
pub fn correlate(task: ResolvedTask, requests: &[RequestContext]) -> TaskRecord {
    let request = requests
        .iter()
        .find(|r| r.request_id == task.id.request_id)
        .cloned();

    TaskRecord {
        id: task.id,
        status: task.status,
        env: task.env,
        request,
        docker_image: task.docker_image,
    }
}
