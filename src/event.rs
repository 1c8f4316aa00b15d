use crate::core::{DeployRecord, TaskRecord};

/// Items flowing from the collection units to the report renderer
#[derive(Debug, Clone)]
pub enum Event {
    /// A task was fetched and joined with its request
    TaskResolved(TaskRecord),

    /// A deploy of a request was resolved
    DeployResolved(DeployRecord),
}
