use crate::client::{Deploy, EnvVar, SingularityClient};
use crate::core::fetcher::{fetch_task, with_retries};
use crate::core::{correlate, DeployMarker, DeployRecord, RequestContext, Sink, TaskIdentifier};
use crate::errors::Error;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Settings that drive a collection run
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Maximum number of units fetching from upstream at once
    pub workers: usize,
    pub retry_attempts: usize,
    pub history_page_size: u32,
    /// Also walk the recent (inactive) task history of every request
    pub include_inactive: bool,
    pub print_active: bool,
    pub print_pending: bool,
}

/// Counters for one collection run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectSummary {
    pub requests: usize,
    pub dispatched: usize,
    pub resolved: usize,
    pub dropped: usize,
}

#[derive(Debug)]
enum UnitOutcome {
    Resolved,
    Dropped,
}

/// Walks the scheduler's requests and dispatches one unit per distinct task.
#[derive(Debug)]
pub struct Collector {
    client: Arc<dyn SingularityClient>,
    options: CollectOptions,
}

impl Collector {
    pub fn new(client: Arc<dyn SingularityClient>, options: CollectOptions) -> Self {
        Collector { client, options }
    }

    /// Lists every request known upstream. Failing to list requests fails the run.
    pub async fn load_requests(&self) -> Result<Vec<RequestContext>, Error> {
        let parents = with_retries(self.options.retry_attempts, "request listing", || {
            self.client.list_requests()
        })
        .await?;

        Ok(parents
            .iter()
            .filter_map(|parent| {
                let context = RequestContext::from_parent(parent);
                if context.is_none() {
                    warn!("Missing request for request parent {:?}", parent);
                }
                context
            })
            .collect())
    }

    /// Task ids listed for a request: active ones, then the most recent page
    /// of history when inactive tasks are included. May contain duplicates.
    async fn list_task_ids(&self, request_id: &str) -> Vec<TaskIdentifier> {
        let attempts = self.options.retry_attempts;
        let mut ids = Vec::new();

        let what = format!("active tasks of request {}", request_id);
        match with_retries(attempts, &what, || {
            self.client.list_active_task_history(request_id)
        })
        .await
        {
            Ok(tasks) => ids.extend(tasks.into_iter().map(|t| TaskIdentifier::from(t.task_id))),
            Err(e) => warn!("Skipping {}: {}", what, e),
        }

        if self.options.include_inactive {
            let what = format!("recent tasks of request {}", request_id);
            match with_retries(attempts, &what, || {
                self.client
                    .list_recent_task_history(request_id, self.options.history_page_size, 1)
            })
            .await
            {
                Ok(tasks) => {
                    ids.extend(tasks.into_iter().map(|t| TaskIdentifier::from(t.task_id)))
                }
                Err(e) => warn!("Skipping {}: {}", what, e),
            }
        }

        ids
    }

    /// Resolves every distinct task and hands it to `sink`.
    ///
    /// Ids are checked against the seen set on this loop before their unit is
    /// spawned, so a task listed twice is fetched once. Returns after every
    /// unit, cache write included, has finished.
    pub async fn collect_tasks(
        &self,
        requests: Vec<RequestContext>,
        sink: &Sink,
    ) -> CollectSummary {
        let requests = Arc::new(requests);
        let permits = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut summary = CollectSummary {
            requests: requests.len(),
            ..CollectSummary::default()
        };
        let mut seen: HashSet<String> = HashSet::new();
        let mut units = JoinSet::new();

        for request in requests.iter() {
            for id in self.list_task_ids(&request.request_id).await {
                if !seen.insert(id.task_id.clone()) {
                    debug!("Task {} already dispatched", id.task_id);
                    continue;
                }
                summary.dispatched += 1;

                let client = Arc::clone(&self.client);
                let requests = Arc::clone(&requests);
                let permits = Arc::clone(&permits);
                let sink = sink.clone();
                let attempts = self.options.retry_attempts;

                units.spawn(async move {
                    let fetched = {
                        let Ok(_permit) = permits.acquire().await else {
                            return UnitOutcome::Dropped;
                        };
                        fetch_task(client.as_ref(), &id, attempts).await
                    };

                    match fetched {
                        Ok(task) => {
                            sink.submit_task(correlate(task, &requests)).await;
                            UnitOutcome::Resolved
                        }
                        Err(e) => {
                            warn!("Dropping task {}: {}", id.task_id, e);
                            UnitOutcome::Dropped
                        }
                    }
                });
            }
        }

        join_units(&mut units, &mut summary).await;
        info!(
            "Collected {} of {} tasks across {} requests ({} dropped)",
            summary.resolved, summary.dispatched, summary.requests, summary.dropped
        );
        summary
    }

    /// Lists the active and/or pending deploy of every request.
    pub async fn collect_deploys(
        &self,
        requests: Vec<RequestContext>,
        sink: &Sink,
    ) -> CollectSummary {
        let permits = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut summary = CollectSummary {
            requests: requests.len(),
            ..CollectSummary::default()
        };
        let mut units = JoinSet::new();

        for request in requests {
            summary.dispatched += 1;
            let client = Arc::clone(&self.client);
            let permits = Arc::clone(&permits);
            let sink = sink.clone();
            let options = self.options.clone();

            units.spawn(async move {
                let fetched = {
                    let Ok(_permit) = permits.acquire().await else {
                        return UnitOutcome::Dropped;
                    };
                    let what = format!("deploy info of request {}", request.request_id);
                    with_retries(options.retry_attempts, &what, || {
                        client.get_request(&request.request_id)
                    })
                    .await
                };

                let parent = match fetched {
                    Ok(parent) => parent,
                    Err(e) => {
                        warn!("Dropping request {}: {}", request.request_id, e);
                        return UnitOutcome::Dropped;
                    }
                };

                if options.print_active {
                    if let Some(deploy) = &parent.active_deploy {
                        let record =
                            deploy_record(&request.request_id, DeployMarker::Active, deploy);
                        sink.submit_deploy(record).await;
                    }
                }
                if options.print_pending {
                    if let Some(deploy) = &parent.pending_deploy {
                        let record =
                            deploy_record(&request.request_id, DeployMarker::Pending, deploy);
                        sink.submit_deploy(record).await;
                    }
                }
                UnitOutcome::Resolved
            });
        }

        join_units(&mut units, &mut summary).await;
        info!(
            "Collected deploys of {} of {} requests",
            summary.resolved, summary.requests
        );
        summary
    }
}

async fn join_units(units: &mut JoinSet<UnitOutcome>, summary: &mut CollectSummary) {
    while let Some(joined) = units.join_next().await {
        match joined {
            Ok(UnitOutcome::Resolved) => summary.resolved += 1,
            Ok(UnitOutcome::Dropped) => summary.dropped += 1,
            Err(e) => {
                error!("Collection unit did not complete: {}", e);
                summary.dropped += 1;
            }
        }
    }
}

fn deploy_record(request_id: &str, marker: DeployMarker, deploy: &Deploy) -> DeployRecord {
    DeployRecord {
        request_id: request_id.to_string(),
        deploy_id: deploy.id.clone(),
        marker,
        env: deploy
            .env
            .iter()
            .flatten()
            .map(|(name, value)| EnvVar::new(name, value))
            .collect(),
        docker_image: deploy
            .container_info
            .as_ref()
            .and_then(|c| c.docker.as_ref())
            .map(|docker| docker.image.clone()),
    }
}
