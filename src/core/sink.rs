use crate::client::TaskState;
use crate::constants::SINK_CAPACITY;
use crate::core::report::{deploy_row, format_line, header_names, task_row, ReportOptions};
use crate::core::{DeployRecord, TaskRecord};
use crate::db::CacheStore;
use crate::event::Event;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Rows written and withheld by the renderer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub printed: usize,
    pub suppressed: usize,
}

/// Producer side of the report pipeline.
///
/// Each collection unit holds a clone. Records are queued for the single
/// render loop and written to the cache; `submit_task` returns once both have
/// happened, so a finished unit never leaves a cache write behind.
#[derive(Debug, Clone)]
pub struct Sink {
    tx: Sender<Event>,
    store: Option<Arc<CacheStore>>,
    source_url: String,
}

/// A record is printed when inactive tasks were asked for, when its status is
/// unknown, or when it is running.
pub fn is_printable(opts: &ReportOptions, record: &TaskRecord) -> bool {
    opts.include_inactive || record.status.map_or(true, |s| s == TaskState::TaskRunning)
}

impl Sink {
    /// Starts the render loop writing to `writer`.
    ///
    /// The returned handle resolves once every `Sink` clone has been dropped
    /// and the output has been flushed; it hands the writer back.
    pub fn spawn<W>(
        writer: W,
        options: ReportOptions,
        store: Option<Arc<CacheStore>>,
        source_url: &str,
    ) -> (Self, JoinHandle<io::Result<(W, RenderStats)>>)
    where
        W: Write + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(SINK_CAPACITY);
        let handle = tokio::spawn(render_loop(rx, writer, options));
        (
            Sink {
                tx,
                store,
                source_url: source_url.to_string(),
            },
            handle,
        )
    }

    pub async fn submit_task(&self, record: TaskRecord) {
        let render = self.queue(Event::TaskResolved(record.clone()));
        let cache = self.cache(record);
        tokio::join!(render, cache);
    }

    pub async fn submit_deploy(&self, deploy: DeployRecord) {
        self.queue(Event::DeployResolved(deploy)).await;
    }

    async fn queue(&self, event: Event) {
        if self.tx.send(event).await.is_err() {
            warn!("Report renderer has stopped; dropping row");
        }
    }

    async fn cache(&self, record: TaskRecord) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let source_url = self.source_url.clone();
        let task_id = record.id.task_id.clone();
        let write = tokio::task::spawn_blocking(move || store.add_task(&source_url, &record));
        if let Err(e) = write.await {
            error!("Cache write for task {} did not complete: {}", task_id, e);
        }
    }
}

async fn render_loop<W: Write>(
    mut rx: Receiver<Event>,
    mut writer: W,
    options: ReportOptions,
) -> io::Result<(W, RenderStats)> {
    let mut stats = RenderStats::default();

    if options.print_headers {
        writeln!(writer, "{}", format_line(&header_names(&options)))?;
    }

    while let Some(event) = rx.recv().await {
        match event {
            Event::TaskResolved(record) => {
                if is_printable(&options, &record) {
                    writeln!(writer, "{}", format_line(&task_row(&options, &record)))?;
                    stats.printed += 1;
                } else {
                    debug!(
                        "Not printing task {} in state {:?}",
                        record.id.task_id, record.status
                    );
                    stats.suppressed += 1;
                }
            }
            Event::DeployResolved(deploy) => {
                writeln!(writer, "{}", format_line(&deploy_row(&options, &deploy)))?;
                stats.printed += 1;
            }
        }
    }

    writer.flush()?;
    Ok((writer, stats))
}
