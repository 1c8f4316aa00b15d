use crate::config::{CacheConfig, CachePolicy};
use crate::constants::UNKNOWN;
use crate::core::TaskRecord;
use crate::db::{
    groom, CacheRepository, Database, GroomOutcome, Migration, RequestSnapshot, MIGRATIONS,
};
use crate::errors::Error;
use chrono::{NaiveDateTime, TimeDelta, Utc};
use diesel::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Local record of every task observed, kept in a SQLite file.
///
/// All writes go through `add_task`, which holds a single lock for the whole
/// record. Request freshness is judged against `captured_at`, the instant the
/// store was opened, so one run behaves as a single point in time.
#[derive(Debug)]
pub struct CacheStore {
    database: Database,
    lock: Mutex<()>,
    captured_at: NaiveDateTime,
    freshness_window: TimeDelta,
}

impl CacheStore {
    /// Opens the store described by `config`, capturing "now" for this run
    pub fn open(config: &CacheConfig) -> Result<Self, Error> {
        let window = config.freshness_window()?;
        Self::open_at(
            &config.resolve_path(),
            config.policy,
            window,
            Utc::now().naive_utc(),
            MIGRATIONS,
        )
    }

    /// Opens (creating when needed) the store at `path` and grooms its schema
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be removed, opened or brought to the current
    /// schema; the store is unusable in that case.
    pub fn open_at(
        path: &Path,
        policy: CachePolicy,
        freshness_window: Duration,
        captured_at: NaiveDateTime,
        migrations: &[Migration],
    ) -> Result<Self, Error> {
        if policy == CachePolicy::Recreate {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Removed previous cache file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!("Recording data to {}", path.display());
        let database = Database::new(&path.to_string_lossy())?;
        let mut conn = database.get_conn()?;
        let outcome = groom(&mut conn, migrations, captured_at)?;
        drop(conn);
        if outcome != GroomOutcome::Unchanged {
            info!("Cache schema groomed: {:?}", outcome);
        }

        let freshness_window = TimeDelta::from_std(freshness_window)
            .map_err(|e| Error::SchemaError(format!("freshness window out of range: {}", e)))?;

        Ok(CacheStore {
            database,
            lock: Mutex::new(()),
            captured_at,
            freshness_window,
        })
    }

    /// Records a task observed on the scheduler at `source_url`.
    ///
    /// Failures are logged and the record (or the failing row) is skipped;
    /// nothing is returned to the caller.
    pub fn add_task(&self, source_url: &str, record: &TaskRecord) {
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Cache lock poisoned, recovering...");
                poisoned.into_inner()
            }
        };

        match self.write_task(source_url, record) {
            Ok(task_row) => debug!("Cached task {} as row {}", record.id.task_id, task_row),
            Err(e) => warn!("Error caching task {}: {}", record.id.task_id, e),
        }
    }

    fn write_task(&self, source_url: &str, record: &TaskRecord) -> Result<i64, Error> {
        let mut conn = self.database.get_conn()?;
        let snapshot = match &record.request {
            Some(request) => RequestSnapshot {
                request_ident: &request.request_id,
                instances: request.instances,
                request_type: &request.request_type,
                state: &request.state,
            },
            None => RequestSnapshot {
                request_ident: &record.id.request_id,
                instances: 0,
                request_type: UNKNOWN,
                state: UNKNOWN,
            },
        };
        let status = record.status.map(|s| s.as_str()).unwrap_or(UNKNOWN);

        conn.transaction::<_, Error, _>(|conn| {
            let mut repo = CacheRepository::new(conn);
            let singularity_row = repo.find_or_insert_singularity(source_url)?;
            let request_row = repo.upsert_request(
                singularity_row,
                &snapshot,
                self.captured_at,
                self.freshness_window,
            )?;
            let task_row = repo.insert_task(request_row, &record.id.deploy_id, status)?;

            for var in &record.env {
                if let Err(e) = repo.insert_env(task_row, &var.name, &var.value) {
                    warn!(
                        "Error inserting task env pair ({:?}: {:?}): {}",
                        var.name, var.value, e
                    );
                }
            }

            if let Some(image) = &record.docker_image {
                if let Err(e) = repo.insert_docker_image(task_row, image) {
                    warn!("Error inserting task docker image ({:?}): {}", image, e);
                }
            }

            Ok(task_row)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{EnvVar, TaskState};
    use crate::core::{RequestContext, TaskIdentifier};
    use crate::schema::{docker_image, env, req, task};
    use diesel::dsl::count_star;
    use diesel::prelude::*;

    fn record(request_id: &str, task_id: &str, request: bool) -> TaskRecord {
        TaskRecord {
            id: TaskIdentifier {
                request_id: request_id.to_string(),
                deploy_id: "d1".to_string(),
                task_id: task_id.to_string(),
            },
            status: Some(TaskState::TaskRunning),
            env: vec![EnvVar::new("TASK_HOST", "h1"), EnvVar::new("PORT0", "80")],
            request: request.then(|| RequestContext {
                request_id: request_id.to_string(),
                instances: 3,
                request_type: "SERVICE".to_string(),
                state: "ACTIVE".to_string(),
            }),
            docker_image: Some("registry/web:1".to_string()),
        }
    }

    fn open(path: &Path, captured_at: NaiveDateTime) -> CacheStore {
        CacheStore::open_at(
            path,
            CachePolicy::Groom,
            Duration::from_secs(1),
            captured_at,
            MIGRATIONS,
        )
        .unwrap()
    }

    fn req_ids(store: &CacheStore) -> Vec<i64> {
        let mut conn = store.database.get_conn().unwrap();
        req::table.select(req::req_id).order(req::req_id).load(&mut *conn).unwrap()
    }

    fn counts(store: &CacheStore) -> (i64, i64, i64) {
        let mut conn = store.database.get_conn().unwrap();
        (
            task::table.select(count_star()).first(&mut *conn).unwrap(),
            env::table.select(count_star()).first(&mut *conn).unwrap(),
            docker_image::table.select(count_star()).first(&mut *conn).unwrap(),
        )
    }

    #[test]
    fn repeat_request_inside_window_reuses_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("cache.db"), Utc::now().naive_utc());

        store.add_task("http://s", &record("web", "t1", true));
        store.add_task("http://s", &record("web", "t2", true));

        assert_eq!(req_ids(&store).len(), 1);
        assert_eq!(counts(&store), (2, 4, 2));
    }

    #[test]
    fn request_from_previous_run_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let first_run = Utc::now().naive_utc();

        let store = open(&path, first_run);
        store.add_task("http://s", &record("web", "t1", true));
        let old_ids = req_ids(&store);
        drop(store);

        let store = open(&path, first_run + TimeDelta::seconds(2));
        store.add_task("http://s", &record("web", "t2", true));
        let new_ids = req_ids(&store);

        assert_eq!(new_ids.len(), 1);
        assert_ne!(old_ids, new_ids);
        // The stale request's task, env and image rows cascade away.
        assert_eq!(counts(&store), (1, 2, 1));
    }

    #[test]
    fn unresolved_request_gets_placeholder_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("cache.db"), Utc::now().naive_utc());
        store.add_task("http://s", &record("orphan", "t1", false));

        let mut conn = store.database.get_conn().unwrap();
        let (kind, state): (Option<String>, Option<String>) = req::table
            .select((req::request_type, req::state))
            .first(&mut *conn)
            .unwrap();
        assert_eq!(kind.as_deref(), Some(UNKNOWN));
        assert_eq!(state.as_deref(), Some(UNKNOWN));
    }

    #[test]
    fn reopening_current_schema_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let now = Utc::now().naive_utc();

        let store = open(&path, now);
        store.add_task("http://s", &record("web", "t1", true));
        let ids = req_ids(&store);
        drop(store);

        let store = open(&path, now);
        store.add_task("http://s", &record("web", "t2", true));
        assert_eq!(req_ids(&store), ids);
        assert_eq!(counts(&store), (2, 4, 2));
    }

    #[test]
    fn recreate_policy_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let now = Utc::now().naive_utc();

        let store = open(&path, now);
        store.add_task("http://s", &record("web", "t1", true));
        drop(store);

        let store = CacheStore::open_at(
            &path,
            CachePolicy::Recreate,
            Duration::from_secs(1),
            now,
            MIGRATIONS,
        )
        .unwrap();
        assert!(req_ids(&store).is_empty());
    }
}
