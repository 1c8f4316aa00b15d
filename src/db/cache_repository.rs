use crate::db::models::*;
use crate::errors::Error;
use chrono::{NaiveDateTime, TimeDelta};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::sqlite::SqliteConnection;
use tracing::debug;

/// Request fields written to the `req` table
#[derive(Debug, Clone, Copy)]
pub struct RequestSnapshot<'a> {
    pub request_ident: &'a str,
    pub instances: i32,
    pub request_type: &'a str,
    pub state: &'a str,
}

/// Repository for the cache tables of a single connection
pub struct CacheRepository<'a> {
    /// Database connection
    pub conn: &'a mut SqliteConnection,
}

impl<'a> CacheRepository<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        CacheRepository { conn }
    }

    fn last_insert_id(&mut self) -> Result<i64, Error> {
        Ok(diesel::select(sql::<BigInt>("last_insert_rowid()")).get_result(self.conn)?)
    }

    /// Returns the id of the scheduler row for `url`, inserting it when missing
    pub fn find_or_insert_singularity(&mut self, url: &str) -> Result<i64, Error> {
        use crate::schema::singularity;

        let existing = singularity::table
            .filter(singularity::url.eq(url))
            .select(singularity::singularity_id)
            .first::<i64>(self.conn)
            .optional()?;

        if let Some(id) = existing {
            debug!("Found existing singularity: {:?} = {}", url, id);
            return Ok(id);
        }

        diesel::insert_into(singularity::table)
            .values(&NewSingularity { url })
            .execute(self.conn)?;
        let id = self.last_insert_id()?;
        debug!("Created new record for singularity {:?} = {}", url, id);
        Ok(id)
    }

    /// Returns the id of a fresh `req` row for `snapshot.request_ident`.
    ///
    /// A row captured less than `window` before `now` is reused as is. An older
    /// row is deleted, cascading to its tasks, and a new one is inserted.
    pub fn upsert_request(
        &mut self,
        singularity_id: i64,
        snapshot: &RequestSnapshot<'_>,
        now: NaiveDateTime,
        window: TimeDelta,
    ) -> Result<i64, Error> {
        use crate::schema::req;

        let existing = req::table
            .filter(req::request_ident.eq(snapshot.request_ident))
            .select((req::req_id, req::captured_at))
            .first::<CachedRequest>(self.conn)
            .optional()?;

        if let Some(found) = existing {
            let fresh = found
                .captured_at
                .map(|at| now.signed_duration_since(at) < window)
                .unwrap_or(false);
            if fresh {
                debug!(
                    "Reusing fresh request {:?} = {}",
                    snapshot.request_ident, found.req_id
                );
                return Ok(found.req_id);
            }

            debug!(
                "Found stale request {:?} = {}, deleting",
                snapshot.request_ident, found.req_id
            );
            diesel::delete(req::table.filter(req::req_id.eq(found.req_id))).execute(self.conn)?;
        }

        diesel::insert_into(req::table)
            .values(&NewRequest {
                singularity_id,
                request_ident: snapshot.request_ident,
                instances: snapshot.instances,
                request_type: snapshot.request_type,
                state: snapshot.state,
                captured_at: now,
            })
            .execute(self.conn)?;
        let id = self.last_insert_id()?;
        debug!("Created new record for request {:?} = {}", snapshot.request_ident, id);
        Ok(id)
    }

    /// Inserts a task row under a request
    ///
    /// # Arguments
    ///
    /// * `req_id` - Row id of the owning request
    /// * `deploy_ident` - Upstream deploy id the task runs
    /// * `status` - Latest task state, or `UNKNOWN`
    ///
    /// # Returns
    ///
    /// The row id of the new task
    ///
    /// # Errors
    ///
    /// Returns an Error if the insert fails, e.g. when `req_id` does not exist
    pub fn insert_task(
        &mut self,
        req_id: i64,
        deploy_ident: &str,
        status: &str,
    ) -> Result<i64, Error> {
        use crate::schema::task;

        diesel::insert_into(task::table)
            .values(&NewTask {
                req_id,
                deploy_ident,
                status,
            })
            .execute(self.conn)?;
        self.last_insert_id()
    }

    /// Records one environment variable of a task
    ///
    /// # Arguments
    ///
    /// * `task_id` - Row id of the task
    /// * `name` - Variable name
    /// * `value` - Variable value
    ///
    /// # Errors
    ///
    /// Returns an Error if the insert fails
    pub fn insert_env(&mut self, task_id: i64, name: &str, value: &str) -> Result<(), Error> {
        use crate::schema::env;

        diesel::insert_into(env::table)
            .values(&NewEnv {
                task_id,
                name,
                value,
            })
            .execute(self.conn)?;
        Ok(())
    }

    /// Records the docker image a task runs
    ///
    /// # Errors
    ///
    /// Returns an Error if the insert fails
    pub fn insert_docker_image(&mut self, task_id: i64, image_name: &str) -> Result<(), Error> {
        use crate::schema::docker_image;

        diesel::insert_into(docker_image::table)
            .values(&NewDockerImage {
                task_id,
                image_name,
            })
            .execute(self.conn)?;
        Ok(())
    }
}
