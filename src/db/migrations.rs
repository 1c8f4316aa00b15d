//! Schema groom: fingerprint check, forward migrations and full rebuild.
//!
//! The cache schema is the ordered concatenation of every migration's
//! statements. Its fingerprint is a SHA-256 over `"{ordinal}:{statement}\n"`,
//! so editing or reordering any statement changes it. On startup:
//!
//! - stored fingerprint equals the current one: nothing happens;
//! - stored version is older and its fingerprint matches the current
//!   migrations up to that version: only the newer migrations run;
//! - anything else: every table, index, trigger and view is dropped and the
//!   schema is rebuilt from scratch.

use chrono::NaiveDateTime;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::sqlite::SqliteConnection;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::errors::Error;

const FINGERPRINT_KEY: &str = "fingerprint";
const VERSION_KEY: &str = "schema_version";
const CREATED_KEY: &str = "created";

/// An ordered group of schema statements introduced at one version
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i32,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    statements: &[
        "create table _database_metadata_(
            name text not null unique on conflict replace,
            value text
        );",
        "create table singularity(
            singularity_id integer primary key autoincrement,
            url text
        );",
        "create table req(
            req_id integer primary key autoincrement,
            singularity_id integer references singularity(singularity_id) on delete cascade,
            request_ident text,
            instances integer,
            type text,
            state text,
            captured_at timestamp
        );",
        "create table task(
            task_id integer primary key autoincrement,
            req_id integer references req(req_id) on delete cascade,
            deploy_ident text,
            status text
        );",
        "create table env(
            env_id integer primary key autoincrement,
            task_id integer references task(task_id) on delete cascade,
            name text,
            value text
        );",
        "create table docker_image(
            docker_image_id integer primary key autoincrement,
            task_id integer references task(task_id) on delete cascade,
            image_name text
        );",
        "create index req_request_ident on req(request_ident);",
    ],
}];

/// What the groom did to the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroomOutcome {
    Unchanged,
    Migrated { from: i32, to: i32 },
    Rebuilt,
}

/// Fingerprint of an ordered statement list
pub fn fingerprint<'a, I>(statements: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Sha256::new();
    for (i, statement) in statements.into_iter().enumerate() {
        hasher.update(format!("{}:{}\n", i, statement).as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn statements_up_to(
    migrations: &[Migration],
    version: i32,
) -> impl Iterator<Item = &'static str> + '_ {
    migrations
        .iter()
        .filter(move |m| m.version <= version)
        .flat_map(|m| m.statements.iter().copied())
}

#[derive(QueryableByName, Debug)]
struct SchemaObject {
    #[diesel(sql_type = Text)]
    kind: String,
    #[diesel(sql_type = Text)]
    name: String,
}

/// Brings the database schema in line with `migrations`.
///
/// # Arguments
/// * `conn` - Connection to the cache database
/// * `migrations` - Migrations in ascending version order
/// * `now` - Creation time recorded when the schema is rebuilt
pub fn groom(
    conn: &mut SqliteConnection,
    migrations: &[Migration],
    now: NaiveDateTime,
) -> Result<GroomOutcome, Error> {
    let target = migrations
        .last()
        .map(|m| m.version)
        .ok_or_else(|| Error::SchemaError("no migrations defined".to_string()))?;
    let current = fingerprint(statements_up_to(migrations, target));

    let stored_fingerprint = read_metadata(conn, FINGERPRINT_KEY);
    let stored_version = read_metadata(conn, VERSION_KEY).and_then(|v| v.parse::<i32>().ok());

    if stored_fingerprint.as_deref() == Some(current.as_str()) {
        debug!("Cache schema fingerprint {} is current", current);
        return Ok(GroomOutcome::Unchanged);
    }

    if let (Some(stored), Some(version)) = (stored_fingerprint.as_deref(), stored_version) {
        if version < target && stored == fingerprint(statements_up_to(migrations, version)) {
            info!("Migrating cache schema from version {} to {}", version, target);
            conn.transaction::<_, Error, _>(|conn| {
                for migration in migrations.iter().filter(|m| m.version > version) {
                    for statement in migration.statements {
                        conn.batch_execute(statement)?;
                    }
                }
                write_fingerprint(conn, &current, target)
            })?;
            return Ok(GroomOutcome::Migrated {
                from: version,
                to: target,
            });
        }
    }

    info!(
        "Rebuilding cache schema: stored fingerprint {:?}, current {}",
        stored_fingerprint, current
    );
    clobber(conn)?;
    conn.transaction::<_, Error, _>(|conn| {
        for statement in statements_up_to(migrations, target) {
            conn.batch_execute(statement)?;
        }
        write_fingerprint(conn, &current, target)?;
        write_metadata(conn, CREATED_KEY, &now.format("%Y-%m-%d %H:%M:%S").to_string())
    })?;
    Ok(GroomOutcome::Rebuilt)
}

/// Reads a metadata value; a missing table or key both read as `None`.
fn read_metadata(conn: &mut SqliteConnection, key: &str) -> Option<String> {
    use crate::schema::database_metadata::dsl::*;

    match database_metadata
        .filter(name.eq(key))
        .select(value)
        .first::<Option<String>>(conn)
        .optional()
    {
        Ok(found) => found.flatten(),
        Err(e) => {
            debug!("No cache metadata for {}: {}", key, e);
            None
        }
    }
}

fn write_metadata(conn: &mut SqliteConnection, key: &str, val: &str) -> Result<(), Error> {
    use crate::schema::database_metadata::dsl::*;

    diesel::replace_into(database_metadata)
        .values((name.eq(key), value.eq(val)))
        .execute(conn)?;
    Ok(())
}

fn write_fingerprint(conn: &mut SqliteConnection, fp: &str, version: i32) -> Result<(), Error> {
    write_metadata(conn, FINGERPRINT_KEY, fp)?;
    write_metadata(conn, VERSION_KEY, &version.to_string())
}

/// Drops every user object from the database.
fn clobber(conn: &mut SqliteConnection) -> Result<(), Error> {
    let objects = diesel::sql_query(
        "select type as kind, name from sqlite_master \
         where name not like 'sqlite_%' and type in ('trigger', 'view', 'index', 'table')",
    )
    .load::<SchemaObject>(conn)?;

    conn.batch_execute("PRAGMA foreign_keys = OFF;")?;
    let dropped = objects.iter().try_for_each(|object| {
        let kind = match object.kind.as_str() {
            "trigger" => "trigger",
            "view" => "view",
            "index" => "index",
            _ => "table",
        };
        debug!("Dropping {} {}", kind, object.name);
        conn.batch_execute(&format!(
            "drop {} if exists \"{}\";",
            kind,
            object.name.replace('"', "\"\"")
        ))
    });
    conn.batch_execute("PRAGMA foreign_keys = ON;")?;
    dropped?;

    conn.batch_execute("vacuum;")?;
    Ok(())
}
