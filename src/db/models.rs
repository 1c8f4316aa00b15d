use crate::schema::{docker_image, env, req, singularity, task};
use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable};

/// A request row as read back for the freshness check
#[derive(Debug, Clone, Queryable)]
pub struct CachedRequest {
    pub req_id: i64,
    pub captured_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = singularity)]
pub struct NewSingularity<'a> {
    pub url: &'a str,
}

/// Snapshot of a request as seen during this run
#[derive(Debug, Insertable)]
#[diesel(table_name = req)]
pub struct NewRequest<'a> {
    pub singularity_id: i64,
    pub request_ident: &'a str,
    pub instances: i32,
    pub request_type: &'a str,
    pub state: &'a str,
    pub captured_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = task)]
pub struct NewTask<'a> {
    pub req_id: i64,
    pub deploy_ident: &'a str,
    pub status: &'a str,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = env)]
pub struct NewEnv<'a> {
    pub task_id: i64,
    pub name: &'a str,
    pub value: &'a str,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = docker_image)]
pub struct NewDockerImage<'a> {
    pub task_id: i64,
    pub image_name: &'a str,
}
