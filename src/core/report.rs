//! Column layout of the tab-separated report.
//!
//! Every row starts with the request and deploy ids. The optional columns
//! follow in a fixed order: state, the requested environment variables, status
//! and docker image.

use crate::client::EnvVar;
use crate::core::{resolve_env, DeployRecord, TaskRecord};

/// Options that shape which rows are printed and which columns they carry
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub print_headers: bool,
    pub print_active: bool,
    pub print_pending: bool,
    pub include_inactive: bool,
    pub include_status: bool,
    pub include_docker_image: bool,
    /// Environment variables to print, in column order
    pub env: Vec<String>,
}

impl ReportOptions {
    /// The state column is only meaningful when both active and pending
    /// deploys can appear in the same report.
    pub fn show_state(&self) -> bool {
        self.print_active && self.print_pending
    }
}

pub fn header_names(opts: &ReportOptions) -> Vec<String> {
    let mut names = vec!["Request ID".to_string(), "Deploy ID".to_string()];
    if opts.show_state() {
        names.push("State".to_string());
    }
    names.extend(opts.env.iter().cloned());
    if opts.include_status {
        names.push("Status".to_string());
    }
    if opts.include_docker_image {
        names.push("Docker Image".to_string());
    }
    names
}

fn env_values(opts: &ReportOptions, env: &[EnvVar]) -> Vec<String> {
    opts.env
        .iter()
        .map(|name| resolve_env(env, name).unwrap_or_default().to_string())
        .collect()
}

fn row(
    opts: &ReportOptions,
    ids: [&str; 2],
    state: Option<&str>,
    env: &[EnvVar],
    status: Option<&str>,
    image: Option<&str>,
) -> Vec<String> {
    let mut values: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    if opts.show_state() {
        values.push(state.unwrap_or_default().to_string());
    }
    values.extend(env_values(opts, env));
    if opts.include_status {
        values.push(status.unwrap_or_default().to_string());
    }
    if opts.include_docker_image {
        values.push(image.unwrap_or_default().to_string());
    }
    values
}

pub fn task_row(opts: &ReportOptions, record: &TaskRecord) -> Vec<String> {
    row(
        opts,
        [&record.id.request_id, &record.id.deploy_id],
        record.request.as_ref().map(|r| r.state.as_str()),
        &record.env,
        record.status.as_ref().map(|s| s.as_str()),
        record.docker_image.as_deref(),
    )
}

pub fn deploy_row(opts: &ReportOptions, deploy: &DeployRecord) -> Vec<String> {
    row(
        opts,
        [&deploy.request_id, &deploy.deploy_id],
        Some(deploy.marker.as_str()),
        &deploy.env,
        None,
        deploy.docker_image.as_deref(),
    )
}

/// Joins a row into a single tab-separated line, without the newline
pub fn format_line(values: &[String]) -> String {
    values.join("\t")
}
