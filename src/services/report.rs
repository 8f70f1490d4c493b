//! Report services - Spreadsheet exports for admins
//!
//! Mounted behind `admin_only_middleware`, so handlers do not re-check the role.

use crate::core::{AppError, AppState};
use crate::export::{XLSX_CONTENT_TYPE, projects_workbook, tasks_workbook, users_workbook};
use crate::repositories::TaskFilter;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{info, instrument};

fn attachment(filename: &str, bytes: Vec<u8>) -> Response {
    info!("Sending {} ({} bytes)", filename, bytes.len());
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

#[instrument(skip(state))]
pub async fn export_tasks(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let tasks = state.task.find_many(TaskFilter::default()).await?;
    Ok(attachment("tasks_report.xlsx", tasks_workbook(&tasks)?))
}

#[instrument(skip(state))]
pub async fn export_users(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let users = state.user.find_all().await?;
    let tasks = state.task.find_many(TaskFilter::default()).await?;
    Ok(attachment("users_report.xlsx", users_workbook(&users, &tasks)?))
}

/// Soft-deleted projects are part of this export
#[instrument(skip(state))]
pub async fn export_projects(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let projects = state.project.find_all_including_deleted().await?;
    Ok(attachment("projects_report.xlsx", projects_workbook(&projects)?))
}
