//! Project services - Project CRUD, membership and project analytics

use crate::analytics::{
    AdminProjectAnalytics, UserProjectAnalytics, admin_project_analytics, user_project_analytics,
};
use crate::core::{AppError, AppState, require_admin, require_self_or_admin};
use crate::dtos::{
    AssignTasksDTO, AssignUsersDTO, CreateProjectDTO, MessageResponseDTO, ProjectDTO,
    ProjectMessageDTO, UpdateProjectDTO, UserProjectsDTO,
};
use crate::entities::User;
use crate::repositories::{Create, Delete, Read, Update};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

fn check_dates(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end < start {
        warn!("End date {} precedes start date {}", end, start);
        return Err(AppError::bad_request("End date must not be before the start date"));
    }
    Ok(())
}

fn not_found(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::RowNotFound => AppError::not_found("Project not found"),
        other => other.into(),
    }
}

#[instrument(skip(state, current_user, body), fields(user_id = current_user.id))]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateProjectDTO>,
) -> Result<(StatusCode, Json<ProjectDTO>), AppError> {
    require_admin(&current_user)?;
    body.validate()?;
    check_dates(body.start_date, body.end_date)?;

    let project = state.project.create(&body).await?;
    info!(project_id = project.id, "Project created");
    Ok((StatusCode::CREATED, Json(project.into())))
}

#[instrument(skip(state, current_user), fields(user_id = current_user.id))]
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<ProjectDTO>>, AppError> {
    require_admin(&current_user)?;
    let projects = state.project.find_active().await?;
    debug!("Found {} projects", projects.len());
    Ok(Json(projects.into_iter().map(ProjectDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = current_user.id, project_id = %project_id))]
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(project_id): Path<i64>,
    Json(body): Json<UpdateProjectDTO>,
) -> Result<Json<ProjectDTO>, AppError> {
    require_admin(&current_user)?;
    body.validate()?;

    let current = state
        .project
        .read(&project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project not found"))?;
    check_dates(
        body.start_date.unwrap_or(current.start_date),
        body.end_date.unwrap_or(current.end_date),
    )?;

    let project = state
        .project
        .update(&project_id, &body)
        .await
        .map_err(not_found)?;
    info!("Project updated");
    Ok(Json(project.into()))
}

#[instrument(skip(state, current_user), fields(user_id = current_user.id, project_id = %project_id))]
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(project_id): Path<i64>,
) -> Result<Json<MessageResponseDTO>, AppError> {
    require_admin(&current_user)?;
    state.project.delete(&project_id).await.map_err(not_found)?;
    info!("Project soft-deleted");
    Ok(Json(MessageResponseDTO::new("Project soft-deleted successfully")))
}

#[instrument(skip(state, current_user, body), fields(user_id = current_user.id, project_id = %project_id))]
pub async fn assign_tasks(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(project_id): Path<i64>,
    Json(body): Json<AssignTasksDTO>,
) -> Result<Json<ProjectMessageDTO>, AppError> {
    require_admin(&current_user)?;
    if state.project.read(&project_id).await?.is_none() {
        return Err(AppError::not_found("Project not found"));
    }

    let project = state
        .project
        .assign_tasks(project_id, &body.task_ids)
        .await
        .map_err(not_found)?;
    info!("{} tasks assigned", body.task_ids.len());

    Ok(Json(ProjectMessageDTO {
        message: "Tasks assigned to project successfully".to_string(),
        project: project.into(),
    }))
}

#[instrument(skip(state, current_user, body), fields(user_id = current_user.id, project_id = %project_id))]
pub async fn assign_users(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(project_id): Path<i64>,
    Json(body): Json<AssignUsersDTO>,
) -> Result<Json<ProjectMessageDTO>, AppError> {
    // 1. Every user id must exist
    // 2. The project must exist
    // 3. Add the users, keeping the current members
    require_admin(&current_user)?;
    if !state.user.all_exist(&body.user_ids).await? {
        warn!("Unknown user among {:?}", body.user_ids);
        return Err(AppError::bad_request("One or more users are invalid"));
    }
    if state.project.read(&project_id).await?.is_none() {
        return Err(AppError::not_found("Project not found"));
    }

    let project = state
        .project
        .assign_users(project_id, &body.user_ids)
        .await
        .map_err(not_found)?;
    info!("Project now has {} members", project.assigned_users.len());

    Ok(Json(ProjectMessageDTO {
        message: "Users assigned to project successfully".to_string(),
        project: project.into(),
    }))
}

#[instrument(skip(state, current_user), fields(caller_id = current_user.id, user_id = %user_id))]
pub async fn list_user_projects(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserProjectsDTO>, AppError> {
    require_self_or_admin(&current_user, user_id)?;
    let projects = state.project.find_by_member(user_id).await?;
    Ok(Json(UserProjectsDTO {
        count: projects.len(),
        projects: projects.into_iter().map(ProjectDTO::from).collect(),
    }))
}

#[instrument(skip(state, current_user), fields(caller_id = current_user.id, user_id = %user_id))]
pub async fn get_user_project_analytics(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserProjectAnalytics>, AppError> {
    require_self_or_admin(&current_user, user_id)?;
    let projects = state.project.find_by_member(user_id).await?;
    Ok(Json(user_project_analytics(user_id, &projects)))
}

#[instrument(skip(state, current_user), fields(user_id = current_user.id))]
pub async fn get_admin_project_analytics(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<AdminProjectAnalytics>, AppError> {
    require_admin(&current_user)?;
    let projects = state.project.find_active().await?;

    let mut member_ids: Vec<i64> = projects
        .iter()
        .flat_map(|p| p.assigned_users.iter().copied())
        .collect();
    member_ids.sort_unstable();
    member_ids.dedup();
    let members = state.user.find_many(&member_ids).await?;

    Ok(Json(admin_project_analytics(&projects, &members)))
}
