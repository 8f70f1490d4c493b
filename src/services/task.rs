//! Task services - Task CRUD, progress updates and dashboards

use crate::analytics::{Dashboard, dashboard, status_summary};
use crate::core::{AppError, AppState, require_admin, require_self_or_admin};
use crate::dtos::{
    CreateTaskDTO, CreateTaskRequestDTO, MessageResponseDTO, TaskDTO, TaskListDTO, TaskListQuery,
    TaskMessageDTO, UpdateChecklistDTO, UpdateTaskDTO, UpdateTaskRequestDTO, UpdateTaskStatusDTO,
};
use crate::entities::{Task, TaskStatus, User};
use crate::mailer::{TaskAssignment, task_assigned_email};
use crate::repositories::{Create, Delete, Read, TaskFilter, Update};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use axum_macros::debug_handler;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

async fn load_task(state: &AppState, task_id: i64) -> Result<Task, AppError> {
    state.task.read(&task_id).await?.ok_or_else(|| {
        warn!("Task {} not found", task_id);
        AppError::not_found("Task not found")
    })
}

/// Assignees and admins may change a task's progress
fn require_assignee_or_admin(user: &User, task: &Task) -> Result<(), AppError> {
    if !user.is_admin() && !task.is_assigned_to(user.id) {
        warn!("User {} is not assigned to task {}", user.id, task.id);
        return Err(AppError::forbidden("Not authorized to update this task"));
    }
    Ok(())
}

async fn ensure_users_exist(state: &AppState, user_ids: &[i64]) -> Result<(), AppError> {
    if !state.user.all_exist(user_ids).await? {
        warn!("Unknown user among {:?}", user_ids);
        return Err(AppError::bad_request("One or more assigned users are invalid"));
    }
    Ok(())
}

async fn ensure_project_exists(state: &AppState, project_id: i64) -> Result<String, AppError> {
    match state.project.read(&project_id).await? {
        Some(project) => Ok(project.name),
        None => {
            warn!("Project {} not found", project_id);
            Err(AppError::not_found("Project not found"))
        }
    }
}

/// Admins see every task, members only the ones assigned to them.
/// The summary counts ignore the filters of the query.
#[instrument(skip(state, current_user), fields(user_id = current_user.id))]
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<TaskListDTO>, AppError> {
    let scope = TaskFilter {
        assigned_to: (!current_user.is_admin()).then_some(current_user.id),
        ..Default::default()
    };
    let visible = state.task.find_many(scope).await?;
    let summary = status_summary(&visible);

    let tasks: Vec<TaskDTO> = visible
        .into_iter()
        .filter(|t| query.status.is_none_or(|s| t.status == s))
        .filter(|t| query.priority.is_none_or(|p| t.priority == p))
        .map(TaskDTO::from)
        .collect();
    debug!("Returning {} of {} visible tasks", tasks.len(), summary.all);

    Ok(Json(TaskListDTO {
        tasks,
        status_summary: summary,
    }))
}

#[instrument(skip(state, current_user), fields(user_id = current_user.id))]
pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Dashboard>, AppError> {
    require_admin(&current_user)?;
    let tasks = state.task.find_many(TaskFilter::default()).await?;
    Ok(Json(dashboard(&tasks, Utc::now())))
}

#[instrument(skip(state, current_user), fields(user_id = current_user.id))]
pub async fn user_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Dashboard>, AppError> {
    let tasks = state
        .task
        .find_many(TaskFilter {
            assigned_to: Some(current_user.id),
            ..Default::default()
        })
        .await?;
    Ok(Json(dashboard(&tasks, Utc::now())))
}

#[derive(Serialize, Debug)]
pub struct UserTasksResponse {
    tasks: Vec<TaskDTO>,
}

#[instrument(skip(state, current_user, query), fields(caller_id = current_user.id, user_id = %user_id))]
pub async fn list_user_tasks(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<i64>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<UserTasksResponse>, AppError> {
    require_self_or_admin(&current_user, user_id)?;
    let tasks = state
        .task
        .find_many(TaskFilter {
            assigned_to: Some(user_id),
            status: query.status,
            priority: query.priority,
        })
        .await?;
    Ok(Json(UserTasksResponse {
        tasks: tasks.into_iter().map(TaskDTO::from).collect(),
    }))
}

#[instrument(skip(state), fields(task_id = %task_id))]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
) -> Result<Json<TaskDTO>, AppError> {
    Ok(Json(load_task(&state, task_id).await?.into()))
}

#[debug_handler]
#[instrument(skip(state, current_user, body), fields(user_id = current_user.id))]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateTaskRequestDTO>,
) -> Result<(StatusCode, Json<TaskMessageDTO>), AppError> {
    // 1. Only admins create tasks
    // 2. Validate the body, the project and every assignee
    // 3. Insert the task with its assignees
    // 4. Notify each assignee by email, failures are only logged
    require_admin(&current_user)?;
    body.validate()?;
    let project_name = ensure_project_exists(&state, body.project_id).await?;
    ensure_users_exist(&state, &body.assigned_to).await?;

    let task = state
        .task
        .create(&CreateTaskDTO {
            title: body.title,
            description: body.description.unwrap_or_default(),
            priority: body.priority.unwrap_or_default(),
            status: TaskStatus::Pending,
            due_date: body.due_date,
            created_by: current_user.id,
            project_id: body.project_id,
            assigned_to: body.assigned_to,
            todo_checklist: body.todo_checklist,
            progress: 0,
            attachments: body.attachments,
        })
        .await?;
    info!(task_id = task.id, "Task created");

    let assignment = TaskAssignment {
        title: &task.title,
        description: &task.description,
        priority: task.priority.as_str(),
        due_date: task.due_date,
        project_name: &project_name,
    };
    for assignee in &task.assigned_to {
        let email = task_assigned_email(&assignee.email, &assignee.name, &assignment);
        if let Err(e) = state.mailer.send(email) {
            error!("Failed to notify {}: {:?}", assignee.email, e);
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(TaskMessageDTO {
            message: "Task created successfully".to_string(),
            task: task.into(),
        }),
    ))
}

#[instrument(skip(state, current_user, body), fields(user_id = current_user.id, task_id = %task_id))]
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(task_id): Path<i64>,
    Json(body): Json<UpdateTaskRequestDTO>,
) -> Result<Json<TaskMessageDTO>, AppError> {
    require_admin(&current_user)?;
    let body = UpdateTaskRequestDTO {
        title: body.title.filter(|t| !t.trim().is_empty()),
        description: body.description.filter(|d| !d.is_empty()),
        ..body
    };
    body.validate()?;

    load_task(&state, task_id).await?;
    if let Some(ref assigned_to) = body.assigned_to {
        ensure_users_exist(&state, assigned_to).await?;
    }
    if let Some(project_id) = body.project_id {
        ensure_project_exists(&state, project_id).await?;
    }

    let task = state
        .task
        .update(&task_id, &UpdateTaskDTO::from(body))
        .await?;
    info!("Task updated");

    Ok(Json(TaskMessageDTO {
        message: "Task updated successfully".to_string(),
        task: task.into(),
    }))
}

#[instrument(skip(state, current_user), fields(user_id = current_user.id, task_id = %task_id))]
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(task_id): Path<i64>,
) -> Result<Json<MessageResponseDTO>, AppError> {
    require_admin(&current_user)?;
    state.task.delete(&task_id).await.map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::not_found("Task not found"),
        other => other.into(),
    })?;
    info!("Task deleted");
    Ok(Json(MessageResponseDTO::new("Task deleted successfully")))
}

#[instrument(skip(state, current_user, body), fields(user_id = current_user.id, task_id = %task_id))]
pub async fn update_task_status(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(task_id): Path<i64>,
    Json(body): Json<UpdateTaskStatusDTO>,
) -> Result<Json<TaskMessageDTO>, AppError> {
    let mut task = load_task(&state, task_id).await?;
    require_assignee_or_admin(&current_user, &task)?;

    task.apply_status(body.status.unwrap_or(task.status));
    let task = state.task.save_progress(&task).await?;

    Ok(Json(TaskMessageDTO {
        message: "Task status updated".to_string(),
        task: task.into(),
    }))
}

#[instrument(skip(state, current_user, body), fields(user_id = current_user.id, task_id = %task_id))]
pub async fn update_task_checklist(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(task_id): Path<i64>,
    Json(body): Json<UpdateChecklistDTO>,
) -> Result<Json<TaskMessageDTO>, AppError> {
    let mut task = load_task(&state, task_id).await?;
    require_assignee_or_admin(&current_user, &task)?;

    task.apply_checklist(body.todo_checklist);
    let task = state.task.save_progress(&task).await?;
    debug!(progress = task.progress, status = %task.status, "Checklist applied");

    Ok(Json(TaskMessageDTO {
        message: "Task checklist updated".to_string(),
        task: task.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{TaskPriority, UserRole, UserSummary};
    use sqlx::types::Json as SqlJson;

    fn user(id: i64, role: UserRole) -> User {
        let now = Utc::now();
        User {
            id,
            name: format!("User {id}"),
            email: format!("u{id}@orbit.test"),
            password: String::new(),
            profile_image_url: String::new(),
            role,
            reset_password_token: None,
            reset_password_expire: None,
            is_verified: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn task_assigned_to(user_id: i64) -> Task {
        let now = Utc::now();
        let assignee = user(user_id, UserRole::Member);
        Task {
            id: 9,
            title: "Ship".to_string(),
            description: String::new(),
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            due_date: None,
            created_by: None,
            project_id: None,
            project_name: None,
            todo_checklist: SqlJson(vec![]),
            progress: 0,
            attachments: SqlJson(vec![]),
            created_at: now,
            updated_at: now,
            assigned_to: vec![UserSummary::from(&assignee)],
        }
    }

    #[test]
    fn test_progress_updates_need_assignment_or_admin() {
        let task = task_assigned_to(2);
        assert!(require_assignee_or_admin(&user(2, UserRole::Member), &task).is_ok());
        assert!(require_assignee_or_admin(&user(1, UserRole::Admin), &task).is_ok());
        let err = require_assignee_or_admin(&user(3, UserRole::Member), &task).expect_err("403");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
