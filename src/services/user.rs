//! User services - Member listing, lookup and deletion

use crate::analytics::task_counts_by_assignee;
use crate::core::{AppError, AppState, require_admin};
use crate::dtos::{MemberDTO, MessageResponseDTO, UserDTO};
use crate::entities::User;
use crate::repositories::{Delete, Read, TaskFilter};
use axum::{
    Extension,
    extract::{Json, Path, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Every member with the number of tasks assigned to them per status
#[instrument(skip(state, current_user), fields(user_id = current_user.id))]
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<MemberDTO>>, AppError> {
    let members = state.user.find_members().await?;
    let tasks = state.task.find_many(TaskFilter::default()).await?;
    let counts = task_counts_by_assignee(&tasks);
    debug!("{} members, {} tasks", members.len(), tasks.len());

    let members = members
        .into_iter()
        .map(|member| {
            let c = counts.get(&member.id).copied().unwrap_or_default();
            MemberDTO {
                user: UserDTO::from(member),
                pending_tasks: c.pending,
                in_progress_tasks: c.in_progress,
                completed_tasks: c.completed,
            }
        })
        .collect();
    Ok(Json(members))
}

/// Everyone except the caller, for the chat user picker
#[instrument(skip(state, current_user), fields(user_id = current_user.id))]
pub async fn list_other_users(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<UserDTO>>, AppError> {
    let users = state.user.find_all_except(current_user.id).await?;
    info!("Found {} users", users.len());
    Ok(Json(users.into_iter().map(UserDTO::from).collect()))
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn get_user_by_id(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserDTO>, AppError> {
    match state.user.read(&user_id).await? {
        Some(user) => Ok(Json(UserDTO::from(user))),
        None => {
            warn!("User not found");
            Err(AppError::not_found("User not found"))
        }
    }
}

#[instrument(skip(state, current_user), fields(admin_id = current_user.id, user_id = %user_id))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<i64>,
) -> Result<Json<MessageResponseDTO>, AppError> {
    require_admin(&current_user)?;
    if current_user.id == user_id {
        warn!("Admin attempted to delete their own account");
        return Err(AppError::bad_request("You cannot delete your own account"));
    }

    state
        .user
        .delete(&user_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::not_found("User not found"),
            other => other.into(),
        })?;
    info!("User deleted");

    Ok(Json(MessageResponseDTO::new("User deleted successfully")))
}
