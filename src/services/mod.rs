//! Services module - HTTP handlers grouped by resource
//!
//! Every handler takes the shared state and, behind the authentication
//! middleware, the current [`User`](crate::entities::User) from the request
//! extensions. Admin-only handlers check the role themselves.

pub mod auth;
pub mod chat;
pub mod project;
pub mod report;
pub mod task;
pub mod user;

pub use auth::{
    change_password, forgot_password, get_profile, login_user, register_user, reset_password,
    update_profile, verify_user,
};
pub use chat::{get_messages, list_conversations, mark_conversation_read, send_message};
pub use project::{
    assign_tasks, assign_users, create_project, delete_project, get_admin_project_analytics,
    get_user_project_analytics, list_projects, list_user_projects, update_project,
};
pub use report::{export_projects, export_tasks, export_users};
pub use task::{
    admin_dashboard, create_task, delete_task, get_task, list_tasks, list_user_tasks,
    update_task, update_task_checklist, update_task_status, user_dashboard,
};
pub use user::{delete_user, get_user_by_id, list_members, list_other_users};

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
