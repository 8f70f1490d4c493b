//! Orbit server library - exposes the modules for the binary and the tests

pub mod analytics;
pub mod core;
pub mod db;
pub mod dtos;
pub mod entities;
pub mod export;
pub mod mailer;
pub mod repositories;
pub mod services;
pub mod ws;

pub use core::{AppError, AppState, auth, config};
pub use services::root;

use axum::{
    Router, middleware,
    routing::{any, get, post, put},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the application router, every API route under `/api`
pub fn create_router(state: Arc<AppState>) -> Router {
    use core::authentication_middleware;
    use ws::ws_handler;

    let api = Router::new()
        .nest("/auth", configure_auth_routes(state.clone()))
        .nest("/users", configure_user_routes(state.clone()))
        .nest("/tasks", configure_task_routes(state.clone()))
        .nest("/projects", configure_project_routes(state.clone()))
        .nest("/reports", configure_report_routes(state.clone()))
        .nest("/chat", configure_chat_routes(state.clone()))
        .route(
            "/ws",
            any(ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                authentication_middleware,
            )),
        );

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Auth routes: registration, login and password recovery are public
fn configure_auth_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    let public_routes = Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/{token}", post(reset_password));

    let private_routes = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", put(change_password).post(change_password))
        .route("/verify-user/{id}", put(verify_user))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    public_routes.merge(private_routes)
}

fn configure_user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_members))
        .route("/all", get(list_other_users))
        .route("/{id}", get(get_user_by_id).delete(delete_user))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_task_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/dashboard-data", get(admin_dashboard))
        .route("/user-dashboard-data", get(user_dashboard))
        .route("/user/{user_id}", get(list_user_tasks))
        .route(
            "/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/{id}/status", put(update_task_status))
        .route("/{id}/todo", put(update_task_checklist))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_project_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/admin/projectanalytics", get(get_admin_project_analytics))
        .route("/user/{user_id}", get(list_user_projects))
        .route("/user/{user_id}/analytics", get(get_user_project_analytics))
        .route("/{id}", put(update_project).delete(delete_project))
        .route("/{id}/assign-tasks", put(assign_tasks))
        .route("/{id}/assign-users", put(assign_users))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Report routes: admins only, checked by a dedicated layer
fn configure_report_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::{admin_only_middleware, authentication_middleware};
    use services::*;

    Router::new()
        .route("/export/tasks", get(export_tasks))
        .route("/export/users", get(export_users))
        .route("/export/projects", get(export_projects))
        .layer(middleware::from_fn(admin_only_middleware))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_chat_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/conversations", get(list_conversations))
        .route(
            "/{peer_id}/messages",
            get(get_messages).post(send_message),
        )
        .route("/{peer_id}/read", put(mark_conversation_read))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
