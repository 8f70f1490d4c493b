//! Application State - Shared state of the application
//!
//! Holds the repositories, the configuration needed by the handlers and the
//! map of users connected to the chat WebSocket.

use crate::core::Config;
use crate::mailer::{LogMailer, Mailer};
use crate::repositories::{MessageRepository, ProjectRepository, TaskRepository, UserRepository};
use crate::ws::usermap::UserMap;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Global state shared by every route and middleware
pub struct AppState {
    /// Users repository
    pub user: UserRepository,

    /// Projects repository
    pub project: ProjectRepository,

    /// Tasks repository
    pub task: TaskRepository,

    /// Chat messages repository
    pub msg: MessageRepository,

    /// Secret key for JWT tokens
    pub jwt_secret: String,

    /// Registering with this token grants the admin role
    pub admin_invite_token: Option<String>,

    /// Base URL of the web client, used in password reset links
    pub frontend_url: String,

    /// Outgoing email transport
    pub mailer: Arc<dyn Mailer>,

    /// Silence allowed on a WebSocket before the server closes it
    pub ws_idle_timeout: Duration,

    /// Concurrent map of users online on the chat WebSocket
    /// Key: user id, Value: sender for the user's WebSocket writer task
    pub users_online: UserMap,
}

impl AppState {
    /// Build the state, creating every repository on the shared pool.
    /// Emails go through a LogMailer until `with_mailer` replaces it.
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            user: UserRepository::new(pool.clone()),
            project: ProjectRepository::new(pool.clone()),
            task: TaskRepository::new(pool.clone()),
            msg: MessageRepository::new(pool),
            jwt_secret: config.jwt_secret.clone(),
            admin_invite_token: config.admin_invite_token.clone(),
            frontend_url: config.frontend_url.clone(),
            mailer: Arc::new(LogMailer::new(config.mail_from.clone())),
            ws_idle_timeout: Duration::from_secs(config.ws_idle_timeout_secs),
            users_online: UserMap::new(),
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}
