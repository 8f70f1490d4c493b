//! Repositories module - Database access for every entity
//!
//! Queries are written with the runtime `sqlx::query_as` API and mapped onto
//! entities through `FromRow`, so the crate builds without a live database.
//! Dynamic statements (partial updates, optional filters, `IN` lists) go
//! through `sqlx::QueryBuilder`.

pub mod message;
pub mod project;
pub mod task;
pub mod traits;
pub mod user;

pub use traits::{Create, Delete, Read, Update};

/// Most ids bound into a single `IN (...)` list. SQLite caps the number of
/// host parameters per statement, so longer lists are split into chunks.
pub(crate) const IN_LIST_CHUNK: usize = 500;

pub use message::MessageRepository;
pub use project::ProjectRepository;
pub use task::{TaskFilter, TaskRepository};
pub use user::UserRepository;
