//! TaskRepository - Tasks with their assignees and project name

use super::{Create, Delete, IN_LIST_CHUNK, Read, Update};
use crate::dtos::{CreateTaskDTO, UpdateTaskDTO};
use crate::entities::{Task, TaskPriority, TaskStatus, UserSummary};
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{Error, FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

const TASK_SELECT: &str = "SELECT t.id, t.title, t.description, t.priority, t.status, t.due_date, \
    t.created_by, t.project_id, p.name AS project_name, t.todo_checklist, t.progress, \
    t.attachments, t.created_at, t.updated_at \
    FROM tasks t LEFT JOIN projects p ON p.id = t.project_id";

/// Optional filters of a task listing, all combined with AND
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    pub assigned_to: Option<i64>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

#[derive(FromRow)]
struct AssigneeRow {
    task_id: i64,
    #[sqlx(flatten)]
    user: UserSummary,
}

pub struct TaskRepository {
    connection_pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Tasks matching `filter`, newest first, assignees loaded
    #[instrument(skip(self))]
    pub async fn find_many(&self, filter: TaskFilter) -> Result<Vec<Task>, Error> {
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(TASK_SELECT);
        query_builder.push(" WHERE 1 = 1");
        if let Some(user_id) = filter.assigned_to {
            query_builder.push(
                " AND t.id IN (SELECT task_id FROM task_assignees WHERE user_id = ",
            );
            query_builder.push_bind(user_id);
            query_builder.push(")");
        }
        if let Some(status) = filter.status {
            query_builder.push(" AND t.status = ");
            query_builder.push_bind(status);
        }
        if let Some(priority) = filter.priority {
            query_builder.push(" AND t.priority = ");
            query_builder.push_bind(priority);
        }
        query_builder.push(" ORDER BY t.created_at DESC, t.id DESC");

        let tasks = query_builder
            .build_query_as::<Task>()
            .fetch_all(&self.connection_pool)
            .await?;
        debug!("{} tasks found", tasks.len());
        self.load_assignees(tasks).await
    }

    /// Persist the outcome of a checklist or status change
    #[instrument(skip(self, task), fields(task_id = task.id))]
    pub async fn save_progress(&self, task: &Task) -> Result<Task, Error> {
        let result = sqlx::query(
            "UPDATE tasks SET status = ?, progress = ?, todo_checklist = ?, updated_at = ? WHERE id = ?",
        )
        .bind(task.status)
        .bind(task.progress)
        .bind(&task.todo_checklist)
        .bind(Utc::now())
        .bind(task.id)
        .execute(&self.connection_pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        info!(status = %task.status, progress = task.progress, "Task progress saved");
        self.read(&task.id).await?.ok_or(Error::RowNotFound)
    }

    async fn load_assignees(&self, mut tasks: Vec<Task>) -> Result<Vec<Task>, Error> {
        if tasks.is_empty() {
            return Ok(tasks);
        }
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();

        let mut by_task: HashMap<i64, Vec<UserSummary>> = HashMap::new();
        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT ta.task_id, u.id, u.name, u.email, u.profile_image_url \
                 FROM task_assignees ta JOIN users u ON u.id = ta.user_id WHERE ta.task_id IN (",
            );
            let mut separated = query_builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            query_builder.push(") ORDER BY u.name, u.id");

            let rows = query_builder
                .build_query_as::<AssigneeRow>()
                .fetch_all(&self.connection_pool)
                .await?;
            for row in rows {
                by_task.entry(row.task_id).or_default().push(row.user);
            }
        }

        for task in tasks.iter_mut() {
            task.assigned_to = by_task.remove(&task.id).unwrap_or_default();
        }
        Ok(tasks)
    }
}

/// Replace the assignee set of a task inside an open transaction
async fn replace_assignees(
    conn: &mut SqliteConnection,
    task_id: i64,
    user_ids: &[i64],
) -> Result<(), Error> {
    sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *conn)
        .await?;
    for user_id in user_ids {
        sqlx::query("INSERT OR IGNORE INTO task_assignees (task_id, user_id) VALUES (?, ?)")
            .bind(task_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

impl Create<Task, CreateTaskDTO> for TaskRepository {
    #[instrument(skip(self, data), fields(title = %data.title, project_id = data.project_id))]
    async fn create(&self, data: &CreateTaskDTO) -> Result<Task, Error> {
        let now = Utc::now();
        let mut tx = self.connection_pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO tasks (title, description, priority, status, due_date, created_by, project_id, \
             todo_checklist, progress, attachments, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.priority)
        .bind(data.status)
        .bind(data.due_date)
        .bind(data.created_by)
        .bind(data.project_id)
        .bind(Json(&data.todo_checklist))
        .bind(data.progress)
        .bind(Json(&data.attachments))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let new_id = result.last_insert_rowid();
        replace_assignees(&mut tx, new_id, &data.assigned_to).await?;
        tx.commit().await?;

        info!("Task created with id {}", new_id);
        self.read(&new_id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<Task, i64> for TaskRepository {
    #[instrument(skip(self), fields(task_id = %id))]
    async fn read(&self, id: &i64) -> Result<Option<Task>, Error> {
        let sql = format!("{TASK_SELECT} WHERE t.id = ?");
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await?;

        match task {
            Some(task) => Ok(self.load_assignees(vec![task]).await?.pop()),
            None => Ok(None),
        }
    }
}

impl Update<Task, UpdateTaskDTO, i64> for TaskRepository {
    #[instrument(skip(self, data), fields(task_id = %id))]
    async fn update(&self, id: &i64, data: &UpdateTaskDTO) -> Result<Task, Error> {
        let mut tx = self.connection_pool.begin().await?;

        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref title) = data.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }
        if let Some(ref description) = data.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }
        if let Some(priority) = data.priority {
            separated.push("priority = ");
            separated.push_bind_unseparated(priority);
        }
        if let Some(due_date) = data.due_date {
            separated.push("due_date = ");
            separated.push_bind_unseparated(due_date);
        }
        if let Some(project_id) = data.project_id {
            separated.push("project_id = ");
            separated.push_bind_unseparated(project_id);
        }
        if let Some(ref checklist) = data.todo_checklist {
            separated.push("todo_checklist = ");
            separated.push_bind_unseparated(Json(checklist.as_slice()));
        }
        if let Some(ref attachments) = data.attachments {
            separated.push("attachments = ");
            separated.push_bind_unseparated(Json(attachments.as_slice()));
        }
        separated.push("updated_at = ");
        separated.push_bind_unseparated(Utc::now());

        query_builder.push(" WHERE id = ");
        query_builder.push_bind(*id);

        let result = query_builder.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }

        if let Some(ref assigned_to) = data.assigned_to {
            debug!("Replacing assignees with {} users", assigned_to.len());
            replace_assignees(&mut tx, *id, assigned_to).await?;
        }
        tx.commit().await?;

        info!("Task updated");
        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}

impl Delete<i64> for TaskRepository {
    #[instrument(skip(self), fields(task_id = %id))]
    async fn delete(&self, id: &i64) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        info!("Task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tasks: &[Task]) -> Vec<i64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_find_many_orders_newest_first(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = TaskRepository::new(pool);
        let tasks = repo.find_many(TaskFilter::default()).await?;
        assert_eq!(ids(&tasks), vec![4, 3, 2, 1]);

        let first = tasks.iter().find(|t| t.id == 1).expect("task 1");
        assert_eq!(first.project_name.as_deref(), Some("Website Redesign"));
        assert_eq!(first.assigned_to.len(), 1);
        assert_eq!(first.assigned_to[0].name, "Bob Builder");
        assert_eq!(first.todo_checklist.len(), 2);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_filters_combine(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = TaskRepository::new(pool);
        let charlie = repo
            .find_many(TaskFilter {
                assigned_to: Some(3),
                ..Default::default()
            })
            .await?;
        assert_eq!(ids(&charlie), vec![4, 3, 2]);

        let pending = repo
            .find_many(TaskFilter {
                assigned_to: Some(3),
                status: Some(TaskStatus::Pending),
                priority: Some(TaskPriority::Medium),
            })
            .await?;
        assert_eq!(ids(&pending), vec![4, 2]);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_create_with_assignees(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = TaskRepository::new(pool);
        let task = repo
            .create(&CreateTaskDTO {
                title: "Write tests".to_string(),
                description: String::new(),
                priority: TaskPriority::High,
                status: TaskStatus::Pending,
                due_date: None,
                created_by: 1,
                project_id: 2,
                assigned_to: vec![3, 2, 3],
                todo_checklist: vec![],
                progress: 0,
                attachments: vec![],
            })
            .await?;
        assert_eq!(task.project_name.as_deref(), Some("Mobile App"));
        let assignees: Vec<i64> = task.assigned_to.iter().map(|u| u.id).collect();
        assert_eq!(assignees, vec![2, 3]);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_update_replaces_assignees(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = TaskRepository::new(pool);
        let task = repo
            .update(
                &2,
                &UpdateTaskDTO {
                    title: Some("Implement SSO".to_string()),
                    assigned_to: Some(vec![4]),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(task.title, "Implement SSO");
        assert_eq!(task.assigned_to.len(), 1);
        assert_eq!(task.assigned_to[0].id, 4);
        assert_eq!(task.description, "Login and registration");

        assert!(matches!(
            repo.update(&99, &UpdateTaskDTO::default()).await,
            Err(Error::RowNotFound)
        ));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_save_progress_roundtrips_checklist(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = TaskRepository::new(pool);
        let mut task = repo.read(&1).await?.expect("task");
        task.apply_status(TaskStatus::Completed);
        let saved = repo.save_progress(&task).await?;
        assert_eq!(saved.status, TaskStatus::Completed);
        assert_eq!(saved.progress, 100);
        assert!(saved.todo_checklist.iter().all(|i| i.completed));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_delete_task(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = TaskRepository::new(pool);
        repo.delete(&1).await?;
        assert!(repo.read(&1).await?.is_none());
        assert!(matches!(repo.delete(&1).await, Err(Error::RowNotFound)));
        Ok(())
    }
}
