//! ProjectRepository - Projects, their members and linked tasks

use super::{Create, Delete, IN_LIST_CHUNK, Read, Update};
use crate::dtos::{CreateProjectDTO, UpdateProjectDTO};
use crate::entities::{Project, TaskBrief};
use chrono::Utc;
use sqlx::{Error, FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

const PROJECT_COLUMNS: &str =
    "id, name, description, start_date, end_date, status, is_deleted, created_at, updated_at";

#[derive(FromRow)]
struct MemberRow {
    project_id: i64,
    user_id: i64,
}

pub struct ProjectRepository {
    connection_pool: SqlitePool,
}

impl ProjectRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Non-deleted projects, oldest first
    #[instrument(skip(self))]
    pub async fn find_active(&self) -> Result<Vec<Project>, Error> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE is_deleted = 0 ORDER BY created_at, id"
        );
        let projects = sqlx::query_as::<_, Project>(&sql)
            .fetch_all(&self.connection_pool)
            .await?;
        self.load_relations(projects).await
    }

    /// Every project, soft-deleted ones included
    #[instrument(skip(self))]
    pub async fn find_all_including_deleted(&self) -> Result<Vec<Project>, Error> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at, id");
        let projects = sqlx::query_as::<_, Project>(&sql)
            .fetch_all(&self.connection_pool)
            .await?;
        self.load_relations(projects).await
    }

    /// Non-deleted projects `user_id` is a member of
    #[instrument(skip(self))]
    pub async fn find_by_member(&self, user_id: i64) -> Result<Vec<Project>, Error> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE is_deleted = 0 AND id IN (SELECT project_id FROM project_members WHERE user_id = ?) \
             ORDER BY created_at, id"
        );
        let projects = sqlx::query_as::<_, Project>(&sql)
            .bind(user_id)
            .fetch_all(&self.connection_pool)
            .await?;
        self.load_relations(projects).await
    }

    /// Add members, keeping the existing ones. Already present ids are ignored.
    #[instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    pub async fn assign_users(&self, project_id: i64, user_ids: &[i64]) -> Result<Project, Error> {
        let mut tx = self.connection_pool.begin().await?;
        for user_id in user_ids {
            sqlx::query("INSERT OR IGNORE INTO project_members (project_id, user_id) VALUES (?, ?)")
                .bind(project_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Users assigned to project {}", project_id);
        self.read(&project_id).await?.ok_or(Error::RowNotFound)
    }

    /// Point the given tasks at this project. Unknown task ids are skipped.
    #[instrument(skip(self, task_ids), fields(count = task_ids.len()))]
    pub async fn assign_tasks(&self, project_id: i64, task_ids: &[i64]) -> Result<Project, Error> {
        if !task_ids.is_empty() {
            let now = Utc::now();
            let mut tx = self.connection_pool.begin().await?;
            let mut linked = 0;
            for chunk in task_ids.chunks(IN_LIST_CHUNK) {
                let mut query_builder: QueryBuilder<Sqlite> =
                    QueryBuilder::new("UPDATE tasks SET project_id = ");
                query_builder.push_bind(project_id);
                query_builder.push(", updated_at = ");
                query_builder.push_bind(now);
                query_builder.push(" WHERE id IN (");
                let mut separated = query_builder.separated(", ");
                for id in chunk {
                    separated.push_bind(*id);
                }
                separated.push_unseparated(")");

                linked += query_builder.build().execute(&mut *tx).await?.rows_affected();
            }
            tx.commit().await?;
            debug!("{} tasks linked to project {}", linked, project_id);
        }
        self.read(&project_id).await?.ok_or(Error::RowNotFound)
    }

    /// Fill `assigned_users` and `tasks` for a batch of projects, two queries per chunk of ids
    async fn load_relations(&self, mut projects: Vec<Project>) -> Result<Vec<Project>, Error> {
        if projects.is_empty() {
            return Ok(projects);
        }
        let ids: Vec<i64> = projects.iter().map(|p| p.id).collect();

        let mut members_by_project: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut tasks_by_project: HashMap<i64, Vec<TaskBrief>> = HashMap::new();
        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let mut members_query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT project_id, user_id FROM project_members WHERE project_id IN (",
            );
            let mut separated = members_query.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            members_query.push(") ORDER BY user_id");
            let members = members_query
                .build_query_as::<MemberRow>()
                .fetch_all(&self.connection_pool)
                .await?;
            for row in members {
                members_by_project
                    .entry(row.project_id)
                    .or_default()
                    .push(row.user_id);
            }

            let mut tasks_query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT id, project_id, title, status FROM tasks WHERE project_id IN (",
            );
            let mut separated = tasks_query.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            tasks_query.push(") ORDER BY created_at, id");
            let tasks = tasks_query
                .build_query_as::<TaskBrief>()
                .fetch_all(&self.connection_pool)
                .await?;
            for task in tasks {
                tasks_by_project.entry(task.project_id).or_default().push(task);
            }
        }

        for project in projects.iter_mut() {
            project.assigned_users = members_by_project.remove(&project.id).unwrap_or_default();
            project.tasks = tasks_by_project.remove(&project.id).unwrap_or_default();
        }
        Ok(projects)
    }
}

impl Create<Project, CreateProjectDTO> for ProjectRepository {
    #[instrument(skip(self, data), fields(name = %data.name))]
    async fn create(&self, data: &CreateProjectDTO) -> Result<Project, Error> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO projects (name, description, start_date, end_date, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.status)
        .bind(now)
        .bind(now)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_rowid();
        info!("Project created with id {}", new_id);
        self.read(&new_id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<Project, i64> for ProjectRepository {
    /// Soft-deleted projects are still returned here
    #[instrument(skip(self), fields(project_id = %id))]
    async fn read(&self, id: &i64) -> Result<Option<Project>, Error> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?");
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await?;

        match project {
            Some(project) => Ok(self.load_relations(vec![project]).await?.pop()),
            None => Ok(None),
        }
    }
}

impl Update<Project, UpdateProjectDTO, i64> for ProjectRepository {
    #[instrument(skip(self, data), fields(project_id = %id))]
    async fn update(&self, id: &i64, data: &UpdateProjectDTO) -> Result<Project, Error> {
        let current = self.read(id).await?.ok_or(Error::RowNotFound)?;
        if data.is_empty() {
            debug!("No fields to update, returning current project");
            return Ok(current);
        }

        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE projects SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref name) = data.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }
        if let Some(ref description) = data.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }
        if let Some(start_date) = data.start_date {
            separated.push("start_date = ");
            separated.push_bind_unseparated(start_date);
        }
        if let Some(end_date) = data.end_date {
            separated.push("end_date = ");
            separated.push_bind_unseparated(end_date);
        }
        if let Some(status) = data.status {
            separated.push("status = ");
            separated.push_bind_unseparated(status);
        }
        separated.push("updated_at = ");
        separated.push_bind_unseparated(Utc::now());

        query_builder.push(" WHERE id = ");
        query_builder.push_bind(*id);
        query_builder.build().execute(&self.connection_pool).await?;

        info!("Project updated");
        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}

impl Delete<i64> for ProjectRepository {
    /// Soft delete: the row stays, flagged as deleted
    #[instrument(skip(self), fields(project_id = %id))]
    async fn delete(&self, id: &i64) -> Result<(), Error> {
        let result = sqlx::query("UPDATE projects SET is_deleted = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        info!("Project soft-deleted");
        Ok(())
    }
}
