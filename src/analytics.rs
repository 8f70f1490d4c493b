//! Analytics - Aggregations behind the dashboards, project analytics and reports
//!
//! Everything here is a pure function over entities already loaded by the
//! repositories, so each aggregation is tested without a database.

use crate::entities::{Project, ProjectStatus, Task, TaskPriority, TaskStatus, User};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Number of tasks listed in a dashboard's `recentTasks`
pub const RECENT_TASKS_LIMIT: usize = 10;

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub all: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub completed_tasks: usize,
}

pub fn status_summary(tasks: &[Task]) -> StatusSummary {
    tasks.iter().fold(
        StatusSummary {
            all: tasks.len(),
            ..Default::default()
        },
        |mut acc, task| {
            match task.status {
                TaskStatus::Pending => acc.pending_tasks += 1,
                TaskStatus::InProgress => acc.in_progress_tasks += 1,
                TaskStatus::Completed => acc.completed_tasks += 1,
            }
            acc
        },
    )
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatistics {
    pub total_tasks: usize,
    pub pending_tasks: usize,
    pub completed_tasks: usize,
    pub over_due_tasks: usize,
}

/// Status distribution. Keys drop the spaces of the status names.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskDistribution {
    #[serde(rename = "Pending")]
    pub pending: usize,
    #[serde(rename = "InProgress")]
    pub in_progress: usize,
    #[serde(rename = "Completed")]
    pub completed: usize,
    #[serde(rename = "All")]
    pub all: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PriorityLevels {
    #[serde(rename = "Low")]
    pub low: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "High")]
    pub high: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCharts {
    pub task_distribution: TaskDistribution,
    pub task_priority_levels: PriorityLevels,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentTask {
    #[serde(rename = "_id")]
    pub id: i64,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub statistics: DashboardStatistics,
    pub charts: DashboardCharts,
    pub recent_tasks: Vec<RecentTask>,
}

/// Dashboard over `tasks`, evaluated at `now` for overdue detection
pub fn dashboard(tasks: &[Task], now: DateTime<Utc>) -> Dashboard {
    let summary = status_summary(tasks);
    let count_priority = |p: TaskPriority| tasks.iter().filter(|t| t.priority == p).count();

    let mut recent: Vec<&Task> = tasks.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let recent_tasks = recent
        .into_iter()
        .take(RECENT_TASKS_LIMIT)
        .map(|t| RecentTask {
            id: t.id,
            title: t.title.clone(),
            status: t.status,
            priority: t.priority,
            due_date: t.due_date,
            created_at: t.created_at,
        })
        .collect();

    Dashboard {
        statistics: DashboardStatistics {
            total_tasks: summary.all,
            pending_tasks: summary.pending_tasks,
            completed_tasks: summary.completed_tasks,
            over_due_tasks: tasks.iter().filter(|t| t.is_overdue(now)).count(),
        },
        charts: DashboardCharts {
            task_distribution: TaskDistribution {
                pending: summary.pending_tasks,
                in_progress: summary.in_progress_tasks,
                completed: summary.completed_tasks,
                all: summary.all,
            },
            task_priority_levels: PriorityLevels {
                low: count_priority(TaskPriority::Low),
                medium: count_priority(TaskPriority::Medium),
                high: count_priority(TaskPriority::High),
            },
        },
        recent_tasks,
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalytics {
    pub project_id: i64,
    pub project_name: String,
    pub total_tasks: usize,
    /// Always carries the three statuses, keyed by display name
    pub status_counts: BTreeMap<&'static str, usize>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub project_status: ProjectStatus,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProjectAnalytics {
    pub user_id: i64,
    pub project_count: usize,
    pub projects: Vec<ProjectAnalytics>,
}

/// Per-project task breakdown for the projects a user belongs to
pub fn user_project_analytics(user_id: i64, projects: &[Project]) -> UserProjectAnalytics {
    let projects = projects
        .iter()
        .map(|project| {
            let mut status_counts: BTreeMap<&'static str, usize> =
                TaskStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
            for task in &project.tasks {
                *status_counts.entry(task.status.as_str()).or_default() += 1;
            }
            ProjectAnalytics {
                project_id: project.id,
                project_name: project.name.clone(),
                total_tasks: project.tasks.len(),
                status_counts,
                start_date: project.start_date,
                end_date: project.end_date,
                project_status: project.status,
            }
        })
        .collect::<Vec<_>>();

    UserProjectAnalytics {
        user_id,
        project_count: projects.len(),
        projects,
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProjectCount {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub projects_count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminProjectAnalytics {
    pub total_projects: usize,
    pub total_tasks: usize,
    /// Only statuses that occur are present
    pub task_status_counts: BTreeMap<&'static str, usize>,
    pub project_status_counts: BTreeMap<&'static str, usize>,
    pub user_analytics: Vec<UserProjectCount>,
}

/// Totals over `projects`; `users` resolves member ids to names (unknown ids are skipped)
pub fn admin_project_analytics(projects: &[Project], users: &[User]) -> AdminProjectAnalytics {
    let mut task_status_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut project_status_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut memberships: HashMap<i64, usize> = HashMap::new();
    let mut total_tasks = 0;

    for project in projects {
        total_tasks += project.tasks.len();
        for task in &project.tasks {
            *task_status_counts.entry(task.status.as_str()).or_default() += 1;
        }
        for user_id in &project.assigned_users {
            *memberships.entry(*user_id).or_default() += 1;
        }
        *project_status_counts
            .entry(project.status.as_str())
            .or_default() += 1;
    }

    let user_analytics = users
        .iter()
        .filter_map(|user| {
            memberships.get(&user.id).map(|count| UserProjectCount {
                user_id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
                projects_count: *count,
            })
        })
        .collect();

    AdminProjectAnalytics {
        total_projects: projects.len(),
        total_tasks,
        task_status_counts,
        project_status_counts,
        user_analytics,
    }
}

/// Task counts of one user, per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

/// Count, for every user id, the tasks assigned to it
pub fn task_counts_by_assignee(tasks: &[Task]) -> HashMap<i64, TaskCounts> {
    let mut counts: HashMap<i64, TaskCounts> = HashMap::new();
    for task in tasks {
        for assignee in &task.assigned_to {
            let entry = counts.entry(assignee.id).or_default();
            entry.total += 1;
            match task.status {
                TaskStatus::Pending => entry.pending += 1,
                TaskStatus::InProgress => entry.in_progress += 1,
                TaskStatus::Completed => entry.completed += 1,
            }
        }
    }
    counts
}

/// Row of the user task report
#[derive(Debug, Clone, PartialEq)]
pub struct UserTaskRow {
    pub name: String,
    pub email: String,
    pub counts: TaskCounts,
}

/// One row per user, users without tasks included with zero counts
pub fn user_task_rows(users: &[User], tasks: &[Task]) -> Vec<UserTaskRow> {
    let counts = task_counts_by_assignee(tasks);
    users
        .iter()
        .map(|user| UserTaskRow {
            name: user.name.clone(),
            email: user.email.clone(),
            counts: counts.get(&user.id).copied().unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{TaskBrief, UserRole, UserSummary};
    use chrono::{Duration, TimeZone};
    use sqlx::types::Json;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 10, 0, 0).unwrap()
    }

    fn summary(id: i64) -> UserSummary {
        UserSummary {
            id,
            name: format!("User {id}"),
            email: format!("u{id}@orbit.test"),
            profile_image_url: String::new(),
        }
    }

    fn task(id: i64, status: TaskStatus, priority: TaskPriority, assignees: &[i64]) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            description: String::new(),
            priority,
            status,
            due_date: None,
            created_by: Some(1),
            project_id: None,
            project_name: None,
            todo_checklist: Json(vec![]),
            progress: 0,
            attachments: Json(vec![]),
            created_at: at(id as u32),
            updated_at: at(id as u32),
            assigned_to: assignees.iter().map(|id| summary(*id)).collect(),
        }
    }

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email: format!("{}@orbit.test", name.to_lowercase()),
            password: String::new(),
            profile_image_url: String::new(),
            role: UserRole::Member,
            reset_password_token: None,
            reset_password_expire: None,
            is_verified: true,
            last_login: None,
            created_at: at(1),
            updated_at: at(1),
        }
    }

    fn project(id: i64, status: ProjectStatus, members: &[i64], tasks: &[TaskStatus]) -> Project {
        Project {
            id,
            name: format!("Project {id}"),
            description: String::new(),
            start_date: at(1),
            end_date: at(28),
            status,
            is_deleted: false,
            created_at: at(1),
            updated_at: at(1),
            assigned_users: members.to_vec(),
            tasks: tasks
                .iter()
                .enumerate()
                .map(|(i, status)| TaskBrief {
                    id: id * 100 + i as i64,
                    project_id: id,
                    title: String::new(),
                    status: *status,
                })
                .collect(),
        }
    }

    #[test]
    fn test_status_summary_counts_each_status() {
        let tasks = vec![
            task(1, TaskStatus::Pending, TaskPriority::Low, &[]),
            task(2, TaskStatus::Pending, TaskPriority::Low, &[]),
            task(3, TaskStatus::Completed, TaskPriority::Low, &[]),
        ];
        assert_eq!(
            status_summary(&tasks),
            StatusSummary {
                all: 3,
                pending_tasks: 2,
                in_progress_tasks: 0,
                completed_tasks: 1,
            }
        );
    }

    #[test]
    fn test_dashboard_overdue_and_charts() {
        let now = at(20);
        let mut late = task(1, TaskStatus::InProgress, TaskPriority::High, &[]);
        late.due_date = Some(now - Duration::days(1));
        let mut done_late = task(2, TaskStatus::Completed, TaskPriority::Low, &[]);
        done_late.due_date = Some(now - Duration::days(3));
        let future = {
            let mut t = task(3, TaskStatus::Pending, TaskPriority::Medium, &[]);
            t.due_date = Some(now + Duration::days(3));
            t
        };

        let dash = dashboard(&[late, done_late, future], now);
        assert_eq!(dash.statistics.total_tasks, 3);
        assert_eq!(dash.statistics.over_due_tasks, 1);
        assert_eq!(dash.charts.task_distribution.in_progress, 1);
        assert_eq!(dash.charts.task_distribution.all, 3);
        assert_eq!(dash.charts.task_priority_levels.high, 1);
        assert_eq!(dash.recent_tasks[0].id, 3);
    }

    #[test]
    fn test_dashboard_serializes_chart_keys() {
        let dash = dashboard(&[], at(1));
        let json = serde_json::to_value(&dash).expect("json");
        let distribution = &json["charts"]["taskDistribution"];
        assert_eq!(distribution["InProgress"], 0);
        assert_eq!(distribution["All"], 0);
        assert_eq!(json["charts"]["taskPriorityLevels"]["Medium"], 0);
        assert_eq!(json["statistics"]["overDueTasks"], 0);
    }

    #[test]
    fn test_recent_tasks_capped_newest_first() {
        let tasks: Vec<Task> = (1..=12)
            .map(|id| task(id, TaskStatus::Pending, TaskPriority::Low, &[]))
            .collect();
        let dash = dashboard(&tasks, at(28));
        assert_eq!(dash.recent_tasks.len(), RECENT_TASKS_LIMIT);
        assert_eq!(dash.recent_tasks[0].id, 12);
        assert_eq!(dash.recent_tasks[9].id, 3);
    }

    #[test]
    fn test_user_project_analytics_always_has_every_status() {
        let projects = vec![project(
            1,
            ProjectStatus::InProgress,
            &[2],
            &[TaskStatus::Pending, TaskStatus::Pending],
        )];
        let analytics = user_project_analytics(2, &projects);
        assert_eq!(analytics.project_count, 1);
        let counts = &analytics.projects[0].status_counts;
        assert_eq!(counts["Pending"], 2);
        assert_eq!(counts["In Progress"], 0);
        assert_eq!(counts["Completed"], 0);
    }

    #[test]
    fn test_admin_analytics_totals() {
        let projects = vec![
            project(1, ProjectStatus::InProgress, &[2, 3], &[TaskStatus::Pending, TaskStatus::InProgress]),
            project(2, ProjectStatus::NotStarted, &[2], &[TaskStatus::Completed]),
        ];
        let users = vec![user(2, "Bob"), user(3, "Charlie"), user(4, "Dana")];
        let analytics = admin_project_analytics(&projects, &users);

        assert_eq!(analytics.total_projects, 2);
        assert_eq!(analytics.total_tasks, 3);
        assert_eq!(analytics.task_status_counts["In Progress"], 1);
        assert_eq!(analytics.project_status_counts["Not Started"], 1);
        assert!(!analytics.project_status_counts.contains_key("Completed"));

        let counts: Vec<(i64, usize)> = analytics
            .user_analytics
            .iter()
            .map(|u| (u.user_id, u.projects_count))
            .collect();
        assert_eq!(counts, vec![(2, 2), (3, 1)]);
    }

    #[test]
    fn test_user_task_rows_include_idle_users() {
        let tasks = vec![
            task(1, TaskStatus::Pending, TaskPriority::Low, &[2]),
            task(2, TaskStatus::Completed, TaskPriority::Low, &[2, 3]),
        ];
        let rows = user_task_rows(&[user(2, "Bob"), user(3, "Charlie"), user(4, "Dana")], &tasks);
        assert_eq!(rows[0].counts.total, 2);
        assert_eq!(rows[0].counts.pending, 1);
        assert_eq!(rows[1].counts.completed, 1);
        assert_eq!(rows[2].counts, TaskCounts::default());
    }
}
