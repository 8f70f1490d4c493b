//! Integration tests for the project endpoints
//!
//! Fixture projects: 1 "Website Redesign" (Bob, Charlie; tasks 1, 2),
//! 2 "Mobile App" (Bob; task 3), 3 "Legacy Cleanup" soft-deleted (Charlie; task 4).

mod common;

#[cfg(test)]
mod project_tests {
    use super::common::*;
    use axum::http::{StatusCode, header::AUTHORIZATION};
    use serde_json::{Value, json};
    use sqlx::SqlitePool;

    fn ids(values: &Value) -> Vec<i64> {
        values
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|v| v["_id"].as_i64())
            .collect()
    }

    // ============================================================
    // POST /api/projects
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_create_project(pool: SqlitePool) {
        let app = spawn_app(pool).await;

        let response = app
            .server
            .post("/api/projects")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .json(&json!({
                "name": "Data Platform",
                "description": "Warehouse and pipelines",
                "startDate": "2025-03-01",
                "endDate": "2025-12-31"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let project: Value = response.json();
        assert_eq!(project["name"], "Data Platform");
        assert_eq!(project["status"], "Not Started");
        assert_eq!(project["isDeleted"], false);
        assert_eq!(project["tasks"], json!([]));
        assert_eq!(project["assignedUsers"], json!([]));
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_create_project_rejections(pool: SqlitePool) {
        let app = spawn_app(pool).await;
        let body = json!({
            "name": "Backwards",
            "description": "Ends before it starts",
            "startDate": "2025-06-01",
            "endDate": "2025-01-01"
        });

        app.server
            .post("/api/projects")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .json(&body)
            .await
            .assert_status_bad_request();

        app.server
            .post("/api/projects")
            .add_header(AUTHORIZATION, bearer(BOB))
            .json(&body)
            .await
            .assert_status_forbidden();
    }

    // ============================================================
    // GET /api/projects
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_list_projects_skips_deleted(pool: SqlitePool) {
        let app = spawn_app(pool).await;

        let response = app
            .server
            .get("/api/projects")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .await;

        response.assert_status_ok();
        let projects: Value = response.json();
        assert_eq!(ids(&projects), vec![1, 2]);
        assert_eq!(ids(&projects[0]["tasks"]), vec![1, 2]);
        assert_eq!(projects[0]["tasks"][0]["status"], "In Progress");
        assert_eq!(projects[0]["assignedUsers"], json!([BOB, CHARLIE]));

        app.server
            .get("/api/projects")
            .add_header(AUTHORIZATION, bearer(BOB))
            .await
            .assert_status_forbidden();
    }

    // ============================================================
    // PUT and DELETE /api/projects/{id}
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_update_project(pool: SqlitePool) {
        let app = spawn_app(pool).await;

        let response = app
            .server
            .put("/api/projects/2")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .json(&json!({ "status": "In Progress", "description": "Beta release" }))
            .await;

        response.assert_status_ok();
        let project: Value = response.json();
        assert_eq!(project["status"], "In Progress");
        assert_eq!(project["description"], "Beta release");
        assert_eq!(project["name"], "Mobile App");

        // end date before the stored start date
        app.server
            .put("/api/projects/2")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .json(&json!({ "endDate": "2025-01-15" }))
            .await
            .assert_status_bad_request();

        app.server
            .put("/api/projects/99")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .json(&json!({ "name": "Missing" }))
            .await
            .assert_status_not_found();
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_soft_delete_project(pool: SqlitePool) {
        let app = spawn_app(pool).await;

        app.server
            .delete("/api/projects/2")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .await
            .assert_status_ok();

        let projects: Value = app
            .server
            .get("/api/projects")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .await
            .json();
        assert_eq!(ids(&projects), vec![1]);

        let bob: Value = app
            .server
            .get(&format!("/api/projects/user/{BOB}"))
            .add_header(AUTHORIZATION, bearer(BOB))
            .await
            .json();
        assert_eq!(bob["count"], 1);

        app.server
            .delete("/api/projects/99")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .await
            .assert_status_not_found();
    }

    // ============================================================
    // Assignment
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_assign_tasks(pool: SqlitePool) {
        let app = spawn_app(pool).await;

        let response = app
            .server
            .put("/api/projects/2/assign-tasks")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .json(&json!({ "taskIds": [2, 4] }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(ids(&body["project"]["tasks"]), vec![2, 3, 4]);

        let task: Value = app
            .server
            .get("/api/tasks/2")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .await
            .json();
        assert_eq!(task["project"]["name"], "Mobile App");

        app.server
            .put("/api/projects/99/assign-tasks")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .json(&json!({ "taskIds": [1] }))
            .await
            .assert_status_not_found();
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_assign_users_keeps_existing_members(pool: SqlitePool) {
        let app = spawn_app(pool).await;

        let response = app
            .server
            .put("/api/projects/2/assign-users")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .json(&json!({ "userIds": [DANA, BOB] }))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>()["project"]["assignedUsers"],
            json!([BOB, DANA])
        );
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_assign_users_rejections(pool: SqlitePool) {
        let app = spawn_app(pool).await;

        app.server
            .put("/api/projects/2/assign-users")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .json(&json!({ "userIds": [DANA, 99] }))
            .await
            .assert_status_bad_request();

        app.server
            .put("/api/projects/99/assign-users")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .json(&json!({ "userIds": [DANA] }))
            .await
            .assert_status_not_found();
    }

    // ============================================================
    // Per-user projects and analytics
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_user_projects_self_or_admin(pool: SqlitePool) {
        let app = spawn_app(pool).await;

        let charlie: Value = app
            .server
            .get(&format!("/api/projects/user/{CHARLIE}"))
            .add_header(AUTHORIZATION, bearer(CHARLIE))
            .await
            .json();
        assert_eq!(charlie["count"], 1, "deleted projects are excluded");
        assert_eq!(ids(&charlie["projects"]), vec![1]);

        app.server
            .get(&format!("/api/projects/user/{CHARLIE}"))
            .add_header(AUTHORIZATION, bearer(BOB))
            .await
            .assert_status_forbidden();

        app.server
            .get(&format!("/api/projects/user/{CHARLIE}"))
            .add_header(AUTHORIZATION, bearer(ALICE))
            .await
            .assert_status_ok();
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_user_project_analytics(pool: SqlitePool) {
        let app = spawn_app(pool).await;

        let response = app
            .server
            .get(&format!("/api/projects/user/{BOB}/analytics"))
            .add_header(AUTHORIZATION, bearer(BOB))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["userId"], BOB);
        assert_eq!(body["projectCount"], 2);

        let first = &body["projects"][0];
        assert_eq!(first["projectName"], "Website Redesign");
        assert_eq!(first["totalTasks"], 2);
        assert_eq!(first["projectStatus"], "In Progress");
        assert_eq!(
            first["statusCounts"],
            json!({ "Completed": 0, "In Progress": 1, "Pending": 1 })
        );

        app.server
            .get(&format!("/api/projects/user/{BOB}/analytics"))
            .add_header(AUTHORIZATION, bearer(DANA))
            .await
            .assert_status_forbidden();
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects", "tasks")))]
    async fn test_admin_project_analytics(pool: SqlitePool) {
        let app = spawn_app(pool).await;

        let response = app
            .server
            .get("/api/projects/admin/projectanalytics")
            .add_header(AUTHORIZATION, bearer(ALICE))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["totalProjects"], 2);
        assert_eq!(body["totalTasks"], 3);
        assert_eq!(
            body["taskStatusCounts"],
            json!({ "Completed": 1, "In Progress": 1, "Pending": 1 })
        );
        assert_eq!(
            body["projectStatusCounts"],
            json!({ "In Progress": 1, "Not Started": 1 })
        );

        let users = body["userAnalytics"].as_array().expect("userAnalytics");
        let bob = users.iter().find(|u| u["userId"] == BOB).expect("bob");
        assert_eq!(bob["projectsCount"], 2);
        let charlie = users.iter().find(|u| u["userId"] == CHARLIE).expect("charlie");
        assert_eq!(charlie["projectsCount"], 1);
        assert!(users.iter().all(|u| u["userId"] != DANA));

        app.server
            .get("/api/projects/admin/projectanalytics")
            .add_header(AUTHORIZATION, bearer(BOB))
            .await
            .assert_status_forbidden();
    }
}
