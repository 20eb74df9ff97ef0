//! Task search integration tests
//!
//! Require PostgreSQL: `DATABASE_URL=... cargo test -- --ignored`

mod common;

use chrono::{Duration, Utc};
use common::{connect, create_task, create_user, new_task};
use sqlx::PgPool;
use tasker_shared::{
    models::task::TaskStatus,
    services::search::{search_tasks, TaskFilter},
};

fn titles(tasks: &[tasker_shared::models::task::TaskDetails]) -> Vec<&str> {
    tasks.iter().map(|t| t.title.as_str()).collect()
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn unknown_status_matches_nothing(pool: PgPool) {
    let a = create_user(&pool, "ada").await;
    create_task(&pool, a, new_task("Anything", 2, Vec::new())).await;

    let found = search_tasks(
        &pool,
        a,
        TaskFilter {
            status: Some("INVALID".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(found.is_empty());
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn union_of_created_and_assigned_without_duplicates(pool: PgPool) {
    let a = create_user(&pool, "ada").await;
    let b = create_user(&pool, "bob").await;
    connect(&pool, a, b).await;

    // created by a, assigned to b
    create_task(&pool, a, new_task("delegated", 3, vec![b])).await;
    // created by a, assigned to a
    create_task(&pool, a, new_task("own", 1, Vec::new())).await;
    // created by b, assigned to a
    create_task(&pool, b, new_task("received", 2, vec![a, b])).await;
    // created by b, assigned to b only
    create_task(&pool, b, new_task("unrelated", 2, Vec::new())).await;

    let found = search_tasks(&pool, a, TaskFilter::default()).await.unwrap();
    assert_eq!(titles(&found), vec!["own", "received", "delegated"]);

    let received = found.iter().find(|t| t.title == "received").unwrap();
    assert_eq!(received.assignees.len(), 2);
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn filters_narrow_the_result(pool: PgPool) {
    let a = create_user(&pool, "ada").await;

    let mut report = new_task("Quarterly Report", 3, Vec::new());
    report.project = Some("finance".to_string());
    report.description = Some("Numbers for Q3".to_string());
    report.estimated_days = Some(2.0);
    create_task(&pool, a, report).await;

    let mut done = new_task("Expense report", 10, Vec::new());
    done.status = TaskStatus::Done;
    create_task(&pool, a, done).await;

    create_task(&pool, a, new_task("Groceries", 1, Vec::new())).await;

    let search = |filter: TaskFilter| {
        let pool = pool.clone();
        async move { search_tasks(&pool, a, filter).await.unwrap() }
    };

    let found = search(TaskFilter {
        title: Some("REPORT".to_string()),
        ..Default::default()
    })
    .await;
    assert_eq!(titles(&found), vec!["Quarterly Report", "Expense report"]);

    let found = search(TaskFilter {
        title: Some("report".to_string()),
        status: Some("DONE".to_string()),
        ..Default::default()
    })
    .await;
    assert_eq!(titles(&found), vec!["Expense report"]);

    let found = search(TaskFilter {
        project: Some("finance".to_string()),
        description: Some("q3".to_string()),
        estimated_days: Some(2.0),
        ..Default::default()
    })
    .await;
    assert_eq!(titles(&found), vec!["Quarterly Report"]);

    let found = search(TaskFilter {
        deadline: Some(Utc::now() + Duration::days(5)),
        ..Default::default()
    })
    .await;
    assert_eq!(titles(&found), vec!["Groceries", "Quarterly Report"]);

    let found = search(TaskFilter {
        creator: Some(a),
        ..Default::default()
    })
    .await;
    assert_eq!(found.len(), 3);
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn like_metacharacters_match_literally(pool: PgPool) {
    let a = create_user(&pool, "ada").await;
    create_task(&pool, a, new_task("Reach 100% coverage", 2, Vec::new())).await;
    create_task(&pool, a, new_task("Reach 1000 users", 2, Vec::new())).await;

    let found = search_tasks(
        &pool,
        a,
        TaskFilter {
            title: Some("100%".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(titles(&found), vec!["Reach 100% coverage"]);
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn extra_assignees_only_widen_through_connections(pool: PgPool) {
    let a = create_user(&pool, "ada").await;
    let friend = create_user(&pool, "bob").await;
    let stranger = create_user(&pool, "eve").await;
    connect(&pool, a, friend).await;

    create_task(&pool, friend, new_task("friend's work", 2, Vec::new())).await;
    create_task(&pool, stranger, new_task("stranger's work", 2, Vec::new())).await;

    let found = search_tasks(
        &pool,
        a,
        TaskFilter {
            assignees: vec![friend, stranger],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(titles(&found), vec!["friend's work"]);
}
