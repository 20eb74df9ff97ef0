//! Task and assignment integration tests
//!
//! Require PostgreSQL: `DATABASE_URL=... cargo test -- --ignored`

mod common;

use chrono::{Duration, Utc};
use common::{
    connect, create_task, create_user, link_calendar, new_task, FailingCalendar, RecordingCalendar,
};
use sqlx::PgPool;
use tasker_shared::{
    calendar::NoopCalendar,
    error::DomainError,
    models::{task::Task, task_assignment::TaskAssignment},
    services::{
        connections,
        tasks::{self, TaskChanges, TaskError},
    },
};
use uuid::Uuid;

async fn task_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn empty_assignees_assign_the_creator(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;

    let task = create_task(&pool, creator, new_task("Write report", 3, Vec::new())).await;
    let details = tasks::get_task(&pool, creator, task.id).await.unwrap();

    assert_eq!(details.creator.id, creator);
    assert_eq!(
        details.assignees.iter().map(|u| u.id).collect::<Vec<_>>(),
        vec![creator]
    );
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn past_deadline_is_rejected(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;

    let mut input = new_task("Too late", 0, Vec::new());
    input.deadline = Utc::now() - Duration::minutes(1);

    let err = tasks::create_task(&pool, &NoopCalendar, creator, input)
        .await
        .unwrap_err();
    assert_eq!(err.code().to_string(), "createTask.invalidDeadline");
    assert_eq!(task_count(&pool).await, 0);
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn long_title_and_project_are_stored(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;
    let title = "x".repeat(300);
    let project = "p".repeat(400);

    let mut input = new_task(&title, 3, Vec::new());
    input.project = Some(project.clone());
    let task = create_task(&pool, creator, input).await;
    assert_eq!(task.title, title);
    assert_eq!(task.project.as_deref(), Some(project.as_str()));

    let longer = "y".repeat(1000);
    tasks::edit_task(
        &pool,
        &NoopCalendar,
        task.id,
        creator,
        TaskChanges {
            title: Some(longer.clone()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(tasks::get_task(&pool, creator, task.id).await.unwrap().title, longer);
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn unknown_creator_is_rejected(pool: PgPool) {
    let err = tasks::create_task(&pool, &NoopCalendar, Uuid::new_v4(), new_task("x", 1, Vec::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidCreator));
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn unconnected_assignee_creates_nothing(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;
    let friend = create_user(&pool, "bob").await;
    let stranger = create_user(&pool, "eve").await;
    connect(&pool, creator, friend).await;

    let err = tasks::create_task(
        &pool,
        &NoopCalendar,
        creator,
        new_task("Plan", 2, vec![friend, stranger]),
    )
    .await
    .unwrap_err();

    assert_eq!(err.code().to_string(), "createTask.invalidAssignees");
    assert_eq!(task_count(&pool).await, 0);
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn pending_request_does_not_allow_assignment(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;
    let other = create_user(&pool, "bob").await;
    connections::create_connection(&pool, creator, other).await.unwrap();

    let err = tasks::create_task(&pool, &NoopCalendar, creator, new_task("Plan", 2, vec![other]))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidAssignees));
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn duplicate_assignees_are_collapsed(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;
    let friend = create_user(&pool, "bob").await;
    connect(&pool, creator, friend).await;

    let task = create_task(&pool, creator, new_task("Pair", 2, vec![friend, friend, creator])).await;

    let mut assignees = TaskAssignment::assignee_ids(&pool, task.id).await.unwrap();
    assignees.sort();
    let mut expected = vec![friend, creator];
    expected.sort();
    assert_eq!(assignees, expected);
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn removing_every_assignee_leaves_the_editor(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;
    let friend = create_user(&pool, "bob").await;
    connect(&pool, creator, friend).await;

    let task = create_task(&pool, creator, new_task("Review", 2, vec![friend])).await;

    tasks::edit_task(
        &pool,
        &NoopCalendar,
        task.id,
        creator,
        TaskChanges {
            remove_assignees: vec![friend],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(
        TaskAssignment::assignee_ids(&pool, task.id).await.unwrap(),
        vec![creator]
    );
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn edit_updates_fields_and_assignees_together(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;
    let friend = create_user(&pool, "bob").await;
    connect(&pool, creator, friend).await;

    let task = create_task(&pool, creator, new_task("Draft", 2, Vec::new())).await;

    tasks::edit_task(
        &pool,
        &NoopCalendar,
        task.id,
        creator,
        TaskChanges {
            title: Some("  Final  ".to_string()),
            estimated_days: Some(2.5),
            add_assignees: vec![friend],
            remove_assignees: vec![creator],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let updated = Task::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.estimated_days, Some(2.5));
    assert_eq!(
        TaskAssignment::assignee_ids(&pool, task.id).await.unwrap(),
        vec![friend]
    );
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn edit_rejections(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;
    let friend = create_user(&pool, "bob").await;
    let stranger = create_user(&pool, "eve").await;
    connect(&pool, creator, friend).await;

    let task = create_task(&pool, creator, new_task("Draft", 2, vec![friend])).await;

    let err = tasks::edit_task(&pool, &NoopCalendar, task.id, creator, TaskChanges::default())
        .await
        .unwrap_err();
    assert_eq!(err.code().to_string(), "editTask.badParams");

    let rename = || TaskChanges {
        title: Some("Mine now".to_string()),
        ..Default::default()
    };

    let err = tasks::edit_task(&pool, &NoopCalendar, task.id, friend, rename())
        .await
        .unwrap_err();
    assert_eq!(err.code().to_string(), "editTask.noPermission");

    let err = tasks::edit_task(&pool, &NoopCalendar, Uuid::new_v4(), creator, rename())
        .await
        .unwrap_err();
    assert_eq!(err.code().to_string(), "editTask.taskNotFound");

    let err = tasks::edit_task(
        &pool,
        &NoopCalendar,
        task.id,
        creator,
        TaskChanges {
            add_assignees: vec![stranger],
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code().to_string(), "editTask.invalidAddAssignees");

    let err = tasks::edit_task(
        &pool,
        &NoopCalendar,
        task.id,
        creator,
        TaskChanges {
            remove_assignees: vec![stranger],
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code().to_string(), "editTask.invalidRemoveAssignees");

    // nothing changed
    let unchanged = Task::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert_eq!(unchanged.title, "Draft");
    assert_eq!(
        TaskAssignment::assignee_ids(&pool, task.id).await.unwrap(),
        vec![friend]
    );
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn only_the_creator_deletes(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;
    let friend = create_user(&pool, "bob").await;
    connect(&pool, creator, friend).await;

    let task = create_task(&pool, creator, new_task("Cleanup", 2, vec![friend])).await;

    let err = tasks::delete_task(&pool, &NoopCalendar, friend, task.id)
        .await
        .unwrap_err();
    assert_eq!(err.code().to_string(), "deleteTask.invalidDelete");

    tasks::delete_task(&pool, &NoopCalendar, creator, task.id)
        .await
        .unwrap();
    assert!(Task::find_by_id(&pool, task.id).await.unwrap().is_none());
    assert!(TaskAssignment::assignee_ids(&pool, task.id).await.unwrap().is_empty());

    let err = tasks::delete_task(&pool, &NoopCalendar, creator, task.id)
        .await
        .unwrap_err();
    assert_eq!(err.code().to_string(), "deleteTask.taskNotFound");
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn profile_tasks_need_an_accepted_connection(pool: PgPool) {
    let a = create_user(&pool, "ada").await;
    let b = create_user(&pool, "bob").await;
    create_task(&pool, a, new_task("Mine", 2, Vec::new())).await;
    create_task(&pool, b, new_task("Yours", 2, Vec::new())).await;

    connections::create_connection(&pool, a, b).await.unwrap();

    for (viewer, profile) in [(a, b), (b, a)] {
        let err = tasks::get_profile_tasks(&pool, viewer, profile)
            .await
            .unwrap_err();
        assert_eq!(err.code().to_string(), "getProfileTasks.noPermission");
    }

    connections::accept_request(&pool, b, a).await.unwrap();

    let tasks_of_b = tasks::get_profile_tasks(&pool, a, b).await.unwrap();
    assert_eq!(tasks_of_b.len(), 1);
    assert_eq!(tasks_of_b[0].title, "Yours");
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn profile_tasks_sort_by_deadline_then_title(pool: PgPool) {
    let a = create_user(&pool, "ada").await;

    let deadline = Utc::now() + Duration::days(5);
    for title in ["b-second", "a-first"] {
        let mut input = new_task(title, 0, Vec::new());
        input.deadline = deadline;
        create_task(&pool, a, input).await;
    }
    create_task(&pool, a, new_task("z-soonest", 1, Vec::new())).await;

    let titles: Vec<String> = tasks::get_profile_tasks(&pool, a, a)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["z-soonest", "a-first", "b-second"]);
}

/// U1 creates a task for themselves; U2 can see it only once connected.
#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn task_becomes_visible_after_connecting(pool: PgPool) {
    let u1 = create_user(&pool, "u1").await;
    let u2 = create_user(&pool, "u2").await;

    let task = create_task(&pool, u1, new_task("Solo", 2, Vec::new())).await;

    let err = tasks::get_task(&pool, u2, task.id).await.unwrap_err();
    assert_eq!(err.code().to_string(), "getTask.noPermission");

    connect(&pool, u1, u2).await;
    let details = tasks::get_task(&pool, u2, task.id).await.unwrap();
    assert_eq!(details.id, task.id);

    let err = tasks::get_task(&pool, u2, Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.code().to_string(), "getTask.taskNotFound");
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn calendar_sync_targets_linked_assignees(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;
    let friend = create_user(&pool, "bob").await;
    connect(&pool, creator, friend).await;
    link_calendar(&pool, friend).await;

    let calendar = RecordingCalendar::default();

    let id = tasks::create_task(&pool, &calendar, creator, new_task("Sync", 2, vec![creator, friend]))
        .await
        .unwrap();
    assert_eq!(*calendar.upserts.lock().unwrap(), vec![(id, vec![friend])]);

    tasks::edit_task(
        &pool,
        &calendar,
        id,
        creator,
        TaskChanges {
            remove_assignees: vec![friend],
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(*calendar.deletes.lock().unwrap(), vec![(id, vec![friend])]);

    // no linked assignee left: no provider call at all
    tasks::delete_task(&pool, &calendar, creator, id).await.unwrap();
    assert_eq!(calendar.deletes.lock().unwrap().len(), 1);
    assert_eq!(calendar.upserts.lock().unwrap().len(), 1);
}

#[sqlx::test(migrator = "tasker_shared::db::migrations::MIGRATOR")]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn calendar_failures_do_not_fail_mutations(pool: PgPool) {
    let creator = create_user(&pool, "ada").await;
    link_calendar(&pool, creator).await;

    let id = tasks::create_task(&pool, &FailingCalendar, creator, new_task("Robust", 2, Vec::new()))
        .await
        .unwrap();

    tasks::edit_task(
        &pool,
        &FailingCalendar,
        id,
        creator,
        TaskChanges {
            title: Some("Still robust".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    tasks::delete_task(&pool, &FailingCalendar, creator, id)
        .await
        .unwrap();
    assert!(Task::find_by_id(&pool, id).await.unwrap().is_none());
}
