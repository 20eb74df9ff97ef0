//! Shared fixtures for the database integration tests
//!
//! Every test gets a fresh database from `#[sqlx::test]`, migrated with the
//! embedded workspace migrations.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Mutex;
use tasker_shared::{
    calendar::{CalendarError, CalendarSync, NoopCalendar},
    models::{
        calendar_credential::CalendarCredential,
        task::{Task, TaskStatus},
        user::{CreateUser, User},
    },
    services::{
        connections,
        tasks::{self, NewTask},
    },
};
use uuid::Uuid;

/// Creates a user with a placeholder password hash
pub async fn create_user(pool: &PgPool, name: &str) -> Uuid {
    User::create(
        pool,
        CreateUser {
            email: format!("{name}-{}@example.com", Uuid::new_v4().simple()),
            password_hash: "not-a-real-hash".to_string(),
            first_name: name.to_string(),
            last_name: "Tester".to_string(),
            bio: String::new(),
        },
    )
    .await
    .expect("create user")
    .id
}

/// Requests and accepts a connection between `a` and `b`
pub async fn connect(pool: &PgPool, a: Uuid, b: Uuid) {
    connections::create_connection(pool, a, b)
        .await
        .expect("request connection");
    connections::accept_request(pool, b, a)
        .await
        .expect("accept connection");
}

pub fn new_task(title: &str, days_ahead: i64, assignees: Vec<Uuid>) -> NewTask {
    NewTask {
        title: title.to_string(),
        deadline: Utc::now() + Duration::days(days_ahead),
        status: TaskStatus::ToDo,
        assignees,
        project: None,
        description: None,
        estimated_days: None,
    }
}

/// Creates a task without calendar sync and returns it
pub async fn create_task(pool: &PgPool, creator: Uuid, input: NewTask) -> Task {
    let id = tasks::create_task(pool, &NoopCalendar, creator, input)
        .await
        .expect("create task");
    Task::find_by_id(pool, id)
        .await
        .expect("load task")
        .expect("task exists")
}

pub async fn link_calendar(pool: &PgPool, user: Uuid) {
    CalendarCredential::create(pool, user, "access", "refresh")
        .await
        .expect("store credentials");
}

/// Calendar that records which users each call targeted
#[derive(Default)]
pub struct RecordingCalendar {
    pub upserts: Mutex<Vec<(Uuid, Vec<Uuid>)>>,
    pub deletes: Mutex<Vec<(Uuid, Vec<Uuid>)>>,
}

fn users(credentials: &[CalendarCredential]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = credentials.iter().map(|c| c.user_id).collect();
    ids.sort();
    ids
}

#[async_trait]
impl CalendarSync for RecordingCalendar {
    async fn upsert_event(
        &self,
        task: &Task,
        credentials: &[CalendarCredential],
    ) -> Result<(), CalendarError> {
        self.upserts
            .lock()
            .unwrap()
            .push((task.id, users(credentials)));
        Ok(())
    }

    async fn delete_event(
        &self,
        task_id: Uuid,
        credentials: &[CalendarCredential],
    ) -> Result<(), CalendarError> {
        self.deletes
            .lock()
            .unwrap()
            .push((task_id, users(credentials)));
        Ok(())
    }
}

/// Calendar whose provider is always down
pub struct FailingCalendar;

#[async_trait]
impl CalendarSync for FailingCalendar {
    async fn upsert_event(
        &self,
        _task: &Task,
        _credentials: &[CalendarCredential],
    ) -> Result<(), CalendarError> {
        Err(CalendarError::Provider {
            status: 503,
            body: "backend unavailable".to_string(),
        })
    }

    async fn delete_event(
        &self,
        _task_id: Uuid,
        _credentials: &[CalendarCredential],
    ) -> Result<(), CalendarError> {
        Err(CalendarError::Provider {
            status: 503,
            body: "backend unavailable".to_string(),
        })
    }
}
