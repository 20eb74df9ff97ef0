/// User model and database operations
///
/// Users are created at signup and mutated through profile updates. They are
/// never hard-deleted by the application.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name TEXT NOT NULL,
///     last_name TEXT NOT NULL,
///     bio TEXT NOT NULL DEFAULT '',
///     avatar_url TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasker_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     bio: String::new(),
/// })
/// .await?;
///
/// let found = User::find_by_email(&pool, "ADA@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Full user row, including the password hash
///
/// Never serialize this to clients; convert to [`PublicUser`] first.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT, unique)
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub bio: String,

    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// User as exposed in read models (task creators, assignees, connection lists)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublicUser {
    pub id: Uuid,

    pub email: String,

    pub first_name: String,

    pub last_name: String,

    pub bio: String,

    pub avatar_url: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub bio: String,
}

/// Input for updating an existing user
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,

    pub password_hash: Option<String>,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub bio: Option<String>,

    /// `Some(None)` clears the avatar
    pub avatar_url: Option<Option<String>>,
}

impl UpdateUser {
    /// True when no field would be written
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password_hash.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, bio, avatar_url, created_at, updated_at";

const PUBLIC_USER_COLUMNS: &str = "id, email, first_name, last_name, bio, avatar_url";

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (unique constraint
    /// violation) or the database is unreachable.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, bio)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.bio)
            .fetch_one(executor)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(
        executor: impl PgExecutor<'_>,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    /// Checks whether a user with this ID exists
    pub async fn exists(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    /// Checks whether an email is taken, optionally ignoring one user
    ///
    /// Used during profile updates so a user can "change" their email to the
    /// address they already own.
    pub async fn email_taken(
        executor: impl PgExecutor<'_>,
        email: &str,
        except: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE email = $1 AND ($2::UUID IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(except)
        .fetch_one(executor)
        .await
    }

    /// Updates an existing user
    ///
    /// Only `Some` fields in `data` are written; `updated_at` is always bumped.
    ///
    /// # Returns
    ///
    /// The updated user, or `None` if no user has this ID
    pub async fn update(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.first_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", first_name = ${}", bind_count));
        }
        if data.last_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", last_name = ${}", bind_count));
        }
        if data.bio.is_some() {
            bind_count += 1;
            query.push_str(&format!(", bio = ${}", bind_count));
        }
        if data.avatar_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", avatar_url = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(first_name) = data.first_name {
            q = q.bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            q = q.bind(last_name);
        }
        if let Some(bio) = data.bio {
            q = q.bind(bio);
        }
        if let Some(avatar_url) = data.avatar_url {
            q = q.bind(avatar_url);
        }

        q.fetch_optional(executor).await
    }
}

impl PublicUser {
    /// Finds the public view of a user by ID
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PUBLIC_USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, PublicUser>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Loads several users at once; unknown IDs are silently skipped
    pub async fn find_many(
        executor: impl PgExecutor<'_>,
        ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {PUBLIC_USER_COLUMNS} FROM users WHERE id = ANY($1)");

        sqlx::query_as::<_, PublicUser>(&query)
            .bind(ids)
            .fetch_all(executor)
            .await
    }
}
