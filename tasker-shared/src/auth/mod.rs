/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: session token issuance and validation
/// - [`middleware`]: bearer-token extraction into an [`middleware::AuthContext`]
/// - [`authorization`]: connection-based permission predicates
///
/// # Example
///
/// ```no_run
/// use tasker_shared::auth::password::{hash_password, verify_password};
/// use tasker_shared::auth::jwt::SessionKeys;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let keys = SessionKeys::new("secret-key-of-at-least-32-bytes!!", Duration::hours(48));
/// let token = keys.issue(Uuid::new_v4())?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
