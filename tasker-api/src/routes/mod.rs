/// API route handlers
///
/// Handlers are thin: they validate the request shape, call the matching
/// service in `tasker_shared::services`, and serialize the result.
///
/// - `health`: Health check endpoint
/// - `auth`: signup and login
/// - `users`: profiles and statistics
/// - `tasks`: task CRUD, search and profile task lists
/// - `connections`: connection requests and lists
/// - `calendar`: Google Calendar linking and manual sync

pub mod auth;
pub mod calendar;
pub mod connections;
pub mod health;
pub mod tasks;
pub mod users;
