/// Domain operations
///
/// Services validate input, enforce the authorization rules, and own the
/// transaction boundaries. Each returns its component's closed error enum,
/// which implements [`crate::error::DomainError`].
///
/// - `users`: signup, login, profile reads and updates
/// - `connections`: connection requests and the connection graph
/// - `tasks`: task CRUD with assignment reconciliation
/// - `search`: filtered task search over the visible set
/// - `stats`: weekly workload statistics

pub mod connections;
pub mod search;
pub mod stats;
pub mod tasks;
pub mod users;
