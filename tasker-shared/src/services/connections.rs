/// Connection graph operations
///
/// State machine for the relationship between two users:
///
/// ```text
/// unconnected --create(A, B)--> requested --accept(B, A)--> connected
///      ^                          |                            |
///      +--- decline(B, A) --------+                            |
///      +--- delete(A, B) / delete(B, A) ----------------------+
/// ```
///
/// Only the requestee may accept or decline a request. Either side may
/// delete: that cancels an outgoing request or removes a connection.

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DomainError, ErrorCode, ErrorKind};
use crate::models::{
    connection::{Connection, ConnectionStatus},
    is_unique_violation,
    user::{PublicUser, User},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOp {
    Create,
    Delete,
    Accept,
    Decline,
}

impl ConnectionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionOp::Create => "createConnection",
            ConnectionOp::Delete => "deleteConnection",
            ConnectionOp::Accept => "acceptRequest",
            ConnectionOp::Decline => "declineRequest",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("You cannot connect with yourself")]
    SelfConnection(ConnectionOp),

    #[error("That user does not exist")]
    UnknownUser,

    #[error("A connection or request already exists between these users")]
    ConnectionExists,

    #[error("No connection or request exists between these users")]
    ConnectionNotFound(ConnectionOp),

    #[error("Only the user who received the request can respond to it")]
    NotRequestee(ConnectionOp),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DomainError for ConnectionError {
    fn code(&self) -> ErrorCode {
        match self {
            ConnectionError::SelfConnection(op) => ErrorCode::new(op.as_str(), "selfConnection"),
            ConnectionError::UnknownUser => {
                ErrorCode::new(ConnectionOp::Create.as_str(), "unknownUser")
            }
            ConnectionError::ConnectionExists => {
                ErrorCode::new(ConnectionOp::Create.as_str(), "connectionExists")
            }
            ConnectionError::ConnectionNotFound(op) => {
                ErrorCode::new(op.as_str(), "connectionNotFound")
            }
            ConnectionError::NotRequestee(op) => ErrorCode::new(op.as_str(), "notRequestee"),
            ConnectionError::Database(_) => ErrorCode::DATABASE,
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::SelfConnection(_) => ErrorKind::Validation,
            ConnectionError::UnknownUser | ConnectionError::ConnectionNotFound(_) => {
                ErrorKind::NotFound
            }
            ConnectionError::ConnectionExists => ErrorKind::Conflict,
            ConnectionError::NotRequestee(_) => ErrorKind::Forbidden,
            ConnectionError::Database(_) => ErrorKind::Internal,
        }
    }
}

/// Status between two users, as returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub user_id: Uuid,
    pub status: ConnectionStatus,
}

/// Sends a connection request from `requester` to `requestee`
pub async fn create_connection(
    pool: &PgPool,
    requester: Uuid,
    requestee: Uuid,
) -> Result<(), ConnectionError> {
    if requester == requestee {
        return Err(ConnectionError::SelfConnection(ConnectionOp::Create));
    }

    if !User::exists(pool, requestee).await? {
        return Err(ConnectionError::UnknownUser);
    }

    if Connection::find_between(pool, requester, requestee).await?.is_some() {
        return Err(ConnectionError::ConnectionExists);
    }

    // A concurrent request for the same pair trips the unordered-pair index
    Connection::create(pool, requester, requestee)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ConnectionError::ConnectionExists
            } else {
                ConnectionError::Database(e)
            }
        })?;

    info!(requester = %requester, requestee = %requestee, "Connection requested");
    Ok(())
}

/// Removes the relationship between `a` and `b`, pending or accepted
pub async fn delete_connection(pool: &PgPool, a: Uuid, b: Uuid) -> Result<(), ConnectionError> {
    if a == b {
        return Err(ConnectionError::SelfConnection(ConnectionOp::Delete));
    }

    if !Connection::delete_between(pool, a, b).await? {
        return Err(ConnectionError::ConnectionNotFound(ConnectionOp::Delete));
    }

    info!(user_id = %a, other = %b, "Connection deleted");
    Ok(())
}

/// Distinguishes "the request points the other way" from "there is no request"
async fn missing_request(
    pool: &PgPool,
    op: ConnectionOp,
    requestee: Uuid,
    requester: Uuid,
) -> Result<ConnectionError, ConnectionError> {
    let reverse = Connection::find_directed(pool, requestee, requester).await?;

    Ok(match reverse {
        Some(row) if !row.accepted => ConnectionError::NotRequestee(op),
        _ => ConnectionError::ConnectionNotFound(op),
    })
}

/// Accepts the request `requester` sent to `requestee`
///
/// Accepting an already accepted connection succeeds without change.
pub async fn accept_request(
    pool: &PgPool,
    requestee: Uuid,
    requester: Uuid,
) -> Result<(), ConnectionError> {
    let op = ConnectionOp::Accept;
    if requestee == requester {
        return Err(ConnectionError::SelfConnection(op));
    }

    match Connection::find_directed(pool, requester, requestee).await? {
        Some(row) if row.accepted => Ok(()),
        Some(_) => {
            Connection::accept(pool, requester, requestee).await?;
            info!(requester = %requester, requestee = %requestee, "Connection accepted");
            Ok(())
        }
        None => Err(missing_request(pool, op, requestee, requester).await?),
    }
}

/// Declines (deletes) the pending request `requester` sent to `requestee`
pub async fn decline_request(
    pool: &PgPool,
    requestee: Uuid,
    requester: Uuid,
) -> Result<(), ConnectionError> {
    let op = ConnectionOp::Decline;
    if requestee == requester {
        return Err(ConnectionError::SelfConnection(op));
    }

    if Connection::delete_pending(pool, requester, requestee).await? {
        info!(requester = %requester, requestee = %requestee, "Connection declined");
        return Ok(());
    }

    Err(missing_request(pool, op, requestee, requester).await?)
}

pub async fn connection_status(
    pool: &PgPool,
    a: Uuid,
    b: Uuid,
) -> Result<ConnectionStatus, ConnectionError> {
    Ok(Connection::status(pool, a, b).await?)
}

pub async fn incoming_requests(
    pool: &PgPool,
    user: Uuid,
) -> Result<Vec<PublicUser>, ConnectionError> {
    Ok(Connection::list_incoming(pool, user).await?)
}

pub async fn outgoing_requests(
    pool: &PgPool,
    user: Uuid,
) -> Result<Vec<PublicUser>, ConnectionError> {
    Ok(Connection::list_outgoing(pool, user).await?)
}

pub async fn accepted_connections(
    pool: &PgPool,
    user: Uuid,
) -> Result<Vec<PublicUser>, ConnectionError> {
    Ok(Connection::list_accepted(pool, user).await?)
}
