/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use tasker_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = tasker_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tasker_shared::{
    auth::{jwt::SessionKeys, middleware::authenticate},
    calendar::{google::GoogleCalendar, CalendarSync, NoopCalendar},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Session token signing keys
    pub keys: SessionKeys,

    /// Calendar the task services push changes to
    pub calendar: Arc<dyn CalendarSync>,

    /// Google client for the OAuth endpoints, if configured
    pub google: Option<Arc<GoogleCalendar>>,
}

impl AppState {
    /// Creates application state, wiring Google Calendar when configured
    ///
    /// # Errors
    ///
    /// Fails if the Google HTTP client cannot be built.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let keys = SessionKeys::new(
            config.jwt.secret.clone(),
            chrono::Duration::hours(config.jwt.expiration_hours),
        );

        let google = config
            .calendar
            .clone()
            .map(|calendar| GoogleCalendar::new(calendar.into()).map(Arc::new))
            .transpose()?;

        let calendar: Arc<dyn CalendarSync> = match &google {
            Some(google) => google.clone() as Arc<dyn CalendarSync>,
            None => Arc::new(NoopCalendar),
        };

        Ok(Self {
            db,
            config: Arc::new(config),
            keys,
            calendar,
            google,
        })
    }

    /// Replaces the calendar the task services sync to
    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarSync>) -> Self {
        self.calendar = calendar;
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        self.keys.secret()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1/
///     ├── /users/                      signup, login, details (public)
///     │   ├── me, update, by-email     (authenticated)
///     │   └── :id/stats, :id/tasks     (authenticated)
///     ├── /tasks/                      search, create, get, edit, delete
///     ├── /connections/                create, delete, accept, decline,
///     │                                status/:id, incoming, outgoing, accepted
///     └── /calendar/                   auth-url, tokens, sync/:task_id
/// ```
///
/// # Middleware Stack
///
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (route layer on the protected routers)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth = || axum::middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_user_routes = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/details/:id", get(routes::users::user_details));

    let user_routes = Router::new()
        .route("/me", get(routes::users::me))
        .route("/update", post(routes::users::update_user))
        .route("/by-email", post(routes::users::find_by_email))
        .route("/:id/stats", get(routes::users::user_stats))
        .route("/:id/tasks", get(routes::tasks::profile_tasks))
        .route_layer(auth());

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::search_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task).delete(routes::tasks::delete_task),
        )
        .route("/:id/edit", post(routes::tasks::edit_task))
        .route_layer(auth());

    let connection_routes = Router::new()
        .route("/create", post(routes::connections::create_connection))
        .route("/delete", post(routes::connections::delete_connection))
        .route("/accept", post(routes::connections::accept_request))
        .route("/decline", post(routes::connections::decline_request))
        .route("/status/:id", get(routes::connections::connection_status))
        .route("/incoming", get(routes::connections::incoming_requests))
        .route("/outgoing", get(routes::connections::outgoing_requests))
        .route("/accepted", get(routes::connections::accepted_connections))
        .route_layer(auth());

    let calendar_routes = Router::new()
        .route("/auth-url", get(routes::calendar::authorization_url))
        .route(
            "/tokens",
            post(routes::calendar::save_tokens)
                .get(routes::calendar::check_tokens)
                .delete(routes::calendar::clear_tokens),
        )
        .route("/sync/:task_id", post(routes::calendar::sync_task))
        .route_layer(auth());

    let v1_routes = Router::new()
        .nest("/users", public_user_routes.merge(user_routes))
        .nest("/tasks", task_routes)
        .nest("/connections", connection_routes)
        .nest("/calendar", calendar_routes);

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the Bearer token and injects the caller's `AuthContext` into
/// the request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
