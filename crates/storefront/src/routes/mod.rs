//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Landing page (search, offer, feed)
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (session database)
//! GET  /recommendations/more   - Next feed batch (HTMX)
//!
//! # Canteens
//! GET  /canteens               - Search results
//! GET  /canteens/{id}          - Canteen page
//!
//! # Orders (requires login)
//! GET  /orders/{id}            - Order page
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add item (badge fragment, 409 on conflict)
//! POST /cart/update            - Set quantity (items fragment)
//! POST /cart/remove            - Remove item (items fragment)
//! POST /cart/clear             - Empty cart (items fragment)
//! GET  /cart/count             - Badge fragment
//!
//! # Auth (rate limited)
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action (page or overlay)
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! GET  /auth/register/hostels  - Hostel options for a gender (HTMX)
//! GET  /auth/register/canteens - Eligible canteen options (HTMX)
//! POST /auth/logout            - Logout action
//!
//! # Login overlay
//! POST /modal/login/open       - Show overlay, back to the page
//! POST /modal/login/close      - Hide overlay, back to the page
//! ```

pub mod auth;
pub mod canteens;
pub mod cart;
pub mod context;
pub mod health;
pub mod home;
pub mod modal;
pub mod orders;
pub mod recommendations;

use std::path::PathBuf;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionStore;

pub use context::PageContext;

use crate::error::AppError;
use crate::middleware::{
    auth_rate_limiter, create_session_layer, csp_nonce_middleware, request_id_middleware,
    security_headers_middleware, session_init_middleware,
};
use crate::state::AppState;

/// Knobs for [`app`].
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Apply the per-IP limiter to `/auth/*`.
    pub rate_limit_auth: bool,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            rate_limit_auth: true,
            static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static"),
        }
    }
}

/// Create the auth routes router.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/register/hostels", get(auth::register_hostels))
        .route("/register/canteens", get(auth::register_canteens))
        .route("/logout", post(auth::logout));

    if rate_limit {
        router.layer(auth_rate_limiter())
    } else {
        router
    }
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the canteen routes router.
pub fn canteen_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(canteens::index))
        .route("/{id}", get(canteens::show))
}

/// Create the login overlay routes router.
pub fn modal_routes() -> Router<AppState> {
    Router::new()
        .route("/login/open", post(modal::open))
        .route("/login/close", post(modal::close))
}

/// Create all session-backed routes.
pub fn routes(rate_limit_auth: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/recommendations/more", get(recommendations::more))
        .nest("/canteens", canteen_routes())
        .route("/orders/{id}", get(orders::show))
        .nest("/cart", cart_routes())
        .nest("/auth", auth_routes(rate_limit_auth))
        .nest("/modal", modal_routes())
}

async fn not_found() -> impl IntoResponse {
    AppError::NotFound("page".to_string())
}

/// Assemble the full application: routes, sessions and the middleware stack.
pub fn app<S>(state: AppState, session_store: S, options: &RouterOptions) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    let pages = routes(options.rate_limit_auth)
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), session_init_middleware))
        .layer(session_layer);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest_service("/static", ServeDir::new(&options.static_dir))
        .merge(pages)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(csp_nonce_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
