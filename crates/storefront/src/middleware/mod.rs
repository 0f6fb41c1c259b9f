//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with a `request_id` field)
//! 3. Request ID
//! 4. CSP nonce (per-request nonce for inline scripts)
//! 5. Security headers (CSP with that nonce, isolation headers)
//! 6. Session layer (tower-sessions with the `SQLite` store)
//! 7. Session initializer (restores the profile once per boot)
//! 8. Rate limiting on `/auth/*` (governor)

pub mod auth;
pub mod csp;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod session_init;

pub use auth::{RequireProfile, auth_tokens, clear_auth_tokens, set_auth_tokens};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer, sqlite_session_store};
pub use session_init::{InitOutcome, initialize_session, mark_initialized, session_init_middleware};
