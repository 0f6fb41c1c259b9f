//! Session keys.
//!
//! Everything a visitor's session holds lives under one of these keys. The
//! values are JSON documents written by the stores in [`crate::stores`] and
//! the auth helpers in [`crate::middleware::auth`].

pub mod keys {
    /// Persisted cart envelope (`PersistedCart`).
    pub const CART: &str = "canteen-cart-storage";

    /// Signed-in student's profile (`UserProfile`).
    pub const PROFILE: &str = "profile";

    /// Access/refresh tokens from the auth service (`AuthTokens`).
    pub const AUTH_TOKENS: &str = "auth_tokens";

    /// Whether the login overlay is showing.
    pub const LOGIN_MODAL_OPEN: &str = "login_modal_open";

    /// Boot id of the server process that last initialized this session.
    pub const BOOT_ID: &str = "boot_id";

    /// Recommendation feed position (`FeedCursor`).
    pub const FEED_CURSOR: &str = "feed_cursor";
}
