//! Test harness for the LunchBox storefront.
//!
//! Builds the real router over an in-memory session store and fake
//! implementations of the auth and recipe services, then drives it with
//! `tower::ServiceExt::oneshot`. Nothing leaves the process.
//!
//! ```rust,ignore
//! let app = TestApp::new().await;
//! let response = app.get("/health", None).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use chrono::Utc;
use lunchbox_core::{
    Canteen, CanteenId, Email, Gender, Hostel, HostelId, Registration, Role, UserId, UserProfile,
};
use lunchbox_storefront::config::{StorefrontConfig, SupabaseConfig};
use lunchbox_storefront::recipes::{Meal, RecipeError, RecipeSource};
use lunchbox_storefront::state::AppState;
use lunchbox_storefront::supabase::{
    AuthBackend, AuthSession, AuthTokens, AuthUser, BackendError, SignUpOutcome,
};
use lunchbox_storefront::{RouterOptions, app};
use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use tokio::sync::Semaphore;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

pub const STUDENT_EMAIL: &str = "asha.verma@iiitdmj.ac.in";
pub const STUDENT_PASSWORD: &str = "dal-makhani-42";
pub const STUDENT_ID: &str = "8c7e2f4a-5b1d-4e1a-9f3c-2d6b7a8e9f01";

// =============================================================================
// Fake auth service
// =============================================================================

#[derive(Default)]
struct AuthData {
    /// email -> (password, user id)
    accounts: HashMap<String, (String, UserId)>,
    profiles: HashMap<UserId, UserProfile>,
    /// access token -> user id
    access_tokens: HashMap<String, UserId>,
    /// refresh token -> user id
    refresh_tokens: HashMap<String, UserId>,
    revoked: HashSet<String>,
    signed_up: Vec<Registration>,
}

/// In-memory stand-in for the hosted auth/database service.
#[derive(Default)]
pub struct FakeAuth {
    data: Mutex<AuthData>,
    issued: AtomicUsize,
    pub sign_up_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub get_user_calls: AtomicUsize,
    /// Every call fails as if the service were unreachable.
    pub offline: AtomicBool,
}

impl FakeAuth {
    /// A service with one confirmed student (with a profile row).
    #[must_use]
    pub fn with_student() -> Self {
        let fake = Self::default();
        let id = UserId::new(STUDENT_ID);
        {
            let mut data = fake.data.lock().unwrap();
            data.accounts.insert(
                STUDENT_EMAIL.to_string(),
                (STUDENT_PASSWORD.to_string(), id.clone()),
            );
            data.profiles.insert(id.clone(), student_profile(id));
        }
        fake
    }

    /// Add an account with no profile row.
    pub fn add_account(&self, email: &str, password: &str, id: &str) -> UserId {
        let id = UserId::new(id);
        self.data
            .lock()
            .unwrap()
            .accounts
            .insert(email.to_string(), (password.to_string(), id.clone()));
        id
    }

    /// Issue tokens for `user`, expiring `expires_in` seconds from now.
    pub fn issue_tokens(&self, user: &UserId, expires_in: i64) -> AuthTokens {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let tokens = AuthTokens {
            access_token: format!("access-{n}"),
            refresh_token: format!("refresh-{n}"),
            expires_at: Utc::now().timestamp() + expires_in,
        };
        let mut data = self.data.lock().unwrap();
        data.access_tokens
            .insert(tokens.access_token.clone(), user.clone());
        data.refresh_tokens
            .insert(tokens.refresh_token.clone(), user.clone());
        tokens
    }

    /// Reject every token issued so far.
    pub fn revoke_all(&self) {
        let mut data = self.data.lock().unwrap();
        data.access_tokens.clear();
        data.refresh_tokens.clear();
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    #[must_use]
    pub fn profile(&self, id: &UserId) -> Option<UserProfile> {
        self.data.lock().unwrap().profiles.get(id).cloned()
    }

    #[must_use]
    pub fn signed_up(&self) -> Vec<Registration> {
        self.data.lock().unwrap().signed_up.clone()
    }

    #[must_use]
    pub fn is_revoked(&self, access_token: &str) -> bool {
        self.data.lock().unwrap().revoked.contains(access_token)
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn user_for(&self, access_token: &str) -> Result<UserId, BackendError> {
        self.data
            .lock()
            .unwrap()
            .access_tokens
            .get(access_token)
            .cloned()
            .ok_or_else(|| BackendError::Unauthorized("invalid JWT".to_string()))
    }
}

#[must_use]
pub fn student_profile(id: UserId) -> UserProfile {
    UserProfile {
        id,
        full_name: "Asha Verma".to_string(),
        email: Email::parse(STUDENT_EMAIL).unwrap(),
        phone: "9876543210".to_string(),
        hostel_id: HostelId::new("H1"),
        preferred_canteen_id: CanteenId::new("C1"),
        gender: Gender::Female,
        role: Role::Student,
    }
}

#[must_use]
pub fn hostels() -> Vec<Hostel> {
    vec![
        Hostel {
            id: HostelId::new("H1"),
            name: "Hall 1".to_string(),
            is_girls: false,
        },
        Hostel {
            id: HostelId::new("H4"),
            name: "Hall 4 (Girls)".to_string(),
            is_girls: true,
        },
    ]
}

#[must_use]
pub fn canteens() -> Vec<Canteen> {
    vec![
        Canteen {
            id: CanteenId::new("C1"),
            name: "Night Canteen".to_string(),
            based_hostel_id: Some(HostelId::new("H1")),
            hostels_allowed: Vec::new(),
            is_girls: false,
        },
        Canteen {
            id: CanteenId::new("C2"),
            name: "Hall 4 Night Mess".to_string(),
            based_hostel_id: Some(HostelId::new("H4")),
            hostels_allowed: vec![HostelId::new("H4")],
            is_girls: true,
        },
        Canteen {
            id: CanteenId::new("C3"),
            name: "Juice Corner".to_string(),
            based_hostel_id: None,
            hostels_allowed: Vec::new(),
            is_girls: false,
        },
    ]
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        self.check_online()?;
        let account = self.data.lock().unwrap().accounts.get(email).cloned();
        match account {
            Some((expected, id)) if expected == password.expose_secret() => Ok(AuthSession {
                tokens: self.issue_tokens(&id, 3600),
                user: AuthUser {
                    id,
                    email: Some(email.to_string()),
                },
            }),
            _ => Err(BackendError::Api {
                status: 400,
                message: "Invalid login credentials".to_string(),
            }),
        }
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        registration: &Registration,
    ) -> Result<SignUpOutcome, BackendError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let mut data = self.data.lock().unwrap();
        if data.accounts.contains_key(email.as_str()) {
            return Err(BackendError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let id = UserId::new(format!("user-{}", data.accounts.len() + 1));
        data.accounts.insert(
            email.as_str().to_string(),
            (password.expose_secret().to_string(), id.clone()),
        );
        data.signed_up.push(registration.clone());
        Ok(SignUpOutcome {
            user: AuthUser {
                id,
                email: Some(email.as_str().to_string()),
            },
            session: None,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let mut data = self.data.lock().unwrap();
        data.access_tokens.remove(access_token);
        data.revoked.insert(access_token.to_string());
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let id = self.user_for(access_token)?;
        Ok(AuthUser { id, email: None })
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        self.check_online()?;
        let id = self
            .data
            .lock()
            .unwrap()
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| BackendError::Unauthorized("Invalid Refresh Token".to_string()))?;
        Ok(AuthSession {
            tokens: self.issue_tokens(&id, 3600),
            user: AuthUser { id, email: None },
        })
    }

    async fn fetch_profile(
        &self,
        access_token: &str,
        user_id: &UserId,
    ) -> Result<UserProfile, BackendError> {
        self.check_online()?;
        self.user_for(access_token)?;
        self.profile(user_id)
            .ok_or_else(|| BackendError::NotFound(format!("profile {user_id}")))
    }

    async fn insert_profile(
        &self,
        _access_token: Option<&str>,
        profile: &UserProfile,
    ) -> Result<(), BackendError> {
        self.check_online()?;
        self.data
            .lock()
            .unwrap()
            .profiles
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn list_hostels(&self) -> Result<Vec<Hostel>, BackendError> {
        self.check_online()?;
        Ok(hostels())
    }

    async fn search_canteens(
        &self,
        hostel_id: Option<&HostelId>,
        query: &str,
    ) -> Result<Vec<Canteen>, BackendError> {
        self.check_online()?;
        Ok(canteens()
            .into_iter()
            .filter(|c| c.name_matches(query))
            .filter(|c| hostel_id.is_none_or(|h| c.serves(h)))
            .collect())
    }

    async fn available_canteens(
        &self,
        hostel_id: &HostelId,
        gender: Gender,
    ) -> Result<Vec<Canteen>, BackendError> {
        self.check_online()?;
        Ok(canteens()
            .into_iter()
            .filter(|c| c.serves(hostel_id))
            .filter(|c| !(c.is_girls && gender == Gender::Male))
            .collect())
    }
}

// =============================================================================
// Fake recipe service
// =============================================================================

/// Hands out numbered meals. When gated, every fetch waits for [`FakeRecipes::release`].
#[derive(Default)]
pub struct FakeRecipes {
    pub calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl FakeRecipes {
    #[must_use]
    pub fn gated() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: Some(Semaphore::new(0)),
        }
    }

    /// Let every waiting and future fetch through.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }
}

#[async_trait]
impl RecipeSource for FakeRecipes {
    async fn random_meal(&self) -> Result<Option<Meal>, RecipeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        Ok(Some(Meal {
            id: format!("{}", 52_770 + n),
            name: format!("Test Meal {n}"),
            category: Some("Vegetarian".to_string()),
            area: Some("Indian".to_string()),
            instructions: Some("Simmer until done.".to_string()),
            thumbnail_url: None,
            tags: Some("Curry,Spicy".to_string()),
            youtube_url: None,
        }))
    }
}

// =============================================================================
// Test application
// =============================================================================

#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: url::Url::parse("http://localhost:3000").unwrap(),
        session_db_url: "sqlite::memory:".to_string(),
        supabase: SupabaseConfig {
            url: url::Url::parse("http://localhost:54321").unwrap(),
            anon_key: SecretString::from("test-anon-key"),
        },
        college_email_domain: "iiitdmj.ac.in".to_string(),
        recipe_api_url: url::Url::parse("http://localhost:9999/api/json/v1/1").unwrap(),
        http_timeout: Duration::from_secs(5),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// The storefront router wired to fakes.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub auth: Arc<FakeAuth>,
    pub recipes: Arc<FakeRecipes>,
    store: MemoryStore,
    pool: SqlitePool,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with(FakeAuth::with_student(), FakeRecipes::default()).await
    }

    pub async fn with(auth: FakeAuth, recipes: FakeRecipes) -> Self {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        Self::build(
            Arc::new(auth),
            Arc::new(recipes),
            MemoryStore::default(),
            pool,
        )
    }

    fn build(
        auth: Arc<FakeAuth>,
        recipes: Arc<FakeRecipes>,
        store: MemoryStore,
        pool: SqlitePool,
    ) -> Self {
        let state = AppState::new(test_config(), pool.clone(), auth.clone(), recipes.clone());
        let options = RouterOptions {
            rate_limit_auth: false,
            ..RouterOptions::default()
        };
        let router = app(state.clone(), store.clone(), &options);
        Self {
            router,
            state,
            auth,
            recipes,
            store,
            pool,
        }
    }

    /// A new server process over the same sessions and services.
    #[must_use]
    pub fn restarted(&self) -> Self {
        Self::build(
            self.auth.clone(),
            self.recipes.clone(),
            self.store.clone(),
            self.pool.clone(),
        )
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, path: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }

    /// Log the test student in and return their session cookie.
    pub async fn login(&self) -> String {
        let response = self
            .post_form(
                "/auth/login",
                &format!("email={STUDENT_EMAIL}&password={STUDENT_PASSWORD}"),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        session_cookie(&response).unwrap()
    }
}

/// `lb_session=...` from a response's `Set-Cookie`, if it sets one.
#[must_use]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("lb_session="))
        .and_then(|v| v.split(';').next())
        .map(String::from)
}

/// The cookie to send next: a newly set one, else the current one.
#[must_use]
pub fn next_cookie(response: &Response<Body>, current: &str) -> String {
    session_cookie(response).unwrap_or_else(|| current.to_string())
}

#[must_use]
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
