//! Authentication route handlers.
//!
//! Login, registration and logout against the hosted auth service. The
//! login form is served both as a page and inside the login overlay; the
//! overlay posts here too and is reopened on failure.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use lunchbox_core::{
    Canteen, Gender, Hostel, HostelId, RegistrationForm, UserProfile, hostels_visible_to,
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::context::{LOGIN_ERROR_PARAM, PageContext, local_path};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{auth_tokens, mark_initialized, set_auth_tokens};
use crate::state::AppState;
use crate::stores::{LoginModal, ProfileStore, StoreError};
use crate::supabase::{AuthTokens, BackendError};

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Page the overlay was opened on; present only for overlay submissions.
    pub return_to: Option<String>,
}

/// Query for the hostel dropdown.
#[derive(Debug, Deserialize)]
pub struct HostelQuery {
    pub gender: Option<String>,
}

/// Query for the preferred canteen dropdown.
#[derive(Debug, Deserialize)]
pub struct CanteenQuery {
    pub hostel_id: Option<String>,
    pub gender: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub form: RegistrationForm,
    pub genders: [Gender; 3],
    pub hostels: Vec<Hostel>,
    pub canteens: Vec<Canteen>,
}

/// Registration success page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register_success.html")]
pub struct RegisterSuccessTemplate {
    pub page: PageContext,
    pub email: String,
}

/// Hostel `<option>` list (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "partials/hostel_options.html")]
pub struct HostelOptionsTemplate {
    pub hostels: Vec<Hostel>,
    pub selected: String,
}

/// Preferred canteen `<option>` list (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "partials/canteen_options.html")]
pub struct CanteenOptionsTemplate {
    pub canteens: Vec<Canteen>,
    pub selected: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(page: PageContext) -> impl IntoResponse {
    LoginTemplate { page }
}

/// Where a failed login goes: back to the overlay's page, or the login page.
async fn login_failed(session: &Session, return_to: Option<&str>, code: &str) -> Response {
    let target = match return_to {
        Some(path) => {
            match LoginModal::load(session.clone()).await {
                Ok(mut modal) => {
                    if let Err(e) = modal.open().await {
                        tracing::error!(error = %e, "Failed to reopen login overlay");
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to load login overlay state"),
            }
            let path = local_path(Some(path));
            let path = path.split('?').next().unwrap_or("/");
            format!("{path}?{LOGIN_ERROR_PARAM}={code}")
        }
        None => format!("/auth/login?{LOGIN_ERROR_PARAM}={code}"),
    };
    Redirect::to(&target).into_response()
}

/// Handle login form submission.
///
/// Signs in with email and password, then fetches the profile row. Only when
/// both succeed is anything written to the session.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let return_to = form.return_to.as_deref();
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return login_failed(&session, return_to, "missing").await;
    }

    let password = SecretString::from(form.password);
    let auth = match state.auth().sign_in_with_password(email, &password).await {
        Ok(auth) => auth,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return login_failed(&session, return_to, "credentials").await;
        }
    };

    let profile = match state
        .auth()
        .fetch_profile(&auth.tokens.access_token, &auth.user.id)
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(error = %e, user_id = %auth.user.id, "Profile fetch after login failed");
            return login_failed(&session, return_to, "profile").await;
        }
    };

    if let Err(e) = start_session(&state, &session, &auth.tokens, profile).await {
        tracing::error!(error = %e, "Failed to store login in session");
        return login_failed(&session, return_to, "session").await;
    }

    Redirect::to("/").into_response()
}

/// Write a fresh login into the session.
async fn start_session(
    state: &AppState,
    session: &Session,
    tokens: &AuthTokens,
    profile: UserProfile,
) -> Result<(), StoreError> {
    // New id on privilege change
    session.cycle_id().await?;

    set_auth_tokens(session, tokens).await?;
    set_sentry_user(&profile.id, Some(profile.email.as_str()));
    tracing::info!(user_id = %profile.id, "Student signed in");

    ProfileStore::load(session.clone())
        .await?
        .set_profile(Some(profile))
        .await?;
    LoginModal::load(session.clone()).await?.close().await?;
    mark_initialized(state, session).await?;
    Ok(())
}

// =============================================================================
// Registration Routes
// =============================================================================

async fn load_hostels(state: &AppState) -> Vec<Hostel> {
    state.auth().list_hostels().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load hostels");
        Vec::new()
    })
}

/// Eligible canteens for a hostel and gender. Empty when either is missing
/// or the lookup fails.
async fn eligible_canteens(state: &AppState, hostel_id: &str, gender: &str) -> Vec<Canteen> {
    let hostel_id = HostelId::new(hostel_id.trim());
    let Ok(gender) = gender.parse::<Gender>() else {
        return Vec::new();
    };
    if hostel_id.is_empty() {
        return Vec::new();
    }

    state
        .auth()
        .available_canteens(&hostel_id, gender)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, hostel_id = %hostel_id, "Failed to load eligible canteens");
            Vec::new()
        })
}

async fn register_form(
    state: &AppState,
    page: PageContext,
    form: RegistrationForm,
    error: Option<String>,
) -> RegisterTemplate {
    let gender = form.gender.parse::<Gender>().ok();
    let hostels = load_hostels(state).await;
    let hostels = hostels_visible_to(&hostels, gender)
        .into_iter()
        .cloned()
        .collect();
    let canteens = eligible_canteens(state, &form.hostel_id, &form.gender).await;

    RegisterTemplate {
        page,
        error,
        form: RegistrationForm {
            password: String::new(),
            ..form
        },
        genders: Gender::ALL,
        hostels,
        canteens,
    }
}

/// Display the registration page.
pub async fn register_page(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    register_form(&state, page, RegistrationForm::default(), None).await
}

/// Handle registration form submission.
///
/// Validation failures are shown inline without calling the auth service.
/// On success the student is asked to confirm their email; they are not
/// signed in here.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    page: PageContext,
    Form(form): Form<RegistrationForm>,
) -> Response {
    let hostels = load_hostels(&state).await;
    let hostel = hostels
        .iter()
        .find(|h| h.id.as_str() == form.hostel_id.trim());

    let registration = match form.validate(&state.config().college_email_domain, hostel) {
        Ok(registration) => registration,
        Err(e) => return registration_failed(&state, page, form, &e.to_string()).await,
    };

    let password = SecretString::from(form.password.clone());
    let outcome = match state
        .auth()
        .sign_up(&registration.email, &password, &registration)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            return registration_failed(&state, page, form, &e.user_message()).await;
        }
    };

    let access_token = outcome
        .session
        .as_ref()
        .map(|s| s.tokens.access_token.as_str());
    let email = registration.email.as_str().to_string();
    let profile = registration.into_profile(outcome.user.id.clone());
    if let Err(e) = state.auth().insert_profile(access_token, &profile).await {
        tracing::error!(error = %e, user_id = %outcome.user.id, "Profile insert after sign-up failed");
        return registration_failed(&state, page, form, &e.user_message()).await;
    }

    tracing::info!(user_id = %outcome.user.id, "Student registered");
    RegisterSuccessTemplate { page, email }.into_response()
}

async fn registration_failed(
    state: &AppState,
    page: PageContext,
    form: RegistrationForm,
    message: &str,
) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        register_form(state, page, form, Some(message.to_string())).await,
    )
        .into_response()
}

/// Hostel options for the selected gender (HTMX).
pub async fn register_hostels(
    State(state): State<AppState>,
    Query(query): Query<HostelQuery>,
) -> impl IntoResponse {
    let gender = query.gender.as_deref().and_then(|g| g.parse::<Gender>().ok());
    let hostels = load_hostels(&state).await;
    HostelOptionsTemplate {
        hostels: hostels_visible_to(&hostels, gender)
            .into_iter()
            .cloned()
            .collect(),
        selected: String::new(),
    }
}

/// Preferred canteen options for the selected hostel and gender (HTMX).
pub async fn register_canteens(
    State(state): State<AppState>,
    Query(query): Query<CanteenQuery>,
) -> impl IntoResponse {
    let canteens = eligible_canteens(
        &state,
        query.hostel_id.as_deref().unwrap_or_default(),
        query.gender.as_deref().unwrap_or_default(),
    )
    .await;
    CanteenOptionsTemplate {
        canteens,
        selected: String::new(),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// Sign-out at the auth service is best effort; the local session is
/// flushed regardless.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    match auth_tokens(&session).await {
        Ok(Some(tokens)) => {
            if let Err(e) = state.auth().sign_out(&tokens.access_token).await {
                log_sign_out_failure(&e);
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Could not read auth tokens on logout"),
    }

    match ProfileStore::load(session.clone()).await {
        Ok(mut profiles) => {
            if let Err(e) = profiles.clear_profile().await {
                tracing::error!(error = %e, "Failed to clear profile");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to load profile on logout"),
    }

    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

fn log_sign_out_failure(err: &BackendError) {
    if err.is_rejected_token() {
        tracing::debug!(error = %err, "Token already invalid at sign-out");
    } else {
        tracing::warn!(error = %err, "Sign-out at auth service failed");
    }
}
