//! REST client for the hosted auth/database service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lunchbox_core::{Canteen, Email, Gender, Hostel, HostelId, Registration, UserId, UserProfile};
use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::types::{ErrorBody, SignUpResponse, TokenResponse};
use super::{AuthBackend, AuthSession, AuthUser, BackendError, SignUpOutcome};
use crate::config::SupabaseConfig;

/// PostgREST media type that returns a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

const CANTEEN_COLUMNS: &str = "id,name,based_hostel_id,hostels_allowed,is_girls";

const HOSTELS_KEY: &str = "hostels";

/// Client for the hosted auth and database service.
///
/// Cheap to clone. Hostels are cached for 5 minutes.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    base_url: String,
    hostels: Cache<&'static str, Arc<Vec<Hostel>>>,
}

impl SupabaseClient {
    /// Create a new client.
    ///
    /// Every request carries the anon key as `apikey`; requests made on
    /// behalf of a signed-in user replace the default bearer token with the
    /// user's access token.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &SupabaseConfig, timeout: Duration) -> Result<Self, BackendError> {
        let key = config.anon_key.expose_secret();
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(key)
                .map_err(|e| BackendError::Parse(format!("Invalid API key format: {e}")))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| BackendError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let hostels = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                base_url: config.url.as_str().trim_end_matches('/').to_string(),
                hostels,
            }),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.inner.base_url)
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.inner.base_url)
    }

    async fn token_request(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<AuthSession, BackendError> {
        let response = self
            .inner
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;

        let token: TokenResponse = parse_json(check(response).await?).await?;
        Ok(token.into_session(Utc::now()))
    }
}

#[async_trait]
impl AuthBackend for SupabaseClient {
    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });
        self.token_request("password", body).await
    }

    #[instrument(skip(self, password, registration), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        registration: &Registration,
    ) -> Result<SignUpOutcome, BackendError> {
        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
            "data": registration,
        });

        let response = self
            .inner
            .client
            .post(self.auth_url("signup"))
            .json(&body)
            .send()
            .await?;

        let outcome = match parse_json::<SignUpResponse>(check(response).await?).await? {
            SignUpResponse::Session(token) => {
                let session = token.into_session(Utc::now());
                SignUpOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => SignUpOutcome {
                user,
                session: None,
            },
        };
        debug!(user_id = %outcome.user.id, confirmed = outcome.session.is_some(), "Signed up");
        Ok(outcome)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .post(self.auth_url("logout"))
            .bearer_auth(access_token)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let response = self
            .inner
            .client
            .get(self.auth_url("user"))
            .bearer_auth(access_token)
            .send()
            .await?;
        parse_json(check(response).await?).await
    }

    #[instrument(skip_all)]
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        // An invalid refresh token comes back as a 400, not a 401
        self.token_request("refresh_token", body)
            .await
            .map_err(|e| match e {
                BackendError::Api { status: 400, message } => BackendError::Unauthorized(message),
                other => other,
            })
    }

    #[instrument(skip(self, access_token))]
    async fn fetch_profile(
        &self,
        access_token: &str,
        user_id: &UserId,
    ) -> Result<UserProfile, BackendError> {
        let response = self
            .inner
            .client
            .get(self.rest_url("profiles"))
            .query(&[("id", format!("eq.{user_id}")), ("select", "*".to_string())])
            .header(ACCEPT, SINGLE_OBJECT)
            .bearer_auth(access_token)
            .send()
            .await?;

        // Zero rows under the single-object media type is a 406
        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Err(BackendError::NotFound(format!("profile {user_id}")));
        }
        parse_json(check(response).await?).await
    }

    #[instrument(skip(self, access_token, profile), fields(user_id = %profile.id))]
    async fn insert_profile(
        &self,
        access_token: Option<&str>,
        profile: &UserProfile,
    ) -> Result<(), BackendError> {
        let mut request = self
            .inner
            .client
            .post(self.rest_url("profiles"))
            .header("Prefer", "return=minimal")
            .json(profile);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        check(request.send().await?).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_hostels(&self) -> Result<Vec<Hostel>, BackendError> {
        if let Some(cached) = self.inner.hostels.get(HOSTELS_KEY).await {
            debug!("Cache hit for hostels");
            return Ok(cached.as_ref().clone());
        }

        let response = self
            .inner
            .client
            .get(self.rest_url("hostels"))
            .query(&[("select", "id,name,is_girls"), ("order", "name")])
            .send()
            .await?;
        let hostels: Vec<Hostel> = parse_json(check(response).await?).await?;

        self.inner
            .hostels
            .insert(HOSTELS_KEY, Arc::new(hostels.clone()))
            .await;
        Ok(hostels)
    }

    #[instrument(skip(self))]
    async fn search_canteens(
        &self,
        hostel_id: Option<&HostelId>,
        query: &str,
    ) -> Result<Vec<Canteen>, BackendError> {
        let mut params = vec![
            ("select", CANTEEN_COLUMNS.to_string()),
            ("order", "name".to_string()),
        ];
        if let Some(pattern) = ilike_pattern(query) {
            params.push(("name", pattern));
        }

        let response = self
            .inner
            .client
            .get(self.rest_url("canteens"))
            .query(&params)
            .send()
            .await?;
        let canteens: Vec<Canteen> = parse_json(check(response).await?).await?;

        Ok(match hostel_id.filter(|h| !h.is_empty()) {
            Some(hostel) => canteens.into_iter().filter(|c| c.serves(hostel)).collect(),
            None => canteens,
        })
    }

    #[instrument(skip(self))]
    async fn available_canteens(
        &self,
        hostel_id: &HostelId,
        gender: Gender,
    ) -> Result<Vec<Canteen>, BackendError> {
        let body = serde_json::json!({
            "p_hostel_id": hostel_id,
            "p_gender": gender.as_str(),
        });
        let response = self
            .inner
            .client
            .post(self.rest_url("rpc/get_available_canteens"))
            .json(&body)
            .send()
            .await?;
        parse_json(check(response).await?).await
    }
}

/// Turn a non-success response into a [`BackendError`] carrying the service's message.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| format!("HTTP {status}"));

    tracing::warn!(status = %status, message = %message, "Auth service returned an error");

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        _ => BackendError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    response
        .json()
        .await
        .map_err(|e| BackendError::Parse(e.to_string()))
}

/// Build a PostgREST `ilike` filter for a free-text name search.
///
/// Characters with meaning in the filter grammar are dropped. Returns `None`
/// when nothing searchable is left.
fn ilike_pattern(query: &str) -> Option<String> {
    let cleaned: String = query
        .chars()
        .filter(|c| !matches!(c, '*' | '%' | ',' | '(' | ')' | '"' | '\\'))
        .collect();
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| format!("ilike.*{cleaned}*"))
}
