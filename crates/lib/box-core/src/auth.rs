//! Authentication against the Box token endpoint.
//!
//! Three modes are supported: client-credentials grant for service accounts,
//! OAuth 2.0 authorization code with a local token cache and refresh, and a
//! static developer token.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use box_models::AuthorizeOutcome;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{ApiError, ApiResult, BoxEndpoints};

/// Tokens are treated as expired this long before their reported expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// How long an interactive authorization waits for the browser callback.
pub const DEFAULT_AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectType {
    Enterprise,
    User,
}

impl SubjectType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enterprise => "enterprise",
            Self::User => "user",
        }
    }
}

impl FromStr for SubjectType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "enterprise" => Ok(Self::Enterprise),
            "user" => Ok(Self::User),
            other => Err(format!("unknown subject type: {other}")),
        }
    }
}

/// Settings for the OAuth 2.0 authorization code flow.
#[derive(Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_path: PathBuf,
}

#[derive(Clone)]
pub enum Credentials {
    ClientCredentials {
        client_id: String,
        client_secret: String,
        subject_type: SubjectType,
        subject_id: String,
    },
    OAuth(OAuthSettings),
    DeveloperToken(String),
}

impl Credentials {
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::ClientCredentials { .. } => "ccg",
            Self::OAuth(_) => "oauth",
            Self::DeveloperToken(_) => "developer",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientCredentials {
                client_id,
                subject_type,
                subject_id,
                ..
            } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("subject_type", subject_type)
                .field("subject_id", subject_id)
                .finish_non_exhaustive(),
            Self::OAuth(settings) => f
                .debug_struct("OAuth")
                .field("client_id", &settings.client_id)
                .field("redirect_uri", &settings.redirect_uri)
                .field("token_path", &settings.token_path)
                .finish_non_exhaustive(),
            Self::DeveloperToken(_) => f.write_str("DeveloperToken(..)"),
        }
    }
}

/// A bearer token and what is needed to renew it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_none_or(|expires_at| expires_at - ChronoDuration::seconds(EXPIRY_SKEW_SECS) > now)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> AccessToken {
        AccessToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .map(|seconds| now + ChronoDuration::seconds(seconds)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Issues bearer tokens for API calls, renewing them as they expire.
pub struct Authenticator {
    http: reqwest::Client,
    endpoints: BoxEndpoints,
    credentials: Credentials,
    token: RwLock<Option<AccessToken>>,
    authorization_timeout: Duration,
    /// Browser URL of the authorization currently waiting for its callback.
    pending: Mutex<Option<String>>,
}

enum Authorization {
    InProgress(String),
    Started(String, JoinHandle<ApiResult<()>>),
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("endpoints", &self.endpoints)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    #[must_use]
    pub fn new(http: reqwest::Client, endpoints: BoxEndpoints, credentials: Credentials) -> Self {
        let token = match &credentials {
            Credentials::DeveloperToken(token) => Some(AccessToken {
                access_token: token.clone(),
                refresh_token: None,
                expires_at: None,
            }),
            _ => None,
        };
        Self {
            http,
            endpoints,
            credentials,
            token: RwLock::new(token),
            authorization_timeout: DEFAULT_AUTHORIZATION_TIMEOUT,
            pending: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_authorization_timeout(mut self, timeout: Duration) -> Self {
        self.authorization_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Acquires the first token for the configured mode.
    ///
    /// In OAuth mode a cached token is used when present; otherwise the
    /// interactive flow runs and this call waits for the browser callback.
    ///
    /// # Errors
    /// Returns `ApiError` when credentials are rejected or the flow fails.
    pub async fn authenticate(self: &Arc<Self>) -> ApiResult<()> {
        match &self.credentials {
            Credentials::DeveloperToken(_) => Ok(()),
            Credentials::ClientCredentials { .. } => {
                let token = self.request_client_credentials().await?;
                *self.token.write().await = Some(token);
                Ok(())
            }
            Credentials::OAuth(settings) => {
                if let Some(token) = load_token(&settings.token_path).await {
                    debug!(path = %settings.token_path.display(), "loaded cached OAuth token");
                    *self.token.write().await = Some(token);
                    self.bearer().await.map(|_| ())
                } else {
                    match self.start_authorization(settings).await? {
                        Authorization::Started(url, completion) => {
                            warn!("authorize the Box application by opening: {url}");
                            completion.await.map_err(|err| {
                                ApiError::Auth(format!("authorization task failed: {err}"))
                            })?
                        }
                        Authorization::InProgress(url) => Err(ApiError::Auth(format!(
                            "an authorization is already waiting for its callback: {url}"
                        ))),
                    }
                }
            }
        }
    }

    /// Returns a bearer token that is valid for at least the expiry skew.
    ///
    /// # Errors
    /// Returns `ApiError::Auth` when no token is available and none can be renewed.
    pub async fn bearer(&self) -> ApiResult<String> {
        let now = Utc::now();
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref().filter(|token| token.is_fresh_at(now)) {
                return Ok(token.access_token.clone());
            }
        }

        let mut token = self.token.write().await;
        if let Some(current) = token.as_ref().filter(|token| token.is_fresh_at(now)) {
            return Ok(current.access_token.clone());
        }

        let renewed = match &self.credentials {
            Credentials::DeveloperToken(value) => {
                return Ok(value.clone());
            }
            Credentials::ClientCredentials { .. } => self.request_client_credentials().await?,
            Credentials::OAuth(settings) => {
                let refresh_token = token
                    .as_ref()
                    .and_then(|current| current.refresh_token.clone())
                    .ok_or_else(|| {
                        ApiError::Auth(
                            "OAuth session has expired; run box_authorize_app to sign in again"
                                .to_string(),
                        )
                    })?;
                let renewed = self.request_refresh(settings, &refresh_token).await?;
                store_token(&settings.token_path, &renewed).await;
                renewed
            }
        };
        let value = renewed.access_token.clone();
        *token = Some(renewed);
        Ok(value)
    }

    /// Authorizes the application again.
    ///
    /// OAuth returns immediately with the URL to open while the callback is
    /// awaited in the background. While that flow is pending, further calls
    /// return the same URL.
    ///
    /// # Errors
    /// Returns `ApiError` when the token request or callback listener fails.
    pub async fn authorize(self: &Arc<Self>) -> ApiResult<AuthorizeOutcome> {
        match &self.credentials {
            Credentials::DeveloperToken(_) => Ok(AuthorizeOutcome {
                authorized: true,
                authorization_url: None,
                message: "Box application authorized with a developer token".to_string(),
            }),
            Credentials::ClientCredentials { .. } => {
                let token = self.request_client_credentials().await?;
                *self.token.write().await = Some(token);
                Ok(AuthorizeOutcome {
                    authorized: true,
                    authorization_url: None,
                    message: "Box application authorized successfully".to_string(),
                })
            }
            Credentials::OAuth(settings) => {
                let (url, completion) = match self.start_authorization(settings).await? {
                    Authorization::Started(url, completion) => (url, completion),
                    Authorization::InProgress(url) => {
                        return Ok(AuthorizeOutcome {
                            authorized: false,
                            authorization_url: Some(url),
                            message: "An authorization is already in progress; open the authorization URL in a browser to finish it".to_string(),
                        });
                    }
                };
                tokio::spawn(async move {
                    match completion.await {
                        Ok(Ok(())) => info!("Box application authorized"),
                        Ok(Err(err)) => warn!("Box authorization failed: {err}"),
                        Err(err) => warn!("Box authorization task failed: {err}"),
                    }
                });
                Ok(AuthorizeOutcome {
                    authorized: false,
                    authorization_url: Some(url),
                    message: "Open the authorization URL in a browser to finish authorizing the Box application".to_string(),
                })
            }
        }
    }

    /// Builds the browser URL for the authorization code flow.
    ///
    /// # Errors
    /// Returns `ApiError::InvalidUrl` when the configured authorize URL is malformed.
    pub fn authorization_url(&self, settings: &OAuthSettings, state: &str) -> ApiResult<String> {
        let url = Url::parse_with_params(
            &self.endpoints.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", settings.client_id.as_str()),
                ("redirect_uri", settings.redirect_uri.as_str()),
                ("state", state),
            ],
        )
        .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", self.endpoints.authorize_url)))?;
        Ok(url.into())
    }

    /// Exchanges an authorization code for tokens and persists them.
    ///
    /// # Errors
    /// Returns `ApiError` when the token endpoint rejects the code.
    pub async fn exchange_code(&self, settings: &OAuthSettings, code: &str) -> ApiResult<()> {
        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", settings.client_id.as_str()),
                ("client_secret", settings.client_secret.as_str()),
                ("redirect_uri", settings.redirect_uri.as_str()),
            ])
            .await?;
        store_token(&settings.token_path, &token).await;
        *self.token.write().await = Some(token);
        Ok(())
    }

    async fn request_client_credentials(&self) -> ApiResult<AccessToken> {
        let Credentials::ClientCredentials {
            client_id,
            client_secret,
            subject_type,
            subject_id,
        } = &self.credentials
        else {
            return Err(ApiError::Auth(
                "client credentials are not configured".to_string(),
            ));
        };
        debug!(subject_type = subject_type.as_str(), "requesting client credentials token");
        self.request_token(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("box_subject_type", subject_type.as_str()),
            ("box_subject_id", subject_id.as_str()),
        ])
        .await
    }

    async fn request_refresh(
        &self,
        settings: &OAuthSettings,
        refresh_token: &str,
    ) -> ApiResult<AccessToken> {
        debug!("refreshing OAuth token");
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", settings.client_id.as_str()),
            ("client_secret", settings.client_secret.as_str()),
        ])
        .await
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> ApiResult<AccessToken> {
        let response = self
            .http
            .post(self.endpoints.token_url())
            .form(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: TokenErrorResponse = serde_json::from_str(&body).unwrap_or_default();
            let reason = parsed
                .error_description
                .or(parsed.error)
                .unwrap_or_else(|| format!("token endpoint returned {status}"));
            return Err(ApiError::Auth(reason));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| ApiError::Decode(format!("token response: {err}")))?;
        Ok(token.into_token(Utc::now()))
    }

    /// Binds the redirect listener and returns the URL to open together with
    /// a task that completes once the code has been exchanged, the flow
    /// failed, or the authorization timeout elapsed. The listener is closed
    /// before that task finishes.
    async fn start_authorization(self: &Arc<Self>, settings: &OAuthSettings) -> ApiResult<Authorization> {
        let mut pending = self.pending.lock().await;
        if let Some(url) = pending.as_ref() {
            return Ok(Authorization::InProgress(url.clone()));
        }

        let redirect = Url::parse(&settings.redirect_uri)
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", settings.redirect_uri)))?;
        let host = redirect.host_str().unwrap_or("localhost").to_string();
        let port = redirect.port_or_known_default().unwrap_or(80);
        let path = redirect.path().to_string();

        let listener = tokio::net::TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|err| {
                ApiError::Auth(format!("cannot listen for the OAuth callback on {host}:{port}: {err}"))
            })?;

        let state = uuid::Uuid::new_v4().to_string();
        let url = self.authorization_url(settings, &state)?;

        let (code_tx, code_rx) = oneshot::channel();
        let callback = Arc::new(CallbackState {
            expected_state: state,
            sender: Mutex::new(Some(code_tx)),
        });
        let router = Router::new()
            .route(&path, get(oauth_callback))
            .with_state(callback);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(err) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!("OAuth callback listener stopped: {err}");
            }
        });

        let authenticator = Arc::clone(self);
        let settings = settings.clone();
        let timeout = self.authorization_timeout;
        let completion = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, code_rx).await {
                Ok(Ok(outcome)) => outcome.map_err(ApiError::Auth),
                Ok(Err(_)) => Err(ApiError::Auth("OAuth callback listener closed".to_string())),
                Err(_) => Err(ApiError::Auth(format!(
                    "no OAuth callback received within {} seconds",
                    timeout.as_secs()
                ))),
            };
            let _ = shutdown_tx.send(());
            let _ = server.await;
            *authenticator.pending.lock().await = None;
            let code = outcome?;
            authenticator.exchange_code(&settings, &code).await
        });

        *pending = Some(url.clone());
        Ok(Authorization::Started(url, completion))
    }
}

struct CallbackState {
    expected_state: String,
    sender: Mutex<Option<oneshot::Sender<Result<String, String>>>>,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

fn callback_outcome(expected_state: &str, params: CallbackParams) -> Result<String, String> {
    if let Some(error) = params.error {
        return Err(params.error_description.unwrap_or(error));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err("OAuth state did not match the authorization request".to_string());
    }
    params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| "OAuth callback did not include a code".to_string())
}

async fn oauth_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    // Requests without the expected state leave the flow waiting.
    if params.state.as_deref() != Some(state.expected_state.as_str()) {
        warn!("ignoring OAuth callback with an unexpected state");
        return (StatusCode::BAD_REQUEST, "Box authorization failed.");
    }
    let outcome = callback_outcome(&state.expected_state, params);
    let response = if outcome.is_ok() {
        (
            StatusCode::OK,
            "Box authorization complete. You can close this window.",
        )
    } else {
        (StatusCode::BAD_REQUEST, "Box authorization failed.")
    };
    if let Some(sender) = state.sender.lock().await.take() {
        let _ = sender.send(outcome);
    }
    response
}

async fn load_token(path: &Path) -> Option<AccessToken> {
    let raw = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice(&raw) {
        Ok(token) => Some(token),
        Err(err) => {
            warn!(path = %path.display(), "ignoring unreadable OAuth token cache: {err}");
            None
        }
    }
}

async fn store_token(path: &Path, token: &AccessToken) {
    if let Some(parent) = path.parent() {
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            warn!(path = %parent.display(), "cannot create OAuth token cache directory: {err}");
            return;
        }
    }
    let payload = match serde_json::to_vec_pretty(token) {
        Ok(payload) => payload,
        Err(err) => {
            warn!("cannot serialize OAuth token: {err}");
            return;
        }
    };
    if let Err(err) = write_private(path, &payload).await {
        warn!(path = %path.display(), "cannot write OAuth token cache: {err}");
    }
}

/// Writes a file readable by its owner only.
async fn write_private(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }
    file.write_all(payload).await?;
    file.flush().await
}
