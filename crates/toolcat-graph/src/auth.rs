//! Identity-platform credentials for Microsoft Graph.
//!
//! - [`ClientSecretCredential`]: app-only access with the client-credentials
//!   grant.
//! - [`DeviceCodeCredential`]: delegated access; the user signs in on another
//!   device while the credential polls the token endpoint.
//! - [`StaticToken`]: a pre-issued bearer token.
//!
//! Both OAuth credentials keep the last token and reuse it until shortly
//! before it expires.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Scope requesting every application permission granted to the app.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Tokens closer than this to expiry are refreshed.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Added to the polling interval on each `slow_down` response.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Upper bound on any server-supplied lifetime or polling interval.
const MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

fn lifetime(seconds: u64) -> Duration {
    Duration::from_secs(seconds).min(MAX_LIFETIME)
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint answered with an OAuth error.
    #[error("token endpoint returned '{error}': {description}")]
    Token { error: String, description: String },

    #[error("device code expired before sign-in completed")]
    DeviceCodeExpired,

    #[error("sign-in was declined by the user")]
    AuthorizationDeclined,
}

/// A bearer token and the moment it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: Instant,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now() + EXPIRY_MARGIN
    }
}

/// Source of bearer tokens for Graph requests.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn token(&self) -> Result<AccessToken, AuthError>;
}

/// A fixed token that never refreshes.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenCredential for StaticToken {
    async fn token(&self) -> Result<AccessToken, AuthError> {
        Ok(AccessToken {
            secret: self.0.clone(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

impl TokenResponse {
    fn into_token(self) -> AccessToken {
        AccessToken {
            secret: self.access_token,
            expires_at: Instant::now() + lifetime(self.expires_in),
        }
    }
}

#[derive(Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

impl From<OAuthErrorResponse> for AuthError {
    fn from(e: OAuthErrorResponse) -> Self {
        Self::Token {
            error: e.error,
            description: e.error_description,
        }
    }
}

fn tenant_endpoint(authority: &str, tenant_id: &str, path: &str) -> String {
    format!(
        "{}/{tenant_id}/oauth2/v2.0/{path}",
        authority.trim().trim_end_matches('/')
    )
}

/// Sends a token-endpoint form request. OAuth error bodies become
/// [`AuthError::Token`].
async fn post_form<T: for<'de> Deserialize<'de>>(
    http: &reqwest::Client,
    url: &str,
    form: &[(&str, &str)],
) -> Result<T, AuthError> {
    let response = http.post(url).form(form).send().await?;

    if response.status().is_success() {
        return Ok(response.json::<T>().await?);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read token error body");
        format!("<unreadable body: {e}>")
    });
    Err(match serde_json::from_str::<OAuthErrorResponse>(&body) {
        Ok(oauth) => oauth.into(),
        Err(_) => AuthError::Token {
            error: status.to_string(),
            description: body,
        },
    })
}

/// App-only credential using the client-credentials grant.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cache: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        authority: &str,
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: tenant_endpoint(authority, tenant_id, "token"),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cache: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    async fn token(&self) -> Result<AccessToken, AuthError> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.as_ref()
            && token.is_fresh()
        {
            return Ok(token.clone());
        }

        let response: TokenResponse = post_form(
            &self.http,
            &self.token_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", GRAPH_DEFAULT_SCOPE),
                ("grant_type", "client_credentials"),
            ],
        )
        .await?;

        debug!(expires_in = response.expires_in, "Acquired app-only token");
        let token = response.into_token();
        *cache = Some(token.clone());
        Ok(token)
    }
}

/// Sign-in instructions issued by the device-code endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeInfo {
    pub user_code: String,
    pub verification_uri: String,
    /// Human-readable instructions, ready to show to the user.
    pub message: String,
    device_code: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
    #[serde(default = "default_interval")]
    interval: u64,
}

fn default_interval() -> u64 {
    5
}

/// Called once per sign-in with the instructions to show the user.
pub type DevicePrompt = Arc<dyn Fn(&DeviceCodeInfo) + Send + Sync>;

/// Delegated credential using the device-code flow.
pub struct DeviceCodeCredential {
    http: reqwest::Client,
    device_code_url: String,
    token_url: String,
    client_id: String,
    scopes: String,
    prompt: DevicePrompt,
    cache: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for DeviceCodeCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCodeCredential")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl DeviceCodeCredential {
    /// Creates a credential that logs the sign-in instructions.
    ///
    /// Use [`DeviceCodeCredential::with_prompt`] to show them some other way.
    pub fn new(
        http: reqwest::Client,
        authority: &str,
        tenant_id: &str,
        client_id: impl Into<String>,
        scopes: &[String],
    ) -> Self {
        Self {
            http,
            device_code_url: tenant_endpoint(authority, tenant_id, "devicecode"),
            token_url: tenant_endpoint(authority, tenant_id, "token"),
            client_id: client_id.into(),
            scopes: scopes.join(" "),
            prompt: Arc::new(|info: &DeviceCodeInfo| info!("{}", info.message)),
            cache: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: DevicePrompt) -> Self {
        self.prompt = prompt;
        self
    }

    async fn sign_in(&self) -> Result<AccessToken, AuthError> {
        let info: DeviceCodeInfo = post_form(
            &self.http,
            &self.device_code_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("scope", self.scopes.as_str()),
            ],
        )
        .await?;
        (self.prompt)(&info);

        let deadline = Instant::now() + lifetime(info.expires_in);
        let mut interval = lifetime(info.interval);

        loop {
            if Instant::now() >= deadline {
                return Err(AuthError::DeviceCodeExpired);
            }
            tokio::time::sleep(interval).await;

            let result: Result<TokenResponse, AuthError> = post_form(
                &self.http,
                &self.token_url,
                &[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", info.device_code.as_str()),
                ],
            )
            .await;

            match result {
                Ok(response) => {
                    info!("Device code sign-in completed");
                    return Ok(response.into_token());
                }
                Err(AuthError::Token { error, description }) => match error.as_str() {
                    "authorization_pending" => {}
                    "slow_down" => interval = (interval + SLOW_DOWN_STEP).min(MAX_LIFETIME),
                    "expired_token" => return Err(AuthError::DeviceCodeExpired),
                    "authorization_declined" | "access_denied" => {
                        return Err(AuthError::AuthorizationDeclined);
                    }
                    _ => return Err(AuthError::Token { error, description }),
                },
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl TokenCredential for DeviceCodeCredential {
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    async fn token(&self) -> Result<AccessToken, AuthError> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.as_ref()
            && token.is_fresh()
        {
            return Ok(token.clone());
        }

        let token = self.sign_in().await?;
        *cache = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method, path},
    };

    use super::*;

    fn device_code_body() -> serde_json::Value {
        json!({
            "device_code": "dev-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://microsoft.com/devicelogin",
            "message": "To sign in, enter ABCD-EFGH",
            "expires_in": 900,
            "interval": 0
        })
    }

    fn pending(error: &str) -> ResponseTemplate {
        ResponseTemplate::new(400).set_body_json(json!({
            "error": error,
            "error_description": format!("{error} description")
        }))
    }

    fn user_credential(server: &MockServer) -> DeviceCodeCredential {
        DeviceCodeCredential::new(
            reqwest::Client::new(),
            &server.uri(),
            "tenant-1",
            "client-1",
            &["User.Read".to_string(), "Mail.Read".to_string()],
        )
    }

    #[test]
    fn test_huge_expires_in_is_clamped() {
        let token = TokenResponse {
            access_token: "abc".to_string(),
            expires_in: u64::MAX,
        }
        .into_token();

        assert!(token.is_fresh());
        assert!(token.expires_at <= Instant::now() + MAX_LIFETIME);
    }

    #[tokio::test]
    async fn test_client_secret_credential_accepts_huge_expires_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "app-token",
                "expires_in": u64::MAX
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = ClientSecretCredential::new(
            reqwest::Client::new(),
            &server.uri(),
            "tenant-1",
            "client-1",
            "s3cret",
        );
        let token = credential.token().await.unwrap();
        assert_eq!(token.secret, "app-token");
        assert!(token.is_fresh());
    }

    #[tokio::test]
    async fn test_static_token_returns_secret() {
        let token = StaticToken::new("abc").token().await.unwrap();
        assert_eq!(token.secret, "abc");
        assert!(token.is_fresh());
    }

    #[tokio::test]
    async fn test_client_secret_credential_requests_default_scope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client-1"))
            .and(body_string_contains("client_secret=s3cret"))
            .and(body_string_contains(
                "scope=https%3A%2F%2Fgraph.microsoft.com%2F.default",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "access_token": "app-token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = ClientSecretCredential::new(
            reqwest::Client::new(),
            &server.uri(),
            "tenant-1",
            "client-1",
            "s3cret",
        );

        assert_eq!(credential.token().await.unwrap().secret, "app-token");
        // Second call is served from the cache; `expect(1)` checks it.
        assert_eq!(credential.token().await.unwrap().secret, "app-token");
    }

    #[tokio::test]
    async fn test_client_secret_credential_refreshes_expiring_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "expires_in": 30,
                "access_token": "short-lived"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let credential = ClientSecretCredential::new(
            reqwest::Client::new(),
            &server.uri(),
            "tenant-1",
            "client-1",
            "s3cret",
        );

        credential.token().await.unwrap();
        credential.token().await.unwrap();
    }

    #[tokio::test]
    async fn test_client_secret_credential_surfaces_oauth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .mount(&server)
            .await;

        let credential = ClientSecretCredential::new(
            reqwest::Client::new(),
            &server.uri(),
            "tenant-1",
            "client-1",
            "wrong",
        );

        let err = credential.token().await.unwrap_err();
        let AuthError::Token { error, description } = err else {
            panic!("expected Token error, got {err:?}");
        };
        assert_eq!(error, "invalid_client");
        assert!(description.contains("Invalid client secret"));
    }

    #[tokio::test]
    async fn test_device_code_polls_until_signed_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/devicecode"))
            .and(body_string_contains("scope=User.Read+Mail.Read"))
            .respond_with(ResponseTemplate::new(200).set_body_json(device_code_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("device_code=dev-123"))
            .respond_with(pending("authorization_pending"))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "expires_in": 3600,
                "access_token": "user-token"
            })))
            .with_priority(2)
            .mount(&server)
            .await;

        let prompts = Arc::new(AtomicUsize::new(0));
        let seen = prompts.clone();
        let credential = user_credential(&server).with_prompt(Arc::new(move |info| {
            assert_eq!(info.user_code, "ABCD-EFGH");
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(credential.token().await.unwrap().secret, "user-token");
        assert_eq!(credential.token().await.unwrap().secret, "user-token");
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_device_code_declined() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/devicecode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(device_code_body()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(pending("authorization_declined"))
            .mount(&server)
            .await;

        let err = user_credential(&server).token().await.unwrap_err();
        assert!(matches!(err, AuthError::AuthorizationDeclined));
    }

    #[tokio::test]
    async fn test_device_code_expired() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/devicecode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(device_code_body()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(pending("expired_token"))
            .mount(&server)
            .await;

        let err = user_credential(&server).token().await.unwrap_err();
        assert!(matches!(err, AuthError::DeviceCodeExpired));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let credential = ClientSecretCredential::new(
            reqwest::Client::new(),
            "https://login.microsoftonline.com",
            "tenant-1",
            "client-1",
            "top-secret",
        );
        let debug = format!("{credential:?}");
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"));
    }
}
