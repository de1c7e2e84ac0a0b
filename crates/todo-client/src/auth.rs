//! OAuth refresh-token handling for the Microsoft identity platform

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use tns_core::{Error, Result};

const AUTHORIZE_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
const TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const REDIRECT_URL: &str = "https://login.microsoftonline.com/common/oauth2/nativeclient";
const SCOPES: &str = "offline_access Tasks.ReadWrite";

/// Refresh access tokens this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// OAuth application settings
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_url: String,
}

impl OAuthConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            redirect_url: REDIRECT_URL.to_string(),
        }
    }

    /// URL the user opens to grant offline access
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&response_mode=query&scope={}&state={}",
            self.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }
}

/// Plain-text file holding the refresh token
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<String> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Auth(format!(
                "cannot read refresh token from {}: {} (run `login` first)",
                self.path.display(),
                e
            ))
        })?;
        let token = content.trim();
        if token.is_empty() {
            return Err(Error::Auth(format!(
                "refresh token file {} is empty",
                self.path.display()
            )));
        }
        Ok(token.to_string())
    }

    pub async fn save(&self, refresh_token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, refresh_token).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Tokens returned by an authorization-code exchange
#[derive(Debug, Clone)]
pub struct AuthorizationGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Duration,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

struct TokenState {
    refresh_token: String,
    access: Option<AccessToken>,
}

/// Hands out access tokens, refreshing them as they expire
pub struct TokenProvider {
    http: reqwest::Client,
    config: OAuthConfig,
    file: TokenFile,
    state: Mutex<TokenState>,
}

impl TokenProvider {
    /// Load the stored refresh token. Does not contact the token endpoint.
    pub async fn load(http: reqwest::Client, config: OAuthConfig, file: TokenFile) -> Result<Self> {
        let refresh_token = file.load().await?;
        Ok(Self {
            http,
            config,
            file,
            state: Mutex::new(TokenState {
                refresh_token,
                access: None,
            }),
        })
    }

    /// A currently valid access token
    pub async fn access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        if let Some(access) = state.access.as_ref().filter(|a| a.is_fresh()) {
            return Ok(access.value.clone());
        }

        debug!("refreshing access token");
        let response = request_token(
            &self.http,
            &self.config,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", state.refresh_token.as_str()),
            ],
        )
        .await?;

        if let Some(rotated) = response.refresh_token.filter(|t| *t != state.refresh_token) {
            self.file.save(&rotated).await?;
            info!(path = %self.file.path().display(), "saved rotated refresh token");
            state.refresh_token = rotated;
        }

        let value = response.access_token;
        state.access = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        });
        Ok(value)
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(
        http: &reqwest::Client,
        config: &OAuthConfig,
        code: &str,
    ) -> Result<AuthorizationGrant> {
        let response = request_token(
            http,
            config,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", config.redirect_url.as_str()),
            ],
        )
        .await?;

        let refresh_token = response
            .refresh_token
            .ok_or_else(|| Error::Auth("token response carried no refresh token".into()))?;
        Ok(AuthorizationGrant {
            access_token: response.access_token,
            refresh_token,
            expires_in: Duration::from_secs(response.expires_in),
        })
    }
}

async fn request_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    grant: &[(&str, &str)],
) -> Result<TokenResponse> {
    let mut form: Vec<(&str, &str)> = vec![
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("scope", SCOPES),
    ];
    form.extend_from_slice(grant);

    let resp = http.post(&config.token_url).form(&form).send().await?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(Error::Auth(format!(
            "token endpoint returned HTTP {}: {}",
            status, text
        )));
    }

    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tempfile::TempDir;

    fn config_for(server: &mockito::Server) -> OAuthConfig {
        OAuthConfig {
            token_url: format!("{}/token", server.url()),
            ..OAuthConfig::new("client-1", "secret-1")
        }
    }

    async fn token_file(dir: &TempDir, content: &str) -> TokenFile {
        let file = TokenFile::new(dir.path().join("token.txt"));
        file.save(content).await.unwrap();
        file
    }

    #[tokio::test]
    async fn test_access_token_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "rt-1".into()),
                Matcher::UrlEncoded("client_id".into(), "client-1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "at-1", "refresh_token": "rt-1", "expires_in": 3600, "token_type": "Bearer"}"#)
            .expect(1)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let file = token_file(&dir, "rt-1\n").await;
        let provider = TokenProvider::load(reqwest::Client::new(), config_for(&server), file)
            .await
            .unwrap();

        assert_eq!(provider.access_token().await.unwrap(), "at-1");
        assert_eq!(provider.access_token().await.unwrap(), "at-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_saved() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "at-2", "refresh_token": "rt-2", "expires_in": 3600}"#)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let file = token_file(&dir, "rt-1").await;
        let provider =
            TokenProvider::load(reqwest::Client::new(), config_for(&server), file.clone())
                .await
                .unwrap();

        provider.access_token().await.unwrap();

        assert_eq!(file.load().await.unwrap(), "rt-2");
    }

    #[tokio::test]
    async fn test_expired_access_token_is_refreshed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "short", "expires_in": 30}"#)
            .expect(2)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let file = token_file(&dir, "rt-1").await;
        let provider = TokenProvider::load(reqwest::Client::new(), config_for(&server), file)
            .await
            .unwrap();

        provider.access_token().await.unwrap();
        provider.access_token().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_refresh_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;
        let dir = TempDir::new().unwrap();
        let file = token_file(&dir, "rt-1").await;
        let provider = TokenProvider::load(reqwest::Client::new(), config_for(&server), file)
            .await
            .unwrap();

        match provider.access_token().await.unwrap_err() {
            Error::Auth(msg) => assert!(msg.contains("invalid_grant")),
            e => panic!("Expected Auth error, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_missing_token_file() {
        let dir = TempDir::new().unwrap();
        let file = TokenFile::new(dir.path().join("absent.txt"));
        let result = TokenProvider::load(
            reqwest::Client::new(),
            OAuthConfig::new("client-1", "secret-1"),
            file,
        )
        .await;

        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded("code".into(), "code-123".into()))
            .with_status(200)
            .with_body(r#"{"access_token": "at-1", "refresh_token": "rt-new", "expires_in": 3600}"#)
            .create_async()
            .await;

        let grant =
            TokenProvider::exchange_code(&reqwest::Client::new(), &config_for(&server), "code-123")
                .await
                .unwrap();

        assert_eq!(grant.refresh_token, "rt-new");
        assert_eq!(grant.expires_in, Duration::from_secs(3600));
    }

    #[test]
    fn test_authorization_url() {
        let url = OAuthConfig::new("client-1", "secret-1").authorization_url("state-1");
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("scope=offline_access%20Tasks.ReadWrite"));
        assert!(url.contains("state=state-1"));
    }
}
