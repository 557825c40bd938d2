//! The authentication capability (spec §4.5 "Authenticating").

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CloudError;

/// What the auth capability returns on success.
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// A signed WebSocket URL good for one connection attempt.
    pub websocket_url: String,
    /// The relay-assigned user id for this device.
    pub user_id: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Optional additional profile fields the relay returned.
    pub profile: Option<serde_json::Value>,
}

/// Exchanges device credentials for a signed connection URL.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Authenticate with the cloud relay.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::AuthFailure`] on invalid credentials or a
    /// malformed response.
    async fn authenticate(&self) -> Result<AuthResult, CloudError>;
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    websocket_url: String,
    user_id: String,
    display_name: String,
    #[serde(default)]
    profile: Option<serde_json::Value>,
}

/// Production auth provider: POSTs device credentials to the relay's auth
/// endpoint over HTTPS.
pub struct HttpAuthProvider {
    auth_url: String,
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
    client: reqwest::Client,
}

impl HttpAuthProvider {
    /// Construct a provider targeting `https://<auth_url>/auth/device`.
    #[must_use]
    pub fn new(
        auth_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            password: password.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn authenticate(&self) -> Result<AuthResult, CloudError> {
        let url = format!("https://{}/auth/device", self.auth_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|e| CloudError::AuthFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CloudError::AuthFailure(format!(
                "auth endpoint returned {}",
                response.status()
            )));
        }

        let body: AuthResponse = response
            .json()
            .await
            .map_err(|e| CloudError::AuthFailure(format!("malformed auth response: {e}")))?;

        Ok(AuthResult {
            websocket_url: body.websocket_url,
            user_id: body.user_id,
            display_name: body.display_name,
            profile: body.profile,
        })
    }
}
