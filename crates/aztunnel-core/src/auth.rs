//! Bearer token acquisition for the tunnel endpoint.
//!
//! Tunnel handshakes authenticate with an Azure management-scope bearer
//! token. Tokens expire, so providers hand out a fresh token per request
//! rather than caching.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// OAuth2 scope requested for tunnel bearer tokens.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Supplies bearer tokens for a subscription's management scope.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Fetch a token usable against the target's tunnel endpoint.
    async fn access_token(&self, subscription_id: &str) -> Result<String>;
}

/// Token provider backed by the Azure AD client-credentials flow.
pub struct AzureAdTokenProvider {
    client: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl AzureAdTokenProvider {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        )
    }
}

#[async_trait]
impl AccessTokenProvider for AzureAdTokenProvider {
    async fn access_token(&self, subscription_id: &str) -> Result<String> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", MANAGEMENT_SCOPE),
        ];

        let response = self
            .client
            .post(self.token_url())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Token(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response.json().await?;
        debug!(subscription_id, "Acquired management-scope token");
        Ok(body.access_token)
    }
}

/// Fixed-token provider for pre-acquired tokens and tests.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self, _subscription_id: &str) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_returns_its_token() {
        let provider = StaticTokenProvider::new("tok-123");
        let token = provider.access_token("sub-1").await.expect("static tokens never fail");
        assert_eq!(token, "tok-123");
    }

    #[test]
    fn token_url_embeds_tenant() {
        let provider = AzureAdTokenProvider::new("my-tenant", "client", "secret");
        assert_eq!(
            provider.token_url(),
            "https://login.microsoftonline.com/my-tenant/oauth2/v2.0/token"
        );
    }
}
