use std::sync::Arc;
use std::time::Duration;

use federate_core::{Context, Result, Signer};
use http::request::Parts;

use crate::config::{Builder, CredentialConfiguration};
use crate::provide_credential::ExternalAccountCredentialProvider;
use crate::sign_request::RequestSigner;
use crate::token::AccessToken;

/// Hands out Google Cloud access tokens obtained through workload identity
/// federation.
///
/// Tokens are cached until they reach their safety margin. Concurrent callers
/// that find the cache empty share a single refresh. Cloning is cheap and
/// clones share the cache.
///
/// ```no_run
/// use federate_core::{Context, Result};
/// use federate_google::CredentialProvider;
/// use std::time::Duration;
///
/// # async fn example(ctx: Context) -> Result<()> {
/// let provider = CredentialProvider::from_env(ctx)?;
/// let token = provider
///     .get_access_token(Some(Duration::from_secs(10)))
///     .await?;
/// println!("token {} valid until {}", token.prefix(), token.expires_at);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    config: Arc<CredentialConfiguration>,
    signer: Signer<AccessToken>,
}

impl CredentialProvider {
    /// Create a provider exchanging as described by `config`.
    pub fn new(ctx: Context, config: CredentialConfiguration) -> Self {
        Self::with_provider(ctx, ExternalAccountCredentialProvider::new(config))
    }

    /// Create a provider around a customized loader.
    pub fn with_provider(ctx: Context, provider: ExternalAccountCredentialProvider) -> Self {
        let config = provider.config().clone();
        Self {
            config,
            signer: Signer::new(ctx, provider, RequestSigner),
        }
    }

    /// Create a provider configured from `GOOGLE_WORKLOADIDENTITY_*` variables.
    pub fn from_env(ctx: Context) -> Result<Self> {
        let config = Builder::from_env(&ctx)?.build()?;
        Ok(Self::new(ctx, config))
    }

    /// Bound a single refresh regardless of caller deadlines. Defaults to 60 seconds.
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.signer = self.signer.with_refresh_timeout(timeout);
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &CredentialConfiguration {
        &self.config
    }

    /// Return a valid access token, refreshing it when needed.
    ///
    /// `deadline` bounds how long this call waits; an elapsed deadline yields
    /// [`federate_core::ErrorKind::Timeout`] while the refresh keeps running
    /// for other callers.
    pub async fn get_access_token(&self, deadline: Option<Duration>) -> Result<AccessToken> {
        self.signer.credential(deadline).await
    }

    /// Insert `Authorization: Bearer <token>` into `req`.
    pub async fn authorize(&self, req: &mut Parts, deadline: Option<Duration>) -> Result<()> {
        self.signer.sign(req, deadline).await
    }
}
