use std::time::Duration;

use bytes::Bytes;
use federate_core::time::parse_rfc3339;
use federate_core::{Context, Error, Result};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::config::{service_account_from_url, CredentialConfiguration};
use crate::deadline::with_deadline;
use crate::token::{expiry_with_margin, FederatedToken, ImpersonatedToken};

#[derive(Serialize)]
struct ImpersonationRequest<'a> {
    scope: &'a [String],
    lifetime: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImpersonatedTokenResponse {
    access_token: Option<String>,
    expire_time: Option<String>,
}

/// Trades a federated token for a service account access token.
#[derive(Debug, Clone)]
pub struct ImpersonationClient {
    url: String,
    service_account: String,
    scopes: Vec<String>,
    lifetime: Duration,
}

impl ImpersonationClient {
    /// Create a client calling `url`, which must end with
    /// `serviceAccounts/<email>:generateAccessToken`.
    pub fn new(url: impl Into<String>, scopes: Vec<String>, lifetime: Duration) -> Result<Self> {
        let url = url.into();
        let service_account = service_account_from_url(&url)
            .ok_or_else(|| {
                Error::config_invalid("impersonation URL does not name a service account")
                    .with_context(format!("url: {url}"))
            })?
            .to_string();
        Ok(Self {
            url,
            service_account,
            scopes,
            lifetime,
        })
    }

    /// Build the client for `config`, or `None` when impersonation is off.
    pub fn from_config(config: &CredentialConfiguration) -> Option<Self> {
        let url = config.service_account_impersonation_url()?;
        let service_account = config.service_account()?;
        Some(Self {
            url: url.to_string(),
            service_account: service_account.to_string(),
            scopes: config.scopes().to_vec(),
            lifetime: config.token_lifetime(),
        })
    }

    /// Email of the impersonated service account.
    pub fn service_account(&self) -> &str {
        &self.service_account
    }

    /// Request a service account token authorized by `federated`.
    pub async fn impersonate(
        &self,
        ctx: &Context,
        federated: &FederatedToken,
        deadline: Option<Duration>,
    ) -> Result<ImpersonatedToken> {
        with_deadline(
            deadline,
            "service account impersonation",
            self.impersonate_inner(ctx, federated),
        )
        .await
    }

    async fn impersonate_inner(
        &self,
        ctx: &Context,
        federated: &FederatedToken,
    ) -> Result<ImpersonatedToken> {
        debug!("impersonating service account {}", self.service_account);

        let body = serde_json::to_vec(&ImpersonationRequest {
            scope: &self.scopes,
            lifetime: format!("{}s", self.lifetime.as_secs()),
        })?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", federated.access_token))?;
        authorization.set_sensitive(true);

        let req = http::Request::post(&self.url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, authorization)
            .body(Bytes::from(body))?;

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::impersonation_failed("failed to send impersonation request")
                .with_source(e)
                .with_context(format!("service_account: {}", self.service_account))
        })?;

        let status = resp.status();
        if !status.is_success() {
            error!(
                "impersonate service account {} got unexpected response: {status}",
                self.service_account
            );
            let body = String::from_utf8_lossy(resp.body()).to_string();
            let mut err = Error::impersonation_failed("impersonate service account failed")
                .with_response(status, body)
                .with_context(format!("service_account: {}", self.service_account));
            if status == StatusCode::FORBIDDEN {
                err = err.with_context(
                    "hint: the federated principal needs roles/iam.serviceAccountTokenCreator on the service account",
                );
            }
            return Err(err);
        }

        let token_resp: ImpersonatedTokenResponse =
            serde_json::from_slice(resp.body()).map_err(|e| {
                Error::protocol("failed to parse impersonation response").with_source(e)
            })?;
        let access_token = token_resp
            .access_token
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::protocol("impersonation response has no accessToken"))?;
        let expire_time = token_resp
            .expire_time
            .ok_or_else(|| Error::protocol("impersonation response has no expireTime"))?;
        let expire_time = parse_rfc3339(&expire_time).map_err(|e| {
            Error::protocol("impersonation response has a malformed expireTime").with_source(e)
        })?;

        let now = ctx.now();
        let remaining = (expire_time - now).to_std().map_err(|_| {
            Error::protocol("impersonation response expireTime is in the past")
                .with_context(format!("expireTime: {expire_time}"))
        })?;
        let expires_at = expiry_with_margin(now, remaining);
        debug!(
            "impersonated {}, token used until {expires_at}",
            self.service_account
        );

        Ok(ImpersonatedToken {
            access_token,
            expires_at,
            scopes: self.scopes.clone(),
            service_account: self.service_account.clone(),
        })
    }
}
