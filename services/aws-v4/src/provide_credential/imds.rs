use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use federate_core::time::{parse_rfc3339, DateTime};
use federate_core::{Context, Error, ProvideCredential, Result};
use http::header::CONTENT_LENGTH;
use http::{Method, StatusCode};
use serde::Deserialize;
use std::sync::{Arc, Mutex};

/// IMDSv2CredentialProvider loads the instance role credentials from the EC2
/// instance metadata service, using a session token as IMDSv2 requires.
#[derive(Debug, Clone)]
pub struct IMDSv2CredentialProvider {
    endpoint: Option<String>,
    token: Arc<Mutex<(String, DateTime)>>,
}

impl Default for IMDSv2CredentialProvider {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: Arc::new(Mutex::new((String::new(), DateTime::default()))),
        }
    }
}

impl IMDSv2CredentialProvider {
    /// Create a new `IMDSv2CredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint for the metadata service.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn get_endpoint(&self, ctx: &Context) -> String {
        // First check configured endpoint, then environment, then default
        self.endpoint.clone().unwrap_or_else(|| {
            ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT)
                .unwrap_or_else(|| IMDS_DEFAULT_ENDPOINT.to_string())
        })
    }

    async fn load_ec2_metadata_token(&self, ctx: &Context) -> Result<String> {
        {
            let (token, expires_in) = self
                .token
                .lock()
                .map_err(|_| Error::unexpected("imds token lock poisoned"))?
                .clone();
            if expires_in > ctx.now() {
                return Ok(token);
            }
        }

        let endpoint = self.get_endpoint(ctx);
        let url = format!("{endpoint}/latest/api/token");
        let req = http::Request::builder()
            .uri(&url)
            .method(Method::PUT)
            .header(CONTENT_LENGTH, "0")
            // 21600s (6h) is recommended by AWS.
            .header(X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS, "21600")
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build IMDS token request")
                    .with_source(e)
                    .with_context(format!("url: {url}"))
            })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::source_unavailable("failed to connect to IMDS")
                .with_source(e)
                .with_context(format!("endpoint: {endpoint}"))
                .with_context("hint: check if running on EC2 instance")
        })?;

        if resp.status() != StatusCode::OK {
            return Err(parse_imds_error(
                "fetch_imds_token",
                resp.status(),
                resp.body(),
            ));
        }
        let ec2_token = resp.into_body();
        // Set expires_in to 10 minutes to enforce re-read.
        let expires_in = ctx.now() + chrono::TimeDelta::try_seconds(21600).expect("in bounds")
            - chrono::TimeDelta::try_seconds(600).expect("in bounds");

        {
            *self
                .token
                .lock()
                .map_err(|_| Error::unexpected("imds token lock poisoned"))? =
                (ec2_token.clone(), expires_in);
        }

        Ok(ec2_token)
    }

    async fn get(&self, ctx: &Context, token: &str, path: &str, op: &str) -> Result<String> {
        let url = format!("{}{path}", self.get_endpoint(ctx));
        let req = http::Request::builder()
            .uri(&url)
            .method(Method::GET)
            .header(X_AWS_EC2_METADATA_TOKEN, token)
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build IMDS request")
                    .with_source(e)
                    .with_context(format!("url: {url}"))
            })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::source_unavailable("failed to query IMDS")
                .with_source(e)
                .with_context(format!("operation: {op}"))
        })?;

        if resp.status() != StatusCode::OK {
            return Err(parse_imds_error(op, resp.status(), resp.body()));
        }
        Ok(resp.into_body())
    }
}

#[async_trait]
impl ProvideCredential for IMDSv2CredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let disabled = ctx
            .env_var(AWS_EC2_METADATA_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if disabled {
            return Ok(None);
        }

        let token = self.load_ec2_metadata_token(ctx).await?;

        // List all credentials that node has.
        let profile_name = self
            .get(
                ctx,
                &token,
                "/latest/meta-data/iam/security-credentials/",
                "list_instance_profiles",
            )
            .await?;
        let profile_name = profile_name.lines().next().unwrap_or_default().trim();
        if profile_name.is_empty() {
            return Err(
                Error::credential_invalid("no IAM role attached to EC2 instance")
                    .with_context("hint: attach an IAM role to your EC2 instance"),
            );
        }

        // Get the credentials via role_name.
        let content = self
            .get(
                ctx,
                &token,
                &format!("/latest/meta-data/iam/security-credentials/{profile_name}"),
                "fetch_credentials",
            )
            .await?;
        let resp: Ec2MetadataIamSecurityCredentials =
            serde_json::from_str(&content).map_err(|e| {
                Error::credential_invalid("failed to parse IMDS credentials response")
                    .with_source(e)
                    .with_context(format!("response_length: {}", content.len()))
                    .with_context(format!("profile: {profile_name}"))
            })?;

        if resp.code != "Success" {
            return Err(Error::credential_invalid(format!(
                "IMDS returned error: [{}] {}",
                resp.code, resp.message
            ))
            .with_context(format!("profile: {profile_name}")));
        }

        let cred = Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            expires_in: Some(parse_rfc3339(&resp.expiration).map_err(|e| {
                e.with_context(format!("expiration_value: {}", resp.expiration))
            })?),
        };

        Ok(Some(cred))
    }
}

fn parse_imds_error(op: &str, status: StatusCode, body: &str) -> Error {
    let err = match status {
        StatusCode::NOT_FOUND => Error::credential_invalid("IMDS resource not found"),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::credential_invalid("IMDS rejected the request")
        }
        _ => Error::source_unavailable("IMDS request failed"),
    };
    err.with_response(status, body)
        .with_context(format!("operation: {op}"))
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Ec2MetadataIamSecurityCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
    message: String,
}
