use std::sync::Arc;

use federate_aws_v4::{Credential as AwsCredential, DefaultCredentialProvider, RequestSigner};
use federate_core::{Context, Error, ProvideCredential, Result, SignRequest};
use http::header::AUTHORIZATION;
use log::debug;
use percent_encoding::utf8_percent_encode;
use serde::Serialize;

use super::SubjectToken;
use crate::config::{AwsCredentialSource, SubjectTokenType};
use crate::constants::{SUBJECT_TOKEN_ENCODE_SET, X_GOOG_CLOUD_TARGET_RESOURCE};

#[derive(Serialize)]
struct SignedEnvelope<'a> {
    url: &'a str,
    method: &'a str,
    headers: Vec<EnvelopeHeader>,
    body: &'a str,
}

#[derive(Serialize)]
struct EnvelopeHeader {
    key: String,
    value: String,
}

/// Proves an AWS identity with a signed `GetCallerIdentity` request.
///
/// The request is never sent. Its signed form is serialized and the
/// token exchange replays it against AWS.
#[derive(Debug, Clone)]
pub struct SignedRequestSource {
    audience: String,
    source: AwsCredentialSource,
    credentials: Arc<dyn ProvideCredential<Credential = AwsCredential>>,
}

impl SignedRequestSource {
    /// Sign with credentials from the environment, then IMDSv2.
    pub fn new(audience: impl Into<String>, source: AwsCredentialSource) -> Self {
        Self {
            audience: audience.into(),
            source,
            credentials: Arc::new(DefaultCredentialProvider::new()),
        }
    }

    /// Resolve AWS credentials from `provider` instead of the default chain.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = AwsCredential>,
    ) -> Self {
        self.credentials = Arc::new(provider);
        self
    }

    pub(crate) async fn fetch(&self, ctx: &Context) -> Result<SubjectToken> {
        let cred = self
            .credentials
            .provide_credential(ctx)
            .await
            .map_err(|e| Error::signing_failed("failed to resolve AWS credentials").with_source(e))?
            .ok_or_else(|| {
                Error::signing_failed(
                    "no AWS credentials found in environment variables or instance metadata",
                )
            })?;

        let url = self.source.verification_url();
        let mut parts = http::Request::post(&url)
            .header(X_GOOG_CLOUD_TARGET_RESOURCE, &self.audience)
            .body(())?
            .into_parts()
            .0;

        RequestSigner::new("sts", self.source.region())
            .sign_request(ctx, &mut parts, Some(&cred))
            .await?;
        debug!(
            "signed GetCallerIdentity request in region {}",
            self.source.region()
        );

        let mut headers = parts
            .headers
            .iter()
            .map(|(k, v)| {
                Ok(EnvelopeHeader {
                    key: k.as_str().to_string(),
                    value: v.to_str()?.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        headers.sort_by(|a, b| {
            (a.key != AUTHORIZATION.as_str(), &a.key).cmp(&(b.key != AUTHORIZATION.as_str(), &b.key))
        });

        let envelope = serde_json::to_string(&SignedEnvelope {
            url: &url,
            method: parts.method.as_str(),
            headers,
            body: "",
        })?;

        Ok(SubjectToken {
            value: utf8_percent_encode(&envelope, &SUBJECT_TOKEN_ENCODE_SET).to_string(),
            token_type: SubjectTokenType::Aws4Request,
        })
    }
}
