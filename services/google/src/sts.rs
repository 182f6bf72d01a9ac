use std::time::Duration;

use bytes::Bytes;
use federate_core::{Context, Error, Result};
use http::header::{ACCEPT, CONTENT_TYPE};
use log::{debug, error};
use serde::Deserialize;

use crate::config::CredentialConfiguration;
use crate::constants::{DEFAULT_SCOPE, GRANT_TYPE_TOKEN_EXCHANGE, TOKEN_TYPE_ACCESS_TOKEN};
use crate::deadline::with_deadline;
use crate::source::SubjectToken;
use crate::token::{expiry_with_margin, FederatedToken};

#[derive(Deserialize)]
struct StsTokenResponse {
    access_token: Option<String>,
    expires_in: Option<serde_json::Value>,
}

/// Exchanges a subject token for a federated access token (RFC 8693).
#[derive(Debug, Clone, Copy, Default)]
pub struct StsTokenExchanger;

impl StsTokenExchanger {
    /// Create a new exchanger.
    pub fn new() -> Self {
        Self
    }

    /// Run one token exchange against `config.token_url()`.
    ///
    /// The returned expiry is already reduced by `max(30s, expires_in / 10)`.
    pub async fn exchange(
        &self,
        ctx: &Context,
        config: &CredentialConfiguration,
        subject_token: &SubjectToken,
        deadline: Option<Duration>,
    ) -> Result<FederatedToken> {
        with_deadline(
            deadline,
            "token exchange",
            self.exchange_inner(ctx, config, subject_token),
        )
        .await
    }

    async fn exchange_inner(
        &self,
        ctx: &Context,
        config: &CredentialConfiguration,
        subject_token: &SubjectToken,
    ) -> Result<FederatedToken> {
        // The impersonation call decides the final scopes.
        let scopes = if config.service_account_impersonation_url().is_some() {
            vec![DEFAULT_SCOPE.to_string()]
        } else {
            config.scopes().to_vec()
        };
        debug!("exchanging subject token at {}", config.token_url());

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", GRANT_TYPE_TOKEN_EXCHANGE)
            .append_pair("audience", config.audience())
            .append_pair("scope", &scopes.join(" "))
            .append_pair("requested_token_type", TOKEN_TYPE_ACCESS_TOKEN)
            .append_pair("subject_token", &subject_token.value)
            .append_pair("subject_token_type", subject_token.token_type.as_str())
            .finish();

        let req = http::Request::post(config.token_url())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(Bytes::from(body))?;

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::exchange_failed("failed to send token exchange request")
                .with_source(e)
                .with_context(format!("url: {}", config.token_url()))
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = String::from_utf8_lossy(resp.body()).to_string();
            let err = Error::exchange_failed("exchange token failed")
                .with_response(status, body)
                .with_context(format!("url: {}", config.token_url()));
            error!(
                "exchange token got unexpected response: {status}, error code: {}",
                err.oauth_error().as_deref().unwrap_or("unknown")
            );
            return Err(err);
        }

        let token_resp: StsTokenResponse = serde_json::from_slice(resp.body()).map_err(|e| {
            Error::protocol("failed to parse token exchange response").with_source(e)
        })?;
        let access_token = token_resp
            .access_token
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::protocol("token exchange response has no access_token"))?;
        let expires_in = token_resp
            .expires_in
            .as_ref()
            .and_then(|v| v.as_u64())
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                Error::protocol("token exchange response has no positive integer expires_in")
            })?;

        let expires_at = expiry_with_margin(ctx.now(), Duration::from_secs(expires_in));
        debug!("token exchange succeeded, token used until {expires_at}");

        Ok(FederatedToken {
            access_token,
            expires_at,
            scopes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileCredentialSource, SubjectTokenType};
    use async_trait::async_trait;
    use federate_core::time::{parse_rfc3339, ManualClock};
    use federate_core::{ErrorKind, HttpSend};
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use test_case::test_case;

    #[derive(Debug, Clone)]
    struct MockSts {
        status: StatusCode,
        body: &'static str,
        delay: Duration,
        seen: Arc<Mutex<Vec<http::Request<Bytes>>>>,
    }

    impl MockSts {
        fn new(status: StatusCode, body: &'static str) -> Self {
            Self {
                status,
                body,
                delay: Duration::ZERO,
                seen: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl HttpSend for MockSts {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            self.seen.lock().unwrap().push(req);
            tokio::time::sleep(self.delay).await;
            Ok(http::Response::builder()
                .status(self.status)
                .body(Bytes::from_static(self.body.as_bytes()))?)
        }
    }

    fn config(impersonate: bool) -> CredentialConfiguration {
        let mut builder = CredentialConfiguration::builder()
            .with_audience("//iam.googleapis.com/projects/1/locations/global/workloadIdentityPools/p/providers/oidc")
            .with_scopes(["https://www.googleapis.com/auth/devstorage.read_only"])
            .with_credential_source(FileCredentialSource::new("/token"));
        if impersonate {
            builder = builder.with_service_account("sa@p.iam.gserviceaccount.com");
        }
        builder.build().expect("config must be valid")
    }

    fn subject() -> SubjectToken {
        SubjectToken {
            value: "subject-jwt".to_string(),
            token_type: SubjectTokenType::Jwt,
        }
    }

    fn ctx(mock: &MockSts) -> Context {
        Context::new()
            .with_http_send(mock.clone())
            .with_clock(ManualClock::new(
                parse_rfc3339("2024-01-01T00:00:00Z").expect("valid time"),
            ))
    }

    fn form(req: &http::Request<Bytes>) -> HashMap<String, String> {
        form_urlencoded::parse(req.body()).into_owned().collect()
    }

    #[tokio::test]
    async fn test_exchange_success() -> Result<()> {
        let mock = MockSts::new(
            StatusCode::OK,
            r#"{"access_token":"t1","issued_token_type":"urn:ietf:params:oauth:token-type:access_token","token_type":"Bearer","expires_in":3600}"#,
        );

        let token = StsTokenExchanger::new()
            .exchange(&ctx(&mock), &config(false), &subject(), None)
            .await?;

        assert_eq!(token.access_token, "t1");
        assert_eq!(token.expires_at, parse_rfc3339("2024-01-01T00:54:00Z")?);
        assert_eq!(
            token.scopes,
            vec!["https://www.googleapis.com/auth/devstorage.read_only".to_string()]
        );

        let seen = mock.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].uri(), "https://sts.googleapis.com/v1/token");
        assert_eq!(
            seen[0].headers()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        let form = form(&seen[0]);
        assert_eq!(form["grant_type"], GRANT_TYPE_TOKEN_EXCHANGE);
        assert_eq!(form["requested_token_type"], TOKEN_TYPE_ACCESS_TOKEN);
        assert_eq!(form["subject_token"], "subject-jwt");
        assert_eq!(
            form["subject_token_type"],
            "urn:ietf:params:oauth:token-type:jwt"
        );
        assert_eq!(
            form["scope"],
            "https://www.googleapis.com/auth/devstorage.read_only"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_exchange_requests_cloud_platform_when_impersonating() -> Result<()> {
        let mock = MockSts::new(StatusCode::OK, r#"{"access_token":"t1","expires_in":3600}"#);

        StsTokenExchanger::new()
            .exchange(&ctx(&mock), &config(true), &subject(), None)
            .await?;

        let seen = mock.seen.lock().unwrap();
        assert_eq!(form(&seen[0])["scope"], DEFAULT_SCOPE);
        Ok(())
    }

    #[tokio::test]
    async fn test_exchange_rejected() {
        let body = r#"{"error":"invalid_grant","error_description":"The audience in ID Token does not match the expected audience."}"#;
        let mock = MockSts::new(StatusCode::BAD_REQUEST, body);

        let err = StsTokenExchanger::new()
            .exchange(&ctx(&mock), &config(false), &subject(), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExchangeFailed);
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.response_body(), Some(body));
        assert_eq!(err.oauth_error().as_deref(), Some("invalid_grant"));
    }

    #[test_case(r#"{"expires_in":3600}"# ; "missing access token")]
    #[test_case(r#"{"access_token":"t1"}"# ; "missing expires_in")]
    #[test_case(r#"{"access_token":"t1","expires_in":"3600"}"# ; "string expires_in")]
    #[test_case(r#"{"access_token":"t1","expires_in":36.5}"# ; "fractional expires_in")]
    #[test_case("<html>ok</html>" ; "not json")]
    #[tokio::test]
    async fn test_exchange_malformed_success(body: &'static str) {
        let mock = MockSts::new(StatusCode::OK, body);

        let err = StsTokenExchanger::new()
            .exchange(&ctx(&mock), &config(false), &subject(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_exchange_deadline() {
        let mut mock = MockSts::new(StatusCode::OK, r#"{"access_token":"t1","expires_in":3600}"#);
        mock.delay = Duration::from_secs(5);

        let err = StsTokenExchanger::new()
            .exchange(
                &ctx(&mock),
                &config(false),
                &subject(),
                Some(Duration::from_millis(20)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
