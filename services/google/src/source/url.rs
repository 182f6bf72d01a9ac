use bytes::Bytes;
use federate_core::{Context, Error, Result};
use log::{debug, error};

use super::SubjectToken;
use crate::config::{SubjectTokenType, UrlCredentialSource};

/// Fetches the subject token from a metadata or token endpoint.
#[derive(Debug, Clone)]
pub struct MetadataEndpointSource {
    audience: String,
    source: UrlCredentialSource,
    token_type: SubjectTokenType,
}

impl MetadataEndpointSource {
    /// Create a source that asks `source` for a token bound to `audience`.
    pub fn new(
        audience: impl Into<String>,
        source: UrlCredentialSource,
        token_type: SubjectTokenType,
    ) -> Self {
        Self {
            audience: audience.into(),
            source,
            token_type,
        }
    }

    fn request_url(&self) -> String {
        let mut url = self.source.url().to_string();
        if let Some(param) = self.source.resource_parameter() {
            let value = self.source.target_resource().unwrap_or(&self.audience);
            let pair = form_urlencoded::Serializer::new(String::new())
                .append_pair(param, value)
                .finish();
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&pair);
        }
        url
    }

    pub(crate) async fn fetch(&self, ctx: &Context) -> Result<SubjectToken> {
        let url = self.request_url();
        debug!("loading subject token from {}", self.source.url());

        let mut req = http::Request::builder()
            .method(self.source.method().clone())
            .uri(&url)
            .body(Bytes::new())?;
        req.headers_mut().extend(self.source.header_map()?);

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::source_unavailable("failed to reach subject token endpoint")
                .with_source(e)
                .with_context(format!("url: {}", self.source.url()))
        })?;

        let status = resp.status();
        if !status.is_success() {
            error!("subject token endpoint got unexpected response: {status}");
            let body = String::from_utf8_lossy(resp.body());
            return Err(
                Error::source_unavailable("subject token endpoint returned an error")
                    .with_response(status, body)
                    .with_context(format!("url: {}", self.source.url())),
            );
        }

        let value = self
            .source
            .format()
            .parse(resp.body())
            .map_err(|e| e.with_context(format!("url: {}", self.source.url())))?;
        Ok(SubjectToken {
            value,
            token_type: self.token_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Format;
    use async_trait::async_trait;
    use federate_core::{ErrorKind, HttpSend};
    use http::{Method, StatusCode};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct MockEndpoint {
        status: StatusCode,
        body: &'static str,
        seen: Arc<Mutex<Vec<http::Request<Bytes>>>>,
    }

    impl MockEndpoint {
        fn new(status: StatusCode, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl HttpSend for MockEndpoint {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            self.seen.lock().unwrap().push(req);
            Ok(http::Response::builder()
                .status(self.status)
                .body(Bytes::from_static(self.body.as_bytes()))?)
        }
    }

    fn azure_source() -> UrlCredentialSource {
        UrlCredentialSource::new(
            "http://169.254.169.254/metadata/identity/oauth2/token?api-version=2018-02-01",
        )
        .with_header("Metadata", "true")
        .with_resource_parameter("resource")
        .with_format(Format::Json {
            field: "access_token".into(),
        })
    }

    #[tokio::test]
    async fn test_fetch_json_field() -> Result<()> {
        let mock = MockEndpoint::new(StatusCode::OK, r#"{"access_token":"eyJ0eXAi.jwt.sig"}"#);
        let ctx = Context::new().with_http_send(mock.clone());
        let source =
            MetadataEndpointSource::new("api://workload", azure_source(), SubjectTokenType::Jwt);

        let token = source.fetch(&ctx).await?;
        assert_eq!(token.value, "eyJ0eXAi.jwt.sig");
        assert_eq!(token.token_type, SubjectTokenType::Jwt);

        let seen = mock.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method(), Method::GET);
        assert_eq!(
            seen[0].uri().to_string(),
            "http://169.254.169.254/metadata/identity/oauth2/token?api-version=2018-02-01&resource=api%3A%2F%2Fworkload"
        );
        assert_eq!(seen[0].headers()["metadata"], "true");
        Ok(())
    }

    #[tokio::test]
    async fn test_target_resource_override() -> Result<()> {
        let mock = MockEndpoint::new(StatusCode::OK, "plain-token\n");
        let ctx = Context::new().with_http_send(mock.clone());
        let source = MetadataEndpointSource::new(
            "api://workload",
            UrlCredentialSource::new("http://localhost:8080/token")
                .with_method(Method::POST)
                .with_resource_parameter("audience")
                .with_target_resource("custom"),
            SubjectTokenType::IdToken,
        );

        let token = source.fetch(&ctx).await?;
        assert_eq!(token.value, "plain-token");
        let seen = mock.seen.lock().unwrap();
        assert_eq!(seen[0].method(), Method::POST);
        assert_eq!(
            seen[0].uri().to_string(),
            "http://localhost:8080/token?audience=custom"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_non_success_keeps_status_and_body() {
        let mock = MockEndpoint::new(StatusCode::BAD_REQUEST, r#"{"error":"invalid_request"}"#);
        let ctx = Context::new().with_http_send(mock);
        let source =
            MetadataEndpointSource::new("api://workload", azure_source(), SubjectTokenType::Jwt);

        let err = source.fetch(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.response_body(), Some(r#"{"error":"invalid_request"}"#));
    }

    #[tokio::test]
    async fn test_missing_field() {
        let mock = MockEndpoint::new(StatusCode::OK, r#"{"token_type":"Bearer"}"#);
        let ctx = Context::new().with_http_send(mock);
        let source =
            MetadataEndpointSource::new("api://workload", azure_source(), SubjectTokenType::Jwt);

        let err = source.fetch(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceFormat);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let source =
            MetadataEndpointSource::new("api://workload", azure_source(), SubjectTokenType::Jwt);

        let err = source.fetch(&Context::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }
}
