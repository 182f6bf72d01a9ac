use async_trait::async_trait;
use federate_core::{Context, Error, Result, SignRequest};
use http::header::AUTHORIZATION;
use http::request::Parts;
use http::HeaderValue;
use log::debug;

use crate::token::AccessToken;

/// Applies an [`AccessToken`] as `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSigner;

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = AccessToken;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let Some(token) = credential else {
            return Err(Error::credential_invalid(
                "no access token available to authorize the request",
            ));
        };

        req.headers.insert(AUTHORIZATION, {
            let mut value: HeaderValue = format!("Bearer {}", token.token).parse()?;
            value.set_sensitive(true);

            value
        });
        debug!("authorized request to {} with {}", req.uri, token.prefix());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Provenance;
    use federate_core::time::now;
    use federate_core::ErrorKind;

    #[tokio::test]
    async fn test_bearer_header() -> Result<()> {
        let token = AccessToken {
            token: "ya29.a0AfH6SMBx".to_string(),
            expires_at: now(),
            scopes: vec![],
            provenance: Provenance::Federated,
        };
        let (mut parts, _) = http::Request::get("https://storage.googleapis.com/storage/v1/b")
            .body(())?
            .into_parts();

        RequestSigner
            .sign_request(&Context::new(), &mut parts, Some(&token))
            .await?;

        assert_eq!(parts.headers[AUTHORIZATION], "Bearer ya29.a0AfH6SMBx");
        assert!(parts.headers[AUTHORIZATION].is_sensitive());
        Ok(())
    }

    #[tokio::test]
    async fn test_no_token() -> Result<()> {
        let (mut parts, _) = http::Request::get("https://storage.googleapis.com")
            .body(())?
            .into_parts();

        let err = RequestSigner
            .sign_request(&Context::new(), &mut parts, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
        assert!(parts.headers.get(AUTHORIZATION).is_none());
        Ok(())
    }
}
