//! Subject token sources.
//!
//! A subject token is the platform identity assertion presented to the token
//! exchange. The set of sources is closed: a signed AWS request, a metadata
//! endpoint and a local file.

use std::fmt::{self, Debug};
use std::time::Duration;

use federate_core::utils::Redact;
use federate_core::{Context, Result};
use log::debug;

use crate::config::{CredentialConfiguration, CredentialSource, SubjectTokenType};
use crate::deadline::with_deadline;

mod aws;
pub use aws::SignedRequestSource;
mod file;
pub use file::FileSource;
mod url;
pub use url::MetadataEndpointSource;

/// A freshly produced identity assertion. Never cached.
#[derive(Clone)]
pub struct SubjectToken {
    /// The opaque token value.
    pub value: String,
    /// The declared token type.
    pub token_type: SubjectTokenType,
}

impl Debug for SubjectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubjectToken")
            .field("value", &Redact::from(&self.value))
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Where subject tokens are produced from.
#[derive(Debug, Clone)]
pub enum SubjectTokenSource {
    /// Signed AWS `GetCallerIdentity` request.
    SignedRequest(SignedRequestSource),
    /// Metadata or token endpoint.
    MetadataEndpoint(MetadataEndpointSource),
    /// Local file.
    File(FileSource),
}

impl SubjectTokenSource {
    /// Build the source described by `config`.
    pub fn from_config(config: &CredentialConfiguration) -> Self {
        let audience = config.audience();
        let token_type = config.subject_token_type();
        match config.credential_source() {
            CredentialSource::Aws(source) => {
                Self::SignedRequest(SignedRequestSource::new(audience, source.clone()))
            }
            CredentialSource::Url(source) => Self::MetadataEndpoint(MetadataEndpointSource::new(
                audience,
                source.clone(),
                token_type,
            )),
            CredentialSource::File(source) => {
                Self::File(FileSource::new(source.clone(), token_type))
            }
        }
    }

    /// Produce one subject token, giving up once `deadline` elapses.
    pub async fn fetch(&self, ctx: &Context, deadline: Option<Duration>) -> Result<SubjectToken> {
        with_deadline(deadline, "subject token fetch", async {
            let token = match self {
                Self::SignedRequest(s) => s.fetch(ctx).await?,
                Self::MetadataEndpoint(s) => s.fetch(ctx).await?,
                Self::File(s) => s.fetch(ctx).await?,
            };
            debug!("subject token fetched, type {}", token.token_type);
            Ok(token)
        })
        .await
    }
}
