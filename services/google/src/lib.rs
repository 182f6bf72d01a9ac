//! Google Cloud workload identity federation.
//!
//! Exchanges a platform identity (a signed AWS request, a token from a
//! metadata endpoint, or a token file) for a short-lived Google Cloud access
//! token, optionally impersonating a service account, and caches the result.
//!
//! ```no_run
//! use federate_core::{Context, Result};
//! use federate_google::{AwsCredentialSource, CredentialConfiguration, CredentialProvider};
//!
//! # async fn example(ctx: Context) -> Result<()> {
//! let config = CredentialConfiguration::builder()
//!     .with_audience("//iam.googleapis.com/projects/123456/locations/global/workloadIdentityPools/pool/providers/aws")
//!     .with_credential_source(AwsCredentialSource::new("us-east-1"))
//!     .with_service_account("reader@my-project.iam.gserviceaccount.com")
//!     .build()?;
//!
//! let provider = CredentialProvider::new(ctx, config);
//! let mut parts = http::Request::get("https://storage.googleapis.com/storage/v1/b?project=my-project")
//!     .body(())?
//!     .into_parts()
//!     .0;
//! provider.authorize(&mut parts, None).await?;
//! # Ok(())
//! # }
//! ```

mod constants;
mod deadline;

mod config;
pub use config::{
    AwsCredentialSource, Builder, CredentialConfiguration, CredentialSource, FileCredentialSource,
    Format, SubjectTokenType, UrlCredentialSource,
};

mod token;
pub use token::{AccessToken, FederatedToken, ImpersonatedToken, Provenance};

mod source;
pub use source::{
    FileSource, MetadataEndpointSource, SignedRequestSource, SubjectToken, SubjectTokenSource,
};

mod sts;
pub use sts::StsTokenExchanger;

mod impersonate;
pub use impersonate::ImpersonationClient;

mod provide_credential;
pub use provide_credential::ExternalAccountCredentialProvider;

mod sign_request;
pub use sign_request::RequestSigner;

mod provider;
pub use provider::CredentialProvider;
