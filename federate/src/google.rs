//! Google Cloud workload identity federation with convenience APIs

// Re-export all workload identity types
pub use federate_google::*;

#[cfg(feature = "default-context")]
use crate::{default_context, Result};

/// Create a credential provider configured from the environment.
///
/// This function creates a provider with:
/// - Default context (tokio file reader, reqwest HTTP client, OS environment)
/// - Configuration read from `GOOGLE_WORKLOADIDENTITY_*`, `AWS_REGION` and
///   `AWS_DEFAULT_REGION`
///
/// Invalid or missing configuration fails here, before any network call.
///
/// # Example
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> federate::Result<()> {
/// let provider = federate::google::default_provider()?;
///
/// let mut req = http::Request::builder()
///     .method("GET")
///     .uri("https://storage.googleapis.com/storage/v1/b?project=my-project")
///     .body(())
///     .unwrap()
///     .into_parts()
///     .0;
///
/// provider.authorize(&mut req, None).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Customization
///
/// Build the configuration yourself to skip the environment:
///
/// ```no_run
/// # fn example() -> federate::Result<()> {
/// use federate::google::{CredentialConfiguration, CredentialProvider, FileCredentialSource};
///
/// let config = CredentialConfiguration::builder()
///     .with_audience("//iam.googleapis.com/projects/123456/locations/global/workloadIdentityPools/k8s/providers/k8s")
///     .with_credential_source(FileCredentialSource::new("/var/run/secrets/tokens/gcp-ksa/token"))
///     .build()?;
/// let provider = CredentialProvider::new(federate::default_context(), config);
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "default-context")]
pub fn default_provider() -> Result<CredentialProvider> {
    CredentialProvider::from_env(default_context())
}
