use std::time::Duration;

use anyhow::Result;
use federate::google::{Builder, CredentialProvider};
use federate::default_context_with_client;
use log::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // Bound every HTTP call made while refreshing
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let ctx = default_context_with_client(client);

    // Read GOOGLE_WORKLOADIDENTITY_* from the environment and validate it
    let config = Builder::from_env(&ctx)?.build()?;
    info!(
        "exchanging for audience {} (impersonating: {:?})",
        config.audience(),
        config.service_account()
    );
    let provider = CredentialProvider::new(ctx.clone(), config);

    let token = match provider.get_access_token(Some(Duration::from_secs(30))).await {
        Ok(token) => token,
        Err(err) => {
            error!("failed to get access token: {}", err.message());
            for line in err.context() {
                error!("  {line}");
            }
            return Err(err.into());
        }
    };
    info!(
        "got {:?} token {} valid until {}",
        token.provenance,
        token.prefix(),
        token.expires_at
    );

    // Authorize a request against Cloud Storage
    let project = std::env::var("GOOGLE_CLOUD_PROJECT").unwrap_or_else(|_| "my-project".into());
    let mut req = http::Request::builder()
        .method(http::Method::GET)
        .uri(format!("https://storage.googleapis.com/storage/v1/b?project={project}"))
        .body(())?
        .into_parts()
        .0;
    provider.authorize(&mut req, None).await?;

    let signed_req = http::Request::from_parts(req, bytes::Bytes::new());
    let resp = ctx.http_send(signed_req).await?;
    println!("Response status: {}", resp.status());

    Ok(())
}
