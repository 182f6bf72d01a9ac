use std::collections::HashMap;
use std::time::Duration;

use federate_core::time::Clock;
use federate_core::{ErrorKind, Result};
use federate_google::{CredentialConfiguration, CredentialProvider, Provenance};
use http::header::AUTHORIZATION;
use http::StatusCode;
use pretty_assertions::assert_eq;

use crate::mock::{
    metadata_config, start_time, test_context, test_context_with_env, MockGoogle, AUDIENCE,
    SERVICE_ACCOUNT,
};

fn seconds(n: i64) -> chrono::TimeDelta {
    chrono::TimeDelta::try_seconds(n).unwrap()
}

#[tokio::test]
async fn test_token_is_reused_within_validity() -> Result<()> {
    let mock = MockGoogle::new();
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(true));

    let first = provider.get_access_token(None).await?;
    mock.clock.advance(Duration::from_secs(600));
    let second = provider.get_access_token(None).await?;

    assert_eq!(first.token, "ya29.impersonated-1");
    assert_eq!(second.token, first.token);
    assert_eq!(second.expires_at, first.expires_at);
    assert_eq!(
        first.provenance,
        Provenance::Impersonated {
            service_account: SERVICE_ACCOUNT.to_string()
        }
    );
    assert_eq!(mock.calls(), (1, 1, 1));
    Ok(())
}

#[tokio::test]
async fn test_token_never_returned_expired() -> Result<()> {
    let mock = MockGoogle::new();
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(true));

    for _ in 0..5 {
        let token = provider.get_access_token(None).await?;
        assert!(token.expires_at > mock.clock.now());
        mock.clock.advance(Duration::from_secs(1700));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_first_callers_share_one_refresh() -> Result<()> {
    let mock = MockGoogle::new().with_delay(Duration::from_millis(50));
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(true));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let provider = provider.clone();
        tasks.spawn(async move { provider.get_access_token(None).await });
    }

    while let Some(res) = tasks.join_next().await {
        let token = res.expect("task must not panic")?;
        assert_eq!(token.token, "ya29.impersonated-1");
    }
    assert_eq!(mock.calls(), (1, 1, 1));
    Ok(())
}

#[tokio::test]
async fn test_refresh_after_margin() -> Result<()> {
    let mock = MockGoogle::new();
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(false));
    let t = start_time();

    let token = provider.get_access_token(None).await?;
    assert_eq!(token.token, "t1");
    assert_eq!(token.expires_at, t + seconds(3240));
    assert_eq!(token.provenance, Provenance::Federated);

    mock.clock.set(t + seconds(3239));
    assert_eq!(provider.get_access_token(None).await?.token, "t1");
    assert_eq!(mock.calls(), (1, 1, 0));

    mock.clock.set(t + seconds(3650));
    let token = provider.get_access_token(None).await?;
    assert_eq!(token.token, "t2");
    assert_eq!(token.expires_at, t + seconds(3650 + 3240));
    assert_eq!(mock.calls(), (2, 2, 0));

    provider.get_access_token(None).await?;
    assert_eq!(mock.calls(), (2, 2, 0));
    Ok(())
}

#[tokio::test]
async fn test_missing_audience_makes_no_network_call() {
    let mock = MockGoogle::new();

    let err = CredentialProvider::from_env(test_context_with_env(
        &mock,
        HashMap::from([
            ("GOOGLE_WORKLOADIDENTITY_SOURCE".to_string(), "metadata".to_string()),
            (
                "GOOGLE_WORKLOADIDENTITY_METADATA_URL".to_string(),
                crate::mock::METADATA_URL.to_string(),
            ),
        ]),
    ))
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    assert!(err.to_string().contains("audience"));
    assert_eq!(mock.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_from_env_builds_working_provider() -> Result<()> {
    let mock = MockGoogle::new();
    let provider = CredentialProvider::from_env(test_context_with_env(
        &mock,
        HashMap::from([
            ("GOOGLE_WORKLOADIDENTITY_AUDIENCE".to_string(), AUDIENCE.to_string()),
            (
                "GOOGLE_WORKLOADIDENTITY_SERVICEACCOUNT".to_string(),
                SERVICE_ACCOUNT.to_string(),
            ),
            ("GOOGLE_WORKLOADIDENTITY_SOURCE".to_string(), "metadata".to_string()),
            (
                "GOOGLE_WORKLOADIDENTITY_METADATA_URL".to_string(),
                crate::mock::METADATA_URL.to_string(),
            ),
            (
                "GOOGLE_WORKLOADIDENTITY_METADATA_FIELD".to_string(),
                "access_token".to_string(),
            ),
        ]),
    ))?;

    assert_eq!(provider.config().service_account(), Some(SERVICE_ACCOUNT));
    let token = provider.get_access_token(None).await?;
    assert_eq!(token.token, "ya29.impersonated-1");
    Ok(())
}

#[tokio::test]
async fn test_impersonation_forbidden_keeps_server_body() {
    let mock = MockGoogle::new();
    let body = r#"{"error":{"code":403,"message":"Permission 'iam.serviceAccounts.getAccessToken' denied on resource (or it may not exist).","status":"PERMISSION_DENIED"}}"#;
    mock.fail_iam(StatusCode::FORBIDDEN, body);
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(true));

    let err = provider.get_access_token(None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ImpersonationFailed);
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(err.response_body(), Some(body));
    assert_eq!(err.message(), "impersonate service account failed");
    assert!(err
        .context()
        .iter()
        .any(|c| c.contains(SERVICE_ACCOUNT)));
    assert!(err
        .context()
        .iter()
        .any(|c| c.contains("roles/iam.serviceAccountTokenCreator")));
}

#[tokio::test]
async fn test_failed_refresh_is_retried() -> Result<()> {
    let mock = MockGoogle::new();
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(false));

    assert_eq!(provider.get_access_token(None).await?.token, "t1");

    mock.clock.advance(Duration::from_secs(3600));
    mock.fail_sts(StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable");
    let err = provider.get_access_token(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExchangeFailed);
    assert!(err.is_retryable());

    mock.reset();
    assert_eq!(provider.get_access_token(None).await?.token, "t3");
    Ok(())
}

#[tokio::test]
async fn test_invalid_grant_escalates() {
    let mock = MockGoogle::new();
    mock.fail_sts(
        StatusCode::BAD_REQUEST,
        r#"{"error":"invalid_grant","error_description":"ID Token issued at 1704067200 is stale to sign-in."}"#,
    );
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(false));

    let first = provider.get_access_token(None).await.unwrap_err();
    let second = provider.get_access_token(None).await.unwrap_err();

    assert_eq!(first.oauth_error().as_deref(), Some("invalid_grant"));
    assert!(first.is_retryable());
    assert!(!second.is_retryable());
    assert_eq!(mock.calls(), (2, 2, 0));
}

#[tokio::test]
async fn test_caller_deadline_does_not_cancel_refresh() -> Result<()> {
    let mock = MockGoogle::new().with_delay(Duration::from_millis(100));
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(true));

    let err = provider
        .get_access_token(Some(Duration::from_millis(10)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let token = provider.get_access_token(None).await?;
    assert_eq!(token.token, "ya29.impersonated-1");
    assert_eq!(mock.calls(), (1, 1, 1));
    Ok(())
}

#[tokio::test]
async fn test_refresh_timeout() {
    let mock = MockGoogle::new().with_delay(Duration::from_millis(200));
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(false))
        .with_refresh_timeout(Duration::from_millis(20));

    let err = provider.get_access_token(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_authorize_sets_bearer() -> Result<()> {
    let mock = MockGoogle::new();
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(true));
    let (mut parts, _) =
        http::Request::get("https://storage.googleapis.com/storage/v1/b?project=my-project")
            .body(())?
            .into_parts();

    provider.authorize(&mut parts, Some(Duration::from_secs(5))).await?;

    assert_eq!(parts.headers[AUTHORIZATION], "Bearer ya29.impersonated-1");
    assert!(parts.headers[AUTHORIZATION].is_sensitive());
    Ok(())
}

#[test]
fn test_invalid_configuration_is_rejected_before_use() {
    let err = CredentialConfiguration::builder()
        .with_audience(AUDIENCE)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    assert!(err.is_permanent());
}
