use std::collections::HashMap;
use std::io::Write;

use federate_core::Result;
use federate_file_read_tokio::TokioFileRead;
use federate_google::{
    AwsCredentialSource, CredentialConfiguration, CredentialProvider, FileCredentialSource,
};
use percent_encoding::percent_decode_str;
use pretty_assertions::assert_eq;

use crate::mock::{
    metadata_config, test_context, test_context_with_env, MockGoogle, METADATA_URL, SUBJECT_JWT,
};

const AWS_AUDIENCE: &str =
    "//iam.googleapis.com/projects/123456/locations/global/workloadIdentityPools/pool/providers/aws";

#[tokio::test]
async fn test_aws_envelope_binds_audience() -> Result<()> {
    let mock = MockGoogle::new();
    let ctx = test_context_with_env(
        &mock,
        HashMap::from([
            ("AWS_ACCESS_KEY_ID".to_string(), "AKIDEXAMPLE".to_string()),
            (
                "AWS_SECRET_ACCESS_KEY".to_string(),
                "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            ),
            ("AWS_SESSION_TOKEN".to_string(), "session-token".to_string()),
            ("AWS_EC2_METADATA_DISABLED".to_string(), "true".to_string()),
        ]),
    );
    let config = CredentialConfiguration::builder()
        .with_audience(AWS_AUDIENCE)
        .with_credential_source(AwsCredentialSource::new("us-east-1"))
        .build()?;
    let provider = CredentialProvider::new(ctx, config);

    assert_eq!(provider.get_access_token(None).await?.token, "t1");
    // The signed request is never sent anywhere but Google STS.
    assert_eq!(mock.calls(), (0, 1, 0));

    let form = mock.last_sts_form();
    assert_eq!(
        form["subject_token_type"],
        "urn:ietf:params:aws:token-type:aws4_request"
    );
    assert_eq!(form["audience"], AWS_AUDIENCE);

    let envelope = percent_decode_str(&form["subject_token"]).decode_utf8_lossy();
    let envelope: serde_json::Value = serde_json::from_str(&envelope)?;
    assert_eq!(envelope["method"], "POST");
    assert_eq!(
        envelope["url"],
        "https://sts.us-east-1.amazonaws.com?Action=GetCallerIdentity&Version=2011-06-15"
    );

    let headers: HashMap<&str, &str> = envelope["headers"]
        .as_array()
        .expect("headers is an array")
        .iter()
        .map(|h| {
            (
                h["key"].as_str().expect("key"),
                h["value"].as_str().expect("value"),
            )
        })
        .collect();
    assert_eq!(headers["x-goog-cloud-target-resource"], AWS_AUDIENCE);
    assert_eq!(headers["x-amz-security-token"], "session-token");
    assert!(headers["authorization"].contains(
        "SignedHeaders=host;x-amz-date;x-amz-security-token;x-goog-cloud-target-resource"
    ));
    assert!(headers["authorization"]
        .starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240101/us-east-1/sts/aws4_request"));
    Ok(())
}

#[tokio::test]
async fn test_aws_without_credentials() {
    let mock = MockGoogle::new();
    let ctx = test_context_with_env(
        &mock,
        HashMap::from([("AWS_EC2_METADATA_DISABLED".to_string(), "true".to_string())]),
    );
    let config = CredentialConfiguration::builder()
        .with_audience(AWS_AUDIENCE)
        .with_credential_source(AwsCredentialSource::new("us-east-1"))
        .build()
        .expect("config must be valid");
    let provider = CredentialProvider::new(ctx, config);

    let err = provider.get_access_token(None).await.unwrap_err();
    assert_eq!(err.kind(), federate_core::ErrorKind::SigningFailed);
    assert_eq!(mock.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_metadata_json_field() -> Result<()> {
    let mock = MockGoogle::new();
    let provider = CredentialProvider::new(test_context(&mock), metadata_config(false));

    provider.get_access_token(None).await?;

    let requests = mock.requests.lock().unwrap();
    let metadata = &requests[0];
    assert_eq!(metadata.headers()["metadata"], "true");
    assert!(metadata
        .uri()
        .to_string()
        .starts_with(&format!("{METADATA_URL}&resource=%2F%2Fiam.googleapis.com")));
    drop(requests);

    let form = mock.last_sts_form();
    assert_eq!(form["subject_token"], SUBJECT_JWT);
    assert_eq!(
        form["subject_token_type"],
        "urn:ietf:params:oauth:token-type:jwt"
    );
    Ok(())
}

#[tokio::test]
async fn test_file_source() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "{SUBJECT_JWT}")?;

    let mock = MockGoogle::new();
    let ctx = test_context(&mock).with_file_read(TokioFileRead);
    let config = CredentialConfiguration::builder()
        .with_audience("//iam.googleapis.com/projects/123456/locations/global/workloadIdentityPools/k8s/providers/k8s")
        .with_credential_source(FileCredentialSource::new(
            file.path().to_string_lossy().to_string(),
        ))
        .build()?;
    let provider = CredentialProvider::new(ctx, config);

    assert_eq!(provider.get_access_token(None).await?.token, "t1");
    assert_eq!(mock.last_sts_form()["subject_token"], SUBJECT_JWT);
    Ok(())
}

#[tokio::test]
async fn test_file_source_rereads_on_refresh() -> Result<()> {
    let file = tempfile::NamedTempFile::new()?;
    std::fs::write(file.path(), "first-token")?;

    let mock = MockGoogle::new();
    let ctx = test_context(&mock).with_file_read(TokioFileRead);
    let config = CredentialConfiguration::builder()
        .with_audience("my-audience")
        .with_credential_source(FileCredentialSource::new(
            file.path().to_string_lossy().to_string(),
        ))
        .build()?;
    let provider = CredentialProvider::new(ctx, config);

    provider.get_access_token(None).await?;
    assert_eq!(mock.last_sts_form()["subject_token"], "first-token");

    std::fs::write(file.path(), "rotated-token")?;
    mock.clock.advance(std::time::Duration::from_secs(3600));
    provider.get_access_token(None).await?;
    assert_eq!(mock.last_sts_form()["subject_token"], "rotated-token");
    Ok(())
}
