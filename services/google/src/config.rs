use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use federate_aws_v4::{AWS_DEFAULT_REGION, AWS_REGION};
use federate_core::{Context, Error, Result};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use serde::Deserialize;

use crate::constants::*;

/// The type of the subject token presented to the token exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubjectTokenType {
    /// A serialized, signed AWS `GetCallerIdentity` request.
    Aws4Request,
    /// An OIDC JWT.
    Jwt,
    /// An OIDC ID token.
    IdToken,
    /// A SAML 2.0 assertion.
    Saml2,
}

impl SubjectTokenType {
    /// The URN sent as `subject_token_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws4Request => "urn:ietf:params:aws:token-type:aws4_request",
            Self::Jwt => "urn:ietf:params:oauth:token-type:jwt",
            Self::IdToken => "urn:ietf:params:oauth:token-type:id_token",
            Self::Saml2 => "urn:ietf:params:oauth:token-type:saml2",
        }
    }
}

impl fmt::Display for SubjectTokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectTokenType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [Self::Aws4Request, Self::Jwt, Self::IdToken, Self::Saml2]
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                Error::config_invalid("subject_token_type is not supported")
                    .with_context(format!("subject_token_type: {s}"))
            })
    }
}

/// How a subject token is stored in a response body or file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// The whole content, trimmed, is the token.
    #[default]
    Text,
    /// The token is the string value of `field` in a JSON object.
    Json {
        /// Name of the field holding the token.
        field: String,
    },
}

impl Format {
    pub(crate) fn parse(&self, content: &[u8]) -> Result<String> {
        let token = match self {
            Format::Text => std::str::from_utf8(content)
                .map_err(|e| {
                    Error::source_format("subject token is not valid UTF-8").with_source(e)
                })?
                .trim()
                .to_string(),
            Format::Json { field } => {
                let value: serde_json::Value = serde_json::from_slice(content).map_err(|e| {
                    Error::source_format("subject token content is not valid JSON").with_source(e)
                })?;
                match value.get(field) {
                    Some(serde_json::Value::String(v)) => v.trim().to_string(),
                    Some(_) => {
                        return Err(Error::source_format(format!(
                            "subject token field {field} is not a string"
                        )))
                    }
                    None => {
                        return Err(Error::source_format(format!(
                            "subject token field {field} is missing"
                        )))
                    }
                }
            }
        };

        if token.is_empty() {
            return Err(Error::source_format("subject token is empty"));
        }
        Ok(token)
    }
}

/// Subject token built from a signed AWS `GetCallerIdentity` request.
#[derive(Clone, Debug)]
pub struct AwsCredentialSource {
    region: String,
    verification_url: String,
}

impl AwsCredentialSource {
    /// Sign requests for `region` against the default regional STS endpoint.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            verification_url: DEFAULT_REGIONAL_CRED_VERIFICATION_URL.to_string(),
        }
    }

    /// Override the verification URL template. `{region}` is substituted.
    pub fn with_verification_url(mut self, template: impl Into<String>) -> Self {
        self.verification_url = template.into();
        self
    }

    /// The AWS region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The verification URL with the region substituted.
    pub fn verification_url(&self) -> String {
        self.verification_url.replace("{region}", &self.region)
    }

    fn validate(&self) -> Result<()> {
        if self.region.is_empty() {
            return Err(Error::config_invalid("credential_source.region is required")
                .with_context(format!("hint: set {AWS_REGION} or {AWS_DEFAULT_REGION}")));
        }
        if !self
            .region
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(Error::config_invalid("credential_source.region is malformed")
                .with_context(format!("region: {}", self.region)));
        }
        if !self.verification_url.contains("{region}") {
            return Err(Error::config_invalid(
                "credential_source.regional_cred_verification_url must contain {region}",
            )
            .with_context(format!("template: {}", self.verification_url)));
        }
        validate_url(
            "credential_source.regional_cred_verification_url",
            &self.verification_url(),
        )?;
        Ok(())
    }
}

/// Subject token fetched from a metadata or token endpoint.
#[derive(Clone, Debug)]
pub struct UrlCredentialSource {
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    resource_parameter: Option<String>,
    target_resource: Option<String>,
    format: Format,
}

impl UrlCredentialSource {
    /// Fetch the token with a `GET` to `url`, reading the body as text.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: Vec::new(),
            resource_parameter: None,
            target_resource: None,
            format: Format::Text,
        }
    }

    /// Use `GET` (default) or `POST`.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a request header, for example `Metadata: true`.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Name of the query parameter carrying the target resource.
    pub fn with_resource_parameter(mut self, name: impl Into<String>) -> Self {
        self.resource_parameter = Some(name.into());
        self
    }

    /// Value of the target resource parameter. Defaults to the audience.
    pub fn with_target_resource(mut self, value: impl Into<String>) -> Self {
        self.target_resource = Some(value.into());
        self
    }

    /// How to read the token from the response body.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The response format.
    pub fn format(&self) -> &Format {
        &self.format
    }

    pub(crate) fn resource_parameter(&self) -> Option<&str> {
        self.resource_parameter.as_deref()
    }

    pub(crate) fn target_resource(&self) -> Option<&str> {
        self.target_resource.as_deref()
    }

    pub(crate) fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::config_invalid("credential_source.headers has an invalid name")
                    .with_source(e)
                    .with_context(format!("header: {name}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                Error::config_invalid("credential_source.headers has an invalid value")
                    .with_source(e)
                    .with_context(format!("header: {name}"))
            })?;
            headers.append(name, value);
        }
        Ok(headers)
    }

    fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::config_invalid("credential_source.url is required"));
        }
        validate_url("credential_source.url", &self.url)?;
        if self.method != Method::GET && self.method != Method::POST {
            return Err(Error::config_invalid(
                "credential_source.method must be GET or POST",
            )
            .with_context(format!("method: {}", self.method)));
        }
        if let Format::Json { field } = &self.format {
            if field.trim().is_empty() {
                return Err(Error::config_invalid(
                    "credential_source.format.subject_token_field_name is required for json",
                ));
            }
        }
        if matches!(&self.resource_parameter, Some(v) if v.trim().is_empty()) {
            return Err(Error::config_invalid(
                "credential_source.resource_parameter must not be empty",
            ));
        }
        self.header_map()?;
        Ok(())
    }
}

/// Subject token read from a local file.
#[derive(Clone, Debug)]
pub struct FileCredentialSource {
    path: String,
    format: Format,
}

impl FileCredentialSource {
    /// Read the token from `path` as text.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: Format::Text,
        }
    }

    /// How to read the token from the file content.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// The file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The file format.
    pub fn format(&self) -> &Format {
        &self.format
    }

    fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(Error::config_invalid("credential_source.file is required"));
        }
        if let Format::Json { field } = &self.format {
            if field.trim().is_empty() {
                return Err(Error::config_invalid(
                    "credential_source.format.subject_token_field_name is required for json",
                ));
            }
        }
        Ok(())
    }
}

/// Where the subject token comes from.
#[derive(Clone, Debug)]
pub enum CredentialSource {
    /// Signed AWS request.
    Aws(AwsCredentialSource),
    /// Metadata or token endpoint.
    Url(UrlCredentialSource),
    /// Local file.
    File(FileCredentialSource),
}

impl CredentialSource {
    fn default_subject_token_type(&self) -> SubjectTokenType {
        match self {
            Self::Aws(_) => SubjectTokenType::Aws4Request,
            Self::Url(_) | Self::File(_) => SubjectTokenType::Jwt,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Aws(v) => v.validate(),
            Self::Url(v) => v.validate(),
            Self::File(v) => v.validate(),
        }
    }
}

impl From<AwsCredentialSource> for CredentialSource {
    fn from(v: AwsCredentialSource) -> Self {
        Self::Aws(v)
    }
}

impl From<UrlCredentialSource> for CredentialSource {
    fn from(v: UrlCredentialSource) -> Self {
        Self::Url(v)
    }
}

impl From<FileCredentialSource> for CredentialSource {
    fn from(v: FileCredentialSource) -> Self {
        Self::File(v)
    }
}

/// Validated, immutable description of one token exchange.
///
/// Build it with [`CredentialConfiguration::builder`],
/// [`Builder::from_env`] or [`Builder::from_credential_json`].
#[derive(Clone, Debug)]
pub struct CredentialConfiguration {
    audience: String,
    subject_token_type: SubjectTokenType,
    token_url: String,
    service_account_impersonation_url: Option<String>,
    scopes: Vec<String>,
    token_lifetime: Duration,
    credential_source: CredentialSource,
}

impl CredentialConfiguration {
    /// Start building a configuration.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The workload identity provider the exchange is scoped to.
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// The declared subject token type.
    pub fn subject_token_type(&self) -> SubjectTokenType {
        self.subject_token_type
    }

    /// The token exchange endpoint.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// The impersonation endpoint, if impersonation is configured.
    pub fn service_account_impersonation_url(&self) -> Option<&str> {
        self.service_account_impersonation_url.as_deref()
    }

    /// Email of the impersonated service account, if any.
    pub fn service_account(&self) -> Option<&str> {
        self.service_account_impersonation_url
            .as_deref()
            .and_then(service_account_from_url)
    }

    /// Scopes requested for the final token.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Requested lifetime of impersonated tokens.
    pub fn token_lifetime(&self) -> Duration {
        self.token_lifetime
    }

    /// The subject token source.
    pub fn credential_source(&self) -> &CredentialSource {
        &self.credential_source
    }
}

/// Builder for [`CredentialConfiguration`].
#[derive(Clone, Debug, Default)]
pub struct Builder {
    audience: Option<String>,
    subject_token_type: Option<SubjectTokenType>,
    token_url: Option<String>,
    service_account_impersonation_url: Option<String>,
    scopes: Option<Vec<String>>,
    token_lifetime: Option<Duration>,
    credential_source: Option<CredentialSource>,
    impersonation_required: bool,
}

impl Builder {
    /// Set the audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set the subject token type. Defaults to the natural type of the source.
    pub fn with_subject_token_type(mut self, v: SubjectTokenType) -> Self {
        self.subject_token_type = Some(v);
        self
    }

    /// Set the token exchange endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Set the impersonation endpoint.
    pub fn with_service_account_impersonation_url(mut self, url: impl Into<String>) -> Self {
        self.service_account_impersonation_url = Some(url.into());
        self
    }

    /// Impersonate the service account with this email.
    pub fn with_service_account(self, email: impl AsRef<str>) -> Self {
        let url = format!(
            "{IMPERSONATION_URL_PREFIX}{}{IMPERSONATION_URL_SUFFIX}",
            email.as_ref().trim()
        );
        self.with_service_account_impersonation_url(url)
    }

    /// Set the requested scopes.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Set the lifetime requested for impersonated tokens.
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = Some(lifetime);
        self
    }

    /// Set the subject token source.
    pub fn with_credential_source(mut self, source: impl Into<CredentialSource>) -> Self {
        self.credential_source = Some(source.into());
        self
    }

    /// Fail the build when no impersonation endpoint is configured.
    pub fn with_impersonation_required(mut self, required: bool) -> Self {
        self.impersonation_required = required;
        self
    }

    /// Validate every field and build the configuration. Performs no I/O.
    pub fn build(self) -> Result<CredentialConfiguration> {
        let audience = self.audience.unwrap_or_default().trim().to_string();
        if audience.is_empty() {
            return Err(Error::config_invalid("audience is required")
                .with_context(format!("hint: set {GOOGLE_WORKLOADIDENTITY_AUDIENCE}")));
        }

        let credential_source = self
            .credential_source
            .ok_or_else(|| Error::config_invalid("credential_source is required"))?;

        let subject_token_type = self
            .subject_token_type
            .unwrap_or_else(|| credential_source.default_subject_token_type());
        match (&credential_source, subject_token_type) {
            (CredentialSource::Aws(_), SubjectTokenType::Aws4Request) => {}
            (CredentialSource::Aws(_), other) => {
                return Err(Error::config_invalid(
                    "subject_token_type must be aws4_request for an AWS credential source",
                )
                .with_context(format!("subject_token_type: {other}")))
            }
            (_, SubjectTokenType::Aws4Request) => {
                return Err(Error::config_invalid(
                    "subject_token_type aws4_request requires an AWS credential source",
                ))
            }
            _ => {}
        }

        validate_audience(&credential_source, &audience)?;
        credential_source.validate()?;

        let token_url = self
            .token_url
            .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string());
        validate_url("token_url", &token_url)?;

        let service_account_impersonation_url = self
            .service_account_impersonation_url
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        match &service_account_impersonation_url {
            Some(url) => {
                validate_url("service_account_impersonation_url", url)?;
                if service_account_from_url(url).is_none() {
                    return Err(Error::config_invalid(
                        "service_account_impersonation_url must end with serviceAccounts/<email>:generateAccessToken",
                    )
                    .with_context(format!("service_account_impersonation_url: {url}")));
                }
            }
            None if self.impersonation_required => {
                return Err(Error::config_invalid(
                    "service_account_impersonation_url is required by policy",
                )
                .with_context(format!(
                    "hint: set {GOOGLE_WORKLOADIDENTITY_SERVICEACCOUNT}"
                )));
            }
            None => {}
        }

        let scopes = self
            .scopes
            .unwrap_or_else(|| vec![DEFAULT_SCOPE.to_string()]);
        if scopes.is_empty() || scopes.iter().any(|v| v.trim().is_empty()) {
            return Err(Error::config_invalid("scopes must not be empty"));
        }

        let token_lifetime = self.token_lifetime.unwrap_or(DEFAULT_TOKEN_LIFETIME);
        if token_lifetime < Duration::from_secs(1) || token_lifetime > MAX_TOKEN_LIFETIME {
            return Err(Error::config_invalid(
                "token_lifetime must be between 1s and 43200s",
            )
            .with_context(format!("token_lifetime: {}s", token_lifetime.as_secs())));
        }

        Ok(CredentialConfiguration {
            audience,
            subject_token_type,
            token_url,
            service_account_impersonation_url,
            scopes,
            token_lifetime,
            credential_source,
        })
    }

    /// Load the builder from `GOOGLE_WORKLOADIDENTITY_*` environment variables.
    ///
    /// Missing values are left unset so that [`Builder::build`] reports them.
    pub fn from_env(ctx: &Context) -> Result<Self> {
        let env = |key: &str| ctx.env_var(key).filter(|v| !v.trim().is_empty());

        let mut builder = Builder::default();
        if let Some(audience) = env(GOOGLE_WORKLOADIDENTITY_AUDIENCE) {
            builder = builder.with_audience(audience);
        }
        if let Some(email) = env(GOOGLE_WORKLOADIDENTITY_SERVICEACCOUNT) {
            builder = builder.with_service_account(email);
        }
        if let Some(scopes) = env(GOOGLE_WORKLOADIDENTITY_SCOPES) {
            builder = builder.with_scopes(
                scopes
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|v| !v.is_empty()),
            );
        }

        let kind = env(GOOGLE_WORKLOADIDENTITY_SOURCE).unwrap_or_else(|| "aws".to_string());
        let source: CredentialSource = match kind.trim().to_ascii_lowercase().as_str() {
            "aws" => AwsCredentialSource::new(aws_region(ctx).unwrap_or_default()).into(),
            "metadata" => {
                let mut source =
                    UrlCredentialSource::new(env(GOOGLE_WORKLOADIDENTITY_METADATA_URL).unwrap_or_default());
                if let Some(headers) = env(GOOGLE_WORKLOADIDENTITY_METADATA_HEADERS) {
                    for pair in headers.split(',').filter(|v| !v.trim().is_empty()) {
                        let (name, value) = pair.split_once('=').ok_or_else(|| {
                            Error::config_invalid(format!(
                                "{GOOGLE_WORKLOADIDENTITY_METADATA_HEADERS} must look like name=value,name2=value2"
                            ))
                        })?;
                        source = source.with_header(name.trim(), value.trim());
                    }
                }
                if let Some(param) = env(GOOGLE_WORKLOADIDENTITY_METADATA_RESOURCE_PARAM) {
                    source = source.with_resource_parameter(param.trim());
                }
                if let Some(field) = env(GOOGLE_WORKLOADIDENTITY_METADATA_FIELD) {
                    source = source.with_format(Format::Json {
                        field: field.trim().to_string(),
                    });
                }
                source.into()
            }
            "file" => {
                FileCredentialSource::new(env(GOOGLE_WORKLOADIDENTITY_TOKEN_FILE).unwrap_or_default())
                    .into()
            }
            other => {
                return Err(Error::config_invalid(format!(
                    "{GOOGLE_WORKLOADIDENTITY_SOURCE} must be one of aws, metadata, file"
                ))
                .with_context(format!("value: {other}")))
            }
        };

        Ok(builder.with_credential_source(source))
    }

    /// Load the builder from a Google `external_account` credential
    /// configuration file.
    ///
    /// For AWS sources the region is taken from `AWS_REGION` or
    /// `AWS_DEFAULT_REGION`.
    pub fn from_credential_json(ctx: &Context, content: &[u8]) -> Result<Self> {
        let file: ExternalAccountFile = serde_json::from_slice(content).map_err(|e| {
            Error::config_invalid("failed to parse credential configuration").with_source(e)
        })?;
        if file.kind != "external_account" {
            return Err(Error::config_invalid(
                "credential configuration type must be external_account",
            )
            .with_context(format!("type: {}", file.kind)));
        }

        let mut builder = Builder::default()
            .with_audience(file.audience)
            .with_subject_token_type(file.subject_token_type.parse()?);
        if let Some(url) = file.token_url {
            builder = builder.with_token_url(url);
        }
        if let Some(url) = file.service_account_impersonation_url {
            builder = builder.with_service_account_impersonation_url(url);
        }
        if let Some(secs) = file
            .service_account_impersonation
            .and_then(|v| v.token_lifetime_seconds)
        {
            builder = builder.with_token_lifetime(Duration::from_secs(secs));
        }
        if let Some(scopes) = file.scopes {
            builder = builder.with_scopes(scopes);
        }

        let src = file.credential_source;
        let format = match src.format {
            None | Some(FormatFile::Text) => Format::Text,
            Some(FormatFile::Json {
                subject_token_field_name,
            }) => Format::Json {
                field: subject_token_field_name,
            },
        };
        let source: CredentialSource = if let Some(environment_id) = src.environment_id {
            if environment_id != "aws1" {
                return Err(Error::config_invalid(
                    "credential_source.environment_id is not supported",
                )
                .with_context(format!("environment_id: {environment_id}")));
            }
            let mut source = AwsCredentialSource::new(aws_region(ctx).unwrap_or_default());
            if let Some(template) = src.regional_cred_verification_url {
                source = source.with_verification_url(template);
            }
            source.into()
        } else if let Some(url) = src.url {
            let mut source = UrlCredentialSource::new(url).with_format(format);
            let mut headers: Vec<_> = src.headers.unwrap_or_default().into_iter().collect();
            headers.sort();
            for (name, value) in headers {
                source = source.with_header(name, value);
            }
            source.into()
        } else if let Some(path) = src.file {
            FileCredentialSource::new(path).with_format(format).into()
        } else {
            return Err(Error::config_invalid(
                "credential_source must contain environment_id, url or file",
            ));
        };

        Ok(builder.with_credential_source(source))
    }
}

fn aws_region(ctx: &Context) -> Option<String> {
    ctx.env_var(AWS_REGION)
        .filter(|v| !v.is_empty())
        .or_else(|| ctx.env_var(AWS_DEFAULT_REGION))
        .filter(|v| !v.is_empty())
}

fn validate_audience(source: &CredentialSource, audience: &str) -> Result<()> {
    if audience.chars().any(char::is_whitespace) {
        return Err(Error::config_invalid("audience must not contain whitespace")
            .with_context(format!("audience: {audience}")));
    }
    if let CredentialSource::Aws(_) = source {
        let is_provider = audience.starts_with("//")
            && audience.contains("/workloadIdentityPools/")
            && audience.contains("/providers/");
        if !is_provider {
            return Err(Error::config_invalid(
                "audience must name a workload identity pool provider, like //iam.googleapis.com/projects/<number>/locations/global/workloadIdentityPools/<pool>/providers/<provider>",
            )
            .with_context(format!("audience: {audience}")));
        }
    }
    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<Uri> {
    let uri: Uri = value.parse().map_err(|e| {
        Error::config_invalid(format!("{field} is not a valid URL"))
            .with_source(e)
            .with_context(format!("{field}: {value}"))
    })?;
    if !matches!(uri.scheme_str(), Some("http") | Some("https")) || uri.authority().is_none() {
        return Err(
            Error::config_invalid(format!("{field} must be an absolute http(s) URL"))
                .with_context(format!("{field}: {value}")),
        );
    }
    Ok(uri)
}

pub(crate) fn service_account_from_url(url: &str) -> Option<&str> {
    let (_, rest) = url.rsplit_once("/serviceAccounts/")?;
    let email = rest.strip_suffix(IMPERSONATION_URL_SUFFIX)?;
    (!email.is_empty() && !email.contains('/')).then_some(email)
}

#[derive(Deserialize)]
struct ExternalAccountFile {
    #[serde(rename = "type")]
    kind: String,
    audience: String,
    subject_token_type: String,
    token_url: Option<String>,
    service_account_impersonation_url: Option<String>,
    service_account_impersonation: Option<ImpersonationOptions>,
    scopes: Option<Vec<String>>,
    credential_source: CredentialSourceFile,
}

#[derive(Deserialize)]
struct ImpersonationOptions {
    token_lifetime_seconds: Option<u64>,
}

#[derive(Deserialize)]
struct CredentialSourceFile {
    environment_id: Option<String>,
    regional_cred_verification_url: Option<String>,
    url: Option<String>,
    file: Option<String>,
    headers: Option<HashMap<String, String>>,
    format: Option<FormatFile>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FormatFile {
    Text,
    Json { subject_token_field_name: String },
}
