use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use thiserror::Error;

/// The error type for federate operations.
///
/// `Error` is cheap to clone so that a single refresh failure can be handed
/// to every caller waiting on it.
#[derive(Error, Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: Option<StatusCode>,
    response_body: Option<String>,
    context: Vec<String>,
    retryable: bool,
    #[source]
    source: Option<Arc<anyhow::Error>>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Static configuration is missing or malformed. Never retried.
    ConfigInvalid,

    /// Ambient credentials exist but are invalid/malformed
    CredentialInvalid,

    /// The subject token request could not be signed
    SigningFailed,

    /// The subject token endpoint could not be reached or answered non-2xx
    SourceUnavailable,

    /// The subject token source answered, but not in the expected shape
    SourceFormat,

    /// Local I/O failed while reading a subject token
    Io,

    /// The token exchange endpoint rejected the request
    ExchangeFailed,

    /// A 2xx response was missing required fields
    Protocol,

    /// The service account impersonation endpoint rejected the request
    ImpersonationFailed,

    /// The caller supplied deadline elapsed
    Timeout,

    /// Request cannot be built or signed (missing required fields, etc.)
    RequestInvalid,

    /// Unexpected errors (network, I/O, service errors, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            response_body: None,
            context: Vec::new(),
            retryable: !matches!(kind, ErrorKind::ConfigInvalid | ErrorKind::RequestInvalid),
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(Arc::new(source.into()));
        self
    }

    /// Add a context line, for example `"url: https://sts.googleapis.com/v1/token"`.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attach the HTTP status and body returned by a remote endpoint.
    ///
    /// The body is kept verbatim: OAuth and IAM endpoints put the
    /// diagnostic error code there.
    pub fn with_response(mut self, status: StatusCode, body: impl Into<String>) -> Self {
        self.status = Some(status);
        self.response_body = Some(body.into());
        self
    }

    /// Override whether this error is worth retrying.
    pub fn set_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message without context.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status returned by the remote endpoint, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Raw body returned by the remote endpoint, if any.
    pub fn response_body(&self) -> Option<&str> {
        self.response_body.as_deref()
    }

    /// Context lines attached while the error travelled up.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Check if retrying the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Check if this error is permanent for the lifetime of the configuration.
    pub fn is_permanent(&self) -> bool {
        self.kind == ErrorKind::ConfigInvalid
    }

    /// Extract the error code reported by the remote endpoint.
    ///
    /// OAuth endpoints answer `{"error": "invalid_grant", ...}` while Google
    /// APIs answer `{"error": {"status": "PERMISSION_DENIED", ...}}`; both
    /// shapes are understood.
    pub fn oauth_error(&self) -> Option<String> {
        let body = self.response_body.as_deref()?;
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        match value.get("error")? {
            serde_json::Value::String(code) => Some(code.clone()),
            serde_json::Value::Object(obj) => obj
                .get("status")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(status) = self.status {
            write!(f, " (status: {status})")?;
        }
        if let Some(body) = &self.response_body {
            write!(f, ", response: {}", body.trim())?;
        }
        for ctx in &self.context {
            write!(f, ", {ctx}")?;
        }
        Ok(())
    }
}

// Convenience constructors
impl Error {
    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a credential invalid error
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create a signing failed error
    pub fn signing_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SigningFailed, message)
    }

    /// Create a source unavailable error
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SourceUnavailable, message)
    }

    /// Create a source format error
    pub fn source_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SourceFormat, message)
    }

    /// Create an io error
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    /// Create an exchange failed error
    pub fn exchange_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExchangeFailed, message)
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    /// Create an impersonation failed error
    pub fn impersonation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ImpersonationFailed, message)
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::CredentialInvalid => write!(f, "invalid credentials"),
            ErrorKind::SigningFailed => write!(f, "signing failed"),
            ErrorKind::SourceUnavailable => write!(f, "subject token source unavailable"),
            ErrorKind::SourceFormat => write!(f, "malformed subject token"),
            ErrorKind::Io => write!(f, "io error"),
            ErrorKind::ExchangeFailed => write!(f, "token exchange failed"),
            ErrorKind::Protocol => write!(f, "protocol error"),
            ErrorKind::ImpersonationFailed => write!(f, "impersonation failed"),
            ErrorKind::Timeout => write!(f, "deadline exceeded"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
