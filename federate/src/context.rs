use federate_core::{Context, OsEnv};
use federate_file_read_tokio::TokioFileRead;
use federate_http_send_reqwest::ReqwestHttpSend;

/// Create a context that reads files with tokio, sends requests with
/// reqwest and reads the process environment.
///
/// ```no_run
/// let ctx = federate::default_context();
/// assert!(ctx.env_var("HOME").is_some());
/// ```
pub fn default_context() -> Context {
    Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv)
}

/// Create a default context that sends requests with `client`.
pub fn default_context_with_client(client: reqwest::Client) -> Context {
    default_context().with_http_send(ReqwestHttpSend::new(client))
}
