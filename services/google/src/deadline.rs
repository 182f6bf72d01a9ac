use std::future::Future;
use std::time::Duration;

use federate_core::{Error, Result};

/// Run `fut`, failing with [`federate_core::ErrorKind::Timeout`] once `deadline` elapses.
///
/// The future is dropped on expiry, which aborts any request it has in flight.
pub(crate) async fn with_deadline<T>(
    deadline: Option<Duration>,
    step: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match deadline {
        None => fut.await,
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .map_err(|_| Error::timeout(format!("{step} did not finish within {d:?}")))?,
    }
}
