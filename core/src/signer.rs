use crate::{Context, Error, ProvideCredential, Result, SignRequest, SigningCredential};
use log::{debug, error, warn};
use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;

/// Upper bound for one refresh, independent of any caller's deadline.
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(60);

/// `None` while the refresh is running, `Some` once it finished.
type Outcome<K> = Option<Result<K>>;

/// Signer caches a credential and applies it to requests.
///
/// Reads of a still valid credential only take a shared lock. When the
/// credential is missing or expired, the first caller spawns a refresh task
/// and every other caller joins it: all of them observe the same credential
/// or the same error. Dropping a waiting future (for example because its
/// deadline elapsed) never cancels the refresh itself.
///
/// A failed refresh leaves the previously cached credential untouched, so the
/// next call retries. Configuration errors are the exception: they are
/// remembered and returned to every later caller without calling the
/// provider again.
pub struct Signer<K: SigningCredential> {
    inner: Arc<Inner<K>>,
    refresh_timeout: Duration,
}

struct Inner<K: SigningCredential> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: RwLock<Option<K>>,
    refresh: Mutex<RefreshState<K>>,
}

struct RefreshState<K> {
    inflight: Option<watch::Receiver<Outcome<K>>>,
    permanent: Option<Error>,
}

enum Pending<K> {
    Ready(K),
    Wait(watch::Receiver<Outcome<K>>),
}

impl<K: SigningCredential> Clone for Signer<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            refresh_timeout: self.refresh_timeout,
        }
    }
}

impl<K: SigningCredential> Debug for Signer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("ctx", &self.inner.ctx)
            .field("loader", &self.inner.loader)
            .field("builder", &self.inner.builder)
            .field("refresh_timeout", &self.refresh_timeout)
            .finish()
    }
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                loader: Arc::new(loader),
                builder: Arc::new(builder),
                credential: RwLock::new(None),
                refresh: Mutex::new(RefreshState {
                    inflight: None,
                    permanent: None,
                }),
            }),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Bound a single refresh. Defaults to 60 seconds.
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Get the context used by this signer.
    pub fn context(&self) -> &Context {
        &self.inner.ctx
    }

    /// Return a valid credential, refreshing it if needed.
    ///
    /// `deadline` bounds how long this caller waits. It does not bound the
    /// shared refresh, which keeps running for other callers.
    pub async fn credential(&self, deadline: Option<Duration>) -> Result<K> {
        if let Some(cred) = self.inner.cached() {
            return Ok(cred);
        }

        let rx = match self.join_or_start_refresh()? {
            Pending::Ready(cred) => return Ok(cred),
            Pending::Wait(rx) => rx,
        };

        match deadline {
            None => wait(rx).await,
            Some(d) => tokio::time::timeout(d, wait(rx)).await.map_err(|_| {
                Error::timeout(format!("credential was not ready within {d:?}"))
            })?,
        }
    }

    /// Signing request.
    pub async fn sign(
        &self,
        req: &mut http::request::Parts,
        deadline: Option<Duration>,
    ) -> Result<()> {
        let cred = self.credential(deadline).await?;

        self.inner
            .builder
            .sign_request(&self.inner.ctx, req, Some(&cred))
            .await
    }

    fn join_or_start_refresh(&self) -> Result<Pending<K>> {
        let mut state = self.inner.refresh.lock().expect("lock poisoned");

        if let Some(err) = &state.permanent {
            return Err(err.clone());
        }
        // Another caller may have finished a refresh while we waited for the lock.
        if let Some(cred) = self.inner.cached() {
            return Ok(Pending::Ready(cred));
        }
        // A closed sender means the refresh task is gone without a result:
        // the provider panicked or its runtime was dropped.
        if let Some(rx) = &state.inflight {
            if rx.has_changed().is_ok() {
                debug!("joining in-flight credential refresh");
                return Ok(Pending::Wait(rx.clone()));
            }
            warn!("in-flight credential refresh was lost, starting a new one");
        }

        debug!("credential missing or expired, starting refresh");
        let (tx, rx) = watch::channel(None);
        state.inflight = Some(rx.clone());
        drop(state);

        let inner = self.inner.clone();
        let timeout = self.refresh_timeout;
        tokio::spawn(async move { inner.refresh(tx, timeout).await });

        Ok(Pending::Wait(rx))
    }
}

impl<K: SigningCredential> Inner<K> {
    fn cached(&self) -> Option<K> {
        let now = self.ctx.now();
        self.credential
            .read()
            .expect("lock poisoned")
            .as_ref()
            .filter(|cred| cred.is_valid(now))
            .cloned()
    }

    async fn refresh(&self, tx: watch::Sender<Outcome<K>>, timeout: Duration) {
        let result = match tokio::time::timeout(timeout, self.loader.provide_credential(&self.ctx))
            .await
        {
            Ok(Ok(Some(cred))) if cred.is_valid(self.ctx.now()) => Ok(cred),
            Ok(Ok(Some(_))) => Err(Error::protocol(
                "provider returned a credential that is already expired",
            )),
            Ok(Ok(None)) => Err(Error::credential_invalid(
                "no credential available from the configured provider",
            )),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(Error::timeout(format!(
                "credential refresh did not finish within {timeout:?}"
            ))),
        };

        {
            let mut state = self.refresh.lock().expect("lock poisoned");
            match &result {
                Ok(cred) => {
                    debug!("credential refreshed");
                    *self.credential.write().expect("lock poisoned") = Some(cred.clone());
                }
                Err(err) if err.is_permanent() => {
                    error!("credential refresh failed permanently: {err}");
                    state.permanent = Some(err.clone());
                }
                Err(err) => {
                    warn!("credential refresh failed, previous credential kept: {err}");
                }
            }
            state.inflight = None;
        }

        tx.send_replace(Some(result));
    }
}

async fn wait<K: SigningCredential>(mut rx: watch::Receiver<Outcome<K>>) -> Result<K> {
    let outcome = rx.wait_for(|v| v.is_some()).await.map_err(|e| {
        Error::unexpected("credential refresh stopped without a result").with_source(e)
    })?;

    match &*outcome {
        Some(result) => result.clone(),
        None => Err(Error::unexpected(
            "credential refresh stopped without a result",
        )),
    }
}
