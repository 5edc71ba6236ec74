//! Single-resolution asynchronous values.
//!
//! An [`Output`] is the engine's "attribute of a resource that may
//! not exist yet". It settles exactly once: either with a value, or
//! with a [`ResolveError`] when the producing side failed or went
//! away. Consumers attach continuations with [`Output::map`] and
//! friends instead of blocking; every clone of an output observes
//! the same settled result.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;

use crate::error::ResolveError;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, ResolveError>>>;

/// A shared, single-resolution asynchronous value.
pub struct Output<T>
where
    T: Clone + Send + 'static,
{
    inner: SharedResult<T>,
}

impl<T> Clone for Output<T>
where
    T: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Output<T>
where
    T: Clone + Send + 'static + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.peek() {
            Some(v) => f.debug_tuple("Output").field(v).finish(),
            None => f.write_str("Output(<pending>)"),
        }
    }
}

impl<T> Output<T>
where
    T: Clone + Send + 'static,
{
    /// An output that is already settled with `value`.
    pub fn resolved(value: T) -> Self {
        Self {
            inner: futures_util::future::ready(Ok(value)).boxed().shared(),
        }
    }

    /// A pending output together with the handle that settles it.
    pub fn pending() -> (Self, Resolver<T>) {
        let (tx, rx) = oneshot::channel::<Result<T, ResolveError>>();
        let fut = async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(ResolveError::SourceDropped),
            }
        }
        .boxed()
        .shared();

        (Self { inner: fut }, Resolver { tx })
    }

    /// Register a continuation on the resolved value.
    ///
    /// Failures pass through untouched.
    pub fn map<U, F>(self, f: F) -> Output<U>
    where
        T: Sync,
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let inner = self.inner;
        Output {
            inner: async move { inner.await.map(f) }.boxed().shared(),
        }
    }

    /// Wait for the output to settle.
    pub async fn wait(&self) -> Result<T, ResolveError> {
        self.inner.clone().await
    }

    /// The settled value, if any. Never blocks.
    pub fn try_get(&self) -> Option<T> {
        self.inner
            .peek()
            .and_then(|result| result.as_ref().ok().cloned())
    }
}

impl Output<String> {
    /// Register a continuation that only runs when the resolved
    /// string is non-empty. The empty string is the engine's
    /// "not yet known" sentinel, not a failure.
    pub fn then_if_non_empty<U, F>(self, f: F) -> Output<Option<U>>
    where
        U: Clone + Send + 'static,
        F: FnOnce(String) -> U + Send + 'static,
    {
        self.map(|value| if value.is_empty() { None } else { Some(f(value)) })
    }
}

/// The producing half of a pending [`Output`].
///
/// Both [`Resolver::resolve`] and [`Resolver::fail`] consume the
/// resolver, so an output can only ever settle once. Dropping the
/// resolver settles the output with [`ResolveError::SourceDropped`].
pub struct Resolver<T> {
    tx: oneshot::Sender<Result<T, ResolveError>>,
}

impl<T> Resolver<T> {
    /// Settle the output with a value.
    pub fn resolve(self, value: T) {
        // The receiver only disappears when every output handle was
        // dropped, in which case nobody cares about the value.
        let _ = self.tx.send(Ok(value));
    }

    /// Settle the output with a failure.
    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.tx.send(Err(ResolveError::SourceFailed(reason.into())));
    }
}
