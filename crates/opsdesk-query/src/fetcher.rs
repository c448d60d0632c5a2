use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use opsdesk_normalize::NormalizeSnapshot;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::executor::{Endpoint, FetchExecutor};

/// One resource's fetch: executor call plus normalization.
///
/// `Deps` is the dependency fingerprint a [`crate::Subscription`] compares
/// across updates; a change tears the running session down.
#[async_trait]
pub trait DomainFetcher: Send + Sync + 'static {
    type Deps: Clone + PartialEq + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;

    async fn fetch(
        &self,
        deps: &Self::Deps,
        cancel: &CancellationToken,
    ) -> Result<Self::Output, FetchError>;
}

/// Ordered query parameters; the dependency fingerprint of resource fetchers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// GET `path` with the dependency params as query string, then normalize.
pub struct ResourceFetcher<T> {
    executor: Arc<dyn FetchExecutor>,
    path: Cow<'static, str>,
    normalize: fn(&Value) -> T,
}

impl<T: NormalizeSnapshot> ResourceFetcher<T> {
    pub fn new(executor: Arc<dyn FetchExecutor>, path: impl Into<Cow<'static, str>>) -> Self {
        Self::with_normalizer(executor, path, T::normalize)
    }
}

impl<T> ResourceFetcher<T> {
    pub fn with_normalizer(
        executor: Arc<dyn FetchExecutor>,
        path: impl Into<Cow<'static, str>>,
        normalize: fn(&Value) -> T,
    ) -> Self {
        Self {
            executor,
            path: path.into(),
            normalize,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl<T> DomainFetcher for ResourceFetcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Deps = QueryParams;
    type Output = T;

    async fn fetch(&self, deps: &QueryParams, cancel: &CancellationToken) -> Result<T, FetchError> {
        let endpoint = Endpoint::get(self.path.as_ref()).with_query(deps.pairs().iter().cloned());
        let raw = self.executor.execute(&endpoint, cancel).await?;
        Ok((self.normalize)(&raw))
    }
}

/// Domain fetcher backed by a closure; handy for embedders and tests.
pub struct FnFetcher<D, T, Fun, Fut> {
    f: Fun,
    _marker: PhantomData<fn(D) -> (T, Fut)>,
}

pub fn fetcher_fn<D, T, Fun, Fut>(f: Fun) -> FnFetcher<D, T, Fun, Fut>
where
    Fun: Fn(D, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    FnFetcher {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<D, T, Fun, Fut> DomainFetcher for FnFetcher<D, T, Fun, Fut>
where
    D: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    Fun: Fn(D, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    type Deps = D;
    type Output = T;

    async fn fetch(&self, deps: &D, cancel: &CancellationToken) -> Result<T, FetchError> {
        (self.f)(deps.clone(), cancel.clone()).await
    }
}
