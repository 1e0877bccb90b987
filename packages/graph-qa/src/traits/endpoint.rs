//! SPARQL endpoint trait.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::EndpointResult;
use crate::types::answer::RawSolution;

/// Executes SPARQL queries against one remote endpoint.
///
/// Implementations own their caching and concurrency limit; callers may
/// issue any number of queries at once.
#[async_trait]
pub trait EndpointAccessor: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Run a query and wait for its solutions.
    async fn query(&self, sparql: &str) -> EndpointResult<Vec<RawSolution>>;
}

/// Run a query on its own task and hand the outcome to `callback`.
///
/// Returns immediately. The callback runs on the task that executed the
/// query and may itself await further I/O.
pub fn query_async<F, Fut>(
    endpoint: Arc<dyn EndpointAccessor>,
    sparql: String,
    callback: F,
) -> JoinHandle<()>
where
    F: FnOnce(EndpointResult<Vec<RawSolution>>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let result = endpoint.query(&sparql).await;
        callback(result).await;
    })
}
