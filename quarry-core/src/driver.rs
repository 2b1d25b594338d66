use crate::{Executor, Result, ServerConfig};
use std::future::Future;

/// Entry point of a backend: knows how to open an [`Executor`] for a server.
pub trait Driver: Send + Sync {
    type Executor: Executor;

    /// Scheme used in connection urls, `mysql` in `mysql://localhost/app`.
    const NAME: &'static str;

    fn connect(&self, config: &ServerConfig) -> impl Future<Output = Result<Self::Executor>> + Send;
}
