use crate::{Query, QueryResult, Result, stream::Stream};

/// Sends statements to a backend.
///
/// Implementations own (or borrow from a pool) the native handle and are shared by
/// every clone of a [`crate::Connection`], so all the methods take `&self`.
pub trait Executor: Send + Sync + 'static {
    /// General method to send any query and return any result type (either row or count)
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send;
}
