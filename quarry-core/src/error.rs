use crate::{Value, truncated};
use std::{fmt::Write, time::Duration};

/// Classification of the failures produced by this crate.
///
/// Errors travel as [`crate::Error`] (`anyhow::Error`). A `DataError` is attached
/// as context, the driver diagnostic (if any) stays in the source chain:
/// ```rust,ignore
/// match error.downcast_ref::<DataError>() {
///     Some(DataError::Query { sql, .. }) => log::warn!("Statement failed: {sql}"),
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// Cannot reach or authenticate to the database.
    #[error("Could not connect to `{server}`")]
    Connection { server: String },
    /// Introspection of a table failed.
    #[error("Could not introspect table `{table}`")]
    Schema { table: String },
    /// A specific statement failed.
    #[error("While running the query:\n{}\nparameters: {}", truncated(.sql), print_params(.params))]
    Query { sql: String, params: Vec<Value> },
    /// The column is a primary key, it is assigned only when inserting.
    #[error("Field `{field}` is the primary key of `{table}` and cannot be written")]
    ImmutableField { table: String, field: String },
    /// The column does not belong to any table referenced by the record.
    #[error("Field `{field}` is not a column of any of the tables {tables:?}")]
    UnknownField { field: String, tables: Vec<String> },
    /// The table is not referenced by the result set.
    #[error("Table `{table}` is not referenced by the result set (tables: {tables:?})")]
    UnknownTable { table: String, tables: Vec<String> },
    /// The statement did not complete within the configured timeout.
    #[error("The query did not complete within {after:?}:\n{}", truncated(.sql))]
    Timeout { sql: String, after: Duration },
    /// The unit of work was cancelled while the statement was running.
    #[error("The query was cancelled:\n{}", truncated(.sql))]
    Cancelled { sql: String },
}

impl DataError {
    /// Extract the classification from an error chain, if any.
    pub fn of(error: &crate::Error) -> Option<&DataError> {
        error.downcast_ref::<DataError>()
    }

    /// The statement was stopped by a timeout or a cancellation rather than refused.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, DataError::Timeout { .. } | DataError::Cancelled { .. })
    }
}

fn print_params(params: &[Value]) -> String {
    let mut out = String::from("[");
    for (i, v) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{v:?}");
    }
    out.push(']');
    out
}
