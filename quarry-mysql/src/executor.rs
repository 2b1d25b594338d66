use crate::{RowWrap, ValueWrap};
use async_stream::try_stream;
use mysql_async::{Params, Pool, prelude::Queryable};
use quarry_core::{
    Error, Executor, Query, QueryResult, Result, RowsAffected,
    stream::{Stream, TryStreamExt},
};

/// Runs each statement on a connection drawn from the pool, released when the statement is done.
#[derive(Debug, Clone)]
pub struct MySQLExecutor {
    pool: Pool,
}

impl MySQLExecutor {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Waits for the pooled connections to close.
    pub async fn disconnect(self) -> Result<()> {
        self.pool.disconnect().await.map_err(Into::into)
    }
}

impl Executor for MySQLExecutor {
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        let Query { sql, params } = query;
        try_stream! {
            let params = params
                .into_iter()
                .map(|v| ValueWrap(v).try_into())
                .collect::<Result<Vec<mysql_async::Value>>>()?;
            let mut connection = self.pool.get_conn().await?;
            let (rows, affected) = if params.is_empty() {
                let mut result = connection.query_iter(sql.as_str()).await?;
                let rows = result.collect::<RowWrap>().await?;
                let affected = RowsAffected {
                    rows_affected: result.affected_rows(),
                    last_affected_id: result.last_insert_id(),
                };
                result.drop_result().await?;
                (rows, affected)
            } else {
                let mut result = connection
                    .exec_iter(sql.as_str(), Params::Positional(params))
                    .await?;
                let rows = result.collect::<RowWrap>().await?;
                let affected = RowsAffected {
                    rows_affected: result.affected_rows(),
                    last_affected_id: result.last_insert_id(),
                };
                result.drop_result().await?;
                (rows, affected)
            };
            if rows.is_empty() {
                yield QueryResult::Affected(affected);
            }
            for row in rows {
                yield QueryResult::Row(row.0);
            }
        }
        .map_err(|e: Error| {
            log::debug!("MySQL error: {:#}", e);
            e
        })
    }
}
