use crate::{
    Config, DataError, Driver, Error, Executor, Origin, Query, QueryResult, Record, Result,
    ResultSet, RowLabeled, RowsAffected, ServerConfig, TableMetadata, TableSet, Value, sql,
    stream::TryStreamExt, truncate_long,
};
use anyhow::Context;
use std::{
    collections::HashMap,
    fmt::{self, Debug},
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};
use tokio::sync::{Mutex, watch};

struct Inner<E: Executor> {
    executor: E,
    config: ServerConfig,
    tables: RwLock<HashMap<String, Arc<TableMetadata>>>,
}

/// Handle to one logical database server.
///
/// Clones are cheap and share the executor (the pool) and the table metadata cache.
/// The table prefix from the configuration is applied to every statement, callers
/// always use unprefixed names.
pub struct Connection<E: Executor> {
    shared: Arc<Inner<E>>,
    cancellation: Option<Cancellation>,
}

impl<E: Executor> Clone for Connection<E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<E: Executor> Debug for Connection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.shared.config.host)
            .field("database", &self.shared.config.database)
            .field("table_prefix", &self.shared.config.table_prefix)
            .finish_non_exhaustive()
    }
}

impl<E: Executor> Connection<E> {
    pub fn new(executor: E, config: ServerConfig) -> Self {
        Self {
            shared: Arc::new(Inner {
                executor,
                config,
                tables: Default::default(),
            }),
            cancellation: None,
        }
    }

    /// Opens the backend for `config`, any failure is a [`DataError::Connection`].
    pub async fn connect<D: Driver<Executor = E>>(
        driver: &D,
        config: ServerConfig,
    ) -> Result<Self> {
        let executor = driver
            .connect(&config)
            .await
            .with_context(|| DataError::Connection {
                server: format!(
                    "{}://{}:{}/{}",
                    D::NAME,
                    config.host,
                    config.port,
                    config.database
                ),
            });
        match executor {
            Ok(executor) => Ok(Self::new(executor, config)),
            Err(e) => {
                log::error!("{:#}", e);
                Err(e)
            }
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    pub fn executor(&self) -> &E {
        &self.shared.executor
    }

    pub fn table_prefix(&self) -> &str {
        &self.shared.config.table_prefix
    }

    /// A handle bound to a unit of work: statements stop with [`DataError::Cancelled`]
    /// once `cancellation` fires. The pool and the table cache stay shared.
    pub fn with_cancellation(&self, cancellation: Cancellation) -> Self {
        Self {
            shared: self.shared.clone(),
            cancellation: Some(cancellation),
        }
    }

    /// Runs one statement with the table prefix applied and `params` bound positionally.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<QueryResult>> {
        let sql = sql::prefix_tables(sql, self.table_prefix()).into_owned();
        log::debug!("Executing:\n{}", truncate_long!(sql));
        let query = Query::new(sql.clone(), params);
        let run = async {
            self.shared
                .executor
                .run(query)
                .try_collect::<Vec<_>>()
                .await
                .with_context(|| DataError::Query {
                    sql: sql.clone(),
                    params: params.to_vec(),
                })
        };
        let result = self.guard(&sql, run).await;
        if let Err(e) = &result {
            log::error!("{:#}", e);
        }
        result
    }

    /// Applies the configured timeout and the cancellation of the unit of work.
    async fn guard<T>(&self, sql: &str, future: impl Future<Output = Result<T>>) -> Result<T> {
        let timed = async {
            match self.shared.config.timeout() {
                Some(after) => tokio::time::timeout(after, future)
                    .await
                    .unwrap_or_else(|_| {
                        Err(Error::new(DataError::Timeout {
                            sql: sql.to_owned(),
                            after,
                        }))
                    }),
                None => future.await,
            }
        };
        match &self.cancellation {
            Some(cancellation) => {
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => Err(Error::new(DataError::Cancelled {
                        sql: sql.to_owned(),
                    })),
                    result = timed => result,
                }
            }
            None => timed.await,
        }
    }

    pub(crate) async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<RowLabeled>> {
        Ok(self
            .execute(sql, params)
            .await?
            .into_iter()
            .filter_map(|v| match v {
                QueryResult::Row(row) => Some(row),
                QueryResult::Affected(..) => None,
            })
            .collect())
    }

    /// Runs a query and wraps its rows, the tables are taken from the statement text.
    ///
    /// Names that cannot be introspected (`dual`, schema qualified names) are left out of
    /// the result set, their columns stay untyped.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let rows = self.fetch_all(sql, params).await?;
        let mut tables = Vec::new();
        for name in sql::parse_referenced_tables(sql) {
            match self.table(&name).await {
                Ok(table) => tables.push(table),
                Err(e) if matches!(DataError::of(&e), Some(DataError::Schema { .. })) => {
                    log::warn!("Table `{name}` is left out of the result set: {e:#}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(ResultSet::new(
            Origin::RawQuery {
                sql: sql.to_owned(),
                params: params.to_vec(),
            },
            Arc::new(TableSet::new(tables)),
            rows,
        ))
    }

    /// First column of the first row.
    pub async fn value(&self, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        Ok(self
            .row(sql, params)
            .await?
            .and_then(|row| row.values.into_vec().into_iter().next()))
    }

    pub async fn row(&self, sql: &str, params: &[Value]) -> Result<Option<RowLabeled>> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }

    /// The generated key for an `INSERT`, the number of affected rows otherwise.
    pub async fn exec(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut affected = RowsAffected::default();
        affected.extend(
            self.execute(sql, params)
                .await?
                .into_iter()
                .filter_map(|v| match v {
                    QueryResult::Affected(v) => Some(v),
                    QueryResult::Row(..) => None,
                }),
        );
        Ok(if sql::is_insert(sql) {
            affected.last_affected_id.unwrap_or_default()
        } else {
            affected.rows_affected
        })
    }

    /// Metadata of `name`, introspected on first access and cached afterwards.
    pub async fn table(&self, name: &str) -> Result<Arc<TableMetadata>> {
        let cached = self
            .shared
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        if let Some(table) = cached {
            return Ok(table);
        }
        let table = Arc::new(TableMetadata::introspect(self, name).await?);
        let mut tables = self
            .shared
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(tables.entry(name.to_owned()).or_insert(table).clone())
    }

    /// Introspects `name` again and replaces the cached metadata.
    ///
    /// Result sets built before keep the metadata they were created with.
    pub async fn refresh(&self, name: &str) -> Result<Arc<TableMetadata>> {
        let table = Arc::new(TableMetadata::introspect(self, name).await?);
        self.shared
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), table.clone());
        Ok(table)
    }

    pub async fn tables(&self, names: &[impl AsRef<str>]) -> Result<Vec<Arc<TableMetadata>>> {
        let mut result = Vec::with_capacity(names.len());
        for name in names {
            result.push(self.table(name.as_ref()).await?);
        }
        Ok(result)
    }

    /// A new, empty record spanning `tables`. Saving it inserts one row per table.
    pub async fn record(&self, tables: &[&str]) -> Result<Record> {
        let tables = self.tables(tables).await?;
        Ok(ResultSet::new(
            Origin::ExplicitTables,
            Arc::new(TableSet::new(tables)),
            Vec::new(),
        )
        .new_record())
    }
}

/// Cancellation signal shared by the statements of one unit of work.
#[derive(Debug, Clone)]
pub struct Cancellation {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes once [`Cancellation::cancel`] was called.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        let closed = receiver.wait_for(|v| *v).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Connections by logical server name, opened on first use and reused afterwards.
pub struct Registry<D: Driver> {
    driver: D,
    config: Config,
    connections: Mutex<HashMap<String, Connection<D::Executor>>>,
}

impl<D: Driver> Registry<D> {
    pub fn new(driver: D, config: Config) -> Self {
        Self {
            driver,
            config,
            connections: Default::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn get(&self, server: &str) -> Result<Connection<D::Executor>> {
        let mut connections = self.connections.lock().await;
        if let Some(connection) = connections.get(server) {
            return Ok(connection.clone());
        }
        let Some(config) = self.config.server(server) else {
            let error = Error::msg(format!("Server `{server}` is not configured")).context(
                DataError::Connection {
                    server: server.to_owned(),
                },
            );
            log::error!("{:#}", error);
            return Err(error);
        };
        let connection = Connection::connect(&self.driver, config.clone()).await?;
        connections.insert(server.to_owned(), connection.clone());
        Ok(connection)
    }
}
