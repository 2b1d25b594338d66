use crate::MySQLExecutor;
use mysql_async::{Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts};
use quarry_core::{Context, Driver, Error, Result, ServerConfig};

/// Statements run on every new pooled connection.
const INIT: [&str; 2] = [
    "SET NAMES utf8mb4",
    "SET SESSION sql_mode = 'STRICT_ALL_TABLES'",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct MySQLDriver;
impl MySQLDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl Driver for MySQLDriver {
    type Executor = MySQLExecutor;

    const NAME: &'static str = "mysql";

    /// Opens the pool and checks out one connection, so a wrong address or bad credentials
    /// fail here rather than on the first statement.
    async fn connect(&self, config: &ServerConfig) -> Result<MySQLExecutor> {
        let context = || {
            format!(
                "While trying to connect to `{}:{}/{}`",
                config.host, config.port, config.database
            )
        };
        let url = config.to_url(Self::NAME)?;
        let opts = Opts::from_url(url.as_str()).with_context(context)?;
        let max = config.pool_max.unwrap_or(100);
        let min = config.pool_min.unwrap_or(10.min(max));
        let constraints = PoolConstraints::new(min, max).ok_or_else(|| {
            Error::msg(format!("Invalid pool size, min {min} is greater than max {max}"))
                .context(context())
        })?;
        let opts = OptsBuilder::from_opts(opts)
            .init(INIT.to_vec())
            .pool_opts(PoolOpts::default().with_constraints(constraints));
        let pool = Pool::new(opts);
        match pool.get_conn().await {
            Ok(connection) => drop(connection),
            Err(e) => {
                let _ = pool.disconnect().await;
                return Err(Error::new(e).context(context()));
            }
        }
        log::debug!("Connected to {}:{}/{}", config.host, config.port, config.database);
        Ok(MySQLExecutor::new(pool))
    }
}
