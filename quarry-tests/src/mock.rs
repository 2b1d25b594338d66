use quarry_core::{
    Driver, Error, Executor, Query, QueryResult, Result, RowLabeled, RowNames, RowsAffected,
    ServerConfig, Value,
    stream::{self, Stream, StreamExt},
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// One `DESCRIBE` row: `(Field, Type, Null, Key, Default, Extra)`.
pub type MockColumn<'a> = (&'a str, &'a str, &'a str, &'a str, Option<&'a str>, &'a str);

#[derive(Debug)]
struct State {
    tables: HashMap<String, Vec<RowLabeled>>,
    rows: HashMap<String, Vec<RowLabeled>>,
    failures: Vec<(String, String)>,
    statements: Vec<Query>,
    next_id: u64,
    affected: u64,
    delay: Option<Duration>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            tables: Default::default(),
            rows: Default::default(),
            failures: Default::default(),
            statements: Default::default(),
            next_id: 0,
            affected: 1,
            delay: None,
        }
    }
}

/// Scripted backend: answers `DESCRIBE` for the declared tables, returns canned rows for
/// known statements, assigns increasing ids to inserts and records everything it runs.
///
/// Clones share the same script and log, keep one to inspect what a connection sent.
#[derive(Debug, Default, Clone)]
pub struct MockExecutor {
    state: Arc<Mutex<State>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declares a table, `name` is the name the server sees (prefix included).
    pub fn table(self, name: &str, columns: &[MockColumn]) -> Self {
        let labels: RowNames = ["Field", "Type", "Null", "Key", "Default", "Extra"]
            .into_iter()
            .map(String::from)
            .collect();
        let rows = columns
            .iter()
            .map(|(field, ty, null, key, default, extra)| {
                RowLabeled::new(
                    labels.clone(),
                    [
                        Value::from(*field),
                        Value::from(*ty),
                        Value::from(*null),
                        Value::from(*key),
                        default.map_or(Value::Null, Value::from),
                        Value::from(*extra),
                    ]
                    .into(),
                )
            })
            .collect();
        self.state().tables.insert(name.to_owned(), rows);
        self
    }

    /// Rows returned for the statement `sql`, compared after the prefix was applied.
    pub fn rows(self, sql: &str, labels: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let labels: RowNames = labels.iter().map(|v| v.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|v| RowLabeled::new(labels.clone(), v.into()))
            .collect();
        self.state().rows.insert(sql.to_owned(), rows);
        self
    }

    /// Statements containing `pattern` fail with `message`.
    pub fn fail_on(self, pattern: &str, message: &str) -> Self {
        self.state()
            .failures
            .push((pattern.to_owned(), message.to_owned()));
        self
    }

    /// Every statement waits `delay` before answering.
    pub fn delay(self, delay: Duration) -> Self {
        self.state().delay = Some(delay);
        self
    }

    /// Rows reported for each `UPDATE` and `DELETE`, 1 unless changed.
    pub fn affected(self, rows: u64) -> Self {
        self.state().affected = rows;
        self
    }

    /// The next insert gets `id + 1`.
    pub fn last_id(self, id: u64) -> Self {
        self.state().next_id = id;
        self
    }

    pub fn statements(&self) -> Vec<Query> {
        self.state().statements.clone()
    }

    /// Statements sent so far, `DESCRIBE` excluded.
    pub fn writes_and_reads(&self) -> Vec<Query> {
        self.state()
            .statements
            .iter()
            .filter(|v| !v.sql.starts_with("DESCRIBE"))
            .cloned()
            .collect()
    }

    pub fn clear_statements(&self) {
        self.state().statements.clear();
    }

    fn answer(&self, query: Query) -> Result<Vec<QueryResult>> {
        let mut state = self.state();
        state.statements.push(query.clone());
        let sql = query.sql.trim();
        if let Some((_, message)) = state.failures.iter().find(|(v, _)| sql.contains(v.as_str())) {
            return Err(Error::msg(message.clone()));
        }
        if let Some(rest) = sql.strip_prefix("DESCRIBE ") {
            let name = rest.trim_matches('`');
            return match state.tables.get(name) {
                Some(rows) => Ok(rows.iter().cloned().map(QueryResult::Row).collect()),
                None => Err(Error::msg(format!("Table '{name}' doesn't exist"))),
            };
        }
        if let Some(rows) = state.rows.get(sql) {
            return Ok(rows.iter().cloned().map(QueryResult::Row).collect());
        }
        let keyword = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        Ok(match keyword.as_str() {
            "INSERT" => {
                state.next_id += 1;
                vec![QueryResult::Affected(RowsAffected {
                    rows_affected: 1,
                    last_affected_id: Some(state.next_id),
                })]
            }
            "UPDATE" | "DELETE" => vec![QueryResult::Affected(RowsAffected {
                rows_affected: state.affected,
                last_affected_id: None,
            })],
            _ => Vec::new(),
        })
    }
}

impl Executor for MockExecutor {
    fn run(&self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        let executor = self.clone();
        stream::once(async move {
            let delay = executor.state().delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            executor.answer(query)
        })
        .flat_map(|result| {
            stream::iter(match result {
                Ok(items) => items.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            })
        })
    }
}

/// Hands out clones of one [`MockExecutor`], refuses the host `unreachable`.
#[derive(Debug, Default, Clone)]
pub struct MockDriver {
    executor: MockExecutor,
    connects: Arc<AtomicUsize>,
}

impl MockDriver {
    pub fn new(executor: MockExecutor) -> Self {
        Self {
            executor,
            connects: Default::default(),
        }
    }

    /// Successful calls to [`Driver::connect`] so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }
}

impl Driver for MockDriver {
    type Executor = MockExecutor;

    const NAME: &'static str = "mock";

    async fn connect(&self, config: &ServerConfig) -> Result<MockExecutor> {
        if config.host == "unreachable" {
            return Err(Error::msg("Connection refused"));
        }
        self.connects.fetch_add(1, Ordering::Relaxed);
        Ok(self.executor.clone())
    }
}

/// `users`, `profiles` (both keyed, joined on `profiles.user_id`) and the keyless `log`,
/// declared with `prefix` in front of their names.
pub fn sample_schema(prefix: &str) -> MockExecutor {
    MockExecutor::new()
        .table(
            &format!("{prefix}users"),
            &[
                ("id", "int(11)", "NO", "PRI", None, "auto_increment"),
                ("name", "varchar(32)", "NO", "", None, ""),
                ("email", "varchar(64)", "YES", "UNI", None, ""),
                ("score", "int(11)", "YES", "", Some("0"), ""),
                ("created", "datetime", "YES", "", None, ""),
            ],
        )
        .table(
            &format!("{prefix}profiles"),
            &[
                ("profile_id", "int(11)", "NO", "PRI", None, "auto_increment"),
                ("user_id", "int(11)", "NO", "MUL", None, ""),
                ("bio", "varchar(255)", "YES", "", None, ""),
                ("created", "date", "YES", "", None, ""),
            ],
        )
        .table(&format!("{prefix}log"), &[("line", "text", "YES", "", None, "")])
}
