use crate::{
    Connection, Entity, Executor, FieldDescriptor, IdentityMap, Record, Result, RowLabeled,
    Shared, TableMetadata, Value,
    sql::{self, Limit},
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::OnceCell;

/// Where the tables of a result set come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    /// Parsed out of the statement that produced the rows.
    RawQuery { sql: String, params: Vec<Value> },
    /// Supplied by the caller, there is no statement text.
    ExplicitTables,
}

/// The tables behind a result set and the union of their columns.
#[derive(Debug)]
pub struct TableSet {
    tables: Vec<Arc<TableMetadata>>,
    fields: HashMap<String, FieldDescriptor>,
}

impl TableSet {
    /// On a column name collision the table that comes first wins.
    pub fn new(tables: Vec<Arc<TableMetadata>>) -> Self {
        let mut fields = HashMap::new();
        for table in &tables {
            for field in table.fields() {
                fields
                    .entry(field.name.clone())
                    .or_insert_with(|| field.clone());
            }
        }
        Self { tables, fields }
    }
    pub fn tables(&self) -> &[Arc<TableMetadata>] {
        &self.tables
    }
    pub fn table(&self, name: &str) -> Option<&Arc<TableMetadata>> {
        self.tables.iter().find(|v| v.name() == name)
    }
    pub fn names(&self) -> Vec<String> {
        self.tables.iter().map(|v| v.name().to_owned()).collect()
    }
    pub fn fields(&self) -> &HashMap<String, FieldDescriptor> {
        &self.fields
    }
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }
}

/// Window of the rows within the full result.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub start: u64,
    /// Index of the last row, `-1` when the window is empty.
    pub end: i64,
    /// Rows per page, `None` when the statement has no `LIMIT`.
    pub range: Option<u64>,
    pub page: u64,
}

impl Pagination {
    pub fn new(limit: Option<Limit>, count: usize) -> Self {
        match limit {
            None => Self {
                start: 0,
                end: count as i64 - 1,
                range: None,
                page: 0,
            },
            Some(Limit {
                offset: None,
                range,
            }) => Self {
                start: 0,
                end: last_index(range),
                range: Some(range),
                page: 0,
            },
            Some(Limit {
                offset: Some(offset),
                range,
            }) => Self {
                start: offset,
                end: last_index(offset.saturating_add(range)),
                range: Some(range),
                page: if range > 0 { offset / range } else { 0 },
            },
        }
    }
}

/// `end - 1` as a row index, clamped to `i64`.
fn last_index(end: u64) -> i64 {
    i64::try_from(end).unwrap_or(i64::MAX).saturating_sub(1)
}

/// Ordered records produced by a query, aware of the tables they come from.
#[derive(Debug)]
pub struct ResultSet {
    origin: Origin,
    tables: Arc<TableSet>,
    records: Vec<Record>,
    limit: Option<Limit>,
    counted: OnceCell<u64>,
}

impl ResultSet {
    pub fn new(origin: Origin, tables: Arc<TableSet>, rows: Vec<RowLabeled>) -> Self {
        let limit = match &origin {
            Origin::RawQuery { sql, .. } => sql::parse_pagination(sql),
            Origin::ExplicitTables => None,
        };
        let records = rows
            .into_iter()
            .map(|row| Record::from_row(tables.clone(), row))
            .collect();
        Self {
            origin,
            tables,
            records,
            limit,
            counted: OnceCell::new(),
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn tables_used(&self) -> &[Arc<TableMetadata>] {
        self.tables.tables()
    }

    pub fn table_set(&self) -> &Arc<TableSet> {
        &self.tables
    }

    pub fn union_of_fields(&self) -> &HashMap<String, FieldDescriptor> {
        self.tables.fields()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// An empty record over the same tables, new for all of them.
    pub fn new_record(&self) -> Record {
        Record::new(self.tables.clone())
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.limit, self.records.len())
    }

    /// Number of rows the statement would return without its `LIMIT`.
    ///
    /// With a `LIMIT` the count is asked to the database once and cached. Without one,
    /// it is the number of records. When there is no statement to count with, it is the
    /// number of records if `fallback_to_count`, otherwise unknown (`None`).
    pub async fn total<E: Executor>(
        &self,
        connection: &Connection<E>,
        fallback_to_count: bool,
    ) -> Result<Option<u64>> {
        let fallback = fallback_to_count.then_some(self.records.len() as u64);
        let Origin::RawQuery { sql, params } = &self.origin else {
            return Ok(fallback);
        };
        if self.limit.is_none() {
            return Ok(Some(self.records.len() as u64));
        }
        let Some(count) = sql::count_query(sql) else {
            log::debug!("Cannot derive the count query, the total falls back to the records");
            return Ok(fallback);
        };
        let total = self
            .counted
            .get_or_try_init(|| async {
                let value = connection.value(&count, params).await?;
                Ok::<_, crate::Error>(value.as_ref().and_then(Value::as_i64).unwrap_or(0) as u64)
            })
            .await?;
        Ok(Some(*total))
    }

    /// Every record as an instance of `T`, shared through `map` with previously loaded ones.
    pub fn cast_as<T: Entity>(self, map: &mut IdentityMap) -> Result<Vec<Shared<T>>> {
        self.records
            .into_iter()
            .map(|record| map.get::<T>(record))
            .collect()
    }
}

impl IntoIterator for ResultSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;
    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
