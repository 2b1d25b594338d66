use crate::{
    Connection, DataError, Error, Executor, FieldDescriptor, FromValue, Result, RowLabeled,
    TableMetadata, TableSet, Value, sql,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// Which of the record's tables an operation applies to.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum Target {
    /// The first table of the result set.
    First,
    Named(String),
    List(Vec<String>),
    /// Every table referenced by the result set.
    #[default]
    AllReferenced,
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Target::Named(value.to_owned())
    }
}

/// One row, possibly spanning several joined tables, with dirty tracking.
///
/// Values written with [`Record::set`] go through the column's [`FieldDescriptor::format`],
/// so a record only ever holds storage ready values. Primary keys are read only, they are
/// assigned by [`Record::save`] when a row is inserted.
#[derive(Debug, Clone)]
pub struct Record {
    tables: Arc<TableSet>,
    values: BTreeMap<String, Value>,
    modified: BTreeSet<String>,
}

impl Record {
    /// An empty record, new for every table.
    pub fn new(tables: Arc<TableSet>) -> Self {
        Self {
            tables,
            values: Default::default(),
            modified: Default::default(),
        }
    }

    /// A record loaded from storage: values are normalized, nothing is modified.
    pub fn from_row(tables: Arc<TableSet>, row: RowLabeled) -> Self {
        let values = row
            .labels
            .iter()
            .zip(row.values.into_vec())
            .map(|(name, value)| {
                let value = match tables.field(name) {
                    Some(field) => field.format(value),
                    None => value,
                };
                (name.clone(), value)
            })
            .collect();
        Self {
            tables,
            values,
            modified: Default::default(),
        }
    }

    pub fn tables(&self) -> &[Arc<TableMetadata>] {
        self.tables.tables()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.tables.field(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a Value) -> &'a Value {
        self.values.get(name).unwrap_or(default)
    }

    /// Typed read, a missing value reads as `Null`.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        T::from_value(self.values.get(name).unwrap_or(&Value::Null))
            .map_err(|e| e.context(format!("While reading the field `{name}`")))
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Writes a value, marking the field as modified when the stored value changes.
    ///
    /// Fails with [`DataError::ImmutableField`] for primary keys and with
    /// [`DataError::UnknownField`] for names that are not columns of the record's tables.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if let Some(table) = self
            .tables
            .tables()
            .iter()
            .find(|v| v.primary_key_name() == Some(name))
        {
            return Err(Error::new(DataError::ImmutableField {
                table: table.name().to_owned(),
                field: name.to_owned(),
            }));
        }
        let Some(field) = self.tables.field(name) else {
            return Err(Error::new(DataError::UnknownField {
                field: name.to_owned(),
                tables: self.tables.names(),
            }));
        };
        let value = field.format(value.into());
        if *self.values.get(name).unwrap_or(&Value::Null) != value {
            self.modified.insert(name.to_owned());
        }
        self.values.insert(name.to_owned(), value);
        Ok(())
    }

    /// [`Record::set`] for each pair, stops at the first failure.
    pub fn set_many<K, V, I>(&mut self, values: I) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (name, value) in values {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    pub fn modified(&self) -> impl Iterator<Item = &str> {
        self.modified.iter().map(String::as_str)
    }

    pub fn is_modified(&self, name: &str) -> bool {
        self.modified.contains(name)
    }

    pub fn is_dirty(&self) -> bool {
        !self.modified.is_empty()
    }

    /// Primary key column of the first table.
    pub fn primary_key_name(&self) -> Option<&str> {
        self.tables.tables().first()?.primary_key_name()
    }

    /// Primary key value of the first table.
    pub fn primary_key(&self) -> Option<&Value> {
        self.values.get(self.primary_key_name()?)
    }

    fn is_new(&self, table: &TableMetadata) -> bool {
        table
            .primary_key_name()
            .and_then(|name| self.values.get(name))
            .is_none_or(Value::is_empty_key)
    }

    /// The row does not exist yet in `table`: its primary key is absent, zero or empty.
    pub fn is_new_for_table(&self, table: &str) -> Result<bool> {
        Ok(self.is_new(self.resolve_one(table)?))
    }

    /// New for the first table.
    pub fn is_new_record(&self) -> bool {
        self.tables
            .tables()
            .first()
            .is_none_or(|table| self.is_new(table))
    }

    fn resolve_one(&self, name: &str) -> Result<&Arc<TableMetadata>> {
        self.tables.table(name).ok_or_else(|| {
            Error::new(DataError::UnknownTable {
                table: name.to_owned(),
                tables: self.tables.names(),
            })
        })
    }

    fn resolve(&self, target: &Target) -> Result<Vec<Arc<TableMetadata>>> {
        Ok(match target {
            Target::First => self.tables.tables().iter().take(1).cloned().collect(),
            Target::Named(name) => vec![self.resolve_one(name)?.clone()],
            Target::List(names) => names
                .iter()
                .map(|v| self.resolve_one(v).cloned())
                .collect::<Result<_>>()?,
            Target::AllReferenced => self.tables.tables().to_vec(),
        })
    }

    /// Writes the record to the `target` tables.
    ///
    /// A table new for this record gets an `INSERT` with every column that has a value or a
    /// default, the generated key is stored back. An existing row gets an `UPDATE` of its
    /// modified columns only. Tables without a primary key are skipped.
    ///
    /// Returns the key of the first table that had an outcome. When the record is not
    /// new and nothing was modified, no statement runs at all.
    pub async fn save<E: Executor>(
        &mut self,
        connection: &Connection<E>,
        target: Target,
    ) -> Result<Option<Value>> {
        let tables = self.resolve(&target)?;
        let mut result: Option<Value> = None;
        for table in tables {
            let Some(primary) = table.primary_key() else {
                log::debug!("Table `{}` has no primary key, skipping", table.name());
                continue;
            };
            let is_new = self.is_new(&table);
            if !is_new && self.modified.is_empty() {
                return Ok(result.or_else(|| self.values.get(&primary.name).cloned()));
            }
            let columns = table
                .fields()
                .iter()
                .filter(|field| {
                    if is_new {
                        !field.is_primary
                            && (self.values.contains_key(&field.name) || field.default.is_some())
                    } else {
                        self.modified.contains(&field.name)
                    }
                })
                .collect::<Vec<_>>();
            if !is_new && columns.is_empty() {
                if result.is_none() {
                    result = self.values.get(&primary.name).cloned();
                }
                continue;
            }
            let mut params = columns
                .iter()
                .map(|field| {
                    let value = self
                        .values
                        .get(&field.name)
                        .filter(|v| !v.is_null())
                        .cloned()
                        .or_else(|| field.default.clone())
                        .unwrap_or_default();
                    field.format(value)
                })
                .collect::<Vec<_>>();
            let names = columns.iter().map(|v| v.name.as_str());
            if is_new {
                let id = connection
                    .exec(&sql::write_insert(table.name(), names), &params)
                    .await?;
                for (field, value) in columns.iter().zip(params) {
                    self.values.insert(field.name.clone(), value);
                }
                if id > 0 {
                    self.values.insert(primary.name.clone(), Value::from(id));
                }
                if result.is_none() {
                    result = self.values.get(&primary.name).cloned();
                }
            } else {
                let key = self.values.get(&primary.name).cloned().unwrap_or_default();
                params.push(key.clone());
                connection
                    .exec(&sql::write_update(table.name(), names, &primary.name), &params)
                    .await?;
                if result.is_none() {
                    result = Some(key);
                }
            }
        }
        self.modified.clear();
        Ok(result)
    }

    /// Deletes the record's row from each of the `target` tables where it exists.
    ///
    /// The primary key of every deleted table becomes `Null`. Returns whether the first
    /// table processed actually lost a row.
    pub async fn delete<E: Executor>(
        &mut self,
        connection: &Connection<E>,
        target: Target,
    ) -> Result<bool> {
        let tables = self.resolve(&target)?;
        let mut result = None;
        for table in tables {
            let Some(primary) = table.primary_key() else {
                continue;
            };
            if self.is_new(&table) {
                continue;
            }
            let key = self.values.get(&primary.name).cloned().unwrap_or_default();
            let affected = connection
                .exec(&sql::write_delete(table.name(), &primary.name), &[key])
                .await?;
            self.values.insert(primary.name.clone(), Value::Null);
            result.get_or_insert(affected > 0);
        }
        Ok(result.unwrap_or(false))
    }
}
