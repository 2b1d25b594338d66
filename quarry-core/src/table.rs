use crate::{
    Connection, DataError, Error, Executor, FieldDescriptor, Result, RowLabeled, Value, sql,
};
use anyhow::Context;

/// Schema of one table as reported by `DESCRIBE`.
///
/// Columns keep the order of the table definition. At most one of them is the primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    name: String,
    fields: Vec<FieldDescriptor>,
    primary_key: Option<usize>,
}

impl TableMetadata {
    /// Only the first field flagged as primary keeps the flag.
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        let name = name.into();
        let mut primary_key = None;
        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(i, mut field)| {
                if field.is_primary {
                    if primary_key.is_none() {
                        primary_key = Some(i);
                    } else {
                        log::warn!(
                            "Table `{name}` reports more than one primary column, `{}` is treated as a plain key",
                            field.name
                        );
                        field.is_primary = false;
                    }
                }
                field
            })
            .collect();
        Self {
            name,
            fields,
            primary_key,
        }
    }

    /// Runs `DESCRIBE` for `name` through the connection (so the table prefix applies).
    pub async fn introspect<E: Executor>(connection: &Connection<E>, name: &str) -> Result<Self> {
        let error = || DataError::Schema {
            table: name.to_owned(),
        };
        let rows = match connection.fetch_all(&sql::describe(name), &[]).await {
            Ok(rows) => rows,
            Err(e) if DataError::of(&e).is_some_and(DataError::is_interrupted) => return Err(e),
            Err(e) => return Err(e.context(error())),
        };
        if rows.is_empty() {
            return Err(Error::msg("DESCRIBE returned no columns").context(error()));
        }
        Self::from_describe(name, &rows).with_context(error)
    }

    /// Builds the metadata from the rows of `DESCRIBE`
    /// (`Field`, `Type`, `Null`, `Key`, `Default`, `Extra`).
    pub fn from_describe(name: impl Into<String>, rows: &[RowLabeled]) -> Result<Self> {
        let fields = rows
            .iter()
            .map(|row| {
                let column = |label: &str| {
                    row.get_column(label)
                        .filter(|v| !v.is_null())
                        .map(ToString::to_string)
                };
                let field_name = column("Field")
                    .ok_or_else(|| Error::msg("DESCRIBE row without the `Field` column"))?;
                let column_type = column("Type").ok_or_else(|| {
                    Error::msg(format!("DESCRIBE row for `{field_name}` without the `Type` column"))
                })?;
                let key = column("Key").unwrap_or_default();
                let extra = column("Extra").unwrap_or_default().to_ascii_lowercase();
                let mut field = FieldDescriptor::new(field_name, &column_type);
                field.is_key = !key.trim().is_empty();
                field.is_primary = key.trim().eq_ignore_ascii_case("PRI");
                field.auto_increment = extra.contains("auto_increment");
                if column("Null").is_some_and(|v| v.eq_ignore_ascii_case("YES")) {
                    let default = if extra.contains("default_generated") {
                        None
                    } else {
                        column("Default").and_then(|v| decode_default(&v))
                    };
                    field = field.nullable(default);
                }
                Ok(field)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(name, fields))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|v| v.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.primary_key.map(|i| &self.fields[i])
    }

    pub fn primary_key_name(&self) -> Option<&str> {
        self.primary_key().map(|v| v.name.as_str())
    }
}

/// Integers become `Number`, other numbers `Float`, the rest stays text.
fn decode_default(value: &str) -> Option<Value> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("NULL")
        || value.ends_with("()")
        || value.eq_ignore_ascii_case("CURRENT_TIMESTAMP")
    {
        return None;
    }
    if let Ok(v) = value.parse::<i64>() {
        return Some(Value::Number(v));
    }
    if let Ok(v) = value.parse::<f64>() {
        return Some(Value::Float(v));
    }
    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .map(|v| v.replace("''", "'"));
    Some(Value::Text(unquoted.unwrap_or_else(|| value.to_owned())))
}
