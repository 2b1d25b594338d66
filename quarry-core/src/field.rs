use crate::{Parse, Value, consume_while};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

/// Coercion category of a column, derived from its SQL type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    Number,
    Float,
    Date,
    Time,
    DateTime,
    #[default]
    Text,
}

impl SemanticType {
    pub fn from_sql_type(sql_type: &str) -> Self {
        match sql_type.to_ascii_lowercase().as_str() {
            "bit" | "bool" | "boolean" | "tinyint" | "smallint" | "mediumint" | "int"
            | "integer" | "bigint" | "year" => SemanticType::Number,
            "float" | "double" | "real" | "decimal" | "numeric" => SemanticType::Float,
            "date" => SemanticType::Date,
            "time" => SemanticType::Time,
            "datetime" | "timestamp" => SemanticType::DateTime,
            _ => SemanticType::Text,
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            SemanticType::Date | SemanticType::Time | SemanticType::DateTime
        )
    }
}

/// SQL type as reported by the server, split into its parts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// Lower-cased base type, `varchar` in `varchar(255)`.
    pub base: String,
    pub length: Option<u32>,
    pub decimals: Option<u32>,
    pub unsigned: bool,
}

impl ColumnType {
    /// Decodes strings like `int(10) unsigned`, `decimal(10,2)`, `varchar(64)` or `enum('a','b')`.
    pub fn parse(column_type: &str) -> Self {
        let lowered = column_type.trim().to_ascii_lowercase();
        let mut input = lowered.as_str();
        let base = consume_while(&mut input, |c| c.is_ascii_alphanumeric() || *c == '_').to_owned();
        let mut length = None;
        let mut decimals = None;
        if let Some(rest) = input.strip_prefix('(') {
            if let Some(end) = rest.find(')') {
                let mut args = rest[..end].split(',').map(|v| v.trim().parse::<u32>().ok());
                length = args.next().flatten();
                decimals = args.next().flatten();
                input = &rest[end + 1..];
            }
        }
        let unsigned = input.split_whitespace().any(|v| v == "unsigned");
        Self {
            base,
            length,
            decimals,
            unsigned,
        }
    }
}

/// Metadata of a single column and the coercion that makes values storage ready.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    /// The column carries any key (primary, unique or index).
    pub is_key: bool,
    pub is_primary: bool,
    pub sql_type: String,
    pub unsigned: bool,
    pub length: Option<u32>,
    pub decimals: Option<u32>,
    /// Default value, known only for nullable columns.
    pub default: Option<Value>,
    pub nullable: bool,
    pub auto_increment: bool,
    pub semantic: SemanticType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, column_type: &str) -> Self {
        let column_type = ColumnType::parse(column_type);
        Self {
            name: name.into(),
            semantic: SemanticType::from_sql_type(&column_type.base),
            sql_type: column_type.base,
            unsigned: column_type.unsigned,
            length: column_type.length,
            decimals: column_type.decimals,
            ..Default::default()
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_key = true;
        self.is_primary = true;
        self
    }

    pub fn nullable(mut self, default: Option<Value>) -> Self {
        self.nullable = true;
        self.default = default;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Turns a user supplied value into what is written for this column.
    ///
    /// `Null` always stays `Null`. Every other value is converted to the field's
    /// semantic type, see [`SemanticType`].
    pub fn format(&self, value: Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match self.semantic {
            SemanticType::Number => match value {
                // Unsigned `BIGINT` above `i64::MAX` keeps its digits
                Value::Text(v) if is_integer(&v) && v.trim().parse::<i64>().is_err() => {
                    log::warn!(
                        "Field `{}` holds {} which does not fit a 64 bit integer, kept as text",
                        self.name,
                        v.trim()
                    );
                    Value::Text(v.trim().to_owned())
                }
                v => Value::Number(integer_cast(&v)),
            },
            SemanticType::Float => {
                let v = float_cast(&value);
                Value::Float(match self.decimals {
                    Some(decimals) => round(v, decimals),
                    None => v,
                })
            }
            SemanticType::Date | SemanticType::Time | SemanticType::DateTime => {
                self.format_temporal(value)
            }
            SemanticType::Text => {
                let mut text = match value {
                    Value::Text(v) => v,
                    v => v.to_string(),
                };
                if let Some(length) = self.length {
                    if let Some((i, _)) = text.char_indices().nth(length as usize) {
                        text.truncate(i);
                    }
                }
                Value::Text(text)
            }
        }
    }

    fn format_temporal(&self, value: Value) -> Value {
        if is_empty_temporal(&value, self.semantic) {
            return Value::Null;
        }
        let timestamp = match &value {
            Value::Number(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            Value::Text(v) if is_integer(v) => v.trim().parse().ok(),
            _ => None,
        };
        if let Some(timestamp) = timestamp {
            return match OffsetDateTime::from_unix_timestamp(timestamp) {
                Ok(v) => self.temporal_from(PrimitiveDateTime::new(v.date(), v.time())),
                Err(e) => {
                    log::warn!("Timestamp {timestamp} for `{}` is out of range: {e}", self.name);
                    value
                }
            };
        }
        match (self.semantic, value) {
            (SemanticType::DateTime, Value::Date(v)) => Value::DateTime(v.midnight()),
            (_, Value::DateTime(v)) => self.temporal_from(v),
            (SemanticType::Date, Value::Text(v)) => <Date as Parse>::parse(&v)
                .map(Value::Date)
                .or_else(|_| <PrimitiveDateTime as Parse>::parse(&v).map(|v| Value::Date(v.date())))
                .unwrap_or(Value::Text(v)),
            (SemanticType::Time, Value::Text(v)) => <Time as Parse>::parse(&v)
                .map(Value::Time)
                .unwrap_or(Value::Text(v)),
            (SemanticType::DateTime, Value::Text(v)) => <PrimitiveDateTime as Parse>::parse(&v)
                .map(Value::DateTime)
                .or_else(|_| <Date as Parse>::parse(&v).map(|v| Value::DateTime(v.midnight())))
                .unwrap_or(Value::Text(v)),
            (_, value) => value,
        }
    }

    fn temporal_from(&self, value: PrimitiveDateTime) -> Value {
        match self.semantic {
            SemanticType::Date => Value::Date(value.date()),
            SemanticType::Time => Value::Time(value.time()),
            _ => Value::DateTime(value),
        }
    }
}

fn is_integer(value: &str) -> bool {
    let value = value.trim();
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_empty_temporal(value: &Value, semantic: SemanticType) -> bool {
    match value {
        Value::Number(v) => *v == 0,
        Value::Float(v) => *v == 0.0,
        Value::Text(v) => {
            let v = v.trim();
            v.is_empty()
                || v == "0"
                || (semantic != SemanticType::Time
                    && v.chars().all(|c| matches!(c, '0' | '-' | ':' | ' ' | '.' | 'T')))
        }
        _ => false,
    }
}

/// Integer reading that never fails: text contributes its leading integer (or 0), saturated
/// to the `i64` range.
fn integer_cast(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Number(v) => *v,
        Value::Float(v) => *v as i64,
        Value::Text(v) => {
            let mut input = v.trim_start();
            let sign = if input.starts_with(['-', '+']) {
                let sign = &input[..1];
                input = &input[1..];
                sign
            } else {
                ""
            };
            let digits = consume_while(&mut input, char::is_ascii_digit);
            match format!("{sign}{digits}").parse::<i64>() {
                Ok(v) => v,
                Err(_) if digits.is_empty() => 0,
                Err(_) if sign == "-" => i64::MIN,
                Err(_) => i64::MAX,
            }
        }
        Value::Date(v) => v.midnight().assume_utc().unix_timestamp(),
        Value::DateTime(v) => v.assume_utc().unix_timestamp(),
        Value::Time(v) => {
            let (h, m, s) = v.as_hms();
            h as i64 * 3600 + m as i64 * 60 + s as i64
        }
    }
}

fn float_cast(value: &Value) -> f64 {
    match value {
        Value::Float(v) => *v,
        Value::Text(v) => {
            let mut input = v.trim();
            let mut end = 0;
            // Longest prefix that still reads as a number
            for (i, _) in input.char_indices().chain([(input.len(), ' ')]) {
                if i > 0 && input[..i].parse::<f64>().is_ok() {
                    end = i;
                }
            }
            input = &input[..end];
            input.parse().unwrap_or(0.0)
        }
        v => integer_cast(v) as f64,
    }
}

fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() { rounded } else { value }
}
