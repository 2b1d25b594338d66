use crate::{Error, Parse, Result};
use std::fmt::{self, Display, Write};
use time::{Date, PrimitiveDateTime, Time, macros::format_description};

/// A single column value, tagged with its semantic kind.
///
/// Equality is type sensitive: `Number(1)` and `Text("1")` are different values.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Number(i64),
    Float(f64),
    Text(String),
    Date(Date),
    Time(Time),
    DateTime(PrimitiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// Integer reading of the value: floats truncate, text must be a whole integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Float(v) if v.is_finite() => Some(*v as i64),
            Value::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// True for the values that mark a row as not yet stored: absent, zero or empty.
    pub fn is_empty_key(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Number(v) => *v == 0,
            Value::Float(v) => *v == 0.0,
            Value::Text(v) => v.is_empty() || v == "0",
            _ => false,
        }
    }

    /// The value as an identity map key, only strictly positive integers qualify.
    pub fn as_positive_key(&self) -> Option<i64> {
        match self {
            Value::Number(v) if *v > 0 => Some(*v),
            Value::Text(v) => v.trim().parse().ok().filter(|v| *v > 0),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Number(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Date(v) => f.write_str(&print_date(v)),
            Value::Time(v) => f.write_str(&print_time(v)),
            Value::DateTime(v) => {
                f.write_str(&print_date(&v.date()))?;
                f.write_char(' ')?;
                f.write_str(&print_time(&v.time()))
            }
        }
    }
}

fn print_date(value: &Date) -> String {
    value
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

fn print_time(value: &Time) -> String {
    let mut out = value
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default();
    if value.microsecond() != 0 {
        let _ = write!(out, ".{:06}", value.microsecond());
    }
    out
}

macro_rules! impl_from_number {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::Number(value as i64)
                }
            }
        )+
    };
}
impl_from_number!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Value::Number)
            .unwrap_or_else(|_| Value::Text(value.to_string()))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Number(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Value::Date(value)
    }
}

impl From<Time> for Value {
    fn from(value: Time) -> Self {
        Value::Time(value)
    }
}

impl From<PrimitiveDateTime> for Value {
    fn from(value: PrimitiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Typed read access to a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T>(value: &Value, target: &str) -> Result<T> {
    Err(Error::msg(format!("Cannot convert {value:?} into {target}")))
}

macro_rules! impl_from_value_integer {
    ($($target:ty),+ $(,)?) => {
        $(
            impl FromValue for $target {
                fn from_value(value: &Value) -> Result<Self> {
                    let Some(v) = value.as_i64() else {
                        return mismatch(value, stringify!($target));
                    };
                    <$target>::try_from(v).map_err(|_| {
                        Error::msg(format!(
                            "Value {v}: i64 is out of range for {}",
                            stringify!($target)
                        ))
                    })
                }
            }
        )+
    };
}
impl_from_value_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_i64() {
            Some(v) => Ok(v != 0),
            None => mismatch(value, "bool"),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().map_or_else(|| mismatch(value, "f64"), Ok)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return mismatch(value, "String");
        }
        Ok(value.to_string())
    }
}

impl FromValue for Date {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Date(v) => Ok(*v),
            Value::DateTime(v) => Ok(v.date()),
            Value::Text(v) => <Date as Parse>::parse(v),
            _ => mismatch(value, "time::Date"),
        }
    }
}

impl FromValue for Time {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Time(v) => Ok(*v),
            Value::DateTime(v) => Ok(v.time()),
            Value::Text(v) => <Time as Parse>::parse(v),
            _ => mismatch(value, "time::Time"),
        }
    }
}

impl FromValue for PrimitiveDateTime {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::DateTime(v) => Ok(*v),
            Value::Date(v) => Ok(v.midnight()),
            Value::Text(v) => <PrimitiveDateTime as Parse>::parse(v),
            _ => mismatch(value, "time::PrimitiveDateTime"),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
