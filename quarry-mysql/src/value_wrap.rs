use mysql_async::consts::ColumnType;
use quarry_core::{Error, Parse, Value};
use time::{Date, Month, PrimitiveDateTime, Time};

type MySQLValue = mysql_async::Value;

pub(crate) struct ValueWrap(pub(crate) Value);

impl From<Value> for ValueWrap {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
impl From<ValueWrap> for Value {
    fn from(value: ValueWrap) -> Self {
        value.0
    }
}

impl ValueWrap {
    /// The text protocol delivers every column as bytes, the declared type tells how to read them.
    pub(crate) fn decode(value: MySQLValue, column_type: ColumnType) -> Self {
        Self(match value {
            MySQLValue::NULL => Value::Null,
            MySQLValue::Int(v) => Value::Number(v),
            MySQLValue::UInt(v) => {
                i64::try_from(v).map_or_else(|_| Value::Text(v.to_string()), Value::Number)
            }
            MySQLValue::Float(v) => Value::Float(v as f64),
            MySQLValue::Double(v) => Value::Float(v),
            MySQLValue::Date(year, month, day, hour, minute, second, micro) => {
                if year == 0 && month == 0 && day == 0 {
                    return Self(Value::Null);
                }
                let date = Month::try_from(month)
                    .ok()
                    .and_then(|m| Date::from_calendar_date(year as _, m, day).ok());
                let time = Time::from_hms_micro(hour, minute, second, micro).ok();
                match (date, time) {
                    (Some(date), _) if is_date(column_type) => Value::Date(date),
                    (Some(date), Some(time)) => Value::DateTime(PrimitiveDateTime::new(date, time)),
                    _ => Value::Text(format!(
                        "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                    )),
                }
            }
            MySQLValue::Time(negative, days, hours, minutes, seconds, micro) => {
                match Time::from_hms_micro(hours, minutes, seconds, micro) {
                    Ok(time) if !negative && days == 0 => Value::Time(time),
                    _ => Value::Text(format!(
                        "{}{:02}:{minutes:02}:{seconds:02}",
                        if negative { "-" } else { "" },
                        days * 24 + hours as u32,
                    )),
                }
            }
            MySQLValue::Bytes(v) => {
                decode_text(String::from_utf8_lossy(&v).into_owned(), column_type)
            }
        })
    }
}

fn is_date(column_type: ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE
    )
}

fn decode_text(text: String, column_type: ColumnType) -> Value {
    let parsed = match column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => text.parse().ok().map(Value::Number),
        ColumnType::MYSQL_TYPE_FLOAT
        | ColumnType::MYSQL_TYPE_DOUBLE
        | ColumnType::MYSQL_TYPE_DECIMAL
        | ColumnType::MYSQL_TYPE_NEWDECIMAL => text.parse().ok().map(Value::Float),
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => {
            <Date as Parse>::parse(&text).ok().map(Value::Date)
        }
        ColumnType::MYSQL_TYPE_TIME => <Time as Parse>::parse(&text).ok().map(Value::Time),
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP => {
            <PrimitiveDateTime as Parse>::parse(&text)
                .ok()
                .map(Value::DateTime)
        }
        _ => None,
    };
    parsed.unwrap_or(Value::Text(text))
}

impl TryFrom<ValueWrap> for MySQLValue {
    type Error = Error;

    fn try_from(value: ValueWrap) -> Result<Self, Self::Error> {
        let year = |date: Date| {
            u16::try_from(date.year())
                .map_err(|_| Error::msg(format!("Date {date} is out of range for MySQL")))
        };
        Ok(match value.0 {
            Value::Null => MySQLValue::NULL,
            Value::Number(v) => MySQLValue::Int(v),
            Value::Float(v) => MySQLValue::Double(v),
            Value::Text(v) => MySQLValue::Bytes(v.into_bytes()),
            Value::Date(v) => MySQLValue::Date(year(v)?, v.month().into(), v.day(), 0, 0, 0, 0),
            Value::Time(v) => MySQLValue::Time(
                false,
                0,
                v.hour(),
                v.minute(),
                v.second(),
                v.microsecond(),
            ),
            Value::DateTime(v) => MySQLValue::Date(
                year(v.date())?,
                v.month().into(),
                v.day(),
                v.hour(),
                v.minute(),
                v.second(),
                v.microsecond(),
            ),
        })
    }
}
