#[cfg(test)]
mod tests {
    use quarry_core::{ColumnType, FieldDescriptor, SemanticType, Value};
    use time::macros::{date, datetime, time};

    fn text(v: &str) -> Value {
        Value::Text(v.into())
    }

    #[test]
    fn column_type() {
        assert_eq!(
            ColumnType::parse("int(10) unsigned"),
            ColumnType {
                base: "int".into(),
                length: Some(10),
                decimals: None,
                unsigned: true,
            }
        );
        assert_eq!(
            ColumnType::parse("DECIMAL(10,2)"),
            ColumnType {
                base: "decimal".into(),
                length: Some(10),
                decimals: Some(2),
                unsigned: false,
            }
        );
        let enumeration = ColumnType::parse("enum('a','b')");
        assert_eq!(enumeration.base, "enum");
        assert_eq!(enumeration.length, None);
        assert_eq!(ColumnType::parse("datetime").length, None);
    }

    #[test]
    fn semantic_type() {
        for (sql, semantic) in [
            ("tinyint", SemanticType::Number),
            ("bigint", SemanticType::Number),
            ("bit", SemanticType::Number),
            ("year", SemanticType::Number),
            ("float", SemanticType::Float),
            ("double", SemanticType::Float),
            ("decimal", SemanticType::Float),
            ("date", SemanticType::Date),
            ("time", SemanticType::Time),
            ("datetime", SemanticType::DateTime),
            ("timestamp", SemanticType::DateTime),
            ("varchar", SemanticType::Text),
            ("enum", SemanticType::Text),
            ("blob", SemanticType::Text),
        ] {
            assert_eq!(SemanticType::from_sql_type(sql), semantic, "{sql}");
        }
        assert!(SemanticType::Time.is_temporal());
        assert!(!SemanticType::Float.is_temporal());
    }

    #[test]
    fn descriptor() {
        let field = FieldDescriptor::new("price", "decimal(8,3) unsigned");
        assert_eq!(field.name, "price");
        assert_eq!(field.sql_type, "decimal");
        assert_eq!(field.semantic, SemanticType::Float);
        assert_eq!(field.decimals, Some(3));
        assert!(field.unsigned);
        assert!(!field.is_primary);
        let key = FieldDescriptor::new("id", "int").primary().auto_increment();
        assert!(key.is_primary && key.is_key && key.auto_increment);
        let nullable = FieldDescriptor::new("n", "int").nullable(Some(Value::Number(4)));
        assert!(nullable.nullable);
        assert_eq!(nullable.default, Some(Value::Number(4)));
    }

    #[test]
    fn format_null() {
        for sql in ["int", "double", "date", "time", "datetime", "varchar(4)"] {
            let field = FieldDescriptor::new("f", sql);
            assert_eq!(field.format(Value::Null), Value::Null, "{sql}");
        }
    }

    #[test]
    fn format_number() {
        let field = FieldDescriptor::new("n", "int(11)");
        assert_eq!(field.format(Value::Number(5)), Value::Number(5));
        assert_eq!(field.format(Value::Float(3.9)), Value::Number(3));
        assert_eq!(field.format(text("12abc")), Value::Number(12));
        assert_eq!(field.format(text(" -7")), Value::Number(-7));
        assert_eq!(field.format(text("abc")), Value::Number(0));
        assert_eq!(
            field.format(Value::Date(date!(1970 - 01 - 02))),
            Value::Number(86_400)
        );
        assert_eq!(
            field.format(Value::Time(time!(01:00:01))),
            Value::Number(3_601)
        );
    }

    #[test]
    fn format_large_integers() {
        let field = FieldDescriptor::new("n", "bigint(20) unsigned");
        assert_eq!(
            field.format(text("9223372036854775807")),
            Value::Number(i64::MAX)
        );
        assert_eq!(
            field.format(text("18446744073709551615")),
            text("18446744073709551615")
        );
        assert_eq!(
            field.format(text(" 18446744073709551615 ")),
            text("18446744073709551615")
        );
        // Trailing garbage saturates instead of reading as zero
        assert_eq!(
            field.format(text("18446744073709551615kg")),
            Value::Number(i64::MAX)
        );
        assert_eq!(
            field.format(text("-99999999999999999999 items")),
            Value::Number(i64::MIN)
        );
    }

    #[test]
    fn format_float() {
        let decimal = FieldDescriptor::new("f", "decimal(10,2)");
        assert_eq!(decimal.format(text("3.14159")), Value::Float(3.14));
        assert_eq!(decimal.format(Value::Float(2.5)), Value::Float(2.5));
        assert_eq!(decimal.format(Value::Number(7)), Value::Float(7.0));
        let double = FieldDescriptor::new("f", "double");
        assert_eq!(double.format(text("3.14159")), Value::Float(3.14159));
        assert_eq!(double.format(text("1.5kg")), Value::Float(1.5));
        assert_eq!(double.format(text("abc")), Value::Float(0.0));
    }

    #[test]
    fn format_date() {
        let field = FieldDescriptor::new("d", "date");
        assert_eq!(
            field.format(text("2024-03-05")),
            Value::Date(date!(2024 - 03 - 05))
        );
        assert_eq!(
            field.format(text("2024-03-05 10:20:30")),
            Value::Date(date!(2024 - 03 - 05))
        );
        assert_eq!(
            field.format(Value::DateTime(datetime!(2024-03-05 10:20))),
            Value::Date(date!(2024 - 03 - 05))
        );
        assert_eq!(
            field.format(Value::Number(86_400)),
            Value::Date(date!(1970 - 01 - 02))
        );
        assert_eq!(field.format(text("0000-00-00")), Value::Null);
        assert_eq!(field.format(text("")), Value::Null);
        assert_eq!(field.format(Value::Number(0)), Value::Null);
        assert_eq!(field.format(text("someday")), text("someday"));
    }

    #[test]
    fn format_time() {
        let field = FieldDescriptor::new("t", "time");
        assert_eq!(field.format(text("08:15:00")), Value::Time(time!(08:15)));
        assert_eq!(field.format(text("00:00:00")), Value::Time(time!(00:00)));
        assert_eq!(field.format(Value::Number(3_600)), Value::Time(time!(01:00)));
        assert_eq!(
            field.format(Value::DateTime(datetime!(2024-03-05 10:20:30))),
            Value::Time(time!(10:20:30))
        );
    }

    #[test]
    fn format_datetime() {
        let field = FieldDescriptor::new("dt", "timestamp");
        assert_eq!(
            field.format(text("2024-03-05 10:20:30")),
            Value::DateTime(datetime!(2024-03-05 10:20:30))
        );
        assert_eq!(
            field.format(text("2024-03-05")),
            Value::DateTime(datetime!(2024-03-05 0:00))
        );
        assert_eq!(
            field.format(Value::Date(date!(2024 - 03 - 05))),
            Value::DateTime(datetime!(2024-03-05 0:00))
        );
        assert_eq!(
            field.format(Value::Number(1_700_000_000)),
            Value::DateTime(datetime!(2023-11-14 22:13:20))
        );
        assert_eq!(field.format(text("0000-00-00 00:00:00")), Value::Null);
    }

    #[test]
    fn format_text() {
        let field = FieldDescriptor::new("s", "varchar(5)");
        assert_eq!(field.format(text("abcdefg")), text("abcde"));
        assert_eq!(field.format(text("héllo wörld")), text("héllo"));
        assert_eq!(field.format(Value::Number(12)), text("12"));
        assert_eq!(field.format(Value::Float(1.5)), text("1.5"));
        let unbounded = FieldDescriptor::new("s", "text");
        assert_eq!(
            unbounded.format(text("a long enough sentence")),
            text("a long enough sentence")
        );
    }
}
