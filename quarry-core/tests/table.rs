#[cfg(test)]
mod tests {
    use quarry_core::{FieldDescriptor, RowLabeled, RowNames, SemanticType, TableMetadata, Value};

    fn describe(rows: &[[Option<&str>; 6]]) -> Vec<RowLabeled> {
        let labels: RowNames = ["Field", "Type", "Null", "Key", "Default", "Extra"]
            .into_iter()
            .map(String::from)
            .collect();
        rows.iter()
            .map(|row| {
                RowLabeled::new(
                    labels.clone(),
                    row.iter().map(|v| Value::from(*v)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn from_describe() {
        let rows = describe(&[
            [
                Some("id"),
                Some("int(10) unsigned"),
                Some("NO"),
                Some("PRI"),
                None,
                Some("auto_increment"),
            ],
            [
                Some("email"),
                Some("varchar(120)"),
                Some("NO"),
                Some("UNI"),
                None,
                Some(""),
            ],
            [
                Some("score"),
                Some("decimal(5,2)"),
                Some("YES"),
                Some(""),
                Some("1.50"),
                Some(""),
            ],
            [
                Some("visits"),
                Some("int"),
                Some("YES"),
                Some(""),
                Some("0"),
                Some(""),
            ],
            [
                Some("nickname"),
                Some("varchar(20)"),
                Some("YES"),
                Some(""),
                Some("'anon'"),
                Some(""),
            ],
            [
                Some("created"),
                Some("timestamp"),
                Some("YES"),
                Some(""),
                Some("current_timestamp()"),
                Some("DEFAULT_GENERATED"),
            ],
            [
                Some("bio"),
                Some("text"),
                Some("YES"),
                Some(""),
                Some("NULL"),
                Some(""),
            ],
        ]);
        let table = TableMetadata::from_describe("users", &rows).expect("Valid DESCRIBE rows");
        assert_eq!(table.name(), "users");
        assert_eq!(
            table
                .fields()
                .iter()
                .map(|v| v.name.as_str())
                .collect::<Vec<_>>(),
            ["id", "email", "score", "visits", "nickname", "created", "bio"]
        );
        assert_eq!(table.primary_key_name(), Some("id"));

        let id = table.field("id").expect("id");
        assert!(id.is_primary && id.is_key && id.auto_increment && id.unsigned);
        assert!(!id.nullable);
        assert_eq!(id.semantic, SemanticType::Number);

        let email = table.field("email").expect("email");
        assert!(email.is_key && !email.is_primary);
        assert_eq!(email.length, Some(120));
        assert_eq!(email.default, None);

        assert_eq!(table.field("score").expect("score").default, Some(Value::Float(1.5)));
        assert_eq!(table.field("visits").expect("visits").default, Some(Value::Number(0)));
        assert_eq!(
            table.field("nickname").expect("nickname").default,
            Some(Value::Text("anon".into()))
        );
        assert_eq!(table.field("created").expect("created").default, None);
        assert_eq!(table.field("bio").expect("bio").default, None);
        assert!(table.has_field("bio"));
        assert!(!table.has_field("missing"));
    }

    #[test]
    fn single_primary_key() {
        let table = TableMetadata::new(
            "pairs",
            [
                FieldDescriptor::new("left_id", "int").primary(),
                FieldDescriptor::new("right_id", "int").primary(),
            ],
        );
        assert_eq!(table.primary_key_name(), Some("left_id"));
        assert_eq!(
            table.fields().iter().filter(|v| v.is_primary).count(),
            1
        );
        assert!(table.field("right_id").expect("right_id").is_key);

        let keyless = TableMetadata::new("log", [FieldDescriptor::new("line", "text")]);
        assert_eq!(keyless.primary_key(), None);
    }

    #[test]
    fn from_describe_errors() {
        let rows = describe(&[[None, Some("int"), Some("NO"), Some(""), None, Some("")]]);
        assert!(TableMetadata::from_describe("broken", &rows).is_err());
    }
}
