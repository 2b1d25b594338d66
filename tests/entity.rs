#[cfg(test)]
mod tests {
    use quarry::{Connection, Entity, IdentityMap, Record, ServerConfig, Target, Value, entity};
    use quarry_tests::sample_schema;
    use time::{PrimitiveDateTime, macros::datetime};

    entity! {
        /// A row of `users`.
        pub struct User {
            id: i64,
            name: String,
            email: Option<String>,
            score: i64,
            created: Option<PrimitiveDateTime>,
        }
    }

    struct Membership {
        record: Record,
    }

    impl Entity for Membership {
        fn from_record(record: Record) -> quarry::Result<Self> {
            Ok(Self { record })
        }
        fn record(&self) -> &Record {
            &self.record
        }
        fn record_mut(&mut self) -> &mut Record {
            &mut self.record
        }
        fn key_name() -> Option<&'static str> {
            Some("user_id")
        }
    }

    #[tokio::test]
    async fn getters() {
        let executor = sample_schema("").rows(
            "SELECT * FROM users",
            &["id", "name", "email", "score", "created"],
            vec![vec![
                Value::Number(3),
                Value::from("carol"),
                Value::Null,
                Value::from("17"),
                Value::Number(1_700_000_000),
            ]],
        );
        let connection = Connection::new(executor, ServerConfig::default());
        let mut map = IdentityMap::new();
        let users = connection
            .query("SELECT * FROM users", &[])
            .await
            .expect("Failed to query the users")
            .cast_as::<User>(&mut map)
            .expect("Failed to build the users");
        let user = users[0].lock().await;
        assert_eq!(user.id().unwrap(), 3);
        assert_eq!(user.name().unwrap(), "carol");
        assert_eq!(user.email().unwrap(), None);
        assert_eq!(user.score().unwrap(), 17);
        assert_eq!(user.created().unwrap(), Some(datetime!(2023-11-14 22:13:20)));
        assert_eq!(user.key(), Some(3));
        assert_eq!(User::key_name(), None);
    }

    #[tokio::test]
    async fn custom_key_and_save() {
        let executor = sample_schema("").last_id(99);
        let connection = Connection::new(executor.clone(), ServerConfig::default());
        let record = connection
            .record(&["profiles"])
            .await
            .expect("Failed to create a record");
        let mut membership = Membership::from_record(record).expect("Failed to build");
        assert_eq!(membership.key(), None);
        membership
            .record_mut()
            .set_many([("user_id", Value::from(5)), ("bio", Value::from("x"))])
            .expect("Failed to fill the record");
        assert_eq!(membership.key(), Some(5));
        let key = membership
            .record_mut()
            .save(&connection, Target::First)
            .await
            .expect("Failed to insert");
        assert_eq!(key, Some(Value::Number(100)));
        assert_eq!(executor.writes_and_reads().len(), 1);
    }
}
