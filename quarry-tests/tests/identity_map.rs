#[cfg(test)]
mod tests {
    use quarry_core::{
        Connection, Entity, IdentityMap, Query, Record, ServerConfig, Shared, Target, Value,
        entity,
    };
    use quarry_tests::{MockExecutor, sample_schema};
    use std::sync::Arc;

    entity! {
        struct User {
            id: i64,
            name: String,
            email: Option<String>,
        }
    }

    entity! {
        struct Author {
            id: i64,
            name: String,
        }
    }

    /// Keyed by its foreign key, one profile per user.
    #[derive(Debug)]
    struct Profile {
        record: Record,
    }

    impl Entity for Profile {
        fn from_record(record: Record) -> quarry_core::Result<Self> {
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

    const USERS: &str = "SELECT * FROM users ORDER BY id";
    const ALICE: &str = "SELECT * FROM users WHERE id = 1";
    const FIRST_PROFILE: &str = "SELECT * FROM profiles WHERE profile_id = 1";

    fn setup() -> (MockExecutor, Connection<MockExecutor>) {
        let labels = ["id", "name", "email"];
        let executor = sample_schema("")
            .rows(
                USERS,
                &labels,
                vec![
                    vec![Value::Number(1), Value::from("alice"), Value::Null],
                    vec![Value::Number(2), Value::from("bob"), Value::Null],
                ],
            )
            .rows(
                ALICE,
                &labels,
                vec![vec![Value::Number(1), Value::from("alice"), Value::Null]],
            )
            .rows(
                "SELECT * FROM profiles",
                &["profile_id", "user_id", "bio"],
                vec![vec![Value::Number(10), Value::Number(2), Value::from("hi")]],
            )
            .rows(
                FIRST_PROFILE,
                &["profile_id", "user_id", "bio"],
                vec![vec![Value::Number(1), Value::Number(1), Value::from("first")]],
            );
        (
            executor.clone(),
            Connection::new(executor, ServerConfig::default()),
        )
    }

    async fn users(
        connection: &Connection<MockExecutor>,
        map: &mut IdentityMap,
    ) -> Vec<Shared<User>> {
        connection
            .query(USERS, &[])
            .await
            .expect("Failed to query the users")
            .cast_as::<User>(map)
            .expect("Failed to build the users")
    }

    #[tokio::test]
    async fn one_instance_per_key() {
        let (_, connection) = setup();
        let mut map = IdentityMap::new();
        let all = users(&connection, &mut map).await;
        assert_eq!(all.len(), 2);
        assert_eq!(map.len(), 2);

        let alice = connection
            .query(ALICE, &[])
            .await
            .expect("Failed to query alice")
            .cast_as::<User>(&mut map)
            .expect("Failed to build alice")
            .remove(0);
        assert!(Arc::ptr_eq(&alice, &all[0]));
        assert_eq!(map.len(), 2);

        // Pending changes are visible to every holder
        all[0]
            .lock()
            .await
            .record_mut()
            .set("name", "alicia")
            .expect("Failed to set name");
        let user = alice.lock().await;
        assert_eq!(user.name().unwrap(), "alicia");
        assert_eq!(user.email().unwrap(), None);
        assert!(user.record().is_dirty());
        assert_eq!(user.key(), Some(1));
    }

    #[tokio::test]
    async fn types_are_separate() {
        let (_, connection) = setup();
        let mut map = IdentityMap::new();
        let user = users(&connection, &mut map).await.remove(0);
        let author = connection
            .query(ALICE, &[])
            .await
            .expect("Failed to query alice")
            .cast_as::<Author>(&mut map)
            .expect("Failed to build alice")
            .remove(0);
        assert_eq!(map.len(), 3);
        assert!(map.contains::<User>("users", 1));
        assert!(map.contains::<Author>("users", 1));
        assert!(!map.contains::<Author>("users", 2));
        assert_eq!(author.lock().await.name().unwrap(), "alice");
        assert!(Arc::ptr_eq(
            &map.find::<User>("users", 1).expect("Missing user"),
            &user
        ));
        assert!(map.find::<Record>("users", 1).is_none());
    }

    #[tokio::test]
    async fn custom_key() {
        let (_, connection) = setup();
        let mut map = IdentityMap::new();
        let profile = connection
            .query("SELECT * FROM profiles", &[])
            .await
            .expect("Failed to query the profiles")
            .cast_as::<Profile>(&mut map)
            .expect("Failed to build the profiles")
            .remove(0);
        assert!(map.contains::<Profile>("profiles", 2));
        assert!(!map.contains::<Profile>("profiles", 10));
        assert_eq!(profile.lock().await.key(), Some(2));

        // Records by their own primary key
        let record = connection
            .query("SELECT * FROM profiles", &[])
            .await
            .expect("Failed to query the profiles")
            .into_records()
            .remove(0);
        let by_id = map
            .get_with_key::<Record>(record.clone(), "profile_id")
            .expect("Failed to get the record");
        assert!(map.contains::<Record>("profiles", 10));
        let again = map.get::<Record>(record).expect("Failed to get the record");
        assert!(Arc::ptr_eq(&by_id, &again));
    }

    #[tokio::test]
    async fn records_of_different_tables() {
        let (_, connection) = setup();
        let mut map = IdentityMap::new();
        let user = connection
            .query(ALICE, &[])
            .await
            .expect("Failed to query alice")
            .cast_as::<Record>(&mut map)
            .expect("Failed to build alice")
            .remove(0);
        let profile = connection
            .query(FIRST_PROFILE, &[])
            .await
            .expect("Failed to query the profile")
            .cast_as::<Record>(&mut map)
            .expect("Failed to build the profile")
            .remove(0);
        assert!(!Arc::ptr_eq(&user, &profile));
        assert_eq!(map.len(), 2);
        assert!(map.contains::<Record>("users", 1));
        assert!(map.contains::<Record>("profiles", 1));
        let profile = profile.lock().await;
        assert_eq!(profile.tables()[0].name(), "profiles");
        assert_eq!(profile.get("bio"), Some(&Value::from("first")));
    }

    #[tokio::test]
    async fn new_records_are_not_cached() {
        let (executor, connection) = setup();
        let executor = executor.last_id(6);
        let mut map = IdentityMap::new();
        let record = connection
            .record(&["users"])
            .await
            .expect("Failed to create a record");
        let first = map.get::<User>(record.clone()).expect("Failed to build");
        let second = map.get::<User>(record).expect("Failed to build");
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(map.is_empty());
        assert_eq!(first.lock().await.key(), None);

        first
            .lock()
            .await
            .record_mut()
            .set("name", "carol")
            .expect("Failed to set name");
        let key = map
            .save(&connection, &first, Target::AllReferenced)
            .await
            .expect("Failed to save");
        assert_eq!(key, Some(Value::Number(7)));
        assert_eq!(executor.writes_and_reads().len(), 1);
        let found = map.find::<User>("users", 7).expect("The new user must be tracked");
        assert!(Arc::ptr_eq(&found, &first));
        assert_eq!(first.lock().await.id().unwrap(), 7);
    }

    #[tokio::test]
    async fn delete_evicts() {
        let (_, connection) = setup();
        let mut map = IdentityMap::new();
        let all = users(&connection, &mut map).await;
        let deleted = map
            .delete(&connection, &all[1], Target::First)
            .await
            .expect("Failed to delete");
        assert!(deleted);
        assert!(!map.contains::<User>("users", 2));
        assert!(map.contains::<User>("users", 1));
        assert_eq!(all[1].lock().await.record().get("id"), Some(&Value::Null));

        // Loading again gives a fresh instance
        let reloaded = users(&connection, &mut map).await;
        assert!(Arc::ptr_eq(&reloaded[0], &all[0]));
        assert!(!Arc::ptr_eq(&reloaded[1], &all[1]));
    }

    #[tokio::test]
    async fn delete_evicts_custom_key() {
        let (executor, connection) = setup();
        let mut map = IdentityMap::new();
        let profile = connection
            .query("SELECT * FROM profiles", &[])
            .await
            .expect("Failed to query the profiles")
            .cast_as::<Profile>(&mut map)
            .expect("Failed to build the profiles")
            .remove(0);
        assert!(map.contains::<Profile>("profiles", 2));
        executor.clear_statements();
        let deleted = map
            .delete(&connection, &profile, Target::First)
            .await
            .expect("Failed to delete");
        assert!(deleted);
        assert_eq!(
            executor.statements(),
            [Query::new(
                "DELETE FROM `profiles` WHERE `profile_id` = ?",
                vec![Value::Number(10)],
            )]
        );
        // The identity column is not the primary key, it survives the delete
        assert_eq!(profile.lock().await.key(), Some(2));
        assert!(!map.contains::<Profile>("profiles", 2));
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn manual_maintenance() {
        let (_, connection) = setup();
        let mut map = IdentityMap::new();
        let all = users(&connection, &mut map).await;
        let evicted = map.evict::<User>("users", 1).expect("Missing user");
        assert!(Arc::ptr_eq(&evicted, &all[0]));
        assert!(map.evict::<User>("users", 1).is_none());
        assert_eq!(map.len(), 1);

        map.update("users", 1, all[1].clone());
        assert!(Arc::ptr_eq(
            &map.find::<User>("users", 1).expect("Missing user"),
            &all[1]
        ));
        map.clear();
        assert!(map.is_empty());
        assert!(map.find::<User>("users", 2).is_none());
    }
}
