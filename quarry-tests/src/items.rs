use quarry_core::{Connection, DataError, Executor, Target, Value};
use std::sync::LazyLock;
use time::macros::date;
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn items<E: Executor>(connection: &Connection<E>) {
    let _lock = MUTEX.lock().await;
    let prefix = connection.table_prefix().to_owned();

    // Setup
    connection
        .exec(&format!("DROP TABLE IF EXISTS {prefix}quarry_items"), &[])
        .await
        .expect("Failed to drop quarry_items");
    connection
        .exec(
            &format!(
                "CREATE TABLE {prefix}quarry_items (
                    id INT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    name VARCHAR(16) NOT NULL,
                    price DECIMAL(10,2) NULL DEFAULT 0,
                    added DATE NULL,
                    notes TEXT NULL
                )"
            ),
            &[],
        )
        .await
        .expect("Failed to create quarry_items");
    let table = connection
        .refresh("quarry_items")
        .await
        .expect("Failed to introspect quarry_items");
    assert_eq!(table.primary_key_name(), Some("id"));
    assert_eq!(table.fields().len(), 5);

    // Insert
    let mut record = connection
        .record(&["quarry_items"])
        .await
        .expect("Failed to create a record");
    assert!(record.is_new_record());
    record
        .set("name", "A rather long item name")
        .expect("Failed to set name");
    record.set("price", "9.999").expect("Failed to set price");
    record.set("added", "2025-03-01").expect("Failed to set added");
    let id = record
        .save(connection, Target::AllReferenced)
        .await
        .expect("Failed to insert the item")
        .and_then(|v| v.as_positive_key())
        .expect("The insert did not produce a key");
    assert!(!record.is_new_record());
    assert!(!record.is_dirty());

    // Reload
    let result = connection
        .query("SELECT * FROM quarry_items WHERE id = ?", &[id.into()])
        .await
        .expect("Failed to load the item");
    assert_eq!(result.len(), 1);
    let mut loaded = result.into_records().remove(0);
    assert_eq!(loaded.get("name"), Some(&Value::Text("A rather long it".into())));
    assert_eq!(loaded.get("price"), Some(&Value::Float(10.0)));
    assert_eq!(loaded.get("added"), Some(&Value::Date(date!(2025 - 03 - 01))));
    assert_eq!(loaded.get("notes"), Some(&Value::Null));

    // Nothing changed, nothing is sent
    let key = loaded
        .save(connection, Target::First)
        .await
        .expect("Failed to save an unchanged item");
    assert_eq!(key, Some(Value::Number(id)));

    // Update
    loaded.set("price", 20).expect("Failed to set price");
    loaded
        .save(connection, Target::First)
        .await
        .expect("Failed to update the item");
    let price = connection
        .value("SELECT price FROM quarry_items WHERE id = ?", &[id.into()])
        .await
        .expect("Failed to read the price");
    assert_eq!(price.and_then(|v| v.as_f64()), Some(20.0));

    // Primary key is read only
    let error = loaded.set("id", 5).expect_err("The primary key must be immutable");
    assert!(matches!(
        DataError::of(&error),
        Some(DataError::ImmutableField { .. })
    ));

    // Delete
    let deleted = loaded
        .delete(connection, Target::First)
        .await
        .expect("Failed to delete the item");
    assert!(deleted);
    assert_eq!(loaded.primary_key(), Some(&Value::Null));
    let count = connection
        .value("SELECT COUNT(*) FROM quarry_items", &[])
        .await
        .expect("Failed to count the items");
    assert_eq!(count, Some(Value::Number(0)));
}
