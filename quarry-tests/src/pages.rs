use quarry_core::{Connection, Executor, Pagination, Value};
use std::sync::LazyLock;
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn pages<E: Executor>(connection: &Connection<E>) {
    let _lock = MUTEX.lock().await;
    let prefix = connection.table_prefix().to_owned();

    // Setup
    connection
        .exec(&format!("DROP TABLE IF EXISTS {prefix}quarry_pages"), &[])
        .await
        .expect("Failed to drop quarry_pages");
    connection
        .exec(
            &format!(
                "CREATE TABLE {prefix}quarry_pages (
                    id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    position INT NOT NULL
                )"
            ),
            &[],
        )
        .await
        .expect("Failed to create quarry_pages");
    for position in 0..25 {
        let id = connection
            .exec(
                "INSERT INTO quarry_pages (position) VALUES (?)",
                &[Value::from(position)],
            )
            .await
            .expect("Failed to insert a page");
        assert!(id > 0);
    }

    // Window
    let result = connection
        .query(
            "SELECT * FROM quarry_pages ORDER BY position LIMIT 20, 10",
            &[],
        )
        .await
        .expect("Failed to query the pages");
    assert_eq!(result.len(), 5);
    assert_eq!(
        result.pagination(),
        Pagination {
            start: 20,
            end: 29,
            range: Some(10),
            page: 2,
        }
    );
    assert_eq!(result.records()[0].get("position"), Some(&Value::Number(20)));
    let total = result
        .total(connection, true)
        .await
        .expect("Failed to count the pages");
    assert_eq!(total, Some(25));

    // Without LIMIT the records are the total
    let result = connection
        .query("SELECT * FROM quarry_pages WHERE position < ?", &[3.into()])
        .await
        .expect("Failed to query the first pages");
    assert_eq!(result.len(), 3);
    assert_eq!(result.pagination().end, 2);
    assert_eq!(
        result
            .total(connection, false)
            .await
            .expect("Failed to compute the total"),
        Some(3)
    );
}
