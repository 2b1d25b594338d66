use quarry_core::{Connection, Executor, Target, Value};
use std::sync::LazyLock;
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Records spanning a join of two tables.
pub async fn library<E: Executor>(connection: &Connection<E>) {
    let _lock = MUTEX.lock().await;
    let prefix = connection.table_prefix().to_owned();

    // Setup
    for statement in [
        format!("DROP TABLE IF EXISTS {prefix}quarry_books"),
        format!("DROP TABLE IF EXISTS {prefix}quarry_authors"),
        format!(
            "CREATE TABLE {prefix}quarry_authors (
                author_id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                author VARCHAR(64) NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE {prefix}quarry_books (
                book_id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                writer_id INT NOT NULL,
                title VARCHAR(128) NOT NULL,
                published DATETIME NULL
            )"
        ),
    ] {
        connection
            .exec(&statement, &[])
            .await
            .unwrap_or_else(|e| panic!("Failed to run `{statement}`: {e:#}"));
    }
    connection
        .refresh("quarry_authors")
        .await
        .expect("Failed to introspect quarry_authors");
    connection
        .refresh("quarry_books")
        .await
        .expect("Failed to introspect quarry_books");

    // One record, two inserts
    let mut record = connection
        .record(&["quarry_authors", "quarry_books"])
        .await
        .expect("Failed to create a record");
    record
        .set_many([
            ("author", Value::from("Ursula K. Le Guin")),
            ("writer_id", Value::from(0)),
            ("title", Value::from("The Dispossessed")),
            ("published", Value::from("1974-05-01 00:00:00")),
        ])
        .expect("Failed to fill the record");
    let author_id = record
        .save(connection, Target::AllReferenced)
        .await
        .expect("Failed to insert author and book")
        .expect("The author has no key");
    assert!(!record.is_new_for_table("quarry_authors").expect("Known table"));
    assert!(!record.is_new_for_table("quarry_books").expect("Known table"));
    let book_id = record.get("book_id").cloned().expect("The book has no key");
    let affected = connection
        .exec(
            "UPDATE quarry_books SET writer_id = ? WHERE book_id = ?",
            &[author_id.clone(), book_id.clone()],
        )
        .await
        .expect("Failed to link the book");
    assert_eq!(affected, 1);

    // Only the second table changes
    let result = connection
        .query(
            "SELECT * FROM quarry_authors JOIN quarry_books ON writer_id = author_id",
            &[],
        )
        .await
        .expect("Failed to query the join");
    assert_eq!(
        result
            .tables_used()
            .iter()
            .map(|v| v.name())
            .collect::<Vec<_>>(),
        ["quarry_authors", "quarry_books"]
    );
    let mut joined = result.into_records().remove(0);
    joined
        .set("title", "The Left Hand of Darkness")
        .expect("Failed to set the title");
    let key = joined
        .save(connection, Target::AllReferenced)
        .await
        .expect("Failed to save the join");
    assert_eq!(key, Some(author_id.clone()));
    let title = connection
        .value("SELECT title FROM quarry_books WHERE book_id = ?", &[book_id])
        .await
        .expect("Failed to read the title");
    assert_eq!(title, Some(Value::from("The Left Hand of Darkness")));

    // Delete scoped to one table
    let deleted = joined
        .delete(connection, Target::from("quarry_books"))
        .await
        .expect("Failed to delete the book");
    assert!(deleted);
    assert_eq!(joined.get("book_id"), Some(&Value::Null));
    assert_eq!(joined.get("author_id"), Some(&author_id));
    let authors = connection
        .value("SELECT COUNT(*) FROM quarry_authors", &[])
        .await
        .expect("Failed to count the authors");
    assert_eq!(authors, Some(Value::Number(1)));
}
