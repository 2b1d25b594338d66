//! Schema-aware records on top of plain SQL.
//!
//! Queries are written by hand. What comes back is a [`ResultSet`] of [`Record`]s that know
//! the tables they were read from: values are coerced to the column types, changes are
//! tracked, and [`Record::save`] or [`Record::delete`] send back the matching statements.
//!
//! ```rust,ignore
//! let connection = Connection::connect(&MySQLDriver, ServerConfig::from_url(url)?).await?;
//! let mut users = connection
//!     .query("SELECT * FROM users WHERE id = ?", &[Value::from(1)])
//!     .await?
//!     .into_records();
//! users[0].set("name", "alice")?;
//! users[0].save(&connection, Target::First).await?;
//! ```
pub use quarry_core::*;
