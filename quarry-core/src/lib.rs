mod config;
mod connection;
mod driver;
mod entity;
mod error;
mod executor;
mod field;
mod identity_map;
mod parse;
mod query;
mod record;
mod result_set;
pub mod sql;
mod table;
mod util;
mod value;

pub use ::anyhow::Context;
pub use config::*;
pub use connection::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use executor::*;
pub use field::*;
pub use identity_map::*;
pub use parse::*;
pub use query::*;
pub use record::*;
pub use result_set::*;
pub use table::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
