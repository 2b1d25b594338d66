mod driver;
mod executor;
mod row_wrap;
mod value_wrap;

pub use driver::*;
pub use executor::*;
pub(crate) use row_wrap::*;
pub(crate) use value_wrap::*;
