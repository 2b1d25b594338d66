use crate::ValueWrap;
use quarry_core::{Row, RowLabeled, RowNames};

pub(crate) struct RowWrap(pub(crate) RowLabeled);

impl mysql_async::prelude::FromRow for RowWrap {
    fn from_row_opt(mut row: mysql_async::Row) -> Result<Self, mysql_async::FromRowError>
    where
        Self: Sized,
    {
        let columns = row.columns();
        let names: RowNames = columns
            .iter()
            .map(|v| v.name_str().into_owned())
            .collect();
        let values: Row = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = row
                    .take::<mysql_async::Value, _>(i)
                    .unwrap_or(mysql_async::Value::NULL);
                ValueWrap::decode(value, column.column_type()).0
            })
            .collect();
        Ok(RowWrap(RowLabeled::new(names, values)))
    }
}
