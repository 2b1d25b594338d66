use crate::{Record, Result};

/// A typed view over a [`Record`].
///
/// Entities are what the [`crate::IdentityMap`] hands out: each one owns the record it
/// was built from, saving or deleting goes through that record.
pub trait Entity: Send + Sized + 'static {
    fn from_record(record: Record) -> Result<Self>;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// Column identifying the entity, the record's first primary key when `None`.
    fn key_name() -> Option<&'static str> {
        None
    }

    /// Current identity, `None` while the entity is not stored yet.
    fn key(&self) -> Option<i64> {
        let record = self.record();
        let name = Self::key_name().or_else(|| record.primary_key_name())?;
        record.get(name)?.as_positive_key()
    }
}

impl Entity for Record {
    fn from_record(record: Record) -> Result<Self> {
        Ok(record)
    }
    fn record(&self) -> &Record {
        self
    }
    fn record_mut(&mut self) -> &mut Record {
        self
    }
}

/// Declares a struct wrapping a [`Record`] with one typed getter per column.
///
/// ```
/// use quarry_core::entity;
///
/// entity! {
///     pub struct User {
///         id: i64,
///         name: String,
///         email: Option<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field:ident: $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            record: $crate::Record,
        }

        impl $name {
            $(
                pub fn $field(&self) -> $crate::Result<$ty> {
                    self.record.get_as::<$ty>(stringify!($field))
                }
            )*
        }

        impl $crate::Entity for $name {
            fn from_record(record: $crate::Record) -> $crate::Result<Self> {
                Ok(Self { record })
            }
            fn record(&self) -> &$crate::Record {
                &self.record
            }
            fn record_mut(&mut self) -> &mut $crate::Record {
                &mut self.record
            }
        }
    };
}
