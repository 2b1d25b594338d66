use crate::{Connection, Entity, Executor, Record, Result, Target, Value};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::{self, Debug},
    sync::Arc,
};
use tokio::sync::Mutex;

/// Instance handed out by the [`IdentityMap`], every holder sees the same pending changes.
pub type Shared<T> = Arc<Mutex<T>>;

/// At most one live instance per entity type, table and positive key.
///
/// Belongs to one unit of work (a request, a job). Records without a positive key are
/// never cached, each call gets a fresh instance for them. The table is the first one of
/// the record, so bare [`Record`]s read from different tables never share an entry.
#[derive(Default)]
pub struct IdentityMap {
    entries: HashMap<(TypeId, String), HashMap<i64, Box<dyn Any + Send>>>,
}

fn scope<T: 'static>(table: &str) -> (TypeId, String) {
    (TypeId::of::<T>(), table.to_owned())
}

fn first_table(record: &Record) -> &str {
    record.tables().first().map_or("", |v| v.name())
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached instance for the record's key, or a new one built from `record`.
    pub fn get<T: Entity>(&mut self, record: Record) -> Result<Shared<T>> {
        let key = T::key_name().or_else(|| record.primary_key_name()).map(str::to_owned);
        self.lookup(record, key.as_deref())
    }

    /// Like [`IdentityMap::get`] with an explicit key column.
    pub fn get_with_key<T: Entity>(&mut self, record: Record, key_name: &str) -> Result<Shared<T>> {
        self.lookup(record, Some(key_name))
    }

    fn lookup<T: Entity>(&mut self, record: Record, key_name: Option<&str>) -> Result<Shared<T>> {
        let key = key_name
            .and_then(|name| record.get(name))
            .and_then(Value::as_positive_key);
        let Some(key) = key else {
            return Ok(Arc::new(Mutex::new(T::from_record(record)?)));
        };
        let table = first_table(&record).to_owned();
        if let Some(found) = self.find::<T>(&table, key) {
            return Ok(found);
        }
        let instance = Arc::new(Mutex::new(T::from_record(record)?));
        self.update(&table, key, instance.clone());
        Ok(instance)
    }

    pub fn find<T: Entity>(&self, table: &str, key: i64) -> Option<Shared<T>> {
        self.entries
            .get(&scope::<T>(table))?
            .get(&key)?
            .downcast_ref::<Shared<T>>()
            .cloned()
    }

    pub fn contains<T: Entity>(&self, table: &str, key: i64) -> bool {
        self.entries
            .get(&scope::<T>(table))
            .is_some_and(|v| v.contains_key(&key))
    }

    /// Overwrites the entry for `key` in `table`.
    pub fn update<T: Entity>(&mut self, table: &str, key: i64, instance: Shared<T>) {
        self.entries
            .entry(scope::<T>(table))
            .or_default()
            .insert(key, Box::new(instance));
    }

    pub fn evict<T: Entity>(&mut self, table: &str, key: i64) -> Option<Shared<T>> {
        let scope = scope::<T>(table);
        let entries = self.entries.get_mut(&scope)?;
        let removed = entries.remove(&key)?;
        if entries.is_empty() {
            self.entries.remove(&scope);
        }
        removed.downcast::<Shared<T>>().ok().map(|v| *v)
    }

    /// Number of cached instances across all types.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Saves the instance's record, an inserted row starts being tracked under its new key.
    pub async fn save<T: Entity, E: Executor>(
        &mut self,
        connection: &Connection<E>,
        instance: &Shared<T>,
        target: Target,
    ) -> Result<Option<Value>> {
        let mut entity = instance.lock().await;
        let result = entity.record_mut().save(connection, target).await?;
        if let Some(key) = entity.key() {
            let table = first_table(entity.record()).to_owned();
            self.update(&table, key, instance.clone());
        }
        Ok(result)
    }

    /// Deletes the instance's record. Once the row of its first table is gone, or its key
    /// was lost, it stops being tracked.
    pub async fn delete<T: Entity, E: Executor>(
        &mut self,
        connection: &Connection<E>,
        instance: &Shared<T>,
        target: Target,
    ) -> Result<bool> {
        let mut entity = instance.lock().await;
        let previous = entity.key();
        let stored = !entity.record().is_new_record();
        let result = entity.record_mut().delete(connection, target).await?;
        let removed = stored && entity.record().is_new_record();
        if let Some(key) = previous {
            if removed || entity.key().is_none() {
                let table = first_table(entity.record()).to_owned();
                self.evict::<T>(&table, key);
            }
        }
        Ok(result)
    }
}

impl Debug for IdentityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMap")
            .field("types", &self.entries.len())
            .field("instances", &self.len())
            .finish()
    }
}
