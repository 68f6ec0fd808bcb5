use super::{Criteria, Entity, Patch, Repository, StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard};

/// Records of one entity kind, keyed by id.
#[derive(Debug, Default)]
pub(crate) struct Table {
    rows: BTreeMap<String, Patch>,
}

impl Table {
    pub(crate) fn from_rows(rows: BTreeMap<String, Patch>) -> Self {
        Self { rows }
    }

    pub(crate) fn rows(&self) -> &BTreeMap<String, Patch> {
        &self.rows
    }

    pub(crate) fn search<T: Entity>(&self, criteria: &Criteria) -> StoreResult<Vec<T>> {
        self.rows
            .values()
            .filter(|row| criteria.matches(row))
            .take(criteria.max_results().unwrap_or(usize::MAX))
            .map(|row| {
                serde_json::from_value(Value::Object(row.clone())).map_err(|source| StoreError::Invalid {
                    entity: T::ENTITY_NAME,
                    source,
                })
            })
            .collect()
    }

    /// Applies every patch or none of them.
    pub(crate) fn write<T: Entity>(&mut self, records: Vec<Patch>, insert: bool) -> StoreResult<()> {
        let staged = self.stage::<T>(records, insert)?;
        self.commit(staged);
        Ok(())
    }

    /// Merges and validates `records` against the stored rows without changing them.
    pub(crate) fn stage<T: Entity>(&self, records: Vec<Patch>, insert: bool) -> StoreResult<BTreeMap<String, Patch>> {
        let mut staged: BTreeMap<String, Patch> = BTreeMap::new();

        for patch in records {
            let id = record_id::<T>(&patch)?;
            let merged = match staged.get(&id).or_else(|| self.rows.get(&id)) {
                Some(existing) => {
                    let mut merged = existing.clone();
                    merged.extend(patch);
                    merged
                }
                None if insert => patch,
                None => {
                    return Err(StoreError::NotFound {
                        entity: T::ENTITY_NAME,
                        id,
                    })
                }
            };

            serde_json::from_value::<T>(Value::Object(merged.clone())).map_err(|source| StoreError::Invalid {
                entity: T::ENTITY_NAME,
                source,
            })?;
            staged.insert(id, merged);
        }

        Ok(staged)
    }

    pub(crate) fn commit(&mut self, staged: BTreeMap<String, Patch>) {
        self.rows.extend(staged);
    }
}

fn record_id<T: Entity>(patch: &Patch) -> StoreResult<String> {
    match patch.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        _ => Err(StoreError::MissingId {
            entity: T::ENTITY_NAME,
        }),
    }
}

pub(crate) fn lock(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct InMemoryRepository<T> {
    table: Mutex<Table>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table::default()),
            _entity: PhantomData,
        }
    }
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn search(&self, criteria: &Criteria) -> StoreResult<Vec<T>> {
        lock(&self.table).search(criteria)
    }

    async fn upsert(&self, records: Vec<Patch>) -> StoreResult<()> {
        lock(&self.table).write::<T>(records, true)
    }

    async fn update(&self, records: Vec<Patch>) -> StoreResult<()> {
        lock(&self.table).write::<T>(records, false)
    }
}
