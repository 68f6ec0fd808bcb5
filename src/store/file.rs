use super::memory::{lock, Table};
use super::{Criteria, Entity, Patch, Repository, StoreResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Repository persisted as `<dir>/<entity>.json`, rewritten after every write.
pub struct FileRepository<T> {
    path: PathBuf,
    table: Mutex<Table>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> FileRepository<T> {
    pub fn open(dir: &Path) -> StoreResult<Self> {
        let path = dir.join(format!("{}.json", T::ENTITY_NAME));
        let rows: BTreeMap<String, Patch> = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            table: Mutex::new(Table::from_rows(rows)),
            _entity: PhantomData,
        })
    }

    /// The table only takes the new rows once they are on disk.
    fn write(&self, records: Vec<Patch>, insert: bool) -> StoreResult<()> {
        let mut table = lock(&self.table);
        let staged = table.stage::<T>(records, insert)?;

        let mut rows = table.rows().clone();
        rows.extend(staged.clone());
        let data = serde_json::to_string_pretty(&rows)?;
        std::fs::write(&self.path, data)?;

        table.commit(staged);
        Ok(())
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for FileRepository<T> {
    async fn search(&self, criteria: &Criteria) -> StoreResult<Vec<T>> {
        lock(&self.table).search(criteria)
    }

    async fn upsert(&self, records: Vec<Patch>) -> StoreResult<()> {
        self.write(records, true)
    }

    async fn update(&self, records: Vec<Patch>) -> StoreResult<()> {
        self.write(records, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::TransactionMirror;
    use crate::store::{into_patch, StoreError};
    use uuid::Uuid;

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = TransactionMirror {
            id: Uuid::new_v4(),
            transaction_id: 77,
            space_id: 3,
            sales_channel_id: "storefront".to_string(),
            data: serde_json::json!({"id": 77}),
        };

        {
            let repo = FileRepository::<TransactionMirror>::open(dir.path()).unwrap();
            repo.upsert(vec![into_patch(&mirror).unwrap()]).await.unwrap();
        }

        let reopened = FileRepository::<TransactionMirror>::open(dir.path()).unwrap();
        let found = reopened
            .search(&Criteria::new().eq("transaction_id", 77))
            .await
            .unwrap();
        assert_eq!(found, vec![mirror]);
        assert!(dir.path().join("transaction_mirror.json").exists());
    }

    #[tokio::test]
    async fn failed_disk_write_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::<TransactionMirror>::open(dir.path()).unwrap();
        // A directory in the file's place makes every write fail.
        std::fs::create_dir(dir.path().join("transaction_mirror.json")).unwrap();

        let mirror = TransactionMirror {
            id: Uuid::new_v4(),
            transaction_id: 78,
            space_id: 3,
            sales_channel_id: "storefront".to_string(),
            data: serde_json::json!({"id": 78}),
        };
        let result = repo.upsert(vec![into_patch(&mirror).unwrap()]).await;

        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(repo.search(&Criteria::new()).await.unwrap().is_empty());
    }
}
