//! Catalog store: generic entity repositories the reconcilers read and write.
//!
//! Records travel as JSON objects keyed by their `id`. An upsert merges the
//! given fields over the stored record, so a field missing from the patch keeps
//! its stored value.

pub mod file;
pub mod memory;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::entity::{
    Media, MediaDefaultFolder, MediaFolder, PaymentMethodMirror, PaymentMethodRecord, RefundMirror, TransactionMirror,
};

pub use file::FileRepository;
pub use memory::InMemoryRepository;

/// Field set written by `upsert` / `update`. Must carry an `id`.
pub type Patch = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} record has no valid id")]
    MissingId { entity: &'static str },

    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} record is invalid: {source}")]
    Invalid {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const ENTITY_NAME: &'static str;
}

/// Equality filters over top-level record fields, plus an optional limit.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    filters: Vec<(String, Value)>,
    limit: Option<usize>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &Patch) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| record.get(field) == Some(value))
    }

    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }
}

#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn search(&self, criteria: &Criteria) -> StoreResult<Vec<T>>;

    /// Inserts new records and merges into existing ones.
    async fn upsert(&self, records: Vec<Patch>) -> StoreResult<()>;

    /// Merges into existing records only; unknown ids fail.
    async fn update(&self, records: Vec<Patch>) -> StoreResult<()>;
}

/// Serializes `value` into a patch, leaving out every `null` field so that
/// absent optional values don't overwrite stored ones.
pub fn into_patch<S: Serialize>(value: &S) -> StoreResult<Patch> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => Err(StoreError::Serialization(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}

/// One repository per entity kind the reconcilers touch.
#[derive(Clone)]
pub struct Catalog {
    pub payment_method_mirrors: Arc<dyn Repository<PaymentMethodMirror>>,
    pub payment_methods: Arc<dyn Repository<PaymentMethodRecord>>,
    pub refund_mirrors: Arc<dyn Repository<RefundMirror>>,
    pub transaction_mirrors: Arc<dyn Repository<TransactionMirror>>,
    pub media: Arc<dyn Repository<Media>>,
    pub media_folders: Arc<dyn Repository<MediaFolder>>,
    pub media_default_folders: Arc<dyn Repository<MediaDefaultFolder>>,
}

impl Catalog {
    pub fn in_memory() -> Self {
        Self {
            payment_method_mirrors: Arc::new(InMemoryRepository::new()),
            payment_methods: Arc::new(InMemoryRepository::new()),
            refund_mirrors: Arc::new(InMemoryRepository::new()),
            transaction_mirrors: Arc::new(InMemoryRepository::new()),
            media: Arc::new(InMemoryRepository::new()),
            media_folders: Arc::new(InMemoryRepository::new()),
            media_default_folders: Arc::new(InMemoryRepository::new()),
        }
    }

    /// Opens (or creates) a catalog with one JSON file per entity kind in `dir`.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            payment_method_mirrors: Arc::new(FileRepository::open(dir)?),
            payment_methods: Arc::new(FileRepository::open(dir)?),
            refund_mirrors: Arc::new(FileRepository::open(dir)?),
            transaction_mirrors: Arc::new(FileRepository::open(dir)?),
            media: Arc::new(FileRepository::open(dir)?),
            media_folders: Arc::new(FileRepository::open(dir)?),
            media_default_folders: Arc::new(FileRepository::open(dir)?),
        })
    }
}
