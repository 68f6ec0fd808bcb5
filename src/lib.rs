pub mod config;
pub mod entity;
pub mod error;
pub mod media;
pub mod payload;
pub mod psp;
pub mod refund;
pub mod settings;
pub mod store;
pub mod sync;

pub use error::{SyncError, SyncResult};
pub use refund::RefundReconciler;
pub use settings::{Settings, SettingsResolver, TenantContext};
pub use sync::{ConfigSyncEngine, SyncReport};
