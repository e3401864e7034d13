//! Infrastructure layer: record/document stores, push dispatch, config,
//! and the services composed over them.

pub mod config;
pub mod content;
pub mod documents;
pub mod error;
pub mod members;
pub mod notify;
pub mod portal_users;
pub mod promotion;
pub mod store;

pub use config::{ConfigError, DatabaseConfig, PortalConfig, PushConfig};
pub use content::ContentLibrary;
pub use documents::{DocumentStore, InMemoryDocumentStore};
pub use error::{ServiceError, ServiceResult};
pub use members::{BulkUpdateReport, MemberDirectory};
pub use notify::{
    BROADCAST_TOPIC, DispatchReceipt, HttpPushDispatcher, Notification, NotificationDispatcher, NotifyError,
    RecordingDispatcher, UnconfiguredDispatcher, broadcast,
};
pub use portal_users::PortalUserDirectory;
pub use promotion::{
    ConflictPolicy, MemberPromotion, Promotion, PromotionError, PromotionOutcome, PromotionStep,
};
pub use store::{
    Collection, InMemoryRecordStore, PostgresRecordStore, RecordPath, RecordStore, StoreError,
};
