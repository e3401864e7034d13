//! Service wiring: stores, dispatcher and the services built over them.

use std::sync::Arc;

use anyhow::Context;

use portal_core::PortalUid;
use portal_infra::{
    ConflictPolicy, ContentLibrary, DatabaseConfig, DocumentStore, HttpPushDispatcher, InMemoryDocumentStore,
    InMemoryRecordStore, MemberDirectory, MemberPromotion, NotificationDispatcher, NotifyError, PortalConfig,
    PortalUserDirectory, PostgresRecordStore, PushConfig, RecordStore, StoreError, UnconfiguredDispatcher,
};

pub type SharedRecords = Arc<dyn RecordStore>;
pub type SharedDocuments = Arc<dyn DocumentStore>;

pub struct AppServices {
    pub members: MemberDirectory<SharedRecords>,
    pub promotion: MemberPromotion<SharedRecords>,
    pub portal_users: PortalUserDirectory<SharedRecords>,
    pub content: ContentLibrary<SharedDocuments>,
    pub notifier: Arc<dyn NotificationDispatcher>,
}

impl AppServices {
    pub fn from_parts(
        records: SharedRecords,
        documents: SharedDocuments,
        notifier: Arc<dyn NotificationDispatcher>,
        policy: ConflictPolicy,
        super_admins: Vec<PortalUid>,
    ) -> Self {
        Self {
            members: MemberDirectory::new(records.clone()),
            promotion: MemberPromotion::new(records.clone(), policy),
            portal_users: PortalUserDirectory::new(records).with_super_admins(super_admins),
            content: ContentLibrary::new(documents),
            notifier,
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(
        notifier: Arc<dyn NotificationDispatcher>,
        policy: ConflictPolicy,
        super_admins: Vec<PortalUid>,
    ) -> Self {
        Self::from_parts(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryDocumentStore::new()),
            notifier,
            policy,
            super_admins,
        )
    }

    /// Postgres wiring; creates the tables on first use.
    pub async fn persistent(
        db: &DatabaseConfig,
        notifier: Arc<dyn NotificationDispatcher>,
        policy: ConflictPolicy,
        super_admins: Vec<PortalUid>,
    ) -> Result<Self, StoreError> {
        let store = Arc::new(PostgresRecordStore::connect(&db.url, db.max_connections).await?);
        store.ensure_schema().await?;

        Ok(Self::from_parts(
            store.clone(),
            store,
            notifier,
            policy,
            super_admins,
        ))
    }
}

/// Push gateway when configured; otherwise a dispatcher that always fails.
pub fn build_notifier(push: Option<&PushConfig>) -> Result<Arc<dyn NotificationDispatcher>, NotifyError> {
    match push {
        Some(push) => {
            tracing::info!(endpoint = %push.endpoint, "using http push gateway");
            Ok(Arc::new(HttpPushDispatcher::new(&push.endpoint, &push.credential)?))
        }
        None => {
            tracing::warn!("PORTAL_PUSH_URL not set; sending notifications will fail");
            Ok(Arc::new(UnconfiguredDispatcher))
        }
    }
}

pub async fn build_services(config: &PortalConfig) -> anyhow::Result<AppServices> {
    let super_admins = config.super_admins.clone();
    let notifier = build_notifier(config.push.as_ref()).context("failed to set up notifications")?;
    match &config.database {
        Some(db) => {
            tracing::info!(max_connections = db.max_connections, "using postgres stores");
            AppServices::persistent(db, notifier, config.conflict_policy, super_admins)
                .await
                .context("failed to initialise stores")
        }
        None => {
            tracing::info!("using in-memory stores");
            Ok(AppServices::in_memory(notifier, config.conflict_policy, super_admins))
        }
    }
}
