//! Portal (staff/admin) account profiles.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use portal_auth::{AccessChange, AuthzError, LoginProfile, PortalUser, Principal, Role};
use portal_core::{Fields, PortalUid};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{Collection, RecordPath, RecordStore, StoreError, load};

#[derive(Debug, Clone)]
pub struct PortalUserDirectory<S> {
    store: S,
    super_admins: BTreeSet<PortalUid>,
}

impl<S> PortalUserDirectory<S>
where
    S: RecordStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            super_admins: BTreeSet::new(),
        }
    }

    /// Accounts that start out as `super_admin` on their first login.
    pub fn with_super_admins(mut self, uids: impl IntoIterator<Item = PortalUid>) -> Self {
        self.super_admins.extend(uids);
        self
    }

    /// Record a login: create the profile, or refresh identity fields only.
    #[tracing::instrument(skip(self, principal, overrides, now), fields(uid = %principal.uid))]
    pub async fn sync(&self, principal: &Principal, overrides: LoginProfile, now: DateTime<Utc>) -> ServiceResult<PortalUser> {
        let path = RecordPath::portal_user(&principal.uid);
        let profile = principal.login_profile(overrides);

        match self.load_own(&path).await? {
            Some(mut user) => {
                user.record_login(profile.clone(), now);

                let mut fields = to_fields(&path, &profile)?;
                fields.insert("lastLogin".to_string(), Value::String(now.to_rfc3339()));
                self.store.update(&path, fields).await?;

                tracing::debug!("portal login refreshed");
                Ok(user)
            }
            None => {
                let role = if self.super_admins.contains(&principal.uid) {
                    Role::SuperAdmin
                } else {
                    Role::default()
                };
                let user = PortalUser::first_login(principal.uid.clone(), profile, role, now);
                let value = serde_json::to_value(&user).map_err(|e| StoreError::malformed(&path, e))?;
                self.store.set(&path, value).await?;

                tracing::info!(role = role.as_str(), "portal user created");
                Ok(user)
            }
        }
    }

    /// The caller's own profile. One that is stored but does not decode is
    /// a denial, not a server error.
    pub async fn get(&self, uid: &PortalUid) -> ServiceResult<Option<PortalUser>> {
        self.load_own(&RecordPath::portal_user(uid)).await
    }

    async fn load_own(&self, path: &RecordPath) -> ServiceResult<Option<PortalUser>> {
        match load(&self.store, path).await {
            Ok(user) => Ok(user),
            Err(StoreError::Malformed { message, .. }) => {
                tracing::error!(%path, error = %message, "stored portal profile is unreadable; access denied");
                Err(AuthzError::ProfileUnreadable.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every decodable profile; malformed records are skipped.
    pub async fn list(&self) -> ServiceResult<Vec<PortalUser>> {
        let records = self.store.list(Collection::PortalUsers).await?;
        Ok(records
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value::<PortalUser>(value) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "skipping malformed portal user");
                    None
                }
            })
            .collect())
    }

    /// Explicit admin edit of another account's role and/or permissions.
    #[tracing::instrument(skip(self, actor, change), fields(actor = %actor.uid, target = %uid))]
    pub async fn update_access(&self, actor: &PortalUser, uid: &PortalUid, change: AccessChange) -> ServiceResult<PortalUser> {
        if change.is_empty() {
            return Err(ServiceError::validation("role or permissions must be provided"));
        }

        let path = RecordPath::portal_user(uid);
        let mut user = load::<PortalUser, _>(&self.store, &path)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("portal user {uid} not found")))?;

        if let Err(e) = user.apply_access_change(&change, actor) {
            tracing::warn!(error = %e, "access change denied");
            return Err(e.into());
        }

        let mut fields = Fields::new();
        if change.role.is_some() {
            fields.insert("role".to_string(), Value::String(user.role.as_str().to_string()));
        }
        if let Some(permissions) = &user.permissions {
            if change.permissions.is_some() {
                let value = serde_json::to_value(permissions).map_err(|e| StoreError::malformed(&path, e))?;
                fields.insert("permissions".to_string(), value);
            }
        }
        self.store.update(&path, fields).await?;

        tracing::info!(role = user.role.as_str(), "portal user access updated");
        Ok(user)
    }
}

fn to_fields(path: &RecordPath, profile: &LoginProfile) -> Result<Fields, StoreError> {
    match serde_json::to_value(profile) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(StoreError::malformed(path, "login profile is not an object")),
        Err(e) => Err(StoreError::malformed(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use portal_auth::{Action, AuthzError, Module, PermissionMatrix};
    use serde_json::json;

    use super::*;
    use crate::store::InMemoryRecordStore;

    fn uid(raw: &str) -> PortalUid {
        PortalUid::parse(raw).unwrap()
    }

    fn principal(raw: &str) -> Principal {
        Principal {
            uid: uid(raw),
            email: Some(format!("{raw}@church.example")),
            display_name: None,
            photo_url: None,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn first_sync_creates_staff_with_default_matrix() {
        let dir = PortalUserDirectory::new(InMemoryRecordStore::new());
        let user = dir.sync(&principal("u1"), LoginProfile::default(), at(9)).await.unwrap();

        assert_eq!(user.role, Role::Staff);
        assert_eq!(user.display_name.as_deref(), Some("u1"));
        assert_eq!(user.permissions, Some(PermissionMatrix::staff_default()));
        assert_eq!(dir.get(&uid("u1")).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn configured_uid_bootstraps_as_super_admin() {
        let dir = PortalUserDirectory::new(InMemoryRecordStore::new()).with_super_admins([uid("root")]);
        let user = dir.sync(&principal("root"), LoginProfile::default(), at(9)).await.unwrap();
        assert_eq!(user.role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn later_sync_never_touches_access() {
        let store = InMemoryRecordStore::new();
        store
            .set(
                &RecordPath::portal_user(&uid("u1")),
                json!({
                    "uid": "u1",
                    "role": "admin",
                    "permissions": { "users": { "view": true, "edit": true, "delete": true } }
                }),
            )
            .await
            .unwrap();
        let dir = PortalUserDirectory::new(store);

        let overrides = LoginProfile {
            display_name: Some("Abouna".to_string()),
            ..LoginProfile::default()
        };
        let user = dir.sync(&principal("u1"), overrides, at(10)).await.unwrap();

        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.last_login, Some(at(10)));
        let stored = dir.get(&uid("u1")).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Admin);
        assert_eq!(stored.display_name.as_deref(), Some("Abouna"));
        assert!(stored.permissions.unwrap().grants(Module::Users, Action::Delete));
    }

    #[tokio::test]
    async fn admin_grants_edit_to_staff() {
        let dir = PortalUserDirectory::new(InMemoryRecordStore::new());
        let admin = PortalUser {
            role: Role::Admin,
            ..dir.sync(&principal("admin"), LoginProfile::default(), at(9)).await.unwrap()
        };
        dir.sync(&principal("staff"), LoginProfile::default(), at(9)).await.unwrap();

        let change = AccessChange {
            role: None,
            permissions: Some(PermissionMatrix::staff_default().with(Module::Users, Action::Edit, true)),
        };
        let updated = dir.update_access(&admin, &uid("staff"), change).await.unwrap();

        assert!(updated.permissions.unwrap().grants(Module::Users, Action::Edit));
        let stored = dir.get(&uid("staff")).await.unwrap().unwrap();
        assert!(stored.permissions.unwrap().grants(Module::Users, Action::Edit));
        assert_eq!(stored.role, Role::Staff);
    }

    #[tokio::test]
    async fn staff_cannot_edit_access() {
        let dir = PortalUserDirectory::new(InMemoryRecordStore::new());
        let staff = dir.sync(&principal("staff"), LoginProfile::default(), at(9)).await.unwrap();
        dir.sync(&principal("other"), LoginProfile::default(), at(9)).await.unwrap();

        let change = AccessChange {
            role: Some(Role::Admin),
            permissions: None,
        };
        let err = dir.update_access(&staff, &uid("other"), change).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authz(AuthzError::AdminRequired)));
        assert_eq!(dir.get(&uid("other")).await.unwrap().unwrap().role, Role::Staff);
    }

    #[tokio::test]
    async fn unreadable_profile_is_a_denial() {
        let store = InMemoryRecordStore::new();
        store
            .set(
                &RecordPath::portal_user(&uid("u1")),
                json!({ "uid": "u1", "role": "staff", "permissions": { "reports": { "view": true } } }),
            )
            .await
            .unwrap();
        let dir = PortalUserDirectory::new(store);

        let err = dir.get(&uid("u1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authz(AuthzError::ProfileUnreadable)));

        let err = dir.sync(&principal("u1"), LoginProfile::default(), at(9)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authz(AuthzError::ProfileUnreadable)));
    }

    #[tokio::test]
    async fn unknown_target_and_empty_change() {
        let dir = PortalUserDirectory::new(InMemoryRecordStore::new());
        let admin = PortalUser {
            role: Role::Admin,
            ..dir.sync(&principal("admin"), LoginProfile::default(), at(9)).await.unwrap()
        };

        assert!(dir
            .update_access(&admin, &uid("ghost"), AccessChange { role: Some(Role::Staff), permissions: None })
            .await
            .is_err());
        assert!(dir
            .update_access(&admin, &uid("admin"), AccessChange::default())
            .await
            .is_err());
    }
}
