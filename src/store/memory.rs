use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::auth::repo_types::{Role, User};

#[derive(Default)]
struct Inner {
    by_id: HashMap<Uuid, User>,
    by_email: HashMap<String, Uuid>,
    order: Vec<Uuid>,
}

/// Process-local store. All mutations go through a single write lock.
#[derive(Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_email
            .get(email)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.by_email.contains_key(&user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        inner.by_email.insert(user.email.clone(), user.id);
        inner.order.push(user.id);
        inner.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.by_id.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        stored.username = user.username;
        stored.password_hash = user.password_hash;
        Ok(stored.clone())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;
        stored.role = role;
        Ok(stored.clone())
    }

    async fn list_all(&self) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User::new(email.into(), "name".into(), "hash".into())
    }

    #[tokio::test]
    async fn insert_then_lookup_by_email_and_id() {
        let store = InMemoryUserStore::new();
        let created = store.insert(user("a@x.com")).await.unwrap();

        let by_email = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@x.com");
        assert!(store.find_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_lookup_is_exact() {
        let store = InMemoryUserStore::new();
        store.insert(user("Mixed@X.com")).await.unwrap();
        assert!(store.find_by_email("mixed@x.com").await.unwrap().is_none());
        assert!(store.find_by_email("Mixed@X.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let store = InMemoryUserStore::new();
        store.insert(user("a@x.com")).await.unwrap();
        let err = store.insert(user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_inserts_keep_one_record_per_email() {
        let store = std::sync::Arc::new(InMemoryUserStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.insert(user("race@x.com")).await }));
        }
        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_username_and_hash_only() {
        let store = InMemoryUserStore::new();
        let created = store.insert(user("a@x.com")).await.unwrap();

        let mut changed = created.clone();
        changed.username = "renamed".into();
        changed.password_hash = "new-hash".into();
        changed.role = Role::Admin;
        changed.email = "other@x.com".into();
        changed.created_at = time::OffsetDateTime::UNIX_EPOCH;

        let updated = store.update(changed).await.unwrap();
        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.password_hash, "new-hash");
        assert_eq!(updated.role, Role::User);
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = InMemoryUserStore::new();
        let err = store.update(user("ghost@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        let err = store.set_role(Uuid::new_v4(), Role::Admin).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn stale_update_keeps_concurrent_promotion() {
        let store = InMemoryUserStore::new();
        let created = store.insert(user("a@x.com")).await.unwrap();
        let stale = store.find_by_id(created.id).await.unwrap().unwrap();

        store.set_role(created.id, Role::Admin).await.unwrap();

        let mut renamed = stale;
        renamed.username = "renamed".into();
        let updated = store.update(renamed).await.unwrap();
        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.role, Role::Admin);
    }

    #[tokio::test]
    async fn list_all_keeps_insertion_order() {
        let store = InMemoryUserStore::new();
        for email in ["c@x.com", "a@x.com", "b@x.com"] {
            store.insert(user(email)).await.unwrap();
        }
        let emails: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, vec!["c@x.com", "a@x.com", "b@x.com"]);
    }
}
