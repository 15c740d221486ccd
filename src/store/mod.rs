use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

mod memory;
mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence for user records. Implementations own the collection.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Fails with `DuplicateEmail` if the email is already present; the check and
    /// the insert are a single atomic step.
    async fn insert(&self, user: User) -> Result<User, StoreError>;
    /// Replaces username and password hash of the record with `user.id`.
    /// The role is left untouched.
    async fn update(&self, user: User) -> Result<User, StoreError>;
    async fn set_role(&self, id: Uuid, role: Role) -> Result<User, StoreError>;
    /// All records in insertion order.
    async fn list_all(&self) -> Result<Vec<User>, StoreError>;
}
