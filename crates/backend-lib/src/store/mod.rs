// ============================
// usergate-backend-lib/src/store/mod.rs
// ============================
//! Account persistence boundary.
//!
//! The engine only ever sees these traits. Single-call operations are
//! atomic on their own; multi-step mutations go through a unit of work
//! whose staged writes stay invisible to other callers until commit.
use async_trait::async_trait;
use thiserror::Error;
use usergate_common::Account;

pub mod memory;

pub use memory::MemoryAccountStore;

/// Possible store failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// Uniqueness violation or a lost race against a concurrent commit
    #[error("conflicting concurrent change")]
    Conflict,

    #[error("account not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Trait for account storage backends.
///
/// All emails passed in are already normalized; the store treats them as
/// opaque keys.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Insert a new account. The insert's own uniqueness enforcement is
    /// authoritative; a prior `exists` check is advisory only.
    async fn insert(&self, account: Account) -> Result<(), StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError>;

    /// Full-record replace keyed by email
    async fn update(&self, account: Account) -> Result<(), StoreError>;

    /// Idempotent removal. Not part of any user flow; exists for rollback
    /// compensation and test teardown.
    async fn delete(&self, email: &str) -> Result<(), StoreError>;

    /// Open a unit of work
    async fn begin(&self) -> Result<Box<dyn AccountUnit>, StoreError>;
}

/// A caller-managed unit of work.
///
/// Reads record the version they observed; writes are staged. `commit`
/// fails with `Conflict` if any record this unit read or wrote changed
/// concurrently after it was read (first committer wins). Dropping the
/// unit without committing discards everything, same as `rollback`.
///
/// Reads observe committed state only; staged writes are not read back.
/// The engine stages at most one write per record and unit.
#[async_trait]
pub trait AccountUnit: Send {
    async fn exists(&mut self, email: &str) -> Result<bool, StoreError>;

    async fn find_by_email(&mut self, email: &str) -> Result<Account, StoreError>;

    fn insert(&mut self, account: Account);

    fn update(&mut self, account: Account);

    fn delete(&mut self, email: &str);

    /// Validate and apply the staged writes atomically
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard the staged writes
    async fn rollback(self: Box<Self>);
}
