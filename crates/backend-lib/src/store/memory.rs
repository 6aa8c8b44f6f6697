// ============================
// usergate-backend-lib/src/store/memory.rs
// ============================
//! In-memory implementation of the account store.
//!
//! Records carry a version counter. A unit of work remembers the version
//! of every record it read (including "absent") and re-checks them under
//! the table write lock at commit; the first committer wins and later
//! ones observe `Conflict`. This gives the engine real transaction
//! semantics to test against without a database. Versions are allocated
//! from a table-global counter and never reused, so a record deleted and
//! re-created between read and commit still fails validation.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use usergate_common::Account;

use super::{AccountStore, AccountUnit, StoreError};

#[derive(Clone)]
struct Versioned {
    version: u64,
    account: Account,
}

/// Records plus the version allocator. Versions are table-global and
/// never reused across incarnations of a key.
#[derive(Default)]
struct TableState {
    next_version: u64,
    records: HashMap<String, Versioned>,
}

impl TableState {
    fn allocate_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }
}

type Table = Arc<RwLock<TableState>>;

/// Versioned in-memory account table
#[derive(Clone, Default)]
pub struct MemoryAccountStore {
    table: Table,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.table.read().await.records.contains_key(email))
    }

    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        if table.records.contains_key(&account.email) {
            return Err(StoreError::Conflict);
        }
        let version = table.allocate_version();
        table
            .records
            .insert(account.email.clone(), Versioned { version, account });
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError> {
        self.table
            .read()
            .await
            .records
            .get(email)
            .map(|entry| entry.account.clone())
            .ok_or_else(|| StoreError::NotFound(email.to_string()))
    }

    async fn update(&self, account: Account) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let version = table.allocate_version();
        match table.records.get_mut(&account.email) {
            Some(entry) => {
                entry.version = version;
                entry.account = account;
                Ok(())
            },
            None => Err(StoreError::NotFound(account.email)),
        }
    }

    async fn delete(&self, email: &str) -> Result<(), StoreError> {
        self.table.write().await.records.remove(email);
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn AccountUnit>, StoreError> {
        Ok(Box::new(MemoryUnit {
            table: self.table.clone(),
            reads: HashMap::new(),
            staged: Vec::new(),
        }))
    }
}

enum Staged {
    Insert(Account),
    Update(Account),
    Delete(String),
}

struct MemoryUnit {
    table: Table,
    /// Version observed per key; None records "absent when read"
    reads: HashMap<String, Option<u64>>,
    staged: Vec<Staged>,
}

#[async_trait]
impl AccountUnit for MemoryUnit {
    async fn exists(&mut self, email: &str) -> Result<bool, StoreError> {
        let table = self.table.read().await;
        let version = table.records.get(email).map(|entry| entry.version);
        self.reads.insert(email.to_string(), version);
        Ok(version.is_some())
    }

    async fn find_by_email(&mut self, email: &str) -> Result<Account, StoreError> {
        let table = self.table.read().await;
        let entry = table.records.get(email);
        self.reads
            .insert(email.to_string(), entry.map(|e| e.version));
        entry
            .map(|e| e.account.clone())
            .ok_or_else(|| StoreError::NotFound(email.to_string()))
    }

    fn insert(&mut self, account: Account) {
        self.staged.push(Staged::Insert(account));
    }

    fn update(&mut self, account: Account) {
        self.staged.push(Staged::Update(account));
    }

    fn delete(&mut self, email: &str) {
        self.staged.push(Staged::Delete(email.to_string()));
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let reads = std::mem::take(&mut self.reads);
        let staged = std::mem::take(&mut self.staged);
        let mut table = self.table.write().await;

        // Validate everything under the write lock before mutating;
        // nothing is applied unless all checks pass.
        for (email, observed) in &reads {
            if table.records.get(email).map(|entry| entry.version) != *observed {
                return Err(StoreError::Conflict);
            }
        }
        for write in &staged {
            match write {
                Staged::Insert(account) => {
                    if table.records.contains_key(&account.email) {
                        return Err(StoreError::Conflict);
                    }
                },
                Staged::Update(account) => {
                    if !table.records.contains_key(&account.email) {
                        return Err(StoreError::NotFound(account.email.clone()));
                    }
                },
                Staged::Delete(_) => {},
            }
        }

        for write in staged {
            match write {
                Staged::Insert(account) => {
                    let version = table.allocate_version();
                    table
                        .records
                        .insert(account.email.clone(), Versioned { version, account });
                },
                Staged::Update(account) => {
                    let version = table.allocate_version();
                    if let Some(entry) = table.records.get_mut(&account.email) {
                        entry.version = version;
                        entry.account = account;
                    }
                },
                Staged::Delete(email) => {
                    table.records.remove(&email);
                },
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) {
        // Staged writes never touched the table; dropping them is enough.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use usergate_common::AccountState;

    fn account(email: &str) -> Account {
        Account {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: "digest".to_string(),
            salt: "c2FsdA".to_string(),
            state: AccountState::Active,
            password_expires_at: Utc::now() + Duration::days(90),
            password_history: Vec::new(),
            roles: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryAccountStore::new();

        store.insert(account("alice@example.com")).await.unwrap();
        assert!(store.exists("alice@example.com").await.unwrap());

        let found = store.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(found.email, "alice@example.com");

        let missing = store.find_by_email("bob@example.com").await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_duplicate_conflicts() {
        let store = MemoryAccountStore::new();

        store.insert(account("alice@example.com")).await.unwrap();
        let second = store.insert(account("alice@example.com")).await;
        assert!(matches!(second, Err(StoreError::Conflict)));
    }

    #[tokio::test]
    async fn test_update() {
        let store = MemoryAccountStore::new();
        store.insert(account("alice@example.com")).await.unwrap();

        let mut changed = account("alice@example.com");
        changed.first_name = "Alicia".to_string();
        store.update(changed).await.unwrap();

        let found = store.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(found.first_name, "Alicia");

        let missing = store.update(account("bob@example.com")).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryAccountStore::new();
        store.insert(account("alice@example.com")).await.unwrap();

        store.delete("alice@example.com").await.unwrap();
        assert!(!store.exists("alice@example.com").await.unwrap());

        // Deleting again is fine
        store.delete("alice@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let store = MemoryAccountStore::new();

        let mut unit = store.begin().await.unwrap();
        assert!(!unit.exists("alice@example.com").await.unwrap());
        unit.insert(account("alice@example.com"));

        // Not visible through the store yet
        assert!(!store.exists("alice@example.com").await.unwrap());

        unit.commit().await.unwrap();
        assert!(store.exists("alice@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_writes() {
        let store = MemoryAccountStore::new();

        let mut unit = store.begin().await.unwrap();
        unit.insert(account("alice@example.com"));
        unit.rollback().await;

        assert!(!store.exists("alice@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_race_first_committer_wins() {
        let store = MemoryAccountStore::new();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        assert!(!first.exists("alice@example.com").await.unwrap());
        assert!(!second.exists("alice@example.com").await.unwrap());

        first.insert(account("alice@example.com"));
        second.insert(account("alice@example.com"));

        first.commit().await.unwrap();
        let lost = second.commit().await;
        assert!(matches!(lost, Err(StoreError::Conflict)));
    }

    #[tokio::test]
    async fn test_concurrent_update_conflicts() {
        let store = MemoryAccountStore::new();
        store.insert(account("alice@example.com")).await.unwrap();

        // Two units race on the same record, e.g. a block against a
        // password change
        let mut blocker = store.begin().await.unwrap();
        let mut changer = store.begin().await.unwrap();

        let mut blocked = blocker.find_by_email("alice@example.com").await.unwrap();
        blocked.state = AccountState::Blocked {
            reason: "abuse".to_string(),
        };
        blocker.update(blocked);

        let mut rotated = changer.find_by_email("alice@example.com").await.unwrap();
        rotated.password_hash = "new-digest".to_string();
        changer.update(rotated);

        blocker.commit().await.unwrap();
        let lost = changer.commit().await;
        assert!(matches!(lost, Err(StoreError::Conflict)));

        // The winner's write is what remains
        let found = store.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(found.state.block_reason(), Some("abuse"));
        assert_eq!(found.password_hash, "digest");
    }

    #[tokio::test]
    async fn test_commit_detects_vanished_record() {
        let store = MemoryAccountStore::new();
        store.insert(account("alice@example.com")).await.unwrap();

        let mut unit = store.begin().await.unwrap();
        let read = unit.find_by_email("alice@example.com").await.unwrap();

        // The record disappears between read and commit
        store.delete("alice@example.com").await.unwrap();

        unit.update(read);
        let result = unit.commit().await;
        assert!(matches!(result, Err(StoreError::Conflict)));
    }

    #[tokio::test]
    async fn test_commit_detects_replaced_record() {
        let store = MemoryAccountStore::new();
        store.insert(account("alice@example.com")).await.unwrap();

        let mut unit = store.begin().await.unwrap();
        let mut read = unit.find_by_email("alice@example.com").await.unwrap();

        // The record is deleted and re-created between read and commit,
        // so the version the unit observed belongs to a dead incarnation
        store.delete("alice@example.com").await.unwrap();
        let mut replacement = account("alice@example.com");
        replacement.first_name = "Second".to_string();
        store.insert(replacement).await.unwrap();

        read.state = AccountState::Blocked {
            reason: "late".to_string(),
        };
        unit.update(read);
        let result = unit.commit().await;
        assert!(matches!(result, Err(StoreError::Conflict)));

        // The re-created record is untouched by the losing commit
        let found = store.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(found.first_name, "Second");
        assert!(found.state.is_active());
    }
}
