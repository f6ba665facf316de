use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use super::account::{UserAccount, UserId};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Stale write for {user} - expected version {expected}, found {found}")]
    Conflict {
        user: UserId,
        expected: u64,
        found: u64,
    },

    #[error("Storage backend failure - {0}")]
    Backend(#[from] anyhow::Error),
}

type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for user records. The ledger engine is storage-agnostic:
/// a document store or a relational store plugs in behind this trait.
pub trait UserStore {
    fn get_user(&self, id: &UserId) -> StoreResult<Option<UserAccount>>;

    /// Write back a full user record. The account's `version` must match the
    /// stored one (compare-and-swap); on a mismatch the write is refused with
    /// [`StoreError::Conflict`] and nothing changes.
    fn save_user(&self, account: UserAccount) -> StoreResult<()>;

    fn find_user_by_referral_code(&self, code: &str) -> StoreResult<Option<UserId>>;

    fn list_users(&self) -> StoreResult<Vec<UserAccount>>;
}

/// In-memory reference adapter. Thread-safe behind a read-write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<UserId, UserAccount>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account, e.g. at registration time. Registration itself is
    /// outside the ledger core.
    pub fn create_user(&self, account: UserAccount) {
        self.accounts
            .write()
            .insert(account.id.clone(), account);
    }
}

impl UserStore for MemoryStore {
    fn get_user(&self, id: &UserId) -> StoreResult<Option<UserAccount>> {
        Ok(self.accounts.read().get(id).cloned())
    }

    fn save_user(&self, account: UserAccount) -> StoreResult<()> {
        let mut accounts = self.accounts.write();

        let found = accounts.get(&account.id).map_or(0, |a| a.version);
        if found != account.version {
            return Err(StoreError::Conflict {
                user: account.id,
                expected: account.version,
                found,
            });
        }

        let mut next = account;
        next.version += 1;
        accounts.insert(next.id.clone(), next);
        Ok(())
    }

    fn find_user_by_referral_code(&self, code: &str) -> StoreResult<Option<UserId>> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|account| account.referral_code.as_deref() == Some(code))
            .map(|account| account.id.clone()))
    }

    fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        let mut users: Vec<UserAccount> = self.accounts.read().values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_user(id: &str) -> (MemoryStore, UserId) {
        let store = MemoryStore::new();
        let user_id = UserId::new(id);
        store.create_user(UserAccount::new(user_id.clone()));
        (store, user_id)
    }

    #[test]
    fn get_user_round_trip() {
        let (store, user_id) = stored_user("user@example.com");

        let account = store.get_user(&user_id).unwrap().unwrap();
        assert_eq!(user_id, account.id);
        assert_eq!(0, account.version);

        let missing = store.get_user(&UserId::new("nobody@example.com")).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn save_bumps_version() {
        let (store, user_id) = stored_user("user@example.com");

        let account = store.get_user(&user_id).unwrap().unwrap();
        store.save_user(account).unwrap();

        let account = store.get_user(&user_id).unwrap().unwrap();
        assert_eq!(1, account.version);
    }

    #[test]
    fn stale_save_is_refused() {
        let (store, user_id) = stored_user("user@example.com");

        // Two callers read the same version; the slower write-back loses.
        let first = store.get_user(&user_id).unwrap().unwrap();
        let second = store.get_user(&user_id).unwrap().unwrap();

        store.save_user(first).unwrap();
        let got = store.save_user(second);
        assert!(matches!(
            got,
            Err(StoreError::Conflict {
                expected: 0,
                found: 1,
                ..
            })
        ));

        // The winning write is intact.
        let account = store.get_user(&user_id).unwrap().unwrap();
        assert_eq!(1, account.version);
    }

    #[test]
    fn find_user_by_referral_code() {
        let store = MemoryStore::new();
        let user_id = UserId::new("user@example.com");
        store.create_user(UserAccount::new(user_id.clone()).with_referral_code("FRIEND-42"));

        assert_eq!(
            Some(user_id),
            store.find_user_by_referral_code("FRIEND-42").unwrap()
        );
        assert_eq!(None, store.find_user_by_referral_code("UNKNOWN").unwrap());
    }

    #[test]
    fn list_users_is_ordered_by_id() {
        let store = MemoryStore::new();
        store.create_user(UserAccount::new(UserId::new("b@example.com")));
        store.create_user(UserAccount::new(UserId::new("a@example.com")));

        let ids: Vec<UserId> = store
            .list_users()
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(
            vec![UserId::new("a@example.com"), UserId::new("b@example.com")],
            ids
        );
    }
}
