//! LMDB implementation of AccountStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use merit_store::account::AccountStore;
use merit_store::StoreError;
use merit_types::{Account, AccountId};

use crate::keys::account_key;
use crate::LmdbError;

pub struct LmdbAccountStore {
    pub(crate) env: Arc<Env>,
    pub(crate) accounts_db: Database<Bytes, Bytes>,
}

impl AccountStore for LmdbAccountStore {
    fn get_account(&self, id: AccountId) -> Result<Account, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .accounts_db
            .get(&rtxn, &account_key(id)[..])
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("account {}", id)))?;
        let account: Account = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(account)
    }

    fn put_account(&self, account: &Account) -> Result<(), StoreError> {
        let bytes = bincode::serialize(account).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.accounts_db
            .put(&mut wtxn, &account_key(account.id)[..], &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn account_exists(&self, id: AccountId) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .accounts_db
            .get(&rtxn, &account_key(id)[..])
            .map_err(LmdbError::from)?;
        Ok(val.is_some())
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.accounts_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }

    fn iter_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.accounts_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            let account: Account = bincode::deserialize(val).map_err(LmdbError::from)?;
            results.push(account);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use merit_types::Timestamp;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 16, 10 * 1024 * 1024)
            .expect("failed to open env");
        (dir, env)
    }

    fn test_account(id: u64) -> Account {
        Account::new(AccountId::new(id), Timestamp::new(1_000))
    }

    #[test]
    fn put_then_get_roundtrips() {
        let (_dir, env) = temp_env();
        let store = env.account_store();

        let account = test_account(7);
        store.put_account(&account).expect("put");

        assert_eq!(store.get_account(account.id).expect("get"), account);
        assert!(store.account_exists(account.id).expect("exists"));
    }

    #[test]
    fn missing_account_is_not_found() {
        let (_dir, env) = temp_env();
        let store = env.account_store();

        let missing = AccountId::new(404);
        assert!(matches!(
            store.get_account(missing),
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.account_exists(missing).expect("exists"));
    }

    #[test]
    fn iter_returns_accounts_in_id_order() {
        let (_dir, env) = temp_env();
        let store = env.account_store();

        for id in [30, 10, 20] {
            store.put_account(&test_account(id)).expect("put");
        }

        assert_eq!(store.account_count().expect("count"), 3);
        let ids: Vec<u64> = store
            .iter_accounts()
            .expect("iter")
            .iter()
            .map(|a| a.id.raw())
            .collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }
}
