//! Account storage trait.

use crate::StoreError;
use merit_types::{Account, AccountId};

/// Trait for account storage operations.
///
/// `put_account` is a standalone atomic write; balance movements that must be
/// atomic with other records go through the backend's write batch instead.
pub trait AccountStore {
    fn get_account(&self, id: AccountId) -> Result<Account, StoreError>;
    fn put_account(&self, account: &Account) -> Result<(), StoreError>;
    fn account_exists(&self, id: AccountId) -> Result<bool, StoreError>;
    fn account_count(&self) -> Result<u64, StoreError>;
    fn iter_accounts(&self) -> Result<Vec<Account>, StoreError>;
}
