//! In-memory account store
//!
//! # Design
//!
//! `InMemoryAccountStore` keeps account snapshots in a `DashMap`, so readers
//! on different accounts never block each other and a reader never blocks a
//! writer for longer than a single map shard access. It does not serialize
//! read-modify-write cycles on its own: the engine holds the per-account
//! lock from the lock table around every mutation.

use super::traits::AccountStore;
use crate::types::{Account, AccountId, LedgerError};
use dashmap::DashMap;

/// Concurrent map of account identifier to latest committed state
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<AccountId, Account>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts, open or closed
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get(&self, id: &AccountId) -> Result<Account, LedgerError> {
        self.accounts
            .get(id)
            .map(|account| account.value().clone())
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    fn save(&self, account: Account) {
        self.accounts.insert(account.id.clone(), account);
    }

    fn insert(&self, account: Account) -> Result<(), LedgerError> {
        let id = account.id.clone();
        let mut inserted = false;
        self.accounts.entry(id.clone()).or_insert_with(|| {
            inserted = true;
            account
        });

        if inserted {
            Ok(())
        } else {
            Err(LedgerError::duplicate_account(&id))
        }
    }

    fn list(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        accounts
    }
}
