//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use merit_store::meta::MetaStore;
use merit_store::StoreError;

use crate::account::LmdbAccountStore;
use crate::history::LmdbHistoryStore;
use crate::meta::LmdbMetaStore;
use crate::payout::LmdbPayoutStore;
use crate::queue::LmdbQueueStore;
use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// The schema version the current code writes and expects.
pub const SCHEMA_VERSION: u32 = 1;

/// Wraps the LMDB environment and all database handles.
///
/// Every named database is created up front so that a broken environment
/// fails the open, not some later operation. Opening is the single fatal
/// path of the whole subsystem.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) accounts_db: Database<Bytes, Bytes>,
    pub(crate) queue_db: Database<Bytes, Bytes>,
    pub(crate) queue_index_db: Database<Bytes, Bytes>,
    pub(crate) history_db: Database<Bytes, Bytes>,
    pub(crate) history_index_db: Database<Bytes, Bytes>,
    pub(crate) payouts_db: Database<Bytes, Bytes>,
    pub(crate) pending_payouts_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// A fresh environment is stamped with [`SCHEMA_VERSION`]; one stamped
    /// with any other version refuses to open.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(heed::Error::Io)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let accounts_db = env.create_database(&mut wtxn, Some("accounts"))?;
        let queue_db = env.create_database(&mut wtxn, Some("queue"))?;
        let queue_index_db = env.create_database(&mut wtxn, Some("queue_index"))?;
        let history_db = env.create_database(&mut wtxn, Some("history"))?;
        let history_index_db = env.create_database(&mut wtxn, Some("history_index"))?;
        let payouts_db = env.create_database(&mut wtxn, Some("payouts"))?;
        let pending_payouts_db = env.create_database(&mut wtxn, Some("pending_payouts"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            accounts_db,
            queue_db,
            queue_index_db,
            history_db,
            history_index_db,
            payouts_db,
            pending_payouts_db,
            meta_db,
        };
        environment.check_schema()?;

        tracing::debug!(path = %path.display(), "opened lmdb environment");
        Ok(environment)
    }

    /// Version 0 means a fresh database (no version stored yet); anything
    /// else must match what this code writes.
    fn check_schema(&self) -> Result<(), LmdbError> {
        let meta = self.meta_store();
        let stored = meta
            .get_schema_version()
            .map_err(|e| LmdbError::Heed(e.to_string()))?;
        match stored {
            0 => {
                meta.set_schema_version(SCHEMA_VERSION)
                    .map_err(|e| LmdbError::Heed(e.to_string()))?;
                tracing::info!(version = SCHEMA_VERSION, "stamped fresh database schema");
                Ok(())
            }
            v if v == SCHEMA_VERSION => Ok(()),
            v => Err(LmdbError::Heed(format!(
                "database schema version {} is not the supported version {}",
                v, SCHEMA_VERSION
            ))),
        }
    }

    /// The raw heed environment (for read transactions in tests and stores).
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Begin a write batch: one LMDB write transaction covering any number of
    /// store mutations. Dropping the batch without committing rolls back.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, StoreError> {
        WriteBatch::new(self)
    }

    // ── Store constructors ──────────────────────────────────────────────

    pub fn account_store(&self) -> LmdbAccountStore {
        LmdbAccountStore {
            env: self.env.clone(),
            accounts_db: self.accounts_db,
        }
    }

    pub fn queue_store(&self) -> LmdbQueueStore {
        LmdbQueueStore {
            env: self.env.clone(),
            queue_db: self.queue_db,
            queue_index_db: self.queue_index_db,
        }
    }

    pub fn history_store(&self) -> LmdbHistoryStore {
        LmdbHistoryStore {
            env: self.env.clone(),
            history_db: self.history_db,
            history_index_db: self.history_index_db,
        }
    }

    pub fn payout_store(&self) -> LmdbPayoutStore {
        LmdbPayoutStore {
            env: self.env.clone(),
            payouts_db: self.payouts_db,
            pending_payouts_db: self.pending_payouts_db,
            meta_db: self.meta_db,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: self.env.clone(),
            meta_db: self.meta_db,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_at(dir: &Path) -> Result<LmdbEnvironment, LmdbError> {
        LmdbEnvironment::open(dir, 16, 10 * 1024 * 1024)
    }

    #[test]
    fn fresh_environment_is_stamped() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = open_at(dir.path()).expect("failed to open env");
        let version = env.meta_store().get_schema_version().expect("version read");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn reopen_accepts_matching_schema() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        drop(open_at(dir.path()).expect("first open"));

        let env = open_at(dir.path()).expect("reopen");
        let version = env.meta_store().get_schema_version().expect("version read");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn mismatched_schema_refuses_to_open() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        {
            let env = open_at(dir.path()).expect("first open");
            env.meta_store()
                .set_schema_version(SCHEMA_VERSION + 1)
                .expect("version write");
        }

        assert!(open_at(dir.path()).is_err());
    }
}
