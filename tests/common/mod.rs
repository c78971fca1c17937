#![allow(dead_code)]

use std::sync::Arc;

use sqlx::SqlitePool;
use tempfile::TempDir;

use cms_scopes::authz::{permissions, Principal, ScopedPolicyEvaluator};
use cms_scopes::store::{ScopeAdmin, SqliteStore};

/// A migrated SQLite database in a temp dir. Keep the struct alive for the
/// duration of the test; dropping it removes the file.
pub struct TestDb {
    _dir: TempDir,
    pub pool: SqlitePool,
}

impl TestDb {
    pub async fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let pool = cms_scopes::db::connect(&url).await?;
        Ok(Self { _dir: dir, pool })
    }

    pub fn store(&self) -> Arc<SqliteStore> {
        Arc::new(SqliteStore::new(self.pool.clone()))
    }
}

/// Store plus evaluator over the same database, with the built-in
/// permission codes registered.
pub async fn engine(db: &TestDb) -> anyhow::Result<(Arc<SqliteStore>, ScopedPolicyEvaluator)> {
    let store = db.store();
    for code in permissions::ALL.iter() {
        store.create_permission(code, None).await?;
    }
    let evaluator = ScopedPolicyEvaluator::from_store(store.clone());
    Ok((store, evaluator))
}

pub async fn active_user(store: &SqliteStore, name: &str) -> anyhow::Result<Principal> {
    Ok(store.create_user(name, false, true).await?.principal())
}
