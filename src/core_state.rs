//! Transport-agnostic application state.
//!
//! `CoreState` is built once at startup and shared via `Arc` between the HTTP
//! handlers and the WebSocket sessions. It owns the store and the services
//! layered on it.

use std::sync::Arc;

use crate::assignment::AssignmentService;
use crate::config::AppConfig;
use crate::db::DatabaseError;
use crate::realtime::BedSynchronizer;
use crate::store::{EntityStore, SqliteStore};

pub struct CoreState {
    pub config: AppConfig,
    store: Arc<SqliteStore>,
    service: Arc<AssignmentService>,
    synchronizer: BedSynchronizer,
}

impl CoreState {
    pub fn new(config: AppConfig, store: Arc<SqliteStore>) -> Self {
        let shared: Arc<dyn EntityStore> = store.clone();
        let service = Arc::new(AssignmentService::new(shared.clone(), config.department_policy));
        let synchronizer = BedSynchronizer::new(shared);
        Self {
            config,
            store,
            service,
            synchronizer,
        }
    }

    /// Open the configured database file and build the state around it.
    pub fn open(config: AppConfig) -> Result<Self, DatabaseError> {
        let store = Arc::new(SqliteStore::open(&config.db_path)?);
        Ok(Self::new(config, store))
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    pub fn assignments(&self) -> &Arc<AssignmentService> {
        &self.service
    }

    pub fn synchronizer(&self) -> &BedSynchronizer {
        &self.synchronizer
    }
}
