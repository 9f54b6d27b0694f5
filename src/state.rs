//! Shared application state, built once at startup.

use crate::config::Config;
use crate::store::TxCoordinator;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// The single write coordinator every store shares.
    pub tran: Arc<TxCoordinator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let tran = Arc::new(TxCoordinator::new(pool.clone(), config.tran_lock_timeout));
        AppState {
            pool,
            tran,
            config: Arc::new(config),
        }
    }
}
