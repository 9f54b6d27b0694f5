//! Transaction coordinator: one write transaction at a time, process-wide.
//!
//! [`TxCoordinator::within_tran`] takes the write lock, begins a transaction,
//! runs the unit of work and commits it. Rollback is the default outcome; it
//! is skipped only after a successful commit. The lock guard is scoped to the
//! call, so it is released on every exit (error, panic, or the caller
//! dropping the future).

use crate::context::RequestContext;
use crate::error::AppError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::{PgConnection, PgPool, Postgres};
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::Mutex;

/// Something that can open transactions.
#[async_trait]
pub trait Transactor: Send + Sync + 'static {
    type Conn: Send;
    type Tx: TxHandle<Conn = Self::Conn>;

    async fn begin(&self) -> Result<Self::Tx, AppError>;
}

/// An open transaction. Dropping it without commit must roll it back.
#[async_trait]
pub trait TxHandle: Send {
    type Conn: Send;

    fn conn(&mut self) -> &mut Self::Conn;
    async fn commit(self) -> Result<(), AppError>;
    async fn rollback(self) -> Result<(), AppError>;
}

#[async_trait]
impl Transactor for PgPool {
    type Conn = PgConnection;
    type Tx = sqlx::Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, AppError> {
        Ok(PgPool::begin(self).await?)
    }
}

#[async_trait]
impl TxHandle for sqlx::Transaction<'static, Postgres> {
    type Conn = PgConnection;

    fn conn(&mut self) -> &mut PgConnection {
        &mut **self
    }

    async fn commit(self) -> Result<(), AppError> {
        Ok(sqlx::Transaction::commit(self).await?)
    }

    async fn rollback(self) -> Result<(), AppError> {
        Ok(sqlx::Transaction::rollback(self).await?)
    }
}

/// Serializes write transactions behind a single lock. Owned by the process
/// root and shared with every store.
pub struct TxCoordinator<T: Transactor = PgPool> {
    db: T,
    lock: Mutex<()>,
    lock_timeout: Duration,
}

impl<T: Transactor> TxCoordinator<T> {
    pub fn new(db: T, lock_timeout: Duration) -> Self {
        TxCoordinator {
            db,
            lock: Mutex::new(()),
            lock_timeout,
        }
    }

    /// Handle for queries that run outside any transaction.
    pub fn db(&self) -> &T {
        &self.db
    }

    /// Run `f` in a new serialized transaction.
    pub async fn within_tran<R, F>(&self, ctx: &RequestContext, f: F) -> Result<R, AppError>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut T::Conn) -> BoxFuture<'t, Result<R, AppError>> + Send,
    {
        self.run(ctx, None, f).await
    }

    /// Run `f` inside `outer` when the caller already holds a transaction,
    /// otherwise in a new one. A nested call never takes the lock or begins
    /// a second transaction.
    pub async fn run<R, F>(
        &self,
        ctx: &RequestContext,
        outer: Option<&mut T::Conn>,
        f: F,
    ) -> Result<R, AppError>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut T::Conn) -> BoxFuture<'t, Result<R, AppError>> + Send,
    {
        if let Some(conn) = outer {
            return f(conn).await;
        }

        let trace_id = ctx.trace_id();
        let _guard = tokio::time::timeout(self.lock_timeout, self.lock.lock())
            .await
            .map_err(|_| {
                AppError::request(
                    axum::http::StatusCode::SERVICE_UNAVAILABLE,
                    "timed out waiting for write lock",
                )
            })?;

        tracing::info!(trace_id, "begin db transaction");
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| e.context("begin db transaction"))?;

        let outcome = AssertUnwindSafe(f(tx.conn())).catch_unwind().await;
        match outcome {
            Ok(Ok(value)) => {
                tracing::info!(trace_id, "commit db transaction");
                tx.commit()
                    .await
                    .map_err(|e| e.context("commit db transaction"))?;
                Ok(value)
            }
            Ok(Err(err)) => {
                rollback(trace_id, tx).await;
                Err(err.context("exec db transaction"))
            }
            Err(panic) => {
                rollback(trace_id, tx).await;
                std::panic::resume_unwind(panic)
            }
        }
    }
}

async fn rollback<X: TxHandle>(trace_id: &str, tx: X) {
    tracing::info!(trace_id, "rollback db transaction");
    if let Err(err) = tx.rollback().await {
        tracing::error!(trace_id, error = %err, "unable to rollback db transaction");
    }
}
