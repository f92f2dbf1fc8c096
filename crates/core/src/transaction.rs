//! Transaction seam wrapped around every parse call.
//!
//! The engine enters a scope before processing, commits on success and rolls
//! back on error; read-only runs roll back unconditionally. The default
//! implementation does nothing, which suits backends whose writes are already
//! transactional or disposable.

/// One transactional scope per parse call. Implementations are re-entered for
/// each call, never nested.
pub trait TransactionScope {
    fn begin(&mut self) -> anyhow::Result<()>;
    fn commit(&mut self) -> anyhow::Result<()>;
    fn rollback(&mut self) -> anyhow::Result<()>;
}

/// No-op scope for backends without revert support.
#[derive(Debug, Default)]
pub struct NoopTransaction;

impl TransactionScope for NoopTransaction {
    fn begin(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
