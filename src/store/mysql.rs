use crate::config::DbPool;

/// MySQL backend. Repository impls live next to their module in `crud.rs`.
#[derive(Clone)]
pub struct MySqlStore {
    pub(crate) pool: DbPool,
}

impl MySqlStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// True when the error is a duplicate-key violation (MySQL error 1062).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
