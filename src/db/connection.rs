use super::error::RepositoryError;
use super::{DbConnection, DbPool};
use anyhow::{Context, Result};
use diesel::PgConnection;
use diesel::r2d2::ConnectionManager;

/// PostgreSQL-backed store. Every repository trait is implemented on it,
/// one file per table under `repositories/`.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn connect(database_url: &str, max_size: u32) -> Result<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);

        let pool = diesel::r2d2::Pool::builder()
            .max_size(max_size)
            .build(manager)
            .context("Failed to create database pool")?;

        Ok(Self { pool })
    }

    pub fn conn(&self) -> Result<DbConnection, RepositoryError> {
        self.pool.get().map_err(Into::into)
    }

    pub fn max_size(&self) -> u32 {
        self.pool.max_size()
    }
}
