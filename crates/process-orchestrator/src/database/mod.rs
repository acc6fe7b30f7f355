/*
 *  Copyright 2026 Process Orchestrator Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Database connection management.
//!
//! `Database` owns a connection pool for exactly one backend (PostgreSQL
//! or SQLite, selected at runtime from the configured URL scheme) and runs
//! the embedded schema migrations for that backend on startup. The DAL
//! (`crate::dal`) dispatches every query through the [`dispatch_conn`]
//! macro so that one set of Diesel models and queries (`schema.rs`) serves
//! both backends.

pub mod schema;
pub mod universal_types;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::StoreError;

#[cfg(feature = "postgres")]
pub const POSTGRES_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");
#[cfg(feature = "sqlite")]
pub const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// Which relational backend a [`Database`] is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    #[cfg(feature = "postgres")]
    Postgres,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

/// The connection pool, tagged by backend.
#[derive(Clone)]
pub enum AnyPool {
    #[cfg(feature = "postgres")]
    Postgres(deadpool_diesel::postgres::Pool),
    #[cfg(feature = "sqlite")]
    Sqlite(deadpool_diesel::sqlite::Pool),
}

/// A connection pool plus the backend it was built for.
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
    backend: BackendType,
}

impl Database {
    /// Connects to the backend named by `config.url`'s scheme
    /// (`postgres://...` or `sqlite://...`/a bare filesystem path) and
    /// runs embedded migrations synchronously before returning.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if config.url.starts_with("postgres://") || config.url.starts_with("postgresql://") {
            #[cfg(feature = "postgres")]
            {
                return Self::connect_postgres(config);
            }
            #[cfg(not(feature = "postgres"))]
            {
                return Err(StoreError::Pool(
                    "postgres URL given but the \"postgres\" feature is not enabled".into(),
                ));
            }
        }

        #[cfg(feature = "sqlite")]
        {
            Self::connect_sqlite(config)
        }
        #[cfg(not(feature = "sqlite"))]
        {
            Err(StoreError::Pool(
                "sqlite URL given but the \"sqlite\" feature is not enabled".into(),
            ))
        }
    }

    #[cfg(feature = "postgres")]
    fn connect_postgres(config: &DatabaseConfig) -> Result<Self, StoreError> {
        use deadpool_diesel::postgres::{Manager, Pool};
        use deadpool_diesel::Runtime;

        // Must run before the first libpq connection is opened: OpenSSL's
        // own init racing libpq's on the first TLS handshake is a known
        // cause of a SIGSEGV on Linux. See
        // https://github.com/diesel-rs/diesel/issues/3441
        openssl::init();

        let manager = Manager::new(config.url.clone(), Runtime::Tokio1);
        let pool = Pool::builder(manager)
            .max_size(config.pool_max_size as usize)
            .wait_timeout(Some(Duration::from_millis(config.connection_timeout_ms)))
            .build()
            .map_err(StoreError::pool)?;

        {
            use diesel::Connection;
            let mut conn = diesel::PgConnection::establish(&config.url).map_err(|e| {
                StoreError::Migration(format!("could not open migration connection: {e}"))
            })?;
            conn.run_pending_migrations(POSTGRES_MIGRATIONS)
                .map(|_| ())
                .map_err(|e| StoreError::Migration(e.to_string()))?;
        }

        info!(backend = "postgres", "database connection pool initialized");
        Ok(Database {
            pool: AnyPool::Postgres(pool),
            backend: BackendType::Postgres,
        })
    }

    #[cfg(feature = "sqlite")]
    fn connect_sqlite(config: &DatabaseConfig) -> Result<Self, StoreError> {
        use deadpool_diesel::sqlite::{Manager, Pool};
        use deadpool_diesel::Runtime;

        let path = config
            .url
            .strip_prefix("sqlite://")
            .unwrap_or(&config.url)
            .to_string();

        {
            use diesel::Connection;
            let mut conn = diesel::SqliteConnection::establish(&path).map_err(|e| {
                StoreError::Migration(format!("could not open migration connection: {e}"))
            })?;
            conn.run_pending_migrations(SQLITE_MIGRATIONS)
                .map(|_| ())
                .map_err(|e| StoreError::Migration(e.to_string()))?;
        }

        let manager = Manager::new(path, Runtime::Tokio1);
        let pool = Pool::builder(manager)
            .max_size(config.pool_max_size as usize)
            .wait_timeout(Some(Duration::from_millis(config.connection_timeout_ms)))
            .build()
            .map_err(StoreError::pool)?;

        info!(backend = "sqlite", "database connection pool initialized");
        Ok(Database {
            pool: AnyPool::Sqlite(pool),
            backend: BackendType::Sqlite,
        })
    }

    pub fn backend(&self) -> BackendType {
        self.backend
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

/// Runs a Diesel query `$body` against whichever backend `$self.database`
/// (a `Database`) was built for, obtaining a pooled connection and
/// flattening the nested pool/interact/query errors into [`StoreError`].
///
/// `$body` is written once and must compile against both `&mut PgConnection`
/// and `&mut SqliteConnection` — true of ordinary CRUD built from the
/// backend-agnostic column types in `schema.rs`.
#[macro_export]
macro_rules! dispatch_conn {
    ($database:expr, $conn:ident, $body:expr) => {{
        use $crate::database::AnyPool;
        match $database.pool() {
            #[cfg(feature = "postgres")]
            AnyPool::Postgres(pool) => {
                let obj = pool.get().await.map_err($crate::error::StoreError::pool)?;
                obj.interact(move |$conn| $body)
                    .await
                    .map_err($crate::error::StoreError::interact)?
            }
            #[cfg(feature = "sqlite")]
            AnyPool::Sqlite(pool) => {
                let obj = pool.get().await.map_err($crate::error::StoreError::pool)?;
                obj.interact(move |$conn| {
                    // SQLite does not enforce foreign keys by default; the
                    // migration's `ON DELETE CASCADE` only takes effect if
                    // this is set on every connection that touches it.
                    let _ = diesel::connection::SimpleConnection::batch_execute(
                        $conn,
                        "PRAGMA foreign_keys = ON;",
                    );
                    $body
                })
                .await
                .map_err($crate::error::StoreError::interact)?
            }
        }
    }};
}

pub use dispatch_conn;
