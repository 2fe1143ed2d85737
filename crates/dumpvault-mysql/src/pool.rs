//! Connection pool wrapper.

use async_trait::async_trait;
use dumpvault_core::DatabasePassword;
use dumpvault_core::{DatabaseConfig, SessionSource, VaultResult};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;

use crate::error;
use crate::session::MySqlSession;

/// [`SessionSource`] over a shared sqlx MySQL pool.
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct MySqlSource {
    pool: MySqlPool,
}

impl MySqlSource {
    /// Open a pool sized and timed from `config`, connecting eagerly so bad
    /// credentials surface here.
    ///
    /// `password` is the resolved clear-text password, if any.
    pub async fn connect(config: &DatabaseConfig, password: Option<&DatabasePassword>) -> VaultResult<Self> {
        config.validate()?;
        let pool = pool_options(config)
            .connect_with(connect_options(config, password))
            .await
            .map_err(error::connection)?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            user = %config.user,
            pool_size = %config.pool_size,
            "Connected to MySQL"
        );
        Ok(Self { pool })
    }

    /// Like [`connect`](Self::connect), but no connection is opened until
    /// the first checkout.
    pub fn connect_lazy(config: &DatabaseConfig, password: Option<&DatabasePassword>) -> VaultResult<Self> {
        config.validate()?;
        let pool = pool_options(config).connect_lazy_with(connect_options(config, password));
        tracing::debug!(host = %config.host, port = config.port, "Created lazy MySQL pool");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn connect_options(config: &DatabaseConfig, password: Option<&DatabasePassword>) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user);
    if let Some(password) = password {
        options = options.password(password.expose());
    }
    if let Some(database) = &config.database {
        options = options.database(database);
    }
    options
}

fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(config.pool_size.as_u32())
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
}

#[async_trait]
impl SessionSource for MySqlSource {
    type Session = MySqlSession;

    async fn checkout(&self) -> VaultResult<MySqlSession> {
        let connection = self.pool.acquire().await.map_err(error::connection)?;
        Ok(MySqlSession::new(connection))
    }
}
