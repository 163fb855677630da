use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{AdminError, Result};

/// Short-lived database client owned by a single command invocation.
///
/// Backed by a pool capped at one connection. Callers must call [`Database::close`]
/// once the command finishes, whether it succeeded or not.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = config.connect_options()?;
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(AdminError::ConnectionFailure)?;
        debug!("database connection acquired");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the bundled migrations inside sqlx's migration transactions.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("migrations applied");
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
        debug!("database connection released");
    }
}
