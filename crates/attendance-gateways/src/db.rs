use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

use crate::SetupError;

/// Lazy pool: nothing connects until the first query, so an unreachable
/// database degrades the run instead of failing startup. Only a malformed
/// URL is rejected here.
pub fn mysql_pool(url: &str) -> Result<MySqlPool, SetupError> {
    MySqlPoolOptions::new()
        .max_connections(4)
        .connect_lazy(url)
        .map_err(|e| SetupError(format!("database pool: {e}")))
}
