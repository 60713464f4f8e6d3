//! sqlx-backed implementation of the audit port.

use async_trait::async_trait;
use sqlx::MySqlPool;

use attendance_core::ports::{AuditError, AuditRecorder};

const INSERT_SQL: &str = "INSERT INTO sv_logs \
    (idFormando, refAcao, dataregisto, registo, menu, username) \
    VALUES (?, ?, NOW(), ?, ?, 'system')";

/// Appends action rows to the `sv_logs` audit table. Append-only, no
/// idempotency; the orchestrator downgrades failures to warnings.
pub struct SqlAuditRecorder {
    pool: MySqlPool,
}

impl SqlAuditRecorder {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRecorder for SqlAuditRecorder {
    async fn record_action(
        &self,
        entity_id: &str,
        message: &str,
        category: &str,
        action_ref: &str,
    ) -> Result<(), AuditError> {
        sqlx::query(INSERT_SQL)
            .bind(entity_id)
            .bind(action_ref)
            .bind(message)
            .bind(category)
            .execute(&self.pool)
            .await
            .map_err(|e| AuditError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_uses_the_system_actor_and_server_timestamp() {
        assert!(INSERT_SQL.contains("'system'"));
        assert!(INSERT_SQL.contains("NOW()"));
        assert_eq!(INSERT_SQL.matches('?').count(), 4);
    }
}
