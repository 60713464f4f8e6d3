//! sqlx-backed implementation of the session query port.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

use attendance_core::model::SessionRow;
use attendance_core::ports::{QueryError, SessionGateway};

/// Reads the (session, instructor) rows scheduled for a date. Responsible
/// only for the query and row mapping; the failure policy lives with the
/// orchestrator.
pub struct SqlSessionGateway {
    pool: MySqlPool,
    excluded_instructors: Vec<i64>,
}

impl SqlSessionGateway {
    pub fn new(pool: MySqlPool, excluded_instructors: Vec<i64>) -> Self {
        Self {
            pool,
            excluded_instructors,
        }
    }
}

/// In-person sessions on the target date, one row per instructor, restricted
/// to instructors with a resolvable email (first of the two contact fields).
/// The date is bound; the deny-list is configuration-validated integers,
/// interpolated as literals because MySQL cannot bind an `IN` list.
fn sessions_sql(excluded: &[i64]) -> String {
    let mut sql = String::from(
        "SELECT DISTINCT \
           s.versao_rowid, \
           CAST(s.Data AS DATE) AS Data, \
           CAST(s.Hora_Inicio AS CHAR) AS Hora_Inicio, \
           CAST(s.Hora_Fim AS CHAR) AS Hora_Fim, \
           s.Rowid_Modulo, \
           CAST(s.Num_Sessao AS CHAR) AS Num_Sessao, \
           f.Nome_Abreviado, \
           cu.Descricao, \
           a.Numero_Accao, \
           a.Ref_Accao, \
           f.Codigo_Formador, \
           COALESCE(c.Email1, c.Email2) AS Email \
         FROM TBForSessoesFormadores sf \
         INNER JOIN TBForSessoes s ON s.versao_rowid = sf.rowid_sessao \
         INNER JOIN TBForAccoes a ON s.Rowid_Accao = a.versao_rowid \
         INNER JOIN TBForFormadores f ON f.Codigo_Formador = sf.codigo_formador \
         INNER JOIN TBGerContactos c ON f.versao_rowid = c.Codigo_Entidade AND c.Tipo_Entidade = 4 \
         INNER JOIN TBForCursos cu ON cu.Codigo_Curso = a.Codigo_Curso \
         WHERE CAST(s.Data AS DATE) = ? \
           AND s.Comp_elr = 'P' \
           AND COALESCE(c.Email1, c.Email2) IS NOT NULL",
    );
    if !excluded.is_empty() {
        let list = excluded
            .iter()
            .map(|code| code.to_string())
            .collect::<Vec<_>>()
            .join(",");
        sql.push_str(" AND f.Codigo_Formador NOT IN (");
        sql.push_str(&list);
        sql.push(')');
    }
    sql
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn row_to_session(r: &MySqlRow) -> Result<SessionRow, sqlx::Error> {
    Ok(SessionRow {
        session_id: i64::from(r.try_get::<i32, _>("versao_rowid")?),
        date: r.try_get::<Option<NaiveDate>, _>("Data")?,
        start_time: trimmed(r.try_get("Hora_Inicio")?),
        end_time: trimmed(r.try_get("Hora_Fim")?),
        module_id: r
            .try_get::<Option<i32>, _>("Rowid_Modulo")?
            .map(i64::from),
        session_number: trimmed(r.try_get("Num_Sessao")?),
        instructor_name: trimmed(r.try_get("Nome_Abreviado")?),
        course: trimmed(r.try_get("Descricao")?),
        action_number: r
            .try_get::<Option<i32>, _>("Numero_Accao")?
            .map(i64::from)
            .unwrap_or(0),
        action_ref: trimmed(r.try_get("Ref_Accao")?),
        instructor_code: r
            .try_get::<Option<i32>, _>("Codigo_Formador")?
            .map(i64::from)
            .unwrap_or(0),
        email: trimmed(r.try_get("Email")?),
    })
}

#[async_trait]
impl SessionGateway for SqlSessionGateway {
    async fn fetch_sessions(&self, target: NaiveDate) -> Result<Vec<SessionRow>, QueryError> {
        let sql = sessions_sql(&self.excluded_instructors);
        let rows = sqlx::query(&sql)
            .bind(target)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| QueryError(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for r in &rows {
            match row_to_session(r) {
                Ok(session) => out.push(session),
                Err(e) => {
                    // a malformed row must not sink the whole day's batch
                    tracing::warn!(error = %e, "skipping malformed session row");
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_list_is_rendered_as_a_literal_not_in() {
        let sql = sessions_sql(&[699, 704, 827]);
        assert!(sql.contains("NOT IN (699,704,827)"));
    }

    #[test]
    fn empty_deny_list_omits_the_clause() {
        let sql = sessions_sql(&[]);
        assert!(!sql.contains("NOT IN"));
    }

    #[test]
    fn query_filters_in_person_sessions_with_email() {
        let sql = sessions_sql(&[]);
        assert!(sql.contains("s.Comp_elr = 'P'"));
        assert!(sql.contains("COALESCE(c.Email1, c.Email2) IS NOT NULL"));
        assert!(sql.contains("CAST(s.Data AS DATE) = ?"));
        assert!(sql.starts_with("SELECT DISTINCT"));
    }

    #[test]
    fn trimming_drops_blank_values() {
        assert_eq!(trimmed(Some("  a  ".into())), Some("a".to_string()));
        assert_eq!(trimmed(Some("   ".into())), None);
        assert_eq!(trimmed(None), None);
    }
}
