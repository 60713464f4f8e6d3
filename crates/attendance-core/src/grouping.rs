//! Grouping of session rows by business key, and the session-id lookup used
//! to reconcile API results back to instructor rows.

use std::collections::{BTreeMap, HashMap};

use crate::model::SessionRow;

/// Bucket for rows that carry no business key.
pub const UNGROUPED_KEY: &str = "SEM_REF";

/// Partitions rows by action ref. Each group holds the distinct session ids
/// in sorted order, so grouping the same rows always yields the same groups
/// regardless of row order or duplication.
pub fn group_sessions(rows: &[SessionRow]) -> BTreeMap<String, Vec<i64>> {
    let mut groups: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for row in rows {
        let key = row
            .action_ref
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(UNGROUPED_KEY);
        groups.entry(key.to_string()).or_default().push(row.session_id);
    }
    for ids in groups.values_mut() {
        ids.sort_unstable();
        ids.dedup();
    }
    groups
}

/// Lookup from session id to every instructor row of that session. Built once
/// per run so reconciling API results stays O(rows).
pub fn index_by_session(rows: &[SessionRow]) -> HashMap<i64, Vec<&SessionRow>> {
    let mut index: HashMap<i64, Vec<&SessionRow>> = HashMap::new();
    for row in rows {
        index.entry(row.session_id).or_default().push(row);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(session_id: i64, action_ref: Option<&str>, instructor_code: i64) -> SessionRow {
        SessionRow {
            session_id,
            date: None,
            start_time: None,
            end_time: None,
            module_id: None,
            session_number: None,
            instructor_name: None,
            course: None,
            action_number: 0,
            action_ref: action_ref.map(String::from),
            instructor_code,
            email: None,
        }
    }

    #[test]
    fn grouping_is_idempotent_and_order_independent() {
        let rows = vec![
            row(2, Some("B"), 1),
            row(1, Some("A"), 1),
            row(1, Some("A"), 2),
            row(3, Some("A"), 1),
        ];
        let mut shuffled = rows.clone();
        shuffled.reverse();

        let first = group_sessions(&rows);
        let second = group_sessions(&rows);
        let third = group_sessions(&shuffled);

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(first["A"], vec![1, 3]);
        assert_eq!(first["B"], vec![2]);
    }

    #[test]
    fn missing_or_blank_ref_falls_into_catch_all() {
        let rows = vec![row(1, None, 1), row(2, Some("  "), 1), row(3, Some("A"), 1)];
        let groups = group_sessions(&rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[UNGROUPED_KEY], vec![1, 2]);
        assert_eq!(groups["A"], vec![3]);
    }

    #[test]
    fn duplicate_session_ids_collapse_within_a_group() {
        let rows = vec![row(9, Some("A"), 1), row(9, Some("A"), 2), row(9, Some("A"), 3)];
        let groups = group_sessions(&rows);
        assert_eq!(groups["A"], vec![9]);
    }

    #[test]
    fn index_keeps_one_entry_per_instructor() {
        let rows = vec![row(9, Some("A"), 1), row(9, Some("A"), 2), row(4, Some("A"), 1)];
        let index = index_by_session(&rows);
        assert_eq!(index[&9].len(), 2);
        assert_eq!(index[&4].len(), 1);
        assert!(!index.contains_key(&5));
    }
}
