#![forbid(unsafe_code)]

//! Ancestry and subtree walks over `parent_id` references. Both walks
//! use explicit worklists with a visited set, so a corrupted chain can
//! never recurse or loop unboundedly.

use super::StoreError;
use rusqlite::{OptionalExtension, Transaction, params};
use std::collections::BTreeSet;

/// True when `candidate` is `node` itself or lies inside `node`'s
/// subtree, i.e. reparenting `node` under `candidate` would create a
/// cycle. Walks upward from `candidate` through `parent_id`.
pub(crate) fn would_create_cycle_tx(
    tx: &Transaction<'_>,
    node: i64,
    candidate: i64,
) -> Result<bool, StoreError> {
    let mut current = Some(candidate);
    let mut seen = BTreeSet::new();

    while let Some(id) = current {
        if id == node {
            return Ok(true);
        }
        if !seen.insert(id) {
            return Err(StoreError::InvalidInput("parent chain contains a cycle"));
        }

        current = tx
            .query_row(
                "SELECT parent_id FROM sections WHERE id=?1",
                params![id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
    }

    Ok(false)
}

/// The node and every transitive descendant, parents before children.
pub(crate) fn subtree_ids_tx(tx: &Transaction<'_>, root: i64) -> Result<Vec<i64>, StoreError> {
    let mut out = Vec::new();
    let mut worklist = vec![root];

    while let Some(id) = worklist.pop() {
        out.push(id);
        let mut stmt = tx.prepare("SELECT id FROM sections WHERE parent_id=?1")?;
        let mut rows = stmt.query(params![id])?;
        while let Some(row) = rows.next()? {
            worklist.push(row.get::<_, i64>(0)?);
        }
    }

    Ok(out)
}
