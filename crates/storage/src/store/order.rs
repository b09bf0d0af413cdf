#![forbid(unsafe_code)]

//! Sibling-order algebra. Every helper is scoped to one sibling group,
//! identified by a nullable parent id; `parent_id IS ?` treats the root
//! group (no parent) as an ordinary group rather than a special case.

use super::StoreError;
use rusqlite::{Transaction, params};

/// Highest order in a group, 0 when the group is empty. `exclude_id`
/// leaves one node out of the reckoning (the node being moved or
/// deleted).
pub(crate) fn max_order_tx(
    tx: &Transaction<'_>,
    parent_id: Option<i64>,
    exclude_id: Option<i64>,
) -> Result<i64, StoreError> {
    Ok(tx.query_row(
        "SELECT COALESCE(MAX(ord), 0) FROM sections \
         WHERE parent_id IS ?1 AND (?2 IS NULL OR id <> ?2)",
        params![parent_id, exclude_id],
        |row| row.get(0),
    )?)
}

/// Number of nodes in a group, optionally leaving one node out. The
/// valid insertion positions for that group are `1 ..= count + 1`.
pub(crate) fn sibling_count_tx(
    tx: &Transaction<'_>,
    parent_id: Option<i64>,
    exclude_id: Option<i64>,
) -> Result<i64, StoreError> {
    Ok(tx.query_row(
        "SELECT COUNT(*) FROM sections \
         WHERE parent_id IS ?1 AND (?2 IS NULL OR id <> ?2)",
        params![parent_id, exclude_id],
        |row| row.get(0),
    )?)
}

/// Shifts every sibling above position `above` down by one, closing the
/// hole a departing node leaves behind.
pub(crate) fn close_gap_tx(
    tx: &Transaction<'_>,
    parent_id: Option<i64>,
    above: i64,
    exclude_id: i64,
) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE sections SET ord = ord - 1 \
         WHERE parent_id IS ?1 AND ord > ?2 AND id <> ?3",
        params![parent_id, above, exclude_id],
    )?;
    Ok(())
}

/// Shifts every sibling at or above position `at` up by one, making
/// room for an arriving node.
pub(crate) fn open_slot_tx(
    tx: &Transaction<'_>,
    parent_id: Option<i64>,
    at: i64,
    exclude_id: i64,
) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE sections SET ord = ord + 1 \
         WHERE parent_id IS ?1 AND ord >= ?2 AND id <> ?3",
        params![parent_id, at, exclude_id],
    )?;
    Ok(())
}
