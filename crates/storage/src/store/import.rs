#![forbid(unsafe_code)]

//! Atomic full-tree rebuild from a normalized template. The previous
//! tree is only destroyed after the payload has passed validation, and
//! the truncate, inserts, parent resolution, and leaf recomputation all
//! share one transaction.

use super::{
    ImportSummary, SqliteStore, StoreError, map_key_conflict, recompute_all_leaves_tx,
};
use rusqlite::{Transaction, params};
use toc_core::{TemplateItem, validate_items};
use tracing::info;

impl SqliteStore {
    /// Replaces the entire section tree with `items`. Items must come
    /// out of [`toc_core::normalize_items`]; validation is re-run here
    /// so an invalid payload can never reach the truncate.
    pub fn import_items(&mut self, items: &[TemplateItem]) -> Result<ImportSummary, StoreError> {
        validate_items(items)?;

        info!(items = items.len(), "starting section import");

        let now_ms = self.now();
        let tx = self.conn.transaction()?;

        truncate_sections_tx(&tx)?;

        // Insert everything parentless first; keys are resolvable only
        // once the whole set is present.
        for item in items {
            let insert = tx.execute(
                "INSERT INTO sections(section_key, name, parent_id, is_leaf, ord, updated_at_ms) \
                 VALUES (?1, ?2, NULL, 1, ?3, ?4)",
                params![item.section_key, item.name, item.order, now_ms],
            );
            if let Err(err) = insert {
                return Err(map_key_conflict(err, &item.section_key));
            }
        }

        for item in items {
            let Some(parent_key) = item.parent_key.as_deref() else {
                continue;
            };
            let updated = tx.execute(
                "UPDATE sections \
                 SET parent_id = (SELECT p.id FROM sections p WHERE p.section_key = ?2), \
                     updated_at_ms = ?3 \
                 WHERE section_key = ?1 \
                   AND EXISTS (SELECT 1 FROM sections p WHERE p.section_key = ?2)",
                params![item.section_key, parent_key, now_ms],
            )?;
            if updated != 1 {
                return Err(StoreError::InvalidParentKey {
                    section_key: item.section_key.clone(),
                    parent_key: parent_key.to_string(),
                });
            }
        }

        recompute_all_leaves_tx(&tx, now_ms)?;

        let inserted =
            tx.query_row("SELECT COUNT(*) FROM sections", [], |row| row.get(0))?;
        let roots = tx.query_row(
            "SELECT COUNT(*) FROM sections WHERE parent_id IS NULL",
            [],
            |row| row.get(0),
        )?;
        let leaves = tx.query_row(
            "SELECT COUNT(*) FROM sections WHERE is_leaf = 1",
            [],
            |row| row.get(0),
        )?;

        tx.commit()?;

        info!(inserted, roots, leaves, "completed section import");
        Ok(ImportSummary {
            inserted,
            roots,
            leaves,
        })
    }
}

/// Empties the sections table unconditionally. Detaching every row
/// first satisfies `ON DELETE RESTRICT` even when a previous payload
/// smuggled in a parent cycle, so a rebuild is always a full replace.
fn truncate_sections_tx(tx: &Transaction<'_>) -> Result<(), StoreError> {
    tx.execute("UPDATE sections SET parent_id = NULL", [])?;
    tx.execute("DELETE FROM sections", [])?;
    Ok(())
}
