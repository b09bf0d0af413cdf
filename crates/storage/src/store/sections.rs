#![forbid(unsafe_code)]

//! Single-section mutations. Each public operation runs in one
//! transaction: order shifts, parent updates, and leaf recomputation
//! land together or not at all.

use super::lineage::{subtree_ids_tx, would_create_cycle_tx};
use super::order::{close_gap_tx, max_order_tx, open_slot_tx, sibling_count_tx};
use super::{
    CreateSectionRequest, DeleteSectionRequest, MoveSectionRequest, RenameSectionRequest,
    SECTION_KEY_SEQ, SqliteStore, StoreError, is_constraint_violation, next_counter_tx,
    ordered_children_tx, recompute_leaf_tx, section_exists_tx, section_row_tx,
};
use rusqlite::params;
use toc_core::name::clean_name;
use toc_core::strategy::DeleteStrategy;

impl SqliteStore {
    /// Inserts a section at the end of its sibling group and returns
    /// the new id. The section key is drawn from a persistent sequence,
    /// so generated keys never repeat across the life of the store.
    pub fn create_section(&mut self, request: CreateSectionRequest) -> Result<i64, StoreError> {
        let name = clean_name(&request.name)
            .map_err(|_| StoreError::InvalidInput("name must not be empty"))?;

        let now_ms = self.now();
        let tx = self.conn.transaction()?;

        if let Some(parent_id) = request.parent_id
            && !section_exists_tx(&tx, parent_id)?
        {
            return Err(StoreError::NotFound("parent section"));
        }

        let next_order = max_order_tx(&tx, request.parent_id, None)? + 1;

        // An imported template may legitimately contain a key of the
        // generated form; skip past it rather than fail. The only
        // violable constraint on this insert is the key's uniqueness,
        // and the sequence is strictly increasing, so the loop ends.
        let id = loop {
            let seq = next_counter_tx(&tx, SECTION_KEY_SEQ)?;
            let section_key = format!("new-{seq:06}");

            let insert = tx.execute(
                "INSERT INTO sections(section_key, name, parent_id, is_leaf, ord, updated_at_ms) \
                 VALUES (?1, ?2, ?3, 1, ?4, ?5)",
                params![section_key, name, request.parent_id, next_order, now_ms],
            );
            match insert {
                Ok(_) => break tx.last_insert_rowid(),
                Err(err) if is_constraint_violation(&err) => continue,
                Err(err) => return Err(StoreError::Sql(err)),
            }
        };

        if let Some(parent_id) = request.parent_id {
            recompute_leaf_tx(&tx, parent_id, now_ms)?;
        }

        tx.commit()?;
        Ok(id)
    }

    pub fn rename_section(&mut self, request: RenameSectionRequest) -> Result<i64, StoreError> {
        let name = clean_name(&request.name)
            .map_err(|_| StoreError::InvalidInput("name must not be empty"))?;

        let now_ms = self.now();
        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE sections SET name=?2, updated_at_ms=?3 WHERE id=?1",
            params![request.id, name, now_ms],
        )?;
        if updated != 1 {
            return Err(StoreError::NotFound("section"));
        }

        tx.commit()?;
        Ok(request.id)
    }

    /// Relocates a section to a new parent and/or slot. Position bounds
    /// are computed against the target group with the moving node left
    /// out, so a move within the same parent cannot inflate the range.
    pub fn move_section(&mut self, request: MoveSectionRequest) -> Result<(), StoreError> {
        let MoveSectionRequest {
            id,
            new_parent_id,
            new_order,
        } = request;

        let now_ms = self.now();
        let tx = self.conn.transaction()?;

        let section = section_row_tx(&tx, id)?.ok_or(StoreError::NotFound("section"))?;

        if new_order < 1 {
            return Err(StoreError::InvalidInput("new_order must be >= 1"));
        }

        if let Some(target) = new_parent_id {
            if !section_exists_tx(&tx, target)? {
                return Err(StoreError::NotFound("target parent section"));
            }
            if would_create_cycle_tx(&tx, id, target)? {
                return Err(StoreError::InvalidMove);
            }
        }

        let max_next = sibling_count_tx(&tx, new_parent_id, Some(id))? + 1;
        if new_order > max_next {
            return Err(StoreError::OrderOutOfRange {
                requested: new_order,
                max: max_next,
            });
        }

        close_gap_tx(&tx, section.parent_id, section.ord, id)?;
        open_slot_tx(&tx, new_parent_id, new_order, id)?;
        tx.execute(
            "UPDATE sections SET parent_id=?2, ord=?3, updated_at_ms=?4 WHERE id=?1",
            params![id, new_parent_id, new_order, now_ms],
        )?;

        // Both ends of the move, even when they coincide.
        for parent_id in [section.parent_id, new_parent_id] {
            if let Some(parent_id) = parent_id {
                recompute_leaf_tx(&tx, parent_id, now_ms)?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn delete_section(&mut self, request: DeleteSectionRequest) -> Result<(), StoreError> {
        let now_ms = self.now();
        let tx = self.conn.transaction()?;

        let section =
            section_row_tx(&tx, request.id)?.ok_or(StoreError::NotFound("section"))?;

        match request.strategy {
            DeleteStrategy::LiftChildren => {
                let child_ids = ordered_children_tx(&tx, section.id)?;

                // Close the gap first; the appended children then land
                // after a contiguous run of surviving siblings.
                close_gap_tx(&tx, section.parent_id, section.ord, section.id)?;
                let base_order = max_order_tx(&tx, section.parent_id, Some(section.id))?;

                for (offset, child_id) in child_ids.iter().enumerate() {
                    tx.execute(
                        "UPDATE sections SET parent_id=?2, ord=?3, updated_at_ms=?4 WHERE id=?1",
                        params![
                            child_id,
                            section.parent_id,
                            base_order + 1 + offset as i64,
                            now_ms
                        ],
                    )?;
                }

                tx.execute("DELETE FROM sections WHERE id=?1", params![section.id])?;
            }
            DeleteStrategy::Cascade => {
                let subtree = subtree_ids_tx(&tx, section.id)?;
                // Children first, to satisfy the parent foreign key.
                for id in subtree.iter().rev() {
                    tx.execute("DELETE FROM sections WHERE id=?1", params![id])?;
                }
                close_gap_tx(&tx, section.parent_id, section.ord, section.id)?;
            }
        }

        if let Some(parent_id) = section.parent_id {
            recompute_leaf_tx(&tx, parent_id, now_ms)?;
        }

        tx.commit()?;
        Ok(())
    }
}
