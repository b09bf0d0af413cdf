#![forbid(unsafe_code)]

use super::{SectionRow, SqliteStore, StoreError};
use serde::Serialize;
use std::collections::HashMap;

/// One section in the projected forest, children sorted by order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SectionNode {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub section_key: String,
    pub name: String,
    pub is_leaf: bool,
    pub order: i64,
    pub children: Vec<SectionNode>,
}

impl SqliteStore {
    /// Projects the whole store into an ordered forest: roots by order,
    /// children by order, recursively.
    pub fn tree(&self) -> Result<Vec<SectionNode>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, parent_id, section_key, name, is_leaf, ord FROM sections",
        )?;
        let mut rows = stmt.query([])?;

        let mut by_parent: HashMap<Option<i64>, Vec<SectionRow>> = HashMap::new();
        while let Some(row) = rows.next()? {
            let section = SectionRow {
                id: row.get(0)?,
                parent_id: row.get(1)?,
                section_key: row.get(2)?,
                name: row.get(3)?,
                is_leaf: row.get(4)?,
                ord: row.get(5)?,
            };
            by_parent.entry(section.parent_id).or_default().push(section);
        }

        for group in by_parent.values_mut() {
            group.sort_by_key(|row| (row.ord, row.id));
        }

        Ok(assemble(by_parent))
    }
}

/// Iterative depth-first assembly: a frame closes once every child
/// below it has been built, so the walk is bounded by an explicit
/// stack rather than tree depth.
fn assemble(mut by_parent: HashMap<Option<i64>, Vec<SectionRow>>) -> Vec<SectionNode> {
    struct Frame {
        row: Option<SectionRow>,
        pending: Vec<SectionRow>,
        built: Vec<SectionNode>,
    }

    fn frame(row: Option<SectionRow>, mut pending: Vec<SectionRow>) -> Frame {
        // Popped from the back, so reverse to visit in group order.
        pending.reverse();
        Frame {
            row,
            pending,
            built: Vec::new(),
        }
    }

    let roots = by_parent.remove(&None).unwrap_or_default();
    let mut current = frame(None, roots);
    let mut parents: Vec<Frame> = Vec::new();

    loop {
        if let Some(row) = current.pending.pop() {
            let children = by_parent.remove(&Some(row.id)).unwrap_or_default();
            let child_frame = frame(Some(row), children);
            parents.push(std::mem::replace(&mut current, child_frame));
            continue;
        }

        // Only the bottom frame has no row of its own; closing it ends
        // the walk with the finished forest.
        let (Some(row), Some(mut parent)) = (current.row.take(), parents.pop()) else {
            return current.built;
        };

        parent.built.push(SectionNode {
            id: row.id,
            parent_id: row.parent_id,
            section_key: row.section_key,
            name: row.name,
            is_leaf: row.is_leaf,
            order: row.ord,
            children: std::mem::take(&mut current.built),
        });
        current = parent;
    }
}
