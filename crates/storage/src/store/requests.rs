#![forbid(unsafe_code)]

use toc_core::strategy::DeleteStrategy;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateSectionRequest {
    pub name: String,
    pub parent_id: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameSectionRequest {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveSectionRequest {
    pub id: i64,
    pub new_parent_id: Option<i64>,
    pub new_order: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteSectionRequest {
    pub id: i64,
    pub strategy: DeleteStrategy,
}

/// Counts reported after a completed import rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: i64,
    pub roots: i64,
    pub leaves: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreCounts {
    pub total: i64,
    pub roots: i64,
    pub leaves: i64,
}
