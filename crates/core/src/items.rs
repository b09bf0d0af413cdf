#![forbid(unsafe_code)]

//! Normalization of raw import descriptors into fully-specified
//! template items: key generation for unnumbered sections, dotted-key
//! parent derivation, and per-group sequential order assignment.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// One entry of an import payload, as found on the wire. Everything
/// except the display name may be omitted.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSectionItem {
    #[serde(default, alias = "section_id")]
    pub section_key: Option<String>,
    #[serde(default, alias = "section_title")]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_key: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

/// A fully-resolved import item: key, parent reference, and order are
/// all present and validated against the rest of the set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateItem {
    pub section_key: String,
    pub name: String,
    pub parent_key: Option<String>,
    pub order: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemError {
    MissingName { index: usize },
    BadOrder { index: usize, order: i64 },
    DuplicateKey(String),
    InvalidParentKey { section_key: String, parent_key: String },
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName { index } => {
                write!(f, "item {index}: each section must include a non-empty name")
            }
            Self::BadOrder { index, order } => {
                write!(f, "item {index}: order must be >= 1 (got {order})")
            }
            Self::DuplicateKey(key) => write!(f, "duplicate section_key: {key}"),
            Self::InvalidParentKey {
                section_key,
                parent_key,
            } => write!(
                f,
                "invalid parent_key '{parent_key}' for section_key '{section_key}'"
            ),
        }
    }
}

impl std::error::Error for ItemError {}

const GENERATED_KEY_NAMESPACE: &str = "u";
const EMPTY_SLUG_FALLBACK: &str = "untitled";

/// Lowercases a name and collapses every non-alphanumeric run to a
/// single hyphen.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        EMPTY_SLUG_FALLBACK.to_string()
    } else {
        slug
    }
}

/// Resolves keys, parent references, and orders for every raw item, in
/// input order. Does not cross-validate the resulting set; see
/// [`validate_items`].
pub fn normalize_items(raw_items: &[RawSectionItem]) -> Result<Vec<TemplateItem>, ItemError> {
    let mut normalized = Vec::with_capacity(raw_items.len());
    let mut sibling_counts: HashMap<Option<String>, i64> = HashMap::new();
    let mut generated_key_counts: HashMap<String, i64> = HashMap::new();

    for (index, raw) in raw_items.iter().enumerate() {
        let name = raw
            .name
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ItemError::MissingName { index })?
            .to_string();

        let explicit_key = raw
            .section_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        // Unnumbered sections (e.g. "Preface") get a stable functional
        // key in a namespace that cannot collide with template keys.
        let generated = explicit_key.is_none();
        let section_key = match explicit_key {
            Some(key) => key.to_string(),
            None => {
                let base_slug = slugify(&name);
                let count = generated_key_counts.entry(base_slug.clone()).or_insert(0);
                *count += 1;
                if *count == 1 {
                    format!("{GENERATED_KEY_NAMESPACE}.{base_slug}")
                } else {
                    format!("{GENERATED_KEY_NAMESPACE}.{base_slug}.{count}")
                }
            }
        };

        let parent_key = match raw.parent_key.clone() {
            Some(parent) => Some(parent),
            // A dotted template key implies its parent; generated keys
            // are dotted by construction and carry no such meaning.
            None if !generated && section_key.contains('.') => section_key
                .rsplit_once('.')
                .map(|(prefix, _)| prefix.to_string()),
            None => None,
        };

        let order = match raw.order {
            Some(order) if order >= 1 => order,
            Some(order) => return Err(ItemError::BadOrder { index, order }),
            None => {
                let count = sibling_counts.entry(parent_key.clone()).or_insert(0);
                *count += 1;
                *count
            }
        };

        normalized.push(TemplateItem {
            section_key,
            name,
            parent_key,
            order,
        });
    }

    Ok(normalized)
}

/// Cross-validates a normalized set: keys must be unique and every
/// parent reference must resolve to another item in the same set.
pub fn validate_items(items: &[TemplateItem]) -> Result<(), ItemError> {
    let mut section_keys = HashSet::with_capacity(items.len());
    for item in items {
        if !section_keys.insert(item.section_key.as_str()) {
            return Err(ItemError::DuplicateKey(item.section_key.clone()));
        }
    }

    for item in items {
        if let Some(parent_key) = item.parent_key.as_deref()
            && (parent_key == item.section_key || !section_keys.contains(parent_key))
        {
            return Err(ItemError::InvalidParentKey {
                section_key: item.section_key.clone(),
                parent_key: parent_key.to_string(),
            });
        }
    }

    Ok(())
}
