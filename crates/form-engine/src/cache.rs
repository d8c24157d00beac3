use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use form_spec::{FieldOption, OptionState};

/// Identifies one option list: a top level field or a single table cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    Field(String),
    Cell {
        field: String,
        column: String,
        row: usize,
    },
}

impl CacheKey {
    pub fn field(field_id: &str) -> Self {
        Self::Field(field_id.to_string())
    }

    pub fn cell(field_id: &str, column_id: &str, row: usize) -> Self {
        Self::Cell {
            field: field_id.to_string(),
            column: column_id.to_string(),
            row,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(id) => f.write_str(id),
            Self::Cell { field, column, row } => write!(f, "{field}[{row}].{column}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CacheEntry {
    signature: Option<String>,
    options: Vec<FieldOption>,
    loading: bool,
    generation: u64,
}

/// Resolved option lists keyed by field or cell.
///
/// Every fetch is tagged with a generation drawn from a shared counter. A
/// completion is applied only while its generation is still the entry's
/// latest, so responses for superseded inputs are dropped.
#[derive(Debug, Clone, Default)]
pub struct OptionCache {
    entries: Arc<DashMap<CacheKey, CacheEntry>>,
    generation: Arc<AtomicU64>,
}

impl OptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn state(&self, key: &CacheKey) -> OptionState {
        self.entries
            .get(key)
            .map(|entry| OptionState {
                options: entry.options.clone(),
                loading: entry.loading,
            })
            .unwrap_or_default()
    }

    pub fn is_loading(&self, key: &CacheKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.loading)
    }

    pub fn signature(&self, key: &CacheKey) -> Option<String> {
        self.entries.get(key).and_then(|entry| entry.signature.clone())
    }

    /// Records `signature` as in flight and returns the generation for the
    /// fetch, or `None` when that signature is already current. Previous
    /// options stay visible until the fetch completes.
    pub fn begin(&self, key: &CacheKey, signature: &str) -> Option<u64> {
        let mut entry = self.entries.entry(key.clone()).or_default();
        if entry.signature.as_deref() == Some(signature) {
            return None;
        }
        let generation = self.next_generation();
        entry.signature = Some(signature.to_string());
        entry.loading = true;
        entry.generation = generation;
        Some(generation)
    }

    /// Stores the result of a fetch. Returns false when the fetch was
    /// superseded and its options were discarded.
    pub fn complete(&self, key: &CacheKey, generation: u64, options: Vec<FieldOption>) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.generation == generation => {
                entry.options = options;
                entry.loading = false;
                true
            }
            _ => false,
        }
    }

    /// Empties the list and forgets the signature. Any fetch in flight for
    /// the key becomes stale.
    pub fn clear(&self, key: &CacheKey) {
        let generation = self.next_generation();
        let mut entry = self.entries.entry(key.clone()).or_default();
        entry.signature = None;
        entry.options.clear();
        entry.loading = false;
        entry.generation = generation;
    }

    /// Drops the cell entries of `field_id` at `from_row` and above.
    pub fn forget_rows(&self, field_id: &str, from_row: usize) {
        self.entries.retain(|key, _| {
            !matches!(key, CacheKey::Cell { field, row, .. } if field == field_id && *row >= from_row)
        });
    }

    /// Snapshot of every list keyed by its display name.
    pub fn snapshot(&self) -> BTreeMap<String, OptionState> {
        self.entries
            .iter()
            .map(|entry| {
                (
                    entry.key().to_string(),
                    OptionState {
                        options: entry.options.clone(),
                        loading: entry.loading,
                    },
                )
            })
            .collect()
    }
}
