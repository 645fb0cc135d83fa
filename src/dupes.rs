//! Duplicate detection and keep-one planning.
//!
//! Files group either by content hash or by bare file name. Each group
//! elects one keeper; the rest become removal candidates.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::probe::hash_file;
use crate::records::FileRecord;

/// Path keywords that promote a file to keeper ahead of newer or larger
/// copies. Matching is case-insensitive over the whole path.
pub const DEFAULT_KEEP_KEYWORDS: &[&str] = &["deliver", "delivery", "master", "final"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMode {
    ContentHash,
    Name,
}

impl DuplicateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateMode::ContentHash => "content_hash",
            DuplicateMode::Name => "name",
        }
    }
}

/// Two or more files sharing one duplicate key. `members` is ordered
/// best-keeper-first and `keeper` is its head.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub key: String,
    pub members: Vec<Arc<FileRecord>>,
    pub keeper: Arc<FileRecord>,
}

/// One row of a keep-one cleanup plan.
#[derive(Debug, Clone, Serialize)]
pub struct RemovalAction {
    pub mode: DuplicateMode,
    pub key: String,
    pub keep_path: PathBuf,
    pub remove_path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    mode: DuplicateMode,
    preferred_keywords: Vec<String>,
}

impl DuplicateFinder {
    pub fn new(mode: DuplicateMode) -> Self {
        Self {
            mode,
            preferred_keywords: DEFAULT_KEEP_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }

    /// Replaces the keeper-preference keywords. Matching stays
    /// case-insensitive.
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.preferred_keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
        self
    }

    /// Groups records by the duplicate key for this finder's mode.
    /// Records with no usable key (unreadable files in content mode) are
    /// left out rather than lumped into one false group.
    pub fn find(&self, records: &[Arc<FileRecord>]) -> Vec<DuplicateGroup> {
        let mut buckets: BTreeMap<String, Vec<Arc<FileRecord>>> = BTreeMap::new();
        for record in records {
            let key = match self.mode {
                DuplicateMode::ContentHash => record
                    .content_hash
                    .clone()
                    .filter(|h| !h.is_empty())
                    .or_else(|| hash_file(&record.path).ok()),
                DuplicateMode::Name => Some(record.name.clone()),
            };
            let Some(key) = key else { continue };
            if key.is_empty() {
                continue;
            }
            buckets.entry(key).or_default().push(Arc::clone(record));
        }

        buckets
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .map(|(key, mut members)| {
                members.sort_by(|a, b| self.compare_keep_priority(b, a));
                let keeper = Arc::clone(&members[0]);
                DuplicateGroup { key, members, keeper }
            })
            .collect()
    }

    /// Expands groups into one removal row per non-keeper member.
    pub fn removal_plan(&self, groups: &[DuplicateGroup]) -> Vec<RemovalAction> {
        let mut actions = Vec::new();
        for group in groups {
            for member in group.members.iter().skip(1) {
                actions.push(RemovalAction {
                    mode: self.mode,
                    key: group.key.clone(),
                    keep_path: group.keeper.path.clone(),
                    remove_path: member.path.clone(),
                    size_bytes: member.size_bytes,
                });
            }
        }
        actions
    }

    /// Keeper priority: preferred path keyword, then newest, then
    /// largest, then name as the final tiebreak.
    fn compare_keep_priority(&self, a: &FileRecord, b: &FileRecord) -> Ordering {
        let a_preferred = self.is_preferred(a);
        let b_preferred = self.is_preferred(b);
        a_preferred
            .cmp(&b_preferred)
            .then(a.modified_time.total_cmp(&b.modified_time))
            .then(a.size_bytes.cmp(&b.size_bytes))
            .then_with(|| a.name.cmp(&b.name))
    }

    fn is_preferred(&self, record: &FileRecord) -> bool {
        let path = record.path.to_string_lossy().to_lowercase();
        self.preferred_keywords.iter().any(|k| path.contains(k))
    }
}
