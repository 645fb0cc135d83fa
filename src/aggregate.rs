//! Streaming aggregation of classified records into a category tree.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::classify::classify_at;
use crate::records::FileRecord;

/// Aggregation cell for one (axis, bucket key) pair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryBucket {
    pub count: usize,
    pub total_size_bytes: u64,
    /// Axis-specific numeric totals (duration seconds, vertex counts, …).
    pub totals: BTreeMap<String, f64>,
    /// Shared, read-only member records; not serialized with the tree.
    #[serde(skip)]
    pub members: Vec<Arc<FileRecord>>,
}

impl CategoryBucket {
    fn add(&mut self, record: Arc<FileRecord>, extra: &[(&str, f64)]) {
        self.count += 1;
        self.total_size_bytes += record.size_bytes;
        for (key, value) in extra {
            *self.totals.entry(key.to_string()).or_insert(0.0) += value;
        }
        self.members.push(record);
    }
}

/// Axis name → bucket key → bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryTree {
    pub axes: BTreeMap<String, BTreeMap<String, CategoryBucket>>,
    pub total_files: usize,
    pub total_size_bytes: u64,
}

impl CategoryTree {
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }

    pub fn axis(&self, axis: &str) -> Option<&BTreeMap<String, CategoryBucket>> {
        self.axes.get(axis)
    }

    pub fn bucket(&self, axis: &str, key: &str) -> Option<&CategoryBucket> {
        self.axes.get(axis).and_then(|buckets| buckets.get(key))
    }
}

/// Folds classified records into a [`CategoryTree`] one record at a time.
///
/// The partial tree is valid at every point, so a cancelled scan can hand
/// back whatever was aggregated so far. Rebuilding from a filtered subset
/// of already-probed records needs no re-probe, only reclassification.
#[derive(Debug, Default)]
pub struct Aggregator {
    tree: CategoryTree,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one record under its classified bucket keys.
    pub fn add(&mut self, record: Arc<FileRecord>, axes: &BTreeMap<String, String>) {
        self.tree.total_files += 1;
        self.tree.total_size_bytes += record.size_bytes;

        for (axis, bucket_key) in axes {
            let extra = axis_totals(axis, &record);
            self.tree
                .axes
                .entry(axis.clone())
                .or_default()
                .entry(bucket_key.clone())
                .or_default()
                .add(Arc::clone(&record), &extra);
        }
    }

    /// Read-only view of the partial tree.
    pub fn tree(&self) -> &CategoryTree {
        &self.tree
    }

    pub fn finish(self) -> CategoryTree {
        self.tree
    }
}

/// One-shot aggregation of already-probed records, reclassified against the
/// given clock. Used to scope the tree to a selected subset.
pub fn aggregate_records<I>(records: I, now: DateTime<Local>) -> CategoryTree
where
    I: IntoIterator<Item = Arc<FileRecord>>,
{
    let mut aggregator = Aggregator::new();
    for record in records {
        let axes = classify_at(&record, now);
        aggregator.add(record, &axes);
    }
    aggregator.finish()
}

/// Numeric totals a bucket on this axis accumulates from the record.
fn axis_totals(axis: &str, record: &FileRecord) -> Vec<(&'static str, f64)> {
    let mut extra = Vec::new();
    if axis.starts_with("audio") || axis.starts_with("video") {
        if let Some(duration) = record.attr_f64("duration") {
            extra.push(("duration", duration));
        }
    } else if axis.starts_with("model") {
        if let Some(vertices) = record.attr_f64("vertices") {
            extra.push(("vertices", vertices));
        }
    } else if axis.starts_with("document") {
        if let Some(words) = record.attr_f64("words") {
            extra.push(("words", words));
        }
    }
    extra
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AttrMap, Category, Value};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn audio_record(name: &str, size_bytes: u64, duration: f64) -> Arc<FileRecord> {
        let mut attributes = AttrMap::new();
        attributes.insert("duration".to_string(), Value::Float(duration));
        attributes.insert("sample_rate".to_string(), Value::Int(44100));
        Arc::new(FileRecord {
            path: PathBuf::from(format!("/music/{}", name)),
            name: name.to_string(),
            extension: ".mp3".to_string(),
            size_bytes,
            modified_time: 1_700_000_000.0,
            content_hash: None,
            category: Category::Audio,
            attributes,
            anomalies: Vec::new(),
        })
    }

    fn assert_invariants(tree: &CategoryTree) {
        for buckets in tree.axes.values() {
            for bucket in buckets.values() {
                assert_eq!(bucket.count, bucket.members.len());
                let sum: u64 = bucket.members.iter().map(|m| m.size_bytes).sum();
                assert_eq!(bucket.total_size_bytes, sum);
            }
        }
    }

    #[test]
    fn test_bucket_invariants_hold() {
        let now = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let records = vec![
            audio_record("a.mp3", 100, 60.0),
            audio_record("b.mp3", 200, 120.0),
            audio_record("c.mp3", 300, 240.0),
        ];
        let tree = aggregate_records(records, now);

        assert_eq!(tree.total_files, 3);
        assert_eq!(tree.total_size_bytes, 600);
        assert_invariants(&tree);

        let primary = tree.bucket("primary", "primary_audio").unwrap();
        assert_eq!(primary.count, 3);
        assert_eq!(primary.total_size_bytes, 600);
    }

    #[test]
    fn test_axis_totals_accumulate_duration() {
        let now = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let records = vec![
            audio_record("a.mp3", 100, 60.0),
            audio_record("b.mp3", 200, 120.0),
        ];
        let tree = aggregate_records(records, now);

        let bucket = tree.bucket("audio_samplerate", "samplerate_cd").unwrap();
        assert_eq!(bucket.totals.get("duration"), Some(&180.0));
    }

    #[test]
    fn test_rebuild_from_subset_matches_fresh_aggregation() {
        let now = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let all = vec![
            audio_record("a.mp3", 100, 60.0),
            audio_record("b.mp3", 200, 120.0),
            audio_record("c.mp3", 300, 240.0),
        ];

        let subset: Vec<_> = all[..2].to_vec();
        let tree = aggregate_records(subset, now);

        assert_eq!(tree.total_files, 2);
        assert_eq!(tree.total_size_bytes, 300);
        assert_invariants(&tree);
    }

    #[test]
    fn test_streaming_partial_tree_is_valid() {
        let now = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut aggregator = Aggregator::new();

        let first = audio_record("a.mp3", 100, 60.0);
        let axes = classify_at(&first, now);
        aggregator.add(first, &axes);
        assert_eq!(aggregator.tree().total_files, 1);
        assert_invariants(aggregator.tree());

        let second = audio_record("b.mp3", 200, 120.0);
        let axes = classify_at(&second, now);
        aggregator.add(second, &axes);

        let tree = aggregator.finish();
        assert_eq!(tree.total_files, 2);
        assert_invariants(&tree);
    }

    #[test]
    fn test_empty_tree() {
        let tree = CategoryTree::default();
        assert!(tree.is_empty());
        assert!(tree.axis("primary").is_none());
    }
}
