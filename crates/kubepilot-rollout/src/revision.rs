//! Revision index over owned revision records
//!
//! Records whose revision value is missing or malformed are dropped with a
//! warning; one corrupt record never prevents history or undo from working
//! with the rest.

use std::collections::BTreeMap;

use k8s_openapi::chrono::{DateTime, Utc};
use tracing::warn;

use crate::resources::{parse_revision, RevisionRecord};

/// One indexed revision
#[derive(Clone, Debug, PartialEq)]
pub struct RevisionEntry {
    /// Revision number
    pub revision: i64,
    /// Human-readable reason, if recorded
    pub change_cause: Option<String>,
    /// The record this revision came from
    pub record: RevisionRecord,
}

/// Ordered view of a workload's revisions
#[derive(Clone, Debug, Default)]
pub struct RevisionIndex {
    entries: BTreeMap<i64, RevisionEntry>,
    skipped: usize,
}

impl RevisionIndex {
    /// Index `records` by their revision number.
    ///
    /// When two records claim the same revision, the more recently created
    /// one is kept.
    pub fn build(records: impl IntoIterator<Item = RevisionRecord>) -> Self {
        let mut index = Self::default();

        for record in records {
            let raw = record.raw_revision();
            let Some(revision) = raw.as_deref().and_then(parse_revision) else {
                warn!(
                    record = %record.name(),
                    value = ?raw,
                    "skipping revision record with missing or malformed revision"
                );
                index.skipped += 1;
                continue;
            };

            let entry = RevisionEntry {
                revision,
                change_cause: record.change_cause(),
                record,
            };

            match index.entries.get(&revision) {
                Some(existing) if created_at(&existing.record) >= created_at(&entry.record) => {
                    warn!(
                        revision,
                        kept = %existing.record.name(),
                        dropped = %entry.record.name(),
                        "duplicate revision number"
                    );
                    index.skipped += 1;
                }
                Some(existing) => {
                    warn!(
                        revision,
                        kept = %entry.record.name(),
                        dropped = %existing.record.name(),
                        "duplicate revision number"
                    );
                    index.skipped += 1;
                    index.entries.insert(revision, entry);
                }
                None => {
                    index.entries.insert(revision, entry);
                }
            }
        }

        index
    }

    /// Number of indexed revisions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no revision was indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records that were not indexed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Entries in ascending revision order
    pub fn iter(&self) -> impl Iterator<Item = &RevisionEntry> {
        self.entries.values()
    }

    /// Entry for exactly `revision`
    pub fn get(&self, revision: i64) -> Option<&RevisionEntry> {
        self.entries.get(&revision)
    }

    /// Entry with the highest revision
    pub fn latest(&self) -> Option<&RevisionEntry> {
        self.entries.values().next_back()
    }

    /// Entry with the greatest revision strictly less than `current`
    pub fn previous(&self, current: i64) -> Option<&RevisionEntry> {
        self.entries.range(..current).next_back().map(|(_, e)| e)
    }
}

fn created_at(record: &RevisionRecord) -> Option<DateTime<Utc>> {
    record.metadata().creation_timestamp.as_ref().map(|t| t.0)
}
