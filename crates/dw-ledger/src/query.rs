use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use dw_types::{OriginId, RecordId, RecordKind};

use crate::index::SecondaryIndexes;
use crate::records::ProvenanceRecord;

/// Inclusive `createdAt` window. Either bound may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

impl TimeRange {
    pub fn contains(&self, ms: u64) -> bool {
        self.start.map_or(true, |s| ms >= s) && self.end.map_or(true, |e| ms <= e)
    }
}

/// Conjunction of optional predicates. An empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<OriginId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecordKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    /// Matches records carrying at least one of these tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl QueryFilter {
    pub fn matches(&self, record: &ProvenanceRecord) -> bool {
        if self.origin_id.as_ref().is_some_and(|o| *o != record.origin_id) {
            return false;
        }
        if self.kind.is_some_and(|k| k != record.kind) {
            return false;
        }
        if self
            .time_range
            .is_some_and(|r| !r.contains(record.created_at))
        {
            return false;
        }
        self.tags.is_empty() || record.has_any_tag(&self.tags)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Kind,
    OriginId,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

/// Pagination and ordering. Defaults to newest first with no limit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default)]
    pub offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl PageRequest {
    pub fn newest(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// One page of query results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    pub records: Vec<ProvenanceRecord>,
    /// Matches before pagination.
    pub total: usize,
    pub has_more: bool,
}

/// Evaluates filters against a consistent view of records and indexes.
pub struct QueryEngine;

impl QueryEngine {
    pub fn execute(
        records: &HashMap<RecordId, ProvenanceRecord>,
        indexes: &SecondaryIndexes,
        filter: &QueryFilter,
        page: &PageRequest,
    ) -> QueryPage {
        let mut matched: Vec<&ProvenanceRecord> = Self::candidates(records, indexes, filter)
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();

        matched.sort_by(|a, b| compare(a, b, page.sort_by, page.sort_order));

        let total = matched.len();
        let limit = page.limit.unwrap_or(usize::MAX);
        let page_records: Vec<ProvenanceRecord> = matched
            .into_iter()
            .skip(page.offset)
            .take(limit)
            .cloned()
            .collect();
        let has_more = page.offset.saturating_add(page_records.len()) < total;

        QueryPage {
            records: page_records,
            total,
            has_more,
        }
    }

    /// Narrow the scan with whichever index bucket is smaller.
    fn candidates<'a>(
        records: &'a HashMap<RecordId, ProvenanceRecord>,
        indexes: &SecondaryIndexes,
        filter: &QueryFilter,
    ) -> Vec<&'a ProvenanceRecord> {
        let by_origin = filter.origin_id.as_ref().map(|o| indexes.by_origin(o));
        let by_kind = filter.kind.map(|k| indexes.by_kind(k));

        let bucket = match (by_origin, by_kind) {
            (Some(o), Some(k)) => Some(if o.len() <= k.len() { o } else { k }),
            (Some(o), None) => Some(o),
            (None, Some(k)) => Some(k),
            (None, None) => None,
        };

        match bucket {
            Some(ids) => ids
                .iter()
                .filter_map(|id| {
                    let record = records.get(id);
                    debug_assert!(record.is_some(), "index entry {id} has no record");
                    record
                })
                .collect(),
            None => records.values().collect(),
        }
    }
}

fn compare(a: &ProvenanceRecord, b: &ProvenanceRecord, key: SortKey, order: SortOrder) -> Ordering {
    let primary = match key {
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Kind => a.kind.as_str().cmp(b.kind.as_str()),
        SortKey::OriginId => a.origin_id.cmp(&b.origin_id),
    };
    let primary = match order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}
