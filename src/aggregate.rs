// src/aggregate.rs

use crate::classifier::Contribution;
use crate::heuristics::{DimensionCounts, ProductKey};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

/// One aggregation bucket after the whole document was consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedRecord {
    #[serde(flatten)]
    pub key: ProductKey,
    pub tag: String,
    pub counts: DimensionCounts,
    /// Sum of order multipliers of the product lines merged into this record.
    pub sets: u64,
    pub bedding: bool,
}

impl AggregatedRecord {
    pub fn count(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }
}

/// Everything extracted from one order document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderSummary {
    pub records: Vec<AggregatedRecord>,
    /// Every observed dimension label, in order of first appearance.
    pub dimensions: Vec<String>,
}

impl OrderSummary {
    pub fn total_units(&self) -> u64 {
        self.records
            .iter()
            .flat_map(|r| r.counts.values())
            .fold(0u64, |acc, n| acc.saturating_add(*n))
    }
}

/// True when `category` contains `marker`, ignoring case only.
pub fn is_bedding(category: &str, marker: &str) -> bool {
    category.to_lowercase().contains(&marker.to_lowercase())
}

/// Scale a bedding set's dimension counts by the number of sets ordered.
///
/// Applies to counts of either mode, so fallback counts carry the multiplier
/// twice. Saturates at `u64::MAX`.
pub fn expand_set(counts: &DimensionCounts, multiplier: u32) -> DimensionCounts {
    counts
        .iter()
        .map(|(label, n)| {
            let scaled = n.checked_mul(u64::from(multiplier)).unwrap_or_else(|| {
                warn!(label = %label, count = n, multiplier, "Set expansion overflow, saturating");
                u64::MAX
            });
            (label.clone(), scaled)
        })
        .collect()
}

#[derive(Debug, Default)]
struct Bucket {
    tag: String,
    counts: DimensionCounts,
    sets: u64,
}

/// Additive, insertion-ordered accumulation keyed by `ProductKey`.
#[derive(Debug)]
pub struct Aggregator {
    bedding_marker: String,
    buckets: IndexMap<ProductKey, Bucket>,
}

impl Aggregator {
    pub fn new(bedding_marker: impl Into<String>) -> Self {
        Self {
            bedding_marker: bedding_marker.into(),
            buckets: IndexMap::new(),
        }
    }

    /// Merge one contribution; returns the number of units it added.
    pub fn add(&mut self, c: Contribution) -> u64 {
        let counts = if is_bedding(&c.key.category, &self.bedding_marker) {
            expand_set(&c.dimensions.counts, c.multiplier)
        } else {
            c.dimensions.counts
        };

        let bucket = self.buckets.entry(c.key).or_insert_with(|| Bucket {
            tag: c.tag,
            ..Bucket::default()
        });
        bucket.sets = bucket.sets.saturating_add(u64::from(c.sets));

        let mut added = 0u64;
        for (label, n) in counts {
            let slot = bucket.counts.entry(label).or_insert(0);
            *slot = slot.saturating_add(n);
            added = added.saturating_add(n);
        }
        added
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn finish(self) -> OrderSummary {
        let mut dimensions: Vec<String> = Vec::new();
        for bucket in self.buckets.values() {
            for label in bucket.counts.keys() {
                if !dimensions.contains(label) {
                    dimensions.push(label.clone());
                }
            }
        }

        let marker = self.bedding_marker;
        let records = self
            .buckets
            .into_iter()
            .map(|(key, b)| AggregatedRecord {
                bedding: is_bedding(&key.category, &marker),
                key,
                tag: b.tag,
                counts: b.counts,
                sets: b.sets,
            })
            .collect();

        OrderSummary {
            records,
            dimensions,
        }
    }
}
