// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

use datafusion::arrow::array::{ArrayRef, RecordBatch};
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::row::{OwnedRow, Row, RowConverter};
use log::debug;
use md5::{Digest, Md5};

use crate::error::{PlannerError, Result};
use crate::partitions::PartitionSet;
use crate::sort_key::SortKey;
use crate::statistics::KeyStatistics;

/// Weight of one retained key.
#[derive(Debug, Clone)]
struct KeyWeight {
    rows: i64,
    /// Encoded bucket columns, present when the sort key buckets.
    bucket: Option<OwnedRow>,
}

/// In-memory [`KeyStatistics`] over Arrow row-format keys.
///
/// Each distinct key is retained with its row count. When more than
/// `max_retained_keys` keys are held, the collector keeps only keys whose md5
/// hash has its lowest `sampling_bits` bits clear, and scales every retained
/// weight by `2^sampling_bits`. The choice of surviving keys depends only on
/// the key bytes, so collectors built on different workers sample the same
/// keys and merge consistently.
///
/// When built for an aggregating shuffle, every distinct key weighs one,
/// since downstream aggregation collapses rows that share a key.
pub struct KeyStatisticsCollector {
    sort_key: SortKey,
    schema: SchemaRef,
    aggregate: bool,
    converter: RowConverter,
    key_indices: Vec<usize>,
    bucket_converter: Option<RowConverter>,
    max_retained_keys: usize,
    sampling_bits: u32,
    keys: BTreeMap<OwnedRow, KeyWeight>,
}

impl Debug for KeyStatisticsCollector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStatisticsCollector")
            .field("sort_key", &self.sort_key)
            .field("aggregate", &self.aggregate)
            .field("retained_keys", &self.keys.len())
            .field("sampling_bits", &self.sampling_bits)
            .finish()
    }
}

impl KeyStatisticsCollector {
    /// Creates an empty collector for rows of `schema`, keyed by `sort_key`.
    pub fn try_new(
        sort_key: SortKey,
        schema: SchemaRef,
        aggregate: bool,
        max_retained_keys: usize,
    ) -> Result<Self> {
        if max_retained_keys == 0 {
            return Err(PlannerError::Configuration(
                "max_retained_keys must be positive".to_string(),
            ));
        }

        let converter = sort_key.row_converter(&schema)?;
        let key_indices = sort_key.key_indices(&schema)?;
        let bucket_converter = if sort_key.bucket_by_count() > 0 {
            let fields = sort_key.sort_fields(&schema)?;
            Some(RowConverter::new(
                fields[..sort_key.bucket_by_count()].to_vec(),
            )?)
        } else {
            None
        };

        Ok(Self {
            sort_key,
            schema,
            aggregate,
            converter,
            key_indices,
            bucket_converter,
            max_retained_keys,
            sampling_bits: 0,
            keys: BTreeMap::new(),
        })
    }

    /// Sort key the collector was built for.
    pub fn sort_key(&self) -> &SortKey {
        &self.sort_key
    }

    /// Whether weights count distinct keys rather than rows.
    pub fn aggregate(&self) -> bool {
        self.aggregate
    }

    /// Converter between key columns and the rows stored in boundaries.
    pub fn converter(&self) -> &RowConverter {
        &self.converter
    }

    /// Number of keys currently retained.
    pub fn retained_keys(&self) -> usize {
        self.keys.len()
    }

    /// Factor each retained weight is scaled by.
    pub fn sampling_factor(&self) -> i64 {
        1_i64 << self.sampling_bits
    }

    /// Adds the keys of every row in `batch`.
    pub fn add_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        let key_columns = self
            .key_indices
            .iter()
            .map(|i| batch.column(*i).clone())
            .collect::<Vec<ArrayRef>>();
        let rows = self.converter.convert_columns(&key_columns)?;
        let buckets = match &self.bucket_converter {
            Some(converter) => Some(
                converter.convert_columns(&key_columns[..self.sort_key.bucket_by_count()])?,
            ),
            None => None,
        };

        for (i, row) in rows.iter().enumerate() {
            if !retains(self.sampling_bits, row) {
                continue;
            }
            let entry = self.keys.entry(row.owned()).or_insert_with(|| KeyWeight {
                rows: 0,
                bucket: buckets.as_ref().map(|b| b.row(i).owned()),
            });
            entry.rows += 1;
        }

        self.enforce_retained_keys();
        Ok(())
    }

    /// Merges the keys collected by `other` into this collector.
    pub fn merge(&mut self, other: &KeyStatisticsCollector) -> Result<()> {
        if self.sort_key != other.sort_key || self.aggregate != other.aggregate {
            return Err(PlannerError::Internal(format!(
                "cannot merge key statistics for {} (aggregate={}) with {} (aggregate={})",
                self.sort_key, self.aggregate, other.sort_key, other.aggregate
            )));
        }
        if self.schema.fields() != other.schema.fields() {
            return Err(PlannerError::Internal(
                "cannot merge key statistics collected over different schemas".to_string(),
            ));
        }

        if other.sampling_bits > self.sampling_bits {
            self.downsample_to(other.sampling_bits);
        }

        // rows are re-encoded so every retained key belongs to this converter
        let parser = self.converter.parser();
        let bucket_parser = self.bucket_converter.as_ref().map(|c| c.parser());
        for (key, weight) in &other.keys {
            if !retains(self.sampling_bits, key.row()) {
                continue;
            }
            self.keys
                .entry(parser.parse(key.row().as_ref()).owned())
                .and_modify(|w| w.rows += weight.rows)
                .or_insert_with(|| KeyWeight {
                    rows: weight.rows,
                    bucket: match (&bucket_parser, &weight.bucket) {
                        (Some(p), Some(b)) => Some(p.parse(b.row().as_ref()).owned()),
                        _ => None,
                    },
                });
        }

        self.enforce_retained_keys();
        Ok(())
    }

    fn enforce_retained_keys(&mut self) {
        while self.keys.len() > self.max_retained_keys && self.sampling_bits < 62 {
            self.downsample_to(self.sampling_bits + 1);
        }
    }

    fn downsample_to(&mut self, sampling_bits: u32) {
        let before = self.keys.len();
        self.sampling_bits = sampling_bits;
        self.keys.retain(|key, _| retains(sampling_bits, key.row()));
        debug!(
            "Downsampled key statistics for {} from {before} to {} keys, sampling factor {}",
            self.sort_key,
            self.keys.len(),
            self.sampling_factor()
        );
    }

    fn scaled_weight(&self, weight: &KeyWeight) -> i64 {
        let base = if self.aggregate { 1 } else { weight.rows };
        base.saturating_mul(self.sampling_factor())
    }

    /// Whether a boundary may be placed before `current`, given the key before it.
    fn may_cut_before(previous: Option<&KeyWeight>, current: &KeyWeight) -> bool {
        match (previous, &current.bucket) {
            (Some(previous), Some(bucket)) => previous.bucket.as_ref() != Some(bucket),
            _ => true,
        }
    }
}

impl KeyStatistics for KeyStatisticsCollector {
    fn estimated_total_weight(&self) -> i64 {
        self.keys
            .values()
            .fold(0_i64, |acc, w| acc.saturating_add(self.scaled_weight(w)))
    }

    fn generate_boundaries_for_target_weight(
        &self,
        target_weight: i64,
    ) -> Result<PartitionSet> {
        if target_weight <= 0 {
            return Err(PlannerError::Configuration(format!(
                "target weight must be positive, got {target_weight}"
            )));
        }

        let mut boundaries = Vec::new();
        let mut current = 0_i64;
        let mut previous: Option<&KeyWeight> = None;
        for (key, weight) in &self.keys {
            let scaled = self.scaled_weight(weight);
            if current > 0
                && current.saturating_add(scaled) > target_weight
                && Self::may_cut_before(previous, weight)
            {
                boundaries.push(key.clone());
                current = 0;
            }
            current = current.saturating_add(scaled);
            previous = Some(weight);
        }

        PartitionSet::from_boundaries(boundaries)
    }

    fn generate_boundaries_for_count(&self, partition_count: usize) -> Result<PartitionSet> {
        if partition_count == 0 {
            return Err(PlannerError::Configuration(
                "partition count must be positive".to_string(),
            ));
        }

        let total = self.estimated_total_weight() as i128;
        if total == 0 || partition_count == 1 {
            return Ok(PartitionSet::single_partition());
        }

        // cut before the first key whose preceding weight reaches the next
        // multiple of total / partition_count
        let threshold = |cut: usize| total * cut as i128 / partition_count as i128;
        let mut boundaries = Vec::with_capacity(partition_count - 1);
        let mut cut = 1;
        let mut cumulative = 0_i128;
        let mut previous: Option<&KeyWeight> = None;
        for (key, weight) in &self.keys {
            if cut < partition_count
                && cumulative > 0
                && cumulative >= threshold(cut)
                && Self::may_cut_before(previous, weight)
            {
                boundaries.push(key.clone());
                while cut < partition_count && cumulative >= threshold(cut) {
                    cut += 1;
                }
            }
            cumulative += self.scaled_weight(weight) as i128;
            previous = Some(weight);
        }

        PartitionSet::from_boundaries(boundaries)
    }

    fn log_summary(&self) {
        debug!(
            "Key statistics for {} (aggregate={}): {} retained keys, sampling factor {}, estimated total weight {}",
            self.sort_key,
            self.aggregate,
            self.keys.len(),
            self.sampling_factor(),
            self.estimated_total_weight()
        );
    }
}

fn retains(sampling_bits: u32, row: Row<'_>) -> bool {
    if sampling_bits == 0 {
        return true;
    }
    let mask = (1_u64 << sampling_bits) - 1;
    key_hash(row) & mask == 0
}

fn key_hash(row: Row<'_>) -> u64 {
    let digest = Md5::digest(row.as_ref());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
