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

//! Shuffle specs: how a stage's output is partitioned for the next stage.

mod factory;
mod fixed_count;
mod target_size;

pub use factory::ShuffleSpecFactory;
pub use fixed_count::GlobalSortFixedCountShuffleSpec;
pub use target_size::GlobalSortTargetSizeShuffleSpec;

use std::fmt::{Display, Formatter};

use datafusion::arrow::datatypes::SchemaRef;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::outcome::PartitionOutcome;
use crate::sort_key::SortKey;
use crate::statistics::{KeyStatistics, KeyStatisticsCollector};

/// Hard upper bound on the number of partitions of any shuffle.
pub const MAX_PARTITIONS: usize = 25_000;

/// Family of partitioning a shuffle performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShuffleKind {
    /// All rows go to a single unsorted partition.
    Mix,
    /// Rows are hashed into partitions, unsorted within each.
    Hash,
    /// Rows are hashed into partitions and sorted within each.
    HashLocalSort,
    /// Rows are range-partitioned on a sort key, so partitions are ordered
    /// with respect to each other.
    GlobalSort,
}

impl ShuffleKind {
    /// Whether rows are sorted within each partition.
    pub fn is_sort(&self) -> bool {
        matches!(self, ShuffleKind::HashLocalSort | ShuffleKind::GlobalSort)
    }
}

impl Display for ShuffleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ShuffleKind::Mix => write!(f, "MIX"),
            ShuffleKind::Hash => write!(f, "HASH"),
            ShuffleKind::HashLocalSort => write!(f, "HASH_LOCAL_SORT"),
            ShuffleKind::GlobalSort => write!(f, "GLOBAL_SORT"),
        }
    }
}

/// How a producer stage's output is partitioned for its consumer stage.
///
/// Specs are built once per stage plan and never mutated. Partition
/// generation is a pure function of the key statistics and the permitted
/// partition count, so it may be retried with a larger limit after a
/// rejection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShuffleSpec {
    /// Global sort into a fixed number of partitions.
    #[serde(rename = "fixedCount")]
    GlobalSortFixedCount(GlobalSortFixedCountShuffleSpec),
    /// Global sort into partitions of a target weight each.
    #[serde(rename = "targetSize")]
    GlobalSortTargetSize(GlobalSortTargetSizeShuffleSpec),
}

impl ShuffleSpec {
    /// Partitioning family of this spec.
    pub fn kind(&self) -> ShuffleKind {
        match self {
            ShuffleSpec::GlobalSortFixedCount(_) | ShuffleSpec::GlobalSortTargetSize(_) => {
                ShuffleKind::GlobalSort
            }
        }
    }

    /// Key rows are sorted and partitioned by.
    pub fn sort_key(&self) -> &SortKey {
        match self {
            ShuffleSpec::GlobalSortFixedCount(spec) => spec.sort_key(),
            ShuffleSpec::GlobalSortTargetSize(spec) => spec.sort_key(),
        }
    }

    /// Whether consumers combine rows sharing a key, so that statistics
    /// and partition sizes refer to post-aggregation weight.
    pub fn does_aggregate(&self) -> bool {
        match self {
            ShuffleSpec::GlobalSortFixedCount(spec) => spec.does_aggregate(),
            ShuffleSpec::GlobalSortTargetSize(spec) => spec.does_aggregate(),
        }
    }

    /// Whether key statistics must be gathered before partitions can be
    /// generated. Global sorts always need them to place boundaries.
    pub fn must_gather_result_key_statistics(&self) -> bool {
        match self.kind() {
            ShuffleKind::GlobalSort => true,
            ShuffleKind::Mix | ShuffleKind::Hash | ShuffleKind::HashLocalSort => false,
        }
    }

    /// Number of partitions, if known before statistics are gathered.
    ///
    /// Fails with [`crate::error::PlannerError::PartitionCountNotKnown`] for
    /// target-size specs.
    pub fn partition_count(&self) -> Result<usize> {
        match self {
            ShuffleSpec::GlobalSortFixedCount(spec) => Ok(spec.partition_count()),
            ShuffleSpec::GlobalSortTargetSize(spec) => spec.partition_count(),
        }
    }

    /// Generates partitions from finalized key statistics, using at most
    /// `max_partitions` partitions.
    pub fn generate_partitions(
        &self,
        statistics: &dyn KeyStatistics,
        max_partitions: usize,
    ) -> Result<PartitionOutcome> {
        match self {
            ShuffleSpec::GlobalSortFixedCount(spec) => {
                spec.generate_partitions(statistics, max_partitions)
            }
            ShuffleSpec::GlobalSortTargetSize(spec) => {
                spec.generate_partitions(statistics, max_partitions)
            }
        }
    }

    /// Creates an empty statistics collector for one producer worker,
    /// matching this spec's key and aggregation.
    pub fn new_statistics_collector(
        &self,
        schema: SchemaRef,
        max_retained_keys: usize,
    ) -> Result<KeyStatisticsCollector> {
        KeyStatisticsCollector::try_new(
            self.sort_key().clone(),
            schema,
            self.does_aggregate(),
            max_retained_keys,
        )
    }
}

impl From<GlobalSortFixedCountShuffleSpec> for ShuffleSpec {
    fn from(spec: GlobalSortFixedCountShuffleSpec) -> Self {
        ShuffleSpec::GlobalSortFixedCount(spec)
    }
}

impl From<GlobalSortTargetSizeShuffleSpec> for ShuffleSpec {
    fn from(spec: GlobalSortTargetSizeShuffleSpec) -> Self {
        ShuffleSpec::GlobalSortTargetSize(spec)
    }
}

impl Display for ShuffleSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ShuffleSpec::GlobalSortFixedCount(spec) => write!(
                f,
                "FixedCountShuffleSpec{{sortKey={}, partitionCount={}, aggregate={}}}",
                spec.sort_key(),
                spec.partition_count(),
                spec.does_aggregate()
            ),
            ShuffleSpec::GlobalSortTargetSize(spec) => write!(
                f,
                "TargetSizeShuffleSpec{{sortKey={}, targetSize={}, aggregate={}}}",
                spec.sort_key(),
                spec.target_size(),
                spec.does_aggregate()
            ),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;
    use crate::sort_key::KeyColumn;

    fn key() -> SortKey {
        SortKey::try_new(vec![KeyColumn::desc("a"), KeyColumn::asc("b")], 0).unwrap()
    }

    #[test]
    fn common_contract() -> Result<()> {
        let fixed: ShuffleSpec = GlobalSortFixedCountShuffleSpec::try_new(key(), 4, false)?.into();
        let target: ShuffleSpec =
            GlobalSortTargetSizeShuffleSpec::try_new(key(), 1000, true)?.into();

        for spec in [&fixed, &target] {
            assert_eq!(spec.kind(), ShuffleKind::GlobalSort);
            assert!(spec.kind().is_sort());
            assert!(spec.must_gather_result_key_statistics());
            assert_eq!(spec.sort_key(), &key());
        }

        assert!(!fixed.does_aggregate());
        assert!(target.does_aggregate());
        assert_eq!(fixed.partition_count()?, 4);
        assert!(matches!(
            target.partition_count(),
            Err(PlannerError::PartitionCountNotKnown(ShuffleKind::GlobalSort))
        ));
        Ok(())
    }

    #[test]
    fn display() -> Result<()> {
        let spec: ShuffleSpec =
            GlobalSortTargetSizeShuffleSpec::try_new(key(), 1000, true)?.into();
        assert_eq!(
            spec.to_string(),
            "TargetSizeShuffleSpec{sortKey=[a DESC, b ASC], targetSize=1000, aggregate=true}"
        );
        assert_eq!(ShuffleKind::HashLocalSort.to_string(), "HASH_LOCAL_SORT");
        Ok(())
    }

    #[test]
    fn json_round_trip() -> Result<()> {
        let spec: ShuffleSpec =
            GlobalSortTargetSizeShuffleSpec::try_new(key(), 1000, true)?.into();
        let json = serde_json::to_string(&spec)?;
        assert_eq!(
            json,
            r#"{"type":"targetSize","sortKey":{"columns":[{"name":"a","order":"DESCENDING"},{"name":"b","order":"ASCENDING"}],"bucketByCount":0},"targetSize":1000,"aggregate":true}"#
        );
        assert_eq!(serde_json::from_str::<ShuffleSpec>(&json)?, spec);

        let spec: ShuffleSpec = GlobalSortFixedCountShuffleSpec::try_new(key(), 7, false)?.into();
        let json = serde_json::to_string(&spec)?;
        assert!(!json.contains("aggregate"));
        assert_eq!(serde_json::from_str::<ShuffleSpec>(&json)?, spec);
        Ok(())
    }

    #[test]
    fn json_validates_on_read() {
        let zero_target = r#"{"type":"targetSize","sortKey":{"columns":[{"name":"a","order":"ASCENDING"}]},"targetSize":0}"#;
        assert!(serde_json::from_str::<ShuffleSpec>(zero_target).is_err());

        let unsortable = r#"{"type":"fixedCount","sortKey":{"columns":[{"name":"a","order":"NONE"}]},"partitionCount":3}"#;
        assert!(serde_json::from_str::<ShuffleSpec>(unsortable).is_err());
    }
}
