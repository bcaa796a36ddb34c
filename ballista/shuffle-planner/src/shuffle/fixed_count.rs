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

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::outcome::PartitionOutcome;
use crate::partitions::PartitionSet;
use crate::shuffle::{is_false, MAX_PARTITIONS};
use crate::sort_key::SortKey;
use crate::statistics::KeyStatistics;

/// Global-sort shuffle into a fixed number of partitions.
///
/// The partition count is known before any statistics exist; statistics only
/// decide where the boundaries fall.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FixedCountDef", into = "FixedCountDef")]
pub struct GlobalSortFixedCountShuffleSpec {
    sort_key: SortKey,
    partition_count: usize,
    aggregate: bool,
}

impl GlobalSortFixedCountShuffleSpec {
    /// Creates a spec producing `partition_count` partitions, between one and
    /// [`MAX_PARTITIONS`].
    pub fn try_new(sort_key: SortKey, partition_count: usize, aggregate: bool) -> Result<Self> {
        if !sort_key.sortable() {
            return Err(PlannerError::InvalidSortKey(format!(
                "sort key {sort_key} must be sortable"
            )));
        }
        if partition_count == 0 || partition_count > MAX_PARTITIONS {
            return Err(PlannerError::Configuration(format!(
                "partition count must be between 1 and {MAX_PARTITIONS}, got {partition_count}"
            )));
        }

        Ok(Self {
            sort_key,
            partition_count,
            aggregate,
        })
    }

    /// Key rows are sorted and partitioned by.
    pub fn sort_key(&self) -> &SortKey {
        &self.sort_key
    }

    /// Number of partitions.
    pub fn partition_count(&self) -> usize {
        self.partition_count
    }

    /// Whether consumers combine rows sharing a key.
    pub fn does_aggregate(&self) -> bool {
        self.aggregate
    }

    /// Asks `statistics` for `partition_count` boundaries of roughly equal
    /// weight. Empty statistics give one partition over the whole key space.
    pub fn generate_partitions(
        &self,
        statistics: &dyn KeyStatistics,
        max_partitions: usize,
    ) -> Result<PartitionOutcome> {
        if self.partition_count > max_partitions {
            info!(
                "Fixed partition count {} exceeds the permitted {max_partitions} partitions",
                self.partition_count
            );
            return Ok(PartitionOutcome::Rejected {
                required_partitions: self.partition_count as u64,
            });
        }

        let total_weight = statistics.estimated_total_weight();
        if total_weight < 0 {
            return Err(PlannerError::Internal(format!(
                "key statistics reported negative total weight {total_weight}"
            )));
        }
        if total_weight == 0 {
            debug!("No key weight collected, generating a single partition");
            return Ok(PartitionOutcome::Accepted(PartitionSet::single_partition()));
        }

        statistics.log_summary();
        let partitions = statistics.generate_boundaries_for_count(self.partition_count)?;
        if partitions.len() > max_partitions {
            return Ok(PartitionOutcome::Rejected {
                required_partitions: partitions.len() as u64,
            });
        }

        debug!(
            "Generated {} of {} requested partitions",
            partitions.len(),
            self.partition_count
        );
        Ok(PartitionOutcome::Accepted(partitions))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixedCountDef {
    sort_key: SortKey,
    partition_count: usize,
    #[serde(default, skip_serializing_if = "is_false")]
    aggregate: bool,
}

impl TryFrom<FixedCountDef> for GlobalSortFixedCountShuffleSpec {
    type Error = PlannerError;

    fn try_from(def: FixedCountDef) -> Result<Self> {
        Self::try_new(def.sort_key, def.partition_count, def.aggregate)
    }
}

impl From<GlobalSortFixedCountShuffleSpec> for FixedCountDef {
    fn from(spec: GlobalSortFixedCountShuffleSpec) -> Self {
        Self {
            sort_key: spec.sort_key,
            partition_count: spec.partition_count,
            aggregate: spec.aggregate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitions::tests::int_rows;
    use crate::sort_key::KeyColumn;
    use std::cell::Cell;

    struct CountingStatistics {
        total_weight: i64,
        boundaries: Vec<i64>,
        count_calls: Cell<usize>,
    }

    impl KeyStatistics for CountingStatistics {
        fn estimated_total_weight(&self) -> i64 {
            self.total_weight
        }

        fn generate_boundaries_for_target_weight(&self, _: i64) -> Result<PartitionSet> {
            Err(PlannerError::Internal("unexpected call".to_string()))
        }

        fn generate_boundaries_for_count(&self, _: usize) -> Result<PartitionSet> {
            self.count_calls.set(self.count_calls.get() + 1);
            PartitionSet::from_boundaries(int_rows(&self.boundaries))
        }

        fn log_summary(&self) {}
    }

    fn spec(partition_count: usize) -> GlobalSortFixedCountShuffleSpec {
        let key = SortKey::try_new(vec![KeyColumn::asc("a")], 0).unwrap();
        GlobalSortFixedCountShuffleSpec::try_new(key, partition_count, false).unwrap()
    }

    #[test]
    fn partition_count_is_validated() {
        let key = SortKey::try_new(vec![KeyColumn::asc("a")], 0).unwrap();
        assert!(GlobalSortFixedCountShuffleSpec::try_new(key.clone(), 0, false).is_err());
        assert!(
            GlobalSortFixedCountShuffleSpec::try_new(key, MAX_PARTITIONS + 1, false).is_err()
        );
    }

    #[test]
    fn generates_requested_boundaries() -> Result<()> {
        let stats = CountingStatistics {
            total_weight: 300,
            boundaries: vec![100, 200],
            count_calls: Cell::new(0),
        };
        let outcome = spec(3).generate_partitions(&stats, 10)?;
        assert_eq!(outcome.partitions().map(|p| p.len()), Some(3));
        assert_eq!(stats.count_calls.get(), 1);
        Ok(())
    }

    #[test]
    fn empty_input_gives_one_partition() -> Result<()> {
        let stats = CountingStatistics {
            total_weight: 0,
            boundaries: vec![100, 200],
            count_calls: Cell::new(0),
        };
        let outcome = spec(3).generate_partitions(&stats, 10)?;
        assert_eq!(
            outcome,
            PartitionOutcome::Accepted(PartitionSet::single_partition())
        );
        assert_eq!(stats.count_calls.get(), 0);
        Ok(())
    }

    #[test]
    fn count_above_limit_is_rejected_without_generation() -> Result<()> {
        let stats = CountingStatistics {
            total_weight: 300,
            boundaries: vec![100, 200],
            count_calls: Cell::new(0),
        };
        let outcome = spec(3).generate_partitions(&stats, 2)?;
        assert_eq!(outcome.required_partitions(), Some(3));
        assert_eq!(stats.count_calls.get(), 0);
        Ok(())
    }
}
