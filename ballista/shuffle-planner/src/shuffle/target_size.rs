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
use crate::shuffle::{is_false, ShuffleKind};
use crate::sort_key::SortKey;
use crate::statistics::KeyStatistics;

/// Global-sort shuffle that sizes partitions to a target weight each, so the
/// number of partitions follows from the data. Commonly used when writing
/// segments that should each hold a certain number of rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TargetSizeDef", into = "TargetSizeDef")]
pub struct GlobalSortTargetSizeShuffleSpec {
    sort_key: SortKey,
    target_size: i64,
    aggregate: bool,
}

impl GlobalSortTargetSizeShuffleSpec {
    /// Creates a spec aiming for `target_size` weight per partition.
    pub fn try_new(sort_key: SortKey, target_size: i64, aggregate: bool) -> Result<Self> {
        if !sort_key.sortable() {
            return Err(PlannerError::InvalidSortKey(format!(
                "sort key {sort_key} must be sortable"
            )));
        }
        if target_size <= 0 {
            return Err(PlannerError::Configuration(format!(
                "target size must be positive, got {target_size}"
            )));
        }

        Ok(Self {
            sort_key,
            target_size,
            aggregate,
        })
    }

    /// Key rows are sorted and partitioned by.
    pub fn sort_key(&self) -> &SortKey {
        &self.sort_key
    }

    /// Target weight of each partition.
    pub fn target_size(&self) -> i64 {
        self.target_size
    }

    /// Whether consumers combine rows sharing a key.
    pub fn does_aggregate(&self) -> bool {
        self.aggregate
    }

    /// Always fails: the count depends on runtime statistics.
    pub fn partition_count(&self) -> Result<usize> {
        Err(PlannerError::PartitionCountNotKnown(ShuffleKind::GlobalSort))
    }

    /// Generates partitions of roughly `target_size` weight each.
    ///
    /// The expected partition count is checked against `max_partitions`
    /// before boundaries are generated. The generated count is checked again,
    /// since the statistics may produce more partitions than they estimated.
    pub fn generate_partitions(
        &self,
        statistics: &dyn KeyStatistics,
        max_partitions: usize,
    ) -> Result<PartitionOutcome> {
        let total_weight = statistics.estimated_total_weight();
        if total_weight < 0 {
            return Err(PlannerError::Internal(format!(
                "key statistics reported negative total weight {total_weight}"
            )));
        }

        let expected_partitions = (total_weight / self.target_size) as u64;
        if expected_partitions > max_partitions as u64 {
            info!(
                "Expected {expected_partitions} partitions for total weight {total_weight} \
                and target size {}, but at most {max_partitions} are permitted",
                self.target_size
            );
            return Ok(PartitionOutcome::Rejected {
                required_partitions: expected_partitions,
            });
        }

        statistics.log_summary();
        let partitions = statistics.generate_boundaries_for_target_weight(self.target_size)?;
        if partitions.len() > max_partitions {
            info!(
                "Generated {} partitions, but at most {max_partitions} are permitted",
                partitions.len()
            );
            return Ok(PartitionOutcome::Rejected {
                required_partitions: partitions.len() as u64,
            });
        }

        debug!(
            "Generated {} partitions, {expected_partitions} expected",
            partitions.len()
        );
        Ok(PartitionOutcome::Accepted(partitions))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetSizeDef {
    sort_key: SortKey,
    target_size: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    aggregate: bool,
}

impl TryFrom<TargetSizeDef> for GlobalSortTargetSizeShuffleSpec {
    type Error = PlannerError;

    fn try_from(def: TargetSizeDef) -> Result<Self> {
        Self::try_new(def.sort_key, def.target_size, def.aggregate)
    }
}

impl From<GlobalSortTargetSizeShuffleSpec> for TargetSizeDef {
    fn from(spec: GlobalSortTargetSizeShuffleSpec) -> Self {
        Self {
            sort_key: spec.sort_key,
            target_size: spec.target_size,
            aggregate: spec.aggregate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitions::tests::int_rows;
    use crate::partitions::PartitionSet;
    use crate::sort_key::KeyColumn;
    use std::cell::Cell;

    struct CountingStatistics {
        total_weight: i64,
        boundaries: Vec<i64>,
        target_calls: Cell<usize>,
    }

    impl CountingStatistics {
        fn new(total_weight: i64, boundaries: Vec<i64>) -> Self {
            Self {
                total_weight,
                boundaries,
                target_calls: Cell::new(0),
            }
        }
    }

    impl KeyStatistics for CountingStatistics {
        fn estimated_total_weight(&self) -> i64 {
            self.total_weight
        }

        fn generate_boundaries_for_target_weight(&self, _: i64) -> Result<PartitionSet> {
            self.target_calls.set(self.target_calls.get() + 1);
            PartitionSet::from_boundaries(int_rows(&self.boundaries))
        }

        fn generate_boundaries_for_count(&self, _: usize) -> Result<PartitionSet> {
            Err(PlannerError::Internal("unexpected call".to_string()))
        }

        fn log_summary(&self) {}
    }

    fn spec(target_size: i64) -> GlobalSortTargetSizeShuffleSpec {
        let key = SortKey::try_new(vec![KeyColumn::asc("a")], 0).unwrap();
        GlobalSortTargetSizeShuffleSpec::try_new(key, target_size, false).unwrap()
    }

    #[test]
    fn non_positive_target_size_is_rejected() {
        let key = SortKey::try_new(vec![KeyColumn::asc("a")], 0).unwrap();
        for target_size in [0, -1, i64::MIN] {
            assert!(matches!(
                GlobalSortTargetSizeShuffleSpec::try_new(key.clone(), target_size, true),
                Err(PlannerError::Configuration(_))
            ));
        }
    }

    #[test]
    fn expected_count_above_limit_skips_generation() -> Result<()> {
        let stats = CountingStatistics::new(1_000, vec![]);
        let outcome = spec(10).generate_partitions(&stats, 99)?;
        assert_eq!(
            outcome,
            PartitionOutcome::Rejected {
                required_partitions: 100
            }
        );
        assert_eq!(stats.target_calls.get(), 0);
        Ok(())
    }

    #[test]
    fn expected_count_at_limit_generates() -> Result<()> {
        let stats = CountingStatistics::new(30, vec![10, 20]);
        let outcome = spec(10).generate_partitions(&stats, 3)?;
        assert_eq!(outcome.partitions().map(|p| p.len()), Some(3));
        assert_eq!(stats.target_calls.get(), 1);
        Ok(())
    }

    #[test]
    fn generated_count_above_limit_is_rejected() -> Result<()> {
        // estimate says 2 partitions, statistics produce 4
        let stats = CountingStatistics::new(20, vec![5, 10, 15]);
        let outcome = spec(10).generate_partitions(&stats, 3)?;
        assert_eq!(outcome.required_partitions(), Some(4));
        assert_eq!(stats.target_calls.get(), 1);
        Ok(())
    }

    #[test]
    fn zero_weight_gives_one_partition() -> Result<()> {
        for target_size in [1, 7, i64::MAX] {
            let stats = CountingStatistics::new(0, vec![]);
            let outcome = spec(target_size).generate_partitions(&stats, 1)?;
            assert_eq!(
                outcome,
                PartitionOutcome::Accepted(PartitionSet::single_partition())
            );
        }
        Ok(())
    }

    #[test]
    fn negative_weight_is_an_internal_error() {
        let stats = CountingStatistics::new(-1, vec![]);
        assert!(matches!(
            spec(10).generate_partitions(&stats, 10),
            Err(PlannerError::Internal(_))
        ));
    }
}
