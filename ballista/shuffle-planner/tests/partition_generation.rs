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

//! Partition generation against key statistics with known weights.

mod common;

#[cfg(test)]
mod partition_generation_tests {
    use crate::common::{assert_well_formed, FakeStatistics};
    use ballista_shuffle_planner::error::{PlannerError, Result};
    use ballista_shuffle_planner::outcome::PartitionOutcome;
    use ballista_shuffle_planner::shuffle::{
        GlobalSortFixedCountShuffleSpec, GlobalSortTargetSizeShuffleSpec, ShuffleSpec,
    };
    use ballista_shuffle_planner::sort_key::{KeyColumn, SortKey};

    fn target_size(target: i64) -> ShuffleSpec {
        let sort_key = SortKey::try_new(vec![KeyColumn::asc("k")], 0).unwrap();
        GlobalSortTargetSizeShuffleSpec::try_new(sort_key, target, false)
            .unwrap()
            .into()
    }

    #[test]
    fn accepts_when_generated_partitions_fit() -> Result<()> {
        let statistics = FakeStatistics::new(1_000_000, 11);

        let outcome = target_size(100_000).generate_partitions(&statistics, 20)?;

        let partitions = outcome.partitions().expect("accepted");
        assert_eq!(partitions.len(), 11);
        assert_well_formed(partitions);
        assert_eq!(statistics.generation_calls(), 1);
        assert_eq!(statistics.summary_calls(), 1);
        Ok(())
    }

    #[test]
    fn rejects_without_generating_boundaries() -> Result<()> {
        let statistics = FakeStatistics::new(1_000_000, 100);

        let outcome = target_size(10_000).generate_partitions(&statistics, 20)?;

        assert_eq!(
            outcome,
            PartitionOutcome::Rejected {
                required_partitions: 100
            }
        );
        assert_eq!(statistics.generation_calls(), 0);
        assert_eq!(statistics.summary_calls(), 0);
        assert!(matches!(
            outcome.into_result(20),
            Err(PlannerError::TooManyPartitions {
                required: 100,
                max: 20
            })
        ));
        Ok(())
    }

    #[test]
    fn rejects_when_generated_partitions_exceed_limit() -> Result<()> {
        // estimate is 10 partitions, the statistics produce 25
        let statistics = FakeStatistics::new(1_000_000, 25);

        let outcome = target_size(100_000).generate_partitions(&statistics, 20)?;

        assert_eq!(outcome.required_partitions(), Some(25));
        assert_eq!(statistics.generation_calls(), 1);
        Ok(())
    }

    #[test]
    fn estimate_at_limit_is_accepted() -> Result<()> {
        let statistics = FakeStatistics::new(2_000_000, 20);

        let outcome = target_size(100_000).generate_partitions(&statistics, 20)?;

        assert!(outcome.is_accepted());
        assert_eq!(outcome.partitions().map(|p| p.len()), Some(20));
        Ok(())
    }

    #[test]
    fn fixed_count_above_limit_is_rejected() -> Result<()> {
        let sort_key = SortKey::try_new(vec![KeyColumn::desc("k")], 0)?;
        let spec: ShuffleSpec = GlobalSortFixedCountShuffleSpec::try_new(sort_key, 50, false)?.into();
        let statistics = FakeStatistics::new(1_000_000, 50);

        let outcome = spec.generate_partitions(&statistics, 20)?;

        assert_eq!(outcome.required_partitions(), Some(50));
        assert_eq!(statistics.generation_calls(), 0);
        Ok(())
    }

    #[test]
    fn fixed_count_over_empty_input_is_single_partition() -> Result<()> {
        let sort_key = SortKey::try_new(vec![KeyColumn::desc("k")], 0)?;
        let spec: ShuffleSpec = GlobalSortFixedCountShuffleSpec::try_new(sort_key, 8, true)?.into();
        let statistics = FakeStatistics::new(0, 8);

        let outcome = spec.generate_partitions(&statistics, 20)?;

        assert_eq!(outcome.partitions().map(|p| p.len()), Some(1));
        assert_eq!(statistics.generation_calls(), 0);
        Ok(())
    }

    #[test]
    fn json_spec_plans_like_constructed_spec() -> Result<()> {
        let json = r#"{"type":"targetSize","sortKey":{"columns":[{"name":"k","order":"ASCENDING"}]},"targetSize":100000}"#;
        let spec: ShuffleSpec = serde_json::from_str(json)?;
        assert_eq!(spec, target_size(100_000));

        let statistics = FakeStatistics::new(1_000_000, 11);
        let outcome = spec.generate_partitions(&statistics, 20)?;
        assert!(outcome.is_accepted());
        Ok(())
    }

    #[test]
    fn invalid_specs_fail_at_construction() {
        assert!(matches!(
            SortKey::try_new(vec![KeyColumn::new("k", ballista_shuffle_planner::sort_key::KeyOrder::None)], 0),
            Err(PlannerError::InvalidSortKey(_))
        ));
        let sort_key = SortKey::try_new(vec![KeyColumn::asc("k")], 0).unwrap();
        assert!(matches!(
            GlobalSortTargetSizeShuffleSpec::try_new(sort_key.clone(), 0, false),
            Err(PlannerError::Configuration(_))
        ));
        assert!(matches!(
            GlobalSortTargetSizeShuffleSpec::try_new(sort_key, -5, false),
            Err(PlannerError::Configuration(_))
        ));
    }
}
