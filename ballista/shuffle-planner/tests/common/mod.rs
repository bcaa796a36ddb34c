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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ballista_shuffle_planner::error::Result;
use ballista_shuffle_planner::partitions::PartitionSet;
use ballista_shuffle_planner::statistics::KeyStatistics;
use datafusion::arrow::array::{ArrayRef, Int64Array};
use datafusion::arrow::datatypes::DataType;
use datafusion::arrow::row::{OwnedRow, RowConverter, SortField};

/// Converter for a single ascending Int64 key column.
#[allow(dead_code)]
pub fn int_converter() -> RowConverter {
    RowConverter::new(vec![SortField::new(DataType::Int64)]).unwrap()
}

#[allow(dead_code)]
pub fn int_rows(values: &[i64]) -> Vec<OwnedRow> {
    let column: ArrayRef = Arc::new(Int64Array::from(values.to_vec()));
    let rows = int_converter().convert_columns(&[column]).unwrap();
    rows.iter().map(|r| r.owned()).collect()
}

/// Key statistics with a fixed total weight that produce a fixed number of
/// partitions, counting how often boundaries are generated.
#[allow(dead_code)]
pub struct FakeStatistics {
    total_weight: i64,
    generated_partitions: usize,
    generation_calls: AtomicUsize,
    summary_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeStatistics {
    pub fn new(total_weight: i64, generated_partitions: usize) -> Self {
        Self {
            total_weight,
            generated_partitions,
            generation_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
        }
    }

    pub fn generation_calls(&self) -> usize {
        self.generation_calls.load(Ordering::SeqCst)
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    fn partitions(&self) -> Result<PartitionSet> {
        self.generation_calls.fetch_add(1, Ordering::SeqCst);
        let boundaries = (1..self.generated_partitions as i64)
            .map(|i| i * 100)
            .collect::<Vec<_>>();
        PartitionSet::from_boundaries(int_rows(&boundaries))
    }
}

impl KeyStatistics for FakeStatistics {
    fn estimated_total_weight(&self) -> i64 {
        self.total_weight
    }

    fn generate_boundaries_for_target_weight(&self, _target_weight: i64) -> Result<PartitionSet> {
        self.partitions()
    }

    fn generate_boundaries_for_count(&self, _partition_count: usize) -> Result<PartitionSet> {
        self.partitions()
    }

    fn log_summary(&self) {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Asserts that `partitions` cover the key space with strictly increasing,
/// abutting ranges.
#[allow(dead_code)]
pub fn assert_well_formed(partitions: &PartitionSet) {
    let ranges = partitions.ranges();
    assert!(!ranges.is_empty());
    assert!(ranges[0].start().is_none());
    assert!(ranges[ranges.len() - 1].end().is_none());
    for pair in ranges.windows(2) {
        assert_eq!(pair[0].end(), pair[1].start());
    }
    let boundaries = partitions.boundaries().collect::<Vec<_>>();
    for pair in boundaries.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}
