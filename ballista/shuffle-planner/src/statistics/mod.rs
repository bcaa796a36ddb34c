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

//! Key statistics consumed by global-sort shuffle planning.
//!
//! Producer-stage workers each build a partial summary of the keys they emit.
//! Those summaries are merged, one worker at a time, by a
//! [`StageStatisticsAccumulator`]; once every expected worker has reported,
//! the merged summary is handed to
//! [`crate::shuffle::ShuffleSpec::generate_partitions`].

mod accumulator;
mod collector;

pub use accumulator::StageStatisticsAccumulator;
pub use collector::KeyStatisticsCollector;

use crate::error::Result;
use crate::partitions::PartitionSet;

/// Approximate summary of key weights across all workers of a producer stage.
///
/// Weight is rows, bytes or distinct keys, depending on how the summary was
/// built. When the consuming shuffle aggregates, the summary reports
/// post-aggregation weight; planning never recomputes it.
///
/// Implementations must only be read once every contribution is merged and
/// must not change while being read.
pub trait KeyStatistics {
    /// Estimated total weight of all keys. Never negative.
    fn estimated_total_weight(&self) -> i64;

    /// Boundaries for partitions of roughly `target_weight` each.
    ///
    /// The number of partitions may differ from
    /// `estimated_total_weight / target_weight`, since both are estimates.
    /// An empty summary yields a single partition.
    fn generate_boundaries_for_target_weight(&self, target_weight: i64)
        -> Result<PartitionSet>;

    /// Boundaries for at most `partition_count` partitions of roughly equal
    /// weight. An empty summary yields a single partition.
    fn generate_boundaries_for_count(&self, partition_count: usize)
        -> Result<PartitionSet>;

    /// Logs a description of the summary. Has no other side effects.
    fn log_summary(&self);
}
