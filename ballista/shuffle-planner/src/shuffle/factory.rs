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

use crate::error::{PlannerError, Result};
use crate::shuffle::{
    GlobalSortFixedCountShuffleSpec, GlobalSortTargetSizeShuffleSpec, ShuffleSpec,
};
use crate::sort_key::SortKey;

/// Builds the shuffle spec of a stage once its sort key is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleSpecFactory {
    /// Global sort into this many partitions.
    GlobalSortFixedCount(usize),
    /// Global sort into partitions of this target weight.
    GlobalSortTargetSize(i64),
}

impl ShuffleSpecFactory {
    /// Builds a spec for `sort_key`.
    pub fn build(&self, sort_key: SortKey, aggregate: bool) -> Result<ShuffleSpec> {
        match self {
            ShuffleSpecFactory::GlobalSortFixedCount(partition_count) => Ok(
                GlobalSortFixedCountShuffleSpec::try_new(sort_key, *partition_count, aggregate)?
                    .into(),
            ),
            ShuffleSpecFactory::GlobalSortTargetSize(target_size) => Ok(
                GlobalSortTargetSizeShuffleSpec::try_new(sort_key, *target_size, aggregate)?
                    .into(),
            ),
        }
    }

    /// Like [`Self::build`], also checking that a fixed partition count does
    /// not exceed `max_partitions`.
    pub fn build_within(
        &self,
        sort_key: SortKey,
        aggregate: bool,
        max_partitions: usize,
    ) -> Result<ShuffleSpec> {
        if let ShuffleSpecFactory::GlobalSortFixedCount(partition_count) = self {
            if *partition_count > max_partitions {
                return Err(PlannerError::Configuration(format!(
                    "partition count {partition_count} exceeds the maximum of {max_partitions}"
                )));
            }
        }
        self.build(sort_key, aggregate)
    }
}
