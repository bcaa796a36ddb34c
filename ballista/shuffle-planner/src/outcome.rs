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

//! Result of partition generation for a global-sort shuffle.

use crate::error::{PlannerError, Result};
use crate::partitions::PartitionSet;

/// Outcome of [`crate::shuffle::ShuffleSpec::generate_partitions`].
///
/// Rejection is an expected result, not a fault: it tells the caller how many
/// partitions the stage would need so it can raise the limit and retry, or
/// fail the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionOutcome {
    /// Boundaries were generated within the permitted partition count.
    Accepted(PartitionSet),
    /// The stage needs at least `required_partitions` partitions.
    Rejected {
        /// Partition count the caller would have to permit.
        required_partitions: u64,
    },
}

impl PartitionOutcome {
    /// Whether partitions were generated.
    pub fn is_accepted(&self) -> bool {
        matches!(self, PartitionOutcome::Accepted(_))
    }

    /// Generated partitions, if accepted.
    pub fn partitions(&self) -> Option<&PartitionSet> {
        match self {
            PartitionOutcome::Accepted(partitions) => Some(partitions),
            PartitionOutcome::Rejected { .. } => None,
        }
    }

    /// Required partition count, if rejected.
    pub fn required_partitions(&self) -> Option<u64> {
        match self {
            PartitionOutcome::Accepted(_) => None,
            PartitionOutcome::Rejected {
                required_partitions,
            } => Some(*required_partitions),
        }
    }

    /// Converts a rejection into [`PlannerError::TooManyPartitions`], for
    /// callers that fail the query rather than retry with a higher limit.
    pub fn into_result(self, max_partitions: usize) -> Result<PartitionSet> {
        match self {
            PartitionOutcome::Accepted(partitions) => Ok(partitions),
            PartitionOutcome::Rejected {
                required_partitions,
            } => Err(PlannerError::TooManyPartitions {
                required: required_partitions,
                max: max_partitions,
            }),
        }
    }
}
