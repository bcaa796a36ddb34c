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

use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use crate::error::{PlannerError, Result};
use crate::statistics::KeyStatisticsCollector;

enum MergeState {
    Merging(Option<KeyStatisticsCollector>),
    Finalized(Arc<KeyStatisticsCollector>),
}

struct AccumulatorState {
    reported: Vec<bool>,
    merge: MergeState,
}

/// Merges the key statistics reported by each worker of a producer stage.
///
/// Workers may report concurrently; merges are serialized behind a lock so
/// the merged statistics are never observed half-merged. Statistics are only
/// released once every expected worker has reported, after which they are
/// frozen and shared read-only.
pub struct StageStatisticsAccumulator {
    stage_id: usize,
    expected_workers: usize,
    state: Mutex<AccumulatorState>,
}

impl StageStatisticsAccumulator {
    /// Creates an accumulator expecting one report from each of
    /// `expected_workers` workers, numbered from zero.
    pub fn try_new(stage_id: usize, expected_workers: usize) -> Result<Self> {
        if expected_workers == 0 {
            return Err(PlannerError::Configuration(format!(
                "stage {stage_id} must expect at least one worker"
            )));
        }

        Ok(Self {
            stage_id,
            expected_workers,
            state: Mutex::new(AccumulatorState {
                reported: vec![false; expected_workers],
                merge: MergeState::Merging(None),
            }),
        })
    }

    /// Stage whose statistics are accumulated.
    pub fn stage_id(&self) -> usize {
        self.stage_id
    }

    /// Number of workers expected to report.
    pub fn expected_workers(&self) -> usize {
        self.expected_workers
    }

    /// Merges the statistics of `worker`. Each worker reports exactly once.
    pub fn add_worker_statistics(
        &self,
        worker: usize,
        statistics: KeyStatisticsCollector,
    ) -> Result<()> {
        let mut state = self.state.lock();

        if worker >= self.expected_workers {
            return Err(PlannerError::Internal(format!(
                "stage {} received statistics from worker {worker}, but only {} workers are expected",
                self.stage_id, self.expected_workers
            )));
        }
        if state.reported[worker] {
            return Err(PlannerError::Internal(format!(
                "stage {} received statistics from worker {worker} twice",
                self.stage_id
            )));
        }

        match &mut state.merge {
            MergeState::Merging(merged @ None) => *merged = Some(statistics),
            MergeState::Merging(Some(merged)) => merged.merge(&statistics)?,
            MergeState::Finalized(_) => {
                return Err(PlannerError::Internal(format!(
                    "stage {} statistics are already finalized",
                    self.stage_id
                )))
            }
        }
        state.reported[worker] = true;

        debug!(
            "Stage {} merged key statistics from worker {worker} ({}/{} reported)",
            self.stage_id,
            state.reported.iter().filter(|r| **r).count(),
            self.expected_workers
        );
        Ok(())
    }

    /// Number of workers that have reported so far.
    pub fn reported_workers(&self) -> usize {
        self.state.lock().reported.iter().filter(|r| **r).count()
    }

    /// Whether every expected worker has reported.
    pub fn is_complete(&self) -> bool {
        self.state.lock().reported.iter().all(|r| *r)
    }

    /// Merged statistics of all workers.
    ///
    /// Fails with [`PlannerError::StatisticsIncomplete`] while any worker has
    /// not reported, since planning on partial statistics under-counts weight.
    /// Once returned, the statistics are frozen and every later call returns
    /// the same snapshot.
    pub fn finalized_statistics(&self) -> Result<Arc<KeyStatisticsCollector>> {
        let mut state = self.state.lock();

        let missing = state
            .reported
            .iter()
            .enumerate()
            .filter(|(_, reported)| !**reported)
            .map(|(worker, _)| worker)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(PlannerError::StatisticsIncomplete(format!(
                "stage {} is still waiting for workers {missing:?}",
                self.stage_id
            )));
        }

        let snapshot = match &mut state.merge {
            MergeState::Finalized(snapshot) => return Ok(snapshot.clone()),
            MergeState::Merging(merged) => merged.take().map(Arc::new).ok_or_else(|| {
                PlannerError::Internal(format!(
                    "stage {} has no merged statistics",
                    self.stage_id
                ))
            })?,
        };
        state.merge = MergeState::Finalized(snapshot.clone());

        info!(
            "Stage {} key statistics finalized from {} workers",
            self.stage_id, self.expected_workers
        );
        Ok(snapshot)
    }
}
