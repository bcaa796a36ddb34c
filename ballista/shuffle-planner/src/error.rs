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

//! Shuffle planner error types

use std::{
    error::Error,
    fmt::{Display, Formatter},
    io, result,
};

use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;

use crate::shuffle::ShuffleKind;

/// Result type alias for shuffle planner operations.
pub type Result<T> = result::Result<T, PlannerError>;

/// Errors raised while building shuffle specs, collecting key statistics or
/// generating partitions.
///
/// A partition count that exceeds the permitted maximum is not an error: it is
/// reported through [`crate::outcome::PartitionOutcome::Rejected`]. Only callers
/// that decide to fail the query turn it into [`PlannerError::TooManyPartitions`].
#[derive(Debug)]
pub enum PlannerError {
    /// Sort key is empty, has a column with undefined ordering, or cannot be
    /// encoded in a totally ordered form.
    InvalidSortKey(String),
    /// Invalid shuffle or planner configuration, e.g. a non-positive target size.
    Configuration(String),
    /// Partition count was requested from a shuffle spec that only learns it
    /// from runtime statistics.
    PartitionCountNotKnown(ShuffleKind),
    /// Boundaries do not form an ordered, contiguous, gap-free partitioning.
    InvalidPartitions(String),
    /// Query needs more partitions than it is permitted to use.
    TooManyPartitions {
        /// Partitions the query would need.
        required: u64,
        /// Partitions the query is permitted to use.
        max: usize,
    },
    /// Key statistics were read before every expected worker reported.
    StatisticsIncomplete(String),
    /// Error from Arrow operations.
    ArrowError(Box<ArrowError>),
    /// Error from DataFusion operations.
    DataFusionError(Box<DataFusionError>),
    /// Malformed protobuf plan.
    ProtoDecode(prost::DecodeError),
    /// Malformed JSON plan.
    Json(serde_json::Error),
    /// I/O operation error.
    IoError(io::Error),
    /// Internal error indicating a bug or unexpected state.
    Internal(String),
    /// General error with a descriptive message.
    General(String),
}

impl From<String> for PlannerError {
    fn from(e: String) -> Self {
        PlannerError::General(e)
    }
}

impl From<ArrowError> for PlannerError {
    fn from(e: ArrowError) -> Self {
        match e {
            ArrowError::ExternalError(e) if e.downcast_ref::<PlannerError>().is_some() => {
                match e.downcast::<PlannerError>() {
                    Ok(e) => *e,
                    Err(e) => {
                        PlannerError::ArrowError(Box::new(ArrowError::ExternalError(e)))
                    }
                }
            }
            other => PlannerError::ArrowError(Box::new(other)),
        }
    }
}

impl From<DataFusionError> for PlannerError {
    fn from(e: DataFusionError) -> Self {
        match e {
            DataFusionError::ArrowError(e, _) => Self::from(e),
            _ => PlannerError::DataFusionError(Box::new(e)),
        }
    }
}

impl From<prost::DecodeError> for PlannerError {
    fn from(e: prost::DecodeError) -> Self {
        PlannerError::ProtoDecode(e)
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(e: serde_json::Error) -> Self {
        PlannerError::Json(e)
    }
}

impl From<io::Error> for PlannerError {
    fn from(e: io::Error) -> Self {
        PlannerError::IoError(e)
    }
}

impl From<PlannerError> for DataFusionError {
    fn from(e: PlannerError) -> Self {
        match e {
            PlannerError::DataFusionError(e) => *e,
            PlannerError::Configuration(desc) => DataFusionError::Configuration(desc),
            other => DataFusionError::External(Box::new(other)),
        }
    }
}

impl Display for PlannerError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PlannerError::InvalidSortKey(desc) => write!(f, "Invalid sort key: {desc}"),
            PlannerError::Configuration(desc) => {
                write!(f, "Configuration error: {desc}")
            }
            PlannerError::PartitionCountNotKnown(kind) => {
                write!(f, "Number of partitions not known for [{kind}]")
            }
            PlannerError::InvalidPartitions(desc) => {
                write!(f, "Invalid partitions: {desc}")
            }
            PlannerError::TooManyPartitions { required, max } => {
                write!(
                    f,
                    "Too many partitions: query requires {required} partitions, \
                    but at most {max} are permitted"
                )
            }
            PlannerError::StatisticsIncomplete(desc) => {
                write!(f, "Key statistics incomplete: {desc}")
            }
            PlannerError::ArrowError(desc) => write!(f, "Arrow error: {desc}"),
            PlannerError::DataFusionError(desc) => {
                write!(f, "DataFusion error: {desc}")
            }
            PlannerError::ProtoDecode(desc) => {
                write!(f, "Protobuf decode error: {desc}")
            }
            PlannerError::Json(desc) => write!(f, "JSON error: {desc}"),
            PlannerError::IoError(desc) => write!(f, "IO error: {desc}"),
            PlannerError::Internal(desc) => {
                write!(f, "Internal shuffle planner error: {desc}")
            }
            PlannerError::General(desc) => write!(f, "General error: {desc}"),
        }
    }
}

impl Error for PlannerError {}
