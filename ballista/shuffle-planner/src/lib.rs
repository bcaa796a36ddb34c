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

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Configuration options for shuffle planning.
pub mod config;
/// Error types and result definitions for shuffle planning.
pub mod error;
/// Result of generating partitions for a shuffle.
pub mod outcome;
/// Key ranges and the partition sets built from them.
pub mod partitions;
/// Protocol Buffer encoding of shuffle specs and partition sets.
pub mod serde;
/// Shuffle specs and the partition generation algorithms.
pub mod shuffle;
/// Sort keys that order shuffled rows.
pub mod sort_key;
/// Collection and merging of key statistics from producer workers.
pub mod statistics;
