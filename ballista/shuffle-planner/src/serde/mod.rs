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

//! Protocol Buffer encoding of shuffle specs and partition boundaries, used
//! to ship them between the scheduler and executors.

use std::convert::TryInto;

use datafusion::arrow::row::RowConverter;
use prost::Message;

use crate::error::Result;
use crate::partitions::PartitionSet;
use crate::shuffle::ShuffleSpec;
pub use generated::shuffle_planner as protobuf;

/// Conversions from protobuf messages.
pub mod from_proto;
/// Protobuf messages.
#[allow(missing_docs)]
pub mod generated;
/// Conversions to protobuf messages.
pub mod to_proto;

/// Encodes `spec` as a `ShuffleSpecNode` message.
pub fn encode_shuffle_spec(spec: &ShuffleSpec) -> Vec<u8> {
    protobuf::ShuffleSpecNode::from(spec).encode_to_vec()
}

/// Decodes a `ShuffleSpecNode` message, validating it like the constructors do.
pub fn decode_shuffle_spec(buf: &[u8]) -> Result<ShuffleSpec> {
    let node = protobuf::ShuffleSpecNode::decode(buf)?;
    (&node).try_into()
}

/// Encodes `partitions` as a `PartitionSetNode` message.
pub fn encode_partition_set(partitions: &PartitionSet) -> Vec<u8> {
    protobuf::PartitionSetNode::from(partitions).encode_to_vec()
}

/// Decodes a `PartitionSetNode` message. Bounds are parsed with `converter`,
/// which must use the sort fields the partitions were generated with.
///
/// Bound bytes are only checked for being non-empty and ordered. They are
/// not validated against the sort fields, so `buf` must come from a trusted
/// peer encoding with the same sort key.
pub fn decode_partition_set(buf: &[u8], converter: &RowConverter) -> Result<PartitionSet> {
    let node = protobuf::PartitionSetNode::decode(buf)?;
    from_proto::partition_set_from_proto(&node, converter)
}
