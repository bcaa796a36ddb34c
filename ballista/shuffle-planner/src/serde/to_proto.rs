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

use crate::partitions::{KeyRange, PartitionSet};
use crate::serde::protobuf;
use crate::shuffle::{
    GlobalSortFixedCountShuffleSpec, GlobalSortTargetSizeShuffleSpec, ShuffleSpec,
};
use crate::sort_key::{KeyColumn, KeyOrder, SortKey};
use protobuf::shuffle_spec_node::SpecType;

impl From<KeyOrder> for protobuf::KeyOrder {
    fn from(order: KeyOrder) -> Self {
        match order {
            KeyOrder::None => protobuf::KeyOrder::None,
            KeyOrder::Ascending => protobuf::KeyOrder::Ascending,
            KeyOrder::Descending => protobuf::KeyOrder::Descending,
        }
    }
}

impl From<&KeyColumn> for protobuf::KeyColumnNode {
    fn from(column: &KeyColumn) -> Self {
        protobuf::KeyColumnNode {
            name: column.name().to_owned(),
            order: protobuf::KeyOrder::from(column.order()).into(),
        }
    }
}

impl From<&SortKey> for protobuf::SortKeyNode {
    fn from(sort_key: &SortKey) -> Self {
        protobuf::SortKeyNode {
            columns: sort_key.columns().iter().map(Into::into).collect(),
            bucket_by_count: sort_key.bucket_by_count() as u64,
        }
    }
}

impl From<&GlobalSortFixedCountShuffleSpec> for protobuf::FixedCountShuffleSpecNode {
    fn from(spec: &GlobalSortFixedCountShuffleSpec) -> Self {
        protobuf::FixedCountShuffleSpecNode {
            sort_key: Some(spec.sort_key().into()),
            partition_count: spec.partition_count() as u64,
            aggregate: spec.does_aggregate(),
        }
    }
}

impl From<&GlobalSortTargetSizeShuffleSpec> for protobuf::TargetSizeShuffleSpecNode {
    fn from(spec: &GlobalSortTargetSizeShuffleSpec) -> Self {
        protobuf::TargetSizeShuffleSpecNode {
            sort_key: Some(spec.sort_key().into()),
            target_size: spec.target_size(),
            aggregate: spec.does_aggregate(),
        }
    }
}

impl From<&ShuffleSpec> for protobuf::ShuffleSpecNode {
    fn from(spec: &ShuffleSpec) -> Self {
        let spec_type = match spec {
            ShuffleSpec::GlobalSortFixedCount(spec) => SpecType::FixedCount(spec.into()),
            ShuffleSpec::GlobalSortTargetSize(spec) => SpecType::TargetSize(spec.into()),
        };
        protobuf::ShuffleSpecNode {
            spec_type: Some(spec_type),
        }
    }
}

impl From<&KeyRange> for protobuf::KeyRangeNode {
    fn from(range: &KeyRange) -> Self {
        protobuf::KeyRangeNode {
            start: range.start().map(|row| row.row().as_ref().to_vec()),
            end: range.end().map(|row| row.row().as_ref().to_vec()),
        }
    }
}

impl From<&PartitionSet> for protobuf::PartitionSetNode {
    fn from(partitions: &PartitionSet) -> Self {
        protobuf::PartitionSetNode {
            ranges: partitions.ranges().iter().map(Into::into).collect(),
        }
    }
}
