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

use std::convert::TryInto;

use datafusion::arrow::row::{OwnedRow, RowConverter, RowParser};

use crate::error::{PlannerError, Result};
use crate::partitions::{KeyRange, PartitionSet};
use crate::serde::protobuf;
use crate::shuffle::{
    GlobalSortFixedCountShuffleSpec, GlobalSortTargetSizeShuffleSpec, ShuffleSpec,
};
use crate::sort_key::{KeyColumn, KeyOrder, SortKey};
use protobuf::shuffle_spec_node::SpecType;

impl From<protobuf::KeyOrder> for KeyOrder {
    fn from(order: protobuf::KeyOrder) -> Self {
        match order {
            protobuf::KeyOrder::None => KeyOrder::None,
            protobuf::KeyOrder::Ascending => KeyOrder::Ascending,
            protobuf::KeyOrder::Descending => KeyOrder::Descending,
        }
    }
}

impl TryInto<KeyColumn> for &protobuf::KeyColumnNode {
    type Error = PlannerError;

    fn try_into(self) -> Result<KeyColumn> {
        let order = protobuf::KeyOrder::try_from(self.order).map_err(|_| {
            PlannerError::General(format!(
                "from_proto(KeyColumn) invalid key order {} for column `{}`",
                self.order, self.name
            ))
        })?;
        Ok(KeyColumn::new(self.name.clone(), order.into()))
    }
}

impl TryInto<SortKey> for &protobuf::SortKeyNode {
    type Error = PlannerError;

    fn try_into(self) -> Result<SortKey> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.try_into())
            .collect::<Result<Vec<KeyColumn>>>()?;
        SortKey::try_new(columns, self.bucket_by_count as usize)
    }
}

fn required_sort_key(node: Option<&protobuf::SortKeyNode>) -> Result<SortKey> {
    node.ok_or_else(|| {
        PlannerError::General("from_proto(ShuffleSpec) missing sort key".to_owned())
    })?
    .try_into()
}

impl TryInto<ShuffleSpec> for &protobuf::ShuffleSpecNode {
    type Error = PlannerError;

    fn try_into(self) -> Result<ShuffleSpec> {
        match &self.spec_type {
            Some(SpecType::FixedCount(spec)) => {
                Ok(GlobalSortFixedCountShuffleSpec::try_new(
                    required_sort_key(spec.sort_key.as_ref())?,
                    spec.partition_count as usize,
                    spec.aggregate,
                )?
                .into())
            }
            Some(SpecType::TargetSize(spec)) => {
                Ok(GlobalSortTargetSizeShuffleSpec::try_new(
                    required_sort_key(spec.sort_key.as_ref())?,
                    spec.target_size,
                    spec.aggregate,
                )?
                .into())
            }
            None => Err(PlannerError::General(
                "from_proto(ShuffleSpec) invalid or missing spec type".to_owned(),
            )),
        }
    }
}

fn parse_bound(parser: &RowParser, bytes: Option<&[u8]>) -> Result<Option<OwnedRow>> {
    match bytes {
        None => Ok(None),
        Some([]) => Err(PlannerError::InvalidPartitions(
            "from_proto(PartitionSet) empty partition bound".to_owned(),
        )),
        Some(bytes) => Ok(Some(parser.parse(bytes).owned())),
    }
}

/// Decodes a partition set whose bounds were encoded by a [`RowConverter`]
/// with the same sort fields as `converter`. Bound bytes are not validated
/// against those fields.
pub fn partition_set_from_proto(
    node: &protobuf::PartitionSetNode,
    converter: &RowConverter,
) -> Result<PartitionSet> {
    let parser = converter.parser();
    let ranges = node
        .ranges
        .iter()
        .map(|range| {
            Ok(KeyRange::new(
                parse_bound(&parser, range.start.as_deref())?,
                parse_bound(&parser, range.end.as_deref())?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    PartitionSet::try_new(ranges)
}
