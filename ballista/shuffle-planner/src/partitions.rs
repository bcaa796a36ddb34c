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

//! Key-range partitionings produced by global-sort shuffle planning.

use std::fmt::Write;

use datafusion::arrow::row::{OwnedRow, Row, RowConverter};
use datafusion::arrow::util::display::array_value_to_string;

use crate::error::{PlannerError, Result};

/// A half-open key range `[start, end)` in row-format key order.
///
/// `None` as `start` means "below all keys" and `None` as `end` means
/// "above all keys".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRange {
    start: Option<OwnedRow>,
    end: Option<OwnedRow>,
}

impl KeyRange {
    /// Creates a key range. Bounds are validated when the range becomes part
    /// of a [`PartitionSet`].
    pub fn new(start: Option<OwnedRow>, end: Option<OwnedRow>) -> Self {
        Self { start, end }
    }

    /// Range covering every key.
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    /// Inclusive lower bound, `None` if unbounded.
    pub fn start(&self) -> Option<&OwnedRow> {
        self.start.as_ref()
    }

    /// Exclusive upper bound, `None` if unbounded.
    pub fn end(&self) -> Option<&OwnedRow> {
        self.end.as_ref()
    }

    /// Whether `row` falls within this range.
    pub fn contains(&self, row: Row<'_>) -> bool {
        self.start.as_ref().is_none_or(|s| s.row() <= row)
            && self.end.as_ref().is_none_or(|e| row < e.row())
    }
}

/// An ordered, contiguous and gap-free partitioning of the whole key space.
///
/// Partition `i` ends exactly where partition `i + 1` starts, the first
/// partition starts below every key and the last one ends above every key.
/// There is always at least one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSet {
    ranges: Vec<KeyRange>,
}

impl PartitionSet {
    /// A single partition spanning the whole key space.
    pub fn single_partition() -> Self {
        Self {
            ranges: vec![KeyRange::unbounded()],
        }
    }

    /// Creates a partition set from explicit ranges, validating that they
    /// are strictly increasing, abutting and together cover every key.
    pub fn try_new(ranges: Vec<KeyRange>) -> Result<Self> {
        let (first, last) = match (ranges.first(), ranges.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(PlannerError::InvalidPartitions(
                    "at least one partition is required".to_string(),
                ))
            }
        };

        if first.start.is_some() {
            return Err(PlannerError::InvalidPartitions(
                "first partition must start below all keys".to_string(),
            ));
        }
        if last.end.is_some() {
            return Err(PlannerError::InvalidPartitions(
                "last partition must end above all keys".to_string(),
            ));
        }

        for (i, pair) in ranges.windows(2).enumerate() {
            let (current, next) = (&pair[0], &pair[1]);
            match (&current.end, &next.start) {
                (Some(end), Some(start)) if end == start => {}
                (Some(_), Some(_)) => {
                    return Err(PlannerError::InvalidPartitions(format!(
                        "partition {i} does not abut partition {}",
                        i + 1
                    )))
                }
                _ => {
                    return Err(PlannerError::InvalidPartitions(format!(
                        "boundary between partitions {i} and {} is unbounded",
                        i + 1
                    )))
                }
            }
            if let (Some(start), Some(end)) = (&current.start, &current.end) {
                if start >= end {
                    return Err(PlannerError::InvalidPartitions(format!(
                        "partition {i} is empty or reversed"
                    )));
                }
            }
        }

        Ok(Self { ranges })
    }

    /// Creates a partition set from the split points between partitions.
    ///
    /// `n` strictly increasing boundaries produce `n + 1` partitions.
    pub fn from_boundaries(boundaries: Vec<OwnedRow>) -> Result<Self> {
        if let Some(i) = boundaries.windows(2).position(|w| w[0] >= w[1]) {
            return Err(PlannerError::InvalidPartitions(format!(
                "boundary {} is not greater than boundary {i}",
                i + 1
            )));
        }

        let mut ranges = Vec::with_capacity(boundaries.len() + 1);
        let mut start = None;
        for boundary in boundaries {
            ranges.push(KeyRange::new(start, Some(boundary.clone())));
            start = Some(boundary);
        }
        ranges.push(KeyRange::new(start, None));

        Ok(Self { ranges })
    }

    /// Number of partitions, always at least one.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Always false: a partition set has at least one partition.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Partitions in key order.
    pub fn ranges(&self) -> &[KeyRange] {
        &self.ranges
    }

    /// Split points between consecutive partitions.
    pub fn boundaries(&self) -> impl Iterator<Item = &OwnedRow> {
        self.ranges.iter().skip(1).filter_map(|r| r.start.as_ref())
    }

    /// Index of the partition that `row` belongs to.
    pub fn partition_for_row(&self, row: Row<'_>) -> usize {
        self.ranges[1..]
            .partition_point(|r| r.start.as_ref().is_some_and(|s| s.row() <= row))
    }

    /// Human-readable boundaries, decoding keys with `converter`. The
    /// converter must use the sort fields the boundaries were encoded with.
    pub fn display_with(&self, converter: &RowConverter) -> Result<String> {
        let parser = converter.parser();
        let columns = converter
            .convert_rows(self.boundaries().map(|b| parser.parse(b.row().data())))?;

        let render = |index: usize| -> Result<String> {
            let values = columns
                .iter()
                .map(|c| array_value_to_string(c.as_ref(), index))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(format!("({})", values.join(", ")))
        };

        let mut out = String::new();
        for i in 0..self.len() {
            let start = if i == 0 {
                "-inf".to_string()
            } else {
                render(i - 1)?
            };
            let end = if i + 1 == self.len() {
                "+inf".to_string()
            } else {
                render(i)?
            };
            // writing to a String cannot fail
            let _ = writeln!(out, "partition {i}: [{start}, {end})");
        }
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use datafusion::arrow::array::{ArrayRef, Int64Array};
    use datafusion::arrow::datatypes::DataType;
    use datafusion::arrow::row::SortField;
    use std::sync::Arc;

    pub(crate) fn int_converter() -> RowConverter {
        RowConverter::new(vec![SortField::new(DataType::Int64)]).unwrap()
    }

    pub(crate) fn int_rows(values: &[i64]) -> Vec<OwnedRow> {
        let column: ArrayRef = Arc::new(Int64Array::from(values.to_vec()));
        let rows = int_converter().convert_columns(&[column]).unwrap();
        rows.iter().map(|r| r.owned()).collect()
    }

    #[test]
    fn single_partition_spans_key_space() {
        let partitions = PartitionSet::single_partition();
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions.ranges()[0], KeyRange::unbounded());
        assert_eq!(partitions.boundaries().count(), 0);
    }

    #[test]
    fn from_boundaries_abuts_partitions() -> Result<()> {
        let rows = int_rows(&[10, 20]);
        let partitions = PartitionSet::from_boundaries(rows.clone())?;
        assert_eq!(partitions.len(), 3);

        let ranges = partitions.ranges();
        assert_eq!(ranges[0].start(), None);
        assert_eq!(ranges[0].end(), Some(&rows[0]));
        assert_eq!(ranges[1].start(), Some(&rows[0]));
        assert_eq!(ranges[1].end(), Some(&rows[1]));
        assert_eq!(ranges[2].end(), None);

        // round trip through explicit ranges keeps the same partitioning
        assert_eq!(PartitionSet::try_new(ranges.to_vec())?, partitions);
        Ok(())
    }

    #[test]
    fn non_increasing_boundaries_are_rejected() {
        assert!(PartitionSet::from_boundaries(int_rows(&[10, 10])).is_err());
        assert!(PartitionSet::from_boundaries(int_rows(&[20, 10])).is_err());
    }

    #[test]
    fn gaps_and_open_ends_are_rejected() {
        let rows = int_rows(&[10, 20]);
        let gap = vec![
            KeyRange::new(None, Some(rows[0].clone())),
            KeyRange::new(Some(rows[1].clone()), None),
        ];
        assert!(PartitionSet::try_new(gap).is_err());

        let bounded_start = vec![KeyRange::new(Some(rows[0].clone()), None)];
        assert!(PartitionSet::try_new(bounded_start).is_err());

        let bounded_end = vec![KeyRange::new(None, Some(rows[0].clone()))];
        assert!(PartitionSet::try_new(bounded_end).is_err());

        assert!(PartitionSet::try_new(vec![]).is_err());
    }

    #[test]
    fn rows_route_to_containing_partition() -> Result<()> {
        let partitions = PartitionSet::from_boundaries(int_rows(&[10, 20]))?;
        let probes = int_rows(&[-5, 10, 15, 20, 99]);
        let routed = probes
            .iter()
            .map(|r| partitions.partition_for_row(r.row()))
            .collect::<Vec<_>>();
        assert_eq!(routed, vec![0, 1, 1, 2, 2]);

        for (probe, index) in probes.iter().zip(routed) {
            assert!(partitions.ranges()[index].contains(probe.row()));
        }
        Ok(())
    }

    #[test]
    fn display_decodes_boundaries() -> Result<()> {
        let partitions = PartitionSet::from_boundaries(int_rows(&[10]))?;
        let rendered = partitions.display_with(&int_converter())?;
        assert_eq!(
            rendered,
            "partition 0: [-inf, (10))\npartition 1: [(10), +inf)\n"
        );
        Ok(())
    }
}
