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

//! Sort keys for global-sort shuffles.

use std::fmt::{Display, Formatter};

use datafusion::arrow::compute::SortOptions;
use datafusion::arrow::datatypes::Schema;
use datafusion::arrow::row::{RowConverter, SortField};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Ordering of a single key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyOrder {
    /// Column groups rows but has no defined ordering.
    None,
    /// Ascending, nulls first.
    Ascending,
    /// Descending, nulls last.
    Descending,
}

impl KeyOrder {
    /// Whether the column can take part in a total ordering.
    pub fn sortable(&self) -> bool {
        !matches!(self, KeyOrder::None)
    }

    fn sort_options(&self) -> Option<SortOptions> {
        match self {
            KeyOrder::None => None,
            KeyOrder::Ascending => Some(SortOptions {
                descending: false,
                nulls_first: true,
            }),
            KeyOrder::Descending => Some(SortOptions {
                descending: true,
                nulls_first: false,
            }),
        }
    }
}

impl Display for KeyOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyOrder::None => write!(f, "NONE"),
            KeyOrder::Ascending => write!(f, "ASC"),
            KeyOrder::Descending => write!(f, "DESC"),
        }
    }
}

/// A named column of a [`SortKey`] together with its ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyColumn {
    name: String,
    order: KeyOrder,
}

impl KeyColumn {
    /// Creates a key column.
    pub fn new(name: impl Into<String>, order: KeyOrder) -> Self {
        Self {
            name: name.into(),
            order,
        }
    }

    /// Ascending key column.
    pub fn asc(name: impl Into<String>) -> Self {
        Self::new(name, KeyOrder::Ascending)
    }

    /// Descending key column.
    pub fn desc(name: impl Into<String>) -> Self {
        Self::new(name, KeyOrder::Descending)
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column ordering.
    pub fn order(&self) -> KeyOrder {
        self.order
    }
}

/// Ordered set of key columns that defines both the sort order of a
/// global-sort shuffle and where its partition boundaries may fall.
///
/// The leading `bucket_by_count` columns co-locate rows; the remaining
/// columns only refine ordering within a bucket.
///
/// A `SortKey` is always sortable: construction rejects empty keys and
/// columns without a defined ordering, so the check never has to be repeated
/// when partitions are generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SortKeyDef", into = "SortKeyDef")]
pub struct SortKey {
    columns: Vec<KeyColumn>,
    bucket_by_count: usize,
}

impl SortKey {
    /// Creates a sort key, failing if it is not totally ordered.
    pub fn try_new(columns: Vec<KeyColumn>, bucket_by_count: usize) -> Result<Self> {
        if columns.is_empty() {
            return Err(PlannerError::InvalidSortKey(
                "sort key must have at least one column".to_string(),
            ));
        }

        if let Some(column) = columns.iter().find(|c| !c.order.sortable()) {
            return Err(PlannerError::InvalidSortKey(format!(
                "column [{}] has no defined ordering",
                column.name
            )));
        }

        if bucket_by_count > columns.len() {
            return Err(PlannerError::InvalidSortKey(format!(
                "bucket_by_count [{bucket_by_count}] exceeds number of key columns [{}]",
                columns.len()
            )));
        }

        Ok(Self {
            columns,
            bucket_by_count,
        })
    }

    /// Key columns in ordering precedence.
    pub fn columns(&self) -> &[KeyColumn] {
        &self.columns
    }

    /// Number of leading columns used for bucketing.
    pub fn bucket_by_count(&self) -> usize {
        self.bucket_by_count
    }

    /// Leading columns used for bucketing.
    pub fn bucket_columns(&self) -> &[KeyColumn] {
        &self.columns[..self.bucket_by_count]
    }

    /// Always true, retained for callers that check before planning.
    pub fn sortable(&self) -> bool {
        self.columns.iter().all(|c| c.order.sortable())
    }

    /// Indices of the key columns in `schema`.
    pub fn key_indices(&self, schema: &Schema) -> Result<Vec<usize>> {
        self.columns
            .iter()
            .map(|c| schema.index_of(&c.name).map_err(PlannerError::from))
            .collect()
    }

    /// Row-format sort fields for this key against `schema`.
    ///
    /// Fails if a column is missing or its type has no total order in the
    /// Arrow row format.
    pub fn sort_fields(&self, schema: &Schema) -> Result<Vec<SortField>> {
        let mut fields = Vec::with_capacity(self.columns.len());
        for (column, index) in self.columns.iter().zip(self.key_indices(schema)?) {
            let options = column.order.sort_options().ok_or_else(|| {
                PlannerError::Internal(format!(
                    "column [{}] has no defined ordering",
                    column.name
                ))
            })?;
            fields.push(SortField::new_with_options(
                schema.field(index).data_type().clone(),
                options,
            ));
        }

        if !RowConverter::supports_fields(&fields) {
            return Err(PlannerError::InvalidSortKey(format!(
                "key {self} has columns whose types cannot be totally ordered"
            )));
        }
        Ok(fields)
    }

    /// Converter from key columns of `schema` to comparable rows.
    pub fn row_converter(&self, schema: &Schema) -> Result<RowConverter> {
        Ok(RowConverter::new(self.sort_fields(schema)?)?)
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.order))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{columns}]")?;
        if self.bucket_by_count > 0 {
            write!(f, " bucketBy={}", self.bucket_by_count)?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SortKeyDef {
    columns: Vec<KeyColumn>,
    #[serde(default)]
    bucket_by_count: usize,
}

impl TryFrom<SortKeyDef> for SortKey {
    type Error = PlannerError;

    fn try_from(def: SortKeyDef) -> Result<Self> {
        SortKey::try_new(def.columns, def.bucket_by_count)
    }
}

impl From<SortKey> for SortKeyDef {
    fn from(key: SortKey) -> Self {
        SortKeyDef {
            columns: key.columns,
            bucket_by_count: key.bucket_by_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::{ArrayRef, Int64Array};
    use datafusion::arrow::datatypes::{DataType, Field};
    use std::sync::Arc;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("a", DataType::Int64, true),
            Field::new("b", DataType::Utf8, true),
        ])
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = SortKey::try_new(vec![], 0).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidSortKey(_)));
    }

    #[test]
    fn unordered_column_is_rejected() {
        let err = SortKey::try_new(
            vec![KeyColumn::asc("a"), KeyColumn::new("b", KeyOrder::None)],
            0,
        )
        .unwrap_err();
        assert!(err.to_string().contains("[b]"));
    }

    #[test]
    fn bucket_count_bounded_by_columns() {
        assert!(SortKey::try_new(vec![KeyColumn::asc("a")], 2).is_err());

        let key =
            SortKey::try_new(vec![KeyColumn::asc("a"), KeyColumn::desc("b")], 1).unwrap();
        assert!(key.sortable());
        assert_eq!(key.bucket_columns(), &[KeyColumn::asc("a")]);
        assert_eq!(key.to_string(), "[a ASC, b DESC] bucketBy=1");
    }

    #[test]
    fn missing_column_fails_conversion() {
        let key = SortKey::try_new(vec![KeyColumn::asc("missing")], 0).unwrap();
        assert!(key.row_converter(&schema()).is_err());
    }

    #[test]
    fn descending_column_reverses_row_order() -> Result<()> {
        let key = SortKey::try_new(vec![KeyColumn::desc("a")], 0)?;
        let converter = key.row_converter(&schema())?;
        let column: ArrayRef = Arc::new(Int64Array::from(vec![1, 2]));
        let rows = converter.convert_columns(&[column])?;
        assert!(rows.row(1) < rows.row(0));
        Ok(())
    }

    #[test]
    fn json_rejects_unordered_column() {
        let json = r#"{"columns":[{"name":"a","order":"NONE"}]}"#;
        assert!(serde_json::from_str::<SortKey>(json).is_err());

        let json = r#"{"columns":[{"name":"a","order":"DESCENDING"}],"bucketByCount":1}"#;
        let key: SortKey = serde_json::from_str(json).unwrap();
        assert_eq!(key.columns()[0].order(), KeyOrder::Descending);
        assert_eq!(key.bucket_by_count(), 1);
    }
}
