#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyColumnNode {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(enumeration = "KeyOrder", tag = "2")]
    pub order: i32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SortKeyNode {
    #[prost(message, repeated, tag = "1")]
    pub columns: ::prost::alloc::vec::Vec<KeyColumnNode>,
    /// leading columns whose values are never split across partitions
    #[prost(uint64, tag = "2")]
    pub bucket_by_count: u64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ShuffleSpecNode {
    #[prost(oneof = "shuffle_spec_node::SpecType", tags = "1, 2")]
    pub spec_type: ::core::option::Option<shuffle_spec_node::SpecType>,
}
/// Nested message and enum types in `ShuffleSpecNode`.
pub mod shuffle_spec_node {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum SpecType {
        #[prost(message, tag = "1")]
        FixedCount(super::FixedCountShuffleSpecNode),
        #[prost(message, tag = "2")]
        TargetSize(super::TargetSizeShuffleSpecNode),
    }
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FixedCountShuffleSpecNode {
    #[prost(message, optional, tag = "1")]
    pub sort_key: ::core::option::Option<SortKeyNode>,
    #[prost(uint64, tag = "2")]
    pub partition_count: u64,
    #[prost(bool, tag = "3")]
    pub aggregate: bool,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TargetSizeShuffleSpecNode {
    #[prost(message, optional, tag = "1")]
    pub sort_key: ::core::option::Option<SortKeyNode>,
    #[prost(int64, tag = "2")]
    pub target_size: i64,
    #[prost(bool, tag = "3")]
    pub aggregate: bool,
}
/// Bounds are encoded in the arrow row format of the shuffle's sort key.
/// A missing bound is unbounded.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyRangeNode {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub start: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub end: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PartitionSetNode {
    #[prost(message, repeated, tag = "1")]
    pub ranges: ::prost::alloc::vec::Vec<KeyRangeNode>,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum KeyOrder {
    None = 0,
    Ascending = 1,
    Descending = 2,
}
impl KeyOrder {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::None => "KEY_ORDER_NONE",
            Self::Ascending => "ASCENDING",
            Self::Descending => "DESCENDING",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "KEY_ORDER_NONE" => Some(Self::None),
            "ASCENDING" => Some(Self::Ascending),
            "DESCENDING" => Some(Self::Descending),
            _ => None,
        }
    }
}
