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

//! Shuffle planner configuration

use std::collections::HashMap;
use std::result;
use std::sync::LazyLock;

use datafusion::{
    arrow::datatypes::DataType, common::config_err, config::ConfigExtension,
    prelude::SessionConfig,
};

use crate::error::{PlannerError, Result};
use crate::shuffle::{ShuffleSpecFactory, MAX_PARTITIONS};

/// Upper bound on the partitions a shuffle may generate
pub const SHUFFLE_MAX_PARTITIONS: &str = "ballista_shuffle.max_partitions";
/// When set, shuffles produce exactly this many partitions
pub const SHUFFLE_PARTITION_COUNT: &str = "ballista_shuffle.partition_count";
/// Target weight (rows, or distinct keys when aggregating) of each partition,
/// used when no fixed partition count is set
pub const SHUFFLE_TARGET_PARTITION_WEIGHT: &str = "ballista_shuffle.target_partition_weight";
/// Number of keys a worker retains before it downsamples its key statistics
pub const SHUFFLE_MAX_RETAINED_KEYS: &str = "ballista_shuffle.max_retained_keys";

const DEFAULT_TARGET_PARTITION_WEIGHT: usize = 3_000_000;
const DEFAULT_MAX_RETAINED_KEYS: usize = 65_536;

/// Result of parsing a user-supplied setting
pub type ParseResult<T> = result::Result<T, String>;

static CONFIG_ENTRIES: LazyLock<HashMap<String, ConfigEntry>> = LazyLock::new(|| {
    let entries = vec![
        ConfigEntry::new(SHUFFLE_MAX_PARTITIONS.to_string(),
                         "Maximum number of partitions a global-sort shuffle may generate".to_string(),
                         DataType::UInt64,
                         Some(MAX_PARTITIONS.to_string())),
        ConfigEntry::new(SHUFFLE_PARTITION_COUNT.to_string(),
                         "Fixed number of partitions for global-sort shuffles. When unset, partitions are sized by target weight".to_string(),
                         DataType::UInt64,
                         None),
        ConfigEntry::new(SHUFFLE_TARGET_PARTITION_WEIGHT.to_string(),
                         "Target weight of each partition of a global-sort shuffle".to_string(),
                         DataType::UInt64,
                         Some(DEFAULT_TARGET_PARTITION_WEIGHT.to_string())),
        ConfigEntry::new(SHUFFLE_MAX_RETAINED_KEYS.to_string(),
                         "Maximum number of distinct keys retained by a worker's key statistics".to_string(),
                         DataType::UInt64,
                         Some(DEFAULT_MAX_RETAINED_KEYS.to_string())),
    ];
    entries
        .into_iter()
        .map(|e| (e.name.clone(), e))
        .collect::<HashMap<_, _>>()
});

/// Configuration option meta-data
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    name: String,
    description: String,
    data_type: DataType,
    default_value: Option<String>,
}

impl ConfigEntry {
    fn new(
        name: String,
        description: String,
        data_type: DataType,
        default_value: Option<String>,
    ) -> Self {
        Self {
            name,
            description,
            data_type,
            default_value,
        }
    }
}

/// Shuffle planner configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShuffleConfig {
    /// Settings stored in map for easy serde
    settings: HashMap<String, String>,
}

impl ShuffleConfig {
    /// Create a new configuration based on key-value pairs
    pub fn with_settings(settings: HashMap<String, String>) -> Result<Self> {
        let supported_entries = ShuffleConfig::valid_entries();

        if let Some(name) = settings.keys().find(|k| !supported_entries.contains_key(*k)) {
            return Err(PlannerError::Configuration(format!(
                "configuration key `{name}` does not exist"
            )));
        }

        for (name, entry) in supported_entries {
            if let Some(v) = settings.get(name) {
                // validate that we can parse the user-supplied value
                Self::parse_value(v.as_str(), entry.data_type.clone()).map_err(|e| PlannerError::Configuration(format!("Failed to parse user-supplied value '{v}' for configuration setting '{name}': {e}")))?;
            }
        }

        let config = Self { settings };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let max_partitions = self.max_partitions();
        if max_partitions == 0 || max_partitions > MAX_PARTITIONS {
            return Err(PlannerError::Configuration(format!(
                "'{SHUFFLE_MAX_PARTITIONS}' must be between 1 and {MAX_PARTITIONS}"
            )));
        }
        if let Some(count) = self.partition_count() {
            if count == 0 || count > max_partitions {
                return Err(PlannerError::Configuration(format!(
                    "'{SHUFFLE_PARTITION_COUNT}' must be between 1 and {max_partitions}"
                )));
            }
        }
        if self.target_partition_weight() <= 0 {
            return Err(PlannerError::Configuration(format!(
                "'{SHUFFLE_TARGET_PARTITION_WEIGHT}' must be positive"
            )));
        }
        if self.max_retained_keys() == 0 {
            return Err(PlannerError::Configuration(format!(
                "'{SHUFFLE_MAX_RETAINED_KEYS}' must be positive"
            )));
        }
        Ok(())
    }

    /// Checks that `val` parses as `data_type`
    pub fn parse_value(val: &str, data_type: DataType) -> ParseResult<()> {
        match data_type {
            DataType::UInt64 => {
                val.to_string()
                    .parse::<usize>()
                    .map_err(|e| format!("{e:?}"))?;
            }
            _ => {
                return Err(format!("not support data type: {data_type}"));
            }
        }

        Ok(())
    }

    /// All available configuration options
    pub fn valid_entries() -> &'static HashMap<String, ConfigEntry> {
        &CONFIG_ENTRIES
    }

    /// User-supplied settings, keyed by full name
    pub fn settings(&self) -> &HashMap<String, String> {
        &self.settings
    }

    /// Upper bound on the partitions a shuffle may generate
    pub fn max_partitions(&self) -> usize {
        self.get_usize_setting(SHUFFLE_MAX_PARTITIONS)
            .unwrap_or(MAX_PARTITIONS)
    }

    /// Fixed partition count, when one is configured
    pub fn partition_count(&self) -> Option<usize> {
        self.get_usize_setting(SHUFFLE_PARTITION_COUNT)
    }

    /// Target weight of each partition
    pub fn target_partition_weight(&self) -> i64 {
        self.get_usize_setting(SHUFFLE_TARGET_PARTITION_WEIGHT)
            .unwrap_or(DEFAULT_TARGET_PARTITION_WEIGHT)
            .try_into()
            .unwrap_or(i64::MAX)
    }

    /// Keys a worker retains before it downsamples its statistics
    pub fn max_retained_keys(&self) -> usize {
        self.get_usize_setting(SHUFFLE_MAX_RETAINED_KEYS)
            .unwrap_or(DEFAULT_MAX_RETAINED_KEYS)
    }

    /// Factory for the shuffle specs this configuration asks for
    pub fn shuffle_spec_factory(&self) -> ShuffleSpecFactory {
        match self.partition_count() {
            Some(count) => ShuffleSpecFactory::GlobalSortFixedCount(count),
            None => ShuffleSpecFactory::GlobalSortTargetSize(self.target_partition_weight()),
        }
    }

    fn get_usize_setting(&self, key: &str) -> Option<usize> {
        // values are validated when they are set
        match self.settings.get(key) {
            Some(v) => v.parse().ok(),
            None => Self::valid_entries()
                .get(key)
                .and_then(|e| e.default_value.as_ref())
                .and_then(|v| v.parse().ok()),
        }
    }
}

impl datafusion::config::ExtensionOptions for ShuffleConfig {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn cloned(&self) -> Box<dyn datafusion::config::ExtensionOptions> {
        Box::new(self.clone())
    }

    fn set(&mut self, key: &str, value: &str) -> datafusion::error::Result<()> {
        let entries = Self::valid_entries();
        let k = format!("{}.{key}", ShuffleConfig::PREFIX);

        match entries.get(&k) {
            Some(entry) => {
                if let Err(e) = Self::parse_value(value, entry.data_type.clone()) {
                    return config_err!("invalid value '{}' for `{}`: {}", value, k, e);
                }
                let mut settings = self.settings.clone();
                settings.insert(k, value.to_string());
                *self = Self::with_settings(settings)?;
                Ok(())
            }
            None => config_err!("configuration key `{}` does not exist", key),
        }
    }

    fn entries(&self) -> Vec<datafusion::config::ConfigEntry> {
        Self::valid_entries()
            .iter()
            .map(|(key, value)| datafusion::config::ConfigEntry {
                key: key.clone(),
                value: self
                    .settings
                    .get(key)
                    .cloned()
                    .or(value.default_value.clone()),
                description: &value.description,
            })
            .collect()
    }
}

impl ConfigExtension for ShuffleConfig {
    const PREFIX: &'static str = "ballista_shuffle";
}

/// Access to [`ShuffleConfig`] carried by a [`SessionConfig`]
pub trait ShuffleSessionConfigExt {
    /// Shuffle configuration of this session, or the default one
    fn shuffle_config(&self) -> ShuffleConfig;

    /// Attaches `config` to this session
    fn with_shuffle_config(self, config: ShuffleConfig) -> Self;
}

impl ShuffleSessionConfigExt for SessionConfig {
    fn shuffle_config(&self) -> ShuffleConfig {
        self.options()
            .extensions
            .get::<ShuffleConfig>()
            .cloned()
            .unwrap_or_default()
    }

    fn with_shuffle_config(self, config: ShuffleConfig) -> Self {
        self.with_option_extension(config)
    }
}
