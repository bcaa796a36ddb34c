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

//! Ballista global sort shuffle planner binary.
//!
//! Collects key statistics over a CSV or Parquet input, treating each
//! partition stream of the scan as one producer worker, and prints the
//! partition boundaries a global sort shuffle would use.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::{env, fs, io};

use ballista_shuffle_planner::config::{ShuffleConfig, ShuffleSessionConfigExt};
use ballista_shuffle_planner::error::{PlannerError, Result};
use ballista_shuffle_planner::shuffle::ShuffleSpec;
use ballista_shuffle_planner::statistics::StageStatisticsAccumulator;
use clap::Parser;
use datafusion::prelude::{
    CsvReadOptions, DataFrame, ParquetReadOptions, SessionConfig, SessionContext,
};
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum InputFormat {
    Csv,
    Parquet,
}

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Config {
    #[arg(long, help = "Path to the JSON encoded shuffle spec")]
    spec: PathBuf,
    #[arg(long, help = "Input file or directory to collect key statistics from")]
    input: String,
    #[arg(long, value_enum, default_value_t = InputFormat::Parquet, help = "Format of the input. Default: parquet")]
    format: InputFormat,
    #[arg(
        long,
        help = "Maximum number of partitions to generate. Overrides ballista_shuffle.max_partitions"
    )]
    max_partitions: Option<usize>,
    #[arg(
        long,
        help = "Number of producer workers, i.e. partitions of the input scan. Defaults to the number of cores"
    )]
    workers: Option<usize>,
    #[arg(
        short = 'c',
        long = "config",
        value_parser = parse_key_val,
        help = "Shuffle planner setting, e.g. -c ballista_shuffle.max_retained_keys=1024"
    )]
    settings: Vec<(String, String)>,
    #[arg(
        long,
        default_value_t = String::from("INFO,datafusion=INFO"),
        help = "special log level for sub mod. link: https://docs.rs/env_logger/latest/env_logger/#enabling-logging. For example we want whole level is INFO but datafusion mode is DEBUG"
    )]
    log_level_setting: String,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;

    runtime.block_on(inner())
}

async fn inner() -> Result<()> {
    let opt = Config::parse();

    let rust_log = env::var(EnvFilter::DEFAULT_ENV);
    let log_filter = EnvFilter::new(rust_log.unwrap_or(opt.log_level_setting.clone()));
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(io::stderr)
        .with_env_filter(log_filter)
        .init();

    let spec: ShuffleSpec = serde_json::from_str(&fs::read_to_string(&opt.spec)?)?;
    let shuffle_config =
        ShuffleConfig::with_settings(opt.settings.iter().cloned().collect::<HashMap<_, _>>())?;
    let max_partitions = opt
        .max_partitions
        .unwrap_or_else(|| shuffle_config.max_partitions());
    let max_retained_keys = shuffle_config.max_retained_keys();
    info!("planning {spec} over {} with at most {max_partitions} partitions", opt.input);

    let mut session_config = SessionConfig::new().with_shuffle_config(shuffle_config);
    if let Some(workers) = opt.workers {
        session_config = session_config.with_target_partitions(workers);
    }
    let ctx = SessionContext::new_with_config(session_config);
    let df: DataFrame = match opt.format {
        InputFormat::Csv => ctx.read_csv(opt.input.as_str(), CsvReadOptions::new()).await?,
        InputFormat::Parquet => {
            ctx.read_parquet(opt.input.as_str(), ParquetReadOptions::default())
                .await?
        }
    };

    let schema = df.schema().inner().clone();
    let streams = df.execute_stream_partitioned().await?;
    let accumulator = Arc::new(StageStatisticsAccumulator::try_new(
        0,
        streams.len().max(1),
    )?);
    if streams.is_empty() {
        accumulator.add_worker_statistics(
            0,
            spec.new_statistics_collector(schema.clone(), max_retained_keys)?,
        )?;
    }

    let mut handles = Vec::with_capacity(streams.len());
    for (worker, mut stream) in streams.into_iter().enumerate() {
        let mut collector = spec.new_statistics_collector(schema.clone(), max_retained_keys)?;
        let accumulator = accumulator.clone();
        handles.push(tokio::spawn(async move {
            while let Some(batch) = stream.next().await {
                collector.add_batch(&batch?)?;
            }
            accumulator.add_worker_statistics(worker, collector)
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| PlannerError::Internal(format!("producer worker failed: {e}")))??;
    }

    let statistics = accumulator.finalized_statistics()?;
    let partitions = spec
        .generate_partitions(statistics.as_ref(), max_partitions)?
        .into_result(max_partitions)?;

    info!("generated {} partitions", partitions.len());
    println!("{}", partitions.display_with(statistics.converter())?);
    Ok(())
}
