use anyhow::Context;
use clap::Parser;
use iotdb_client::TSDataType;
use iotdb_tablet_bench::{
    driver::{RunConfig, performance_test},
    encoder::Encoding,
};

use super::common::{SessionArgs, ValueArgs};

#[derive(Debug, Parser)]
#[clap(visible_alias = "r")]
pub(crate) struct Config {
    /// Connection to the store
    #[clap(flatten)]
    session: SessionArgs,

    /// Value generation
    #[clap(flatten)]
    values: ValueArgs,

    /// Logging configuration
    #[clap(flatten)]
    pub(crate) logging_config: trogging::cli::LoggingConfig,

    /// The data type of each measurement, in order, e.g. `FLOAT,INT32,TEXT`
    #[clap(
        long = "data-types",
        env = "IOTDB_BENCH_DATA_TYPES",
        value_delimiter = ',',
        default_value = "FLOAT"
    )]
    data_types: Vec<TSDataType>,

    /// How tablets are represented in memory before they are inserted
    #[clap(
        long = "encoding",
        env = "IOTDB_BENCH_ENCODING",
        value_enum,
        default_value_t = Encoding::Columnar
    )]
    encoding: Encoding,

    /// Check the point count of every series right after its insert
    #[clap(long = "validate", default_value_t = false)]
    validate: bool,

    /// Rows per tablet
    #[clap(long = "rows", env = "IOTDB_BENCH_ROWS", default_value_t = 10_000)]
    rows: usize,

    /// Number of series, each inserted as one tablet
    #[clap(long = "columns", env = "IOTDB_BENCH_COLUMNS", default_value_t = 2_000)]
    columns: usize,
}

pub(crate) async fn command(config: Config) -> Result<(), anyhow::Error> {
    let run = RunConfig {
        data_types: config.data_types,
        encoding: config.encoding,
        validate: config.validate,
        rows: config.rows,
        columns: config.columns,
        seed: config.values.seed,
        random_values: config.values.random_values,
    };

    let mut session = config.session.session();
    let report = performance_test(&mut session, &run)
        .await
        .context("benchmark run failed")?;
    println!("{report}");

    Ok(())
}
