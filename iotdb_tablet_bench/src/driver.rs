//! The benchmark run loop: one session, one tablet per series, strictly sequential.

use std::time::Duration;

use iotdb_client::{Session, TSDataType};
use observability_deps::tracing::{debug, info, warn};
use tokio::time::Instant;

use crate::{
    encoder::{Encoding, MeasurementSchema, ValueSource, device_id},
    report::RunReport,
    validation::{ValidationError, check_count, count_statement},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open session: {0}")]
    Open(#[source] iotdb_client::Error),

    #[error("at least one data type is required")]
    EmptySchema,

    #[error("failed to build tablet for {device_id}: {source}")]
    Encode {
        device_id: String,
        #[source]
        source: iotdb_client::Error,
    },

    #[error("failed to insert tablet for {device_id}: {source}")]
    Insert {
        device_id: String,
        #[source]
        source: iotdb_client::Error,
    },

    #[error("validation of {device_id} failed: {source}")]
    Validation {
        device_id: String,
        #[source]
        source: ValidationError,
    },

    #[error("failed to close session: {0}")]
    Close(#[source] iotdb_client::Error),
}

/// Parameters of one benchmark run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// One measurement per entry, in order
    pub data_types: Vec<TSDataType>,
    pub encoding: Encoding,
    /// Count-check every series right after its insert
    pub validate: bool,
    /// Rows per tablet
    pub rows: usize,
    /// Number of series, one tablet each
    pub columns: usize,
    pub seed: u64,
    /// Draw cell values from an RNG seeded with `seed` instead of the fixed samples
    pub random_values: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_types: vec![TSDataType::Float],
            encoding: Encoding::default(),
            validate: false,
            rows: 10_000,
            columns: 2_000,
            seed: 0,
            random_values: false,
        }
    }
}

impl RunConfig {
    pub fn value_source(&self) -> ValueSource {
        if self.random_values {
            ValueSource::seeded(self.seed)
        } else {
            ValueSource::Canonical
        }
    }
}

/// Run the benchmark described by `config` against `session`
///
/// The session is opened here and always closed before returning, also when a step fails. The
/// first failure aborts the run and is the error returned.
pub async fn performance_test<S: Session + ?Sized>(
    session: &mut S,
    config: &RunConfig,
) -> Result<RunReport, Error> {
    if config.data_types.is_empty() {
        return Err(Error::EmptySchema);
    }

    session.open().await.map_err(Error::Open)?;
    let start = Instant::now();
    info!(
        encoding = %config.encoding,
        rows = config.rows,
        columns = config.columns,
        validate = config.validate,
        "starting tablet insertion"
    );

    let result = insert_all(session, config).await;
    let closed = session.close().await;
    let total = start.elapsed();

    let insert = match (result, closed) {
        (Ok(insert), Ok(())) => insert,
        (Ok(_), Err(e)) => return Err(Error::Close(e)),
        (Err(e), Ok(())) => return Err(e),
        (Err(e), Err(close_err)) => {
            warn!(error = %close_err, "failed to close session after a failed run");
            return Err(e);
        }
    };

    Ok(RunReport::new(total, insert, config.columns))
}

/// Insert one tablet per series and return the time spent inside insert calls
async fn insert_all<S: Session + ?Sized>(
    session: &mut S,
    config: &RunConfig,
) -> Result<Duration, Error> {
    let schema = MeasurementSchema::from_data_types(&config.data_types);
    let encoder = config.encoding.encoder();
    let mut source = config.value_source();
    let mut insert_time = Duration::ZERO;

    for index in 0..config.columns {
        let device_id = device_id(index);
        let tablet = encoder
            .encode(&device_id, &schema, config.rows, &mut source)
            .map_err(|source| Error::Encode {
                device_id: device_id.clone(),
                source,
            })?;

        let insert_start = Instant::now();
        session
            .insert_tablet(&tablet)
            .await
            .map_err(|source| Error::Insert {
                device_id: device_id.clone(),
                source,
            })?;
        insert_time += insert_start.elapsed();
        debug!(%device_id, rows = tablet.row_count(), "tablet inserted");
        drop(tablet);

        if config.validate {
            check_count(session, config.rows as i64, &count_statement(&device_id))
                .await
                .map_err(|source| Error::Validation {
                    device_id: device_id.clone(),
                    source,
                })?;
        }
    }

    Ok(insert_time)
}
