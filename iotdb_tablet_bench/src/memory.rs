//! An in-process stand-in for the store, used for dry runs and tests.
//!
//! It keeps the timestamps of every inserted point, answers `select count(*) from <device>` the
//! way the store does and rejects any other statement. Values are dropped unless the session was
//! built with [`MemorySession::with_retained_values`].

use std::{
    collections::{BTreeMap, BTreeSet, btree_map::Entry},
    num::NonZeroUsize,
    sync::LazyLock,
};

use async_trait::async_trait;
use iotdb_client::{
    Error, Field, Result, RowRecord, Session, SessionDataSet, TSDataType, Tablet, Value,
    session::DEFAULT_FETCH_SIZE,
};
use observability_deps::tracing::debug;
use regex::Regex;

/// Status code the store uses when a value does not match a series' data type
pub const DATA_TYPE_MISMATCH: i64 = 507;
/// Status code the store uses for statements it cannot parse
pub const SQL_PARSE_ERROR: i64 = 700;

static COUNT_ALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*select\s+count\(\s*\*\s*\)\s+from\s+([A-Za-z0-9_.]+)\s*;?\s*$")
        .expect("count statement pattern compiles")
});

/// The points of one measurement of a device
#[derive(Debug, Clone)]
pub struct Series {
    measurement: String,
    data_type: TSDataType,
    timestamps: BTreeSet<i64>,
    /// Only kept when the session retains values
    values: Option<BTreeMap<i64, Value>>,
}

impl Series {
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn data_type(&self) -> TSDataType {
        self.data_type
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.timestamps.iter().copied().collect()
    }

    /// The values in timestamp order, or `None` if the session does not retain values
    pub fn values(&self) -> Option<Vec<Value>> {
        self.values
            .as_ref()
            .map(|values| values.values().cloned().collect())
    }

    pub fn count(&self) -> usize {
        self.timestamps.len()
    }
}

/// Every series of one device, in the order they were created
#[derive(Debug, Clone, Default)]
pub struct Device {
    series: Vec<Series>,
}

impl Device {
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn get(&self, measurement: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.measurement == measurement)
    }

    fn get_or_create(
        &mut self,
        device_id: &str,
        measurement: &str,
        data_type: TSDataType,
        retain_values: bool,
    ) -> Result<&mut Series> {
        let pos = match self.series.iter().position(|s| s.measurement == measurement) {
            Some(pos) => pos,
            None => {
                self.series.push(Series {
                    measurement: measurement.to_string(),
                    data_type,
                    timestamps: BTreeSet::new(),
                    values: retain_values.then(BTreeMap::new),
                });
                self.series.len() - 1
            }
        };
        let series = &mut self.series[pos];
        if series.data_type != data_type {
            return Err(Error::Server {
                code: DATA_TYPE_MISMATCH,
                message: format!(
                    "data type of {device_id}.{measurement} is {}, but {data_type} was given",
                    series.data_type
                ),
            });
        }
        Ok(series)
    }
}

/// A [`Session`] over an in-memory store
#[derive(Debug)]
pub struct MemorySession {
    fetch_size: NonZeroUsize,
    retain_values: bool,
    open: bool,
    devices: BTreeMap<String, Device>,
    insert_calls: usize,
    query_calls: usize,
    close_calls: usize,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_SIZE)
    }
}

impl MemorySession {
    pub fn new(fetch_size: NonZeroUsize) -> Self {
        Self {
            fetch_size,
            retain_values: false,
            open: false,
            devices: BTreeMap::new(),
            insert_calls: 0,
            query_calls: 0,
            close_calls: 0,
        }
    }

    /// Keep every inserted value as well as its timestamp, so tests can inspect them
    pub fn with_retained_values(mut self) -> Self {
        self.retain_values = true;
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn device(&self, device_id: &str) -> Option<&Device> {
        self.devices.get(device_id)
    }

    /// Ids of every device holding data, in sorted order
    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::SessionClosed)
        }
    }

    fn write(&mut self, tablet: &Tablet) -> Result<()> {
        let device_id = tablet.device_id();
        let device = match self.devices.entry(device_id.to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(Device::default()),
        };

        for (col, (measurement, data_type)) in tablet
            .measurements()
            .iter()
            .zip(tablet.data_types())
            .enumerate()
        {
            let series =
                device.get_or_create(device_id, measurement, *data_type, self.retain_values)?;
            series.timestamps.extend(tablet.timestamps());
            if let Some(values) = &mut series.values {
                values.extend(
                    tablet
                        .timestamps()
                        .iter()
                        .copied()
                        .zip(tablet.column_values(col)),
                );
            }
        }
        Ok(())
    }

    fn count_all(&self, device_id: &str) -> SessionDataSet {
        let Some(device) = self.devices.get(device_id) else {
            return SessionDataSet::default();
        };
        let names = device
            .series
            .iter()
            .map(|s| format!("count({device_id}.{})", s.measurement))
            .collect();
        let fields = device
            .series
            .iter()
            .map(|s| Field::new(Some(Value::Int64(s.count() as i64))))
            .collect();
        SessionDataSet::new(names, [RowRecord::new(None, fields)])
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn open(&mut self) -> Result<()> {
        self.open = true;
        debug!("in-memory session opened");
        Ok(())
    }

    async fn insert_tablet(&mut self, tablet: &Tablet) -> Result<()> {
        self.ensure_open()?;
        self.insert_calls += 1;
        self.write(tablet)
    }

    async fn execute_query_statement_with_fetch_size(
        &mut self,
        sql: &str,
        _fetch_size: NonZeroUsize,
    ) -> Result<SessionDataSet> {
        self.ensure_open()?;
        self.query_calls += 1;
        let device_id = COUNT_ALL
            .captures(sql)
            .and_then(|c| c.get(1))
            .ok_or_else(|| Error::Server {
                code: SQL_PARSE_ERROR,
                message: format!("unsupported statement: {sql}"),
            })?
            .as_str();
        Ok(self.count_all(device_id))
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.close_calls += 1;
            debug!("in-memory session closed");
        }
        Ok(())
    }

    fn fetch_size(&self) -> NonZeroUsize {
        self.fetch_size
    }
}
