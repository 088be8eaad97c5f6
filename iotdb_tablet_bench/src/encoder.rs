//! Synthesis of benchmark tablets.
//!
//! A [`BatchEncoder`] turns a series id, a [`MeasurementSchema`] and a row count into one
//! [`Tablet`]. Encoders differ only in the in-memory representation they build; the logical
//! content (timestamps `0..rows` and the values drawn from the [`ValueSource`]) is the same.

use std::fmt::Display;

use iotdb_client::{Column, TSDataType, Tablet, TabletValues, Value};
use rand::{Rng, SeedableRng, distributions::Alphanumeric, rngs::StdRng};
use serde::{Deserialize, Serialize};

/// Series are spread over this many storage groups
pub const STORAGE_GROUP_BUCKETS: usize = 8;

/// The series identifier for column `index` of a run: `root.sg{index % 8}.{index}`
pub fn device_id(index: usize) -> String {
    format!("root.sg{}.{index}", index % STORAGE_GROUP_BUCKETS)
}

/// The fixed sample used for every cell of `data_type`
pub fn canonical_value(data_type: TSDataType) -> Value {
    match data_type {
        TSDataType::Boolean => Value::Boolean(true),
        TSDataType::Int32 => Value::Int32(100),
        TSDataType::Int64 => Value::Int64(123456789098),
        TSDataType::Float => Value::Float(1.2),
        TSDataType::Double => Value::Double(1.234567),
        TSDataType::Text => Value::Text("test_record".to_string()),
    }
}

/// The ordered measurements shared by every series of a run: `s0, s1, ...`, one per data type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementSchema {
    measurements: Vec<String>,
    data_types: Vec<TSDataType>,
}

impl MeasurementSchema {
    pub fn from_data_types(data_types: &[TSDataType]) -> Self {
        Self {
            measurements: (0..data_types.len()).map(|i| format!("s{i}")).collect(),
            data_types: data_types.to_vec(),
        }
    }

    pub fn measurements(&self) -> &[String] {
        &self.measurements
    }

    pub fn data_types(&self) -> &[TSDataType] {
        &self.data_types
    }
}

/// Where cell values come from
#[derive(Debug, Clone)]
pub enum ValueSource {
    /// Every cell holds the [`canonical_value`] of its type
    Canonical,
    /// Cells are drawn from an RNG seeded with the run seed
    Seeded(StdRng),
}

impl ValueSource {
    pub fn seeded(seed: u64) -> Self {
        Self::Seeded(StdRng::seed_from_u64(seed))
    }

    pub fn next_value(&mut self, data_type: TSDataType) -> Value {
        match self {
            Self::Canonical => canonical_value(data_type),
            Self::Seeded(rng) => random_value(rng, data_type),
        }
    }
}

fn random_value(rng: &mut impl Rng, data_type: TSDataType) -> Value {
    match data_type {
        TSDataType::Boolean => Value::Boolean(rng.r#gen()),
        TSDataType::Int32 => Value::Int32(rng.r#gen()),
        TSDataType::Int64 => Value::Int64(rng.r#gen()),
        TSDataType::Float => Value::Float(rng.gen_range(-1_000.0..1_000.0)),
        TSDataType::Double => Value::Double(rng.gen_range(-1_000_000.0..1_000_000.0)),
        TSDataType::Text => Value::Text(
            rng.sample_iter(&Alphanumeric)
                .take(11)
                .map(char::from)
                .collect(),
        ),
    }
}

/// Builds one [`Tablet`] for a series
pub trait BatchEncoder: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Build the tablet for `device_id` with `rows` rows, timestamps `0..rows`, drawing values
    /// from `source` in row-major order
    fn encode(
        &self,
        device_id: &str,
        schema: &MeasurementSchema,
        rows: usize,
        source: &mut ValueSource,
    ) -> Result<Tablet, iotdb_client::Error>;
}

/// Appends one timestamp and one tuple of values per row
#[derive(Debug, Clone, Copy, Default)]
pub struct RowEncoder;

impl BatchEncoder for RowEncoder {
    fn name(&self) -> &'static str {
        "row"
    }

    fn encode(
        &self,
        device_id: &str,
        schema: &MeasurementSchema,
        rows: usize,
        source: &mut ValueSource,
    ) -> Result<Tablet, iotdb_client::Error> {
        let mut timestamps = Vec::new();
        let mut values = Vec::new();
        for t in 0..rows {
            timestamps.push(t as i64);
            let row: Vec<Value> = schema
                .data_types()
                .iter()
                .map(|data_type| source.next_value(*data_type))
                .collect();
            values.push(row);
        }

        Tablet::try_new(
            device_id,
            schema.measurements().to_vec(),
            schema.data_types().to_vec(),
            TabletValues::Rows(values),
            timestamps,
        )
    }
}

/// Pre-allocates one typed buffer per measurement and a timestamp buffer, then fills every
/// slot by index
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnarEncoder;

impl BatchEncoder for ColumnarEncoder {
    fn name(&self) -> &'static str {
        "columnar"
    }

    fn encode(
        &self,
        device_id: &str,
        schema: &MeasurementSchema,
        rows: usize,
        source: &mut ValueSource,
    ) -> Result<Tablet, iotdb_client::Error> {
        let mut timestamps = vec![0_i64; rows];
        let mut columns: Vec<Column> = schema
            .data_types()
            .iter()
            .map(|data_type| Column::zeroed(*data_type, rows))
            .collect();

        for (t, timestamp) in timestamps.iter_mut().enumerate() {
            *timestamp = t as i64;
            for (column, data_type) in columns.iter_mut().zip(schema.data_types()) {
                column.set(t, source.next_value(*data_type))?;
            }
        }

        Tablet::try_new(
            device_id,
            schema.measurements().to_vec(),
            schema.data_types().to_vec(),
            TabletValues::Columns(columns),
            timestamps,
        )
    }
}

/// The tablet representation a run uses
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Row-oriented tuples
    Row,
    /// Typed column buffers
    #[default]
    Columnar,
}

impl Encoding {
    pub fn encoder(&self) -> &'static dyn BatchEncoder {
        match self {
            Self::Row => &RowEncoder,
            Self::Columnar => &ColumnarEncoder,
        }
    }
}

impl Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.encoder().name())
    }
}
