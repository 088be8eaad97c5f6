//! The [`Tablet`]: one bulk-insert unit covering a single device, a fixed set of measurements
//! and a run of timestamped values.

use serde::{
    Serialize, Serializer,
    ser::{SerializeSeq, SerializeStruct},
};

use crate::{Error, Result, TSDataType, Value};

/// A fixed-width, typed buffer holding every value of one measurement in a [`Tablet`]
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    /// Allocate a column of `len` zero values for `data_type`
    pub fn zeroed(data_type: TSDataType, len: usize) -> Self {
        match data_type {
            TSDataType::Boolean => Self::Boolean(vec![false; len]),
            TSDataType::Int32 => Self::Int32(vec![0; len]),
            TSDataType::Int64 => Self::Int64(vec![0; len]),
            TSDataType::Float => Self::Float(vec![0.0; len]),
            TSDataType::Double => Self::Double(vec![0.0; len]),
            TSDataType::Text => Self::Text(vec![String::new(); len]),
        }
    }

    pub fn data_type(&self) -> TSDataType {
        match self {
            Self::Boolean(_) => TSDataType::Boolean,
            Self::Int32(_) => TSDataType::Int32,
            Self::Int64(_) => TSDataType::Int64,
            Self::Float(_) => TSDataType::Float,
            Self::Double(_) => TSDataType::Double,
            Self::Text(_) => TSDataType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the value in slot `index`, if there is one
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Self::Boolean(v) => v.get(index).copied().map(Value::Boolean),
            Self::Int32(v) => v.get(index).copied().map(Value::Int32),
            Self::Int64(v) => v.get(index).copied().map(Value::Int64),
            Self::Float(v) => v.get(index).copied().map(Value::Float),
            Self::Double(v) => v.get(index).copied().map(Value::Double),
            Self::Text(v) => v.get(index).cloned().map(Value::Text),
        }
    }

    /// Overwrite slot `index` with `value`
    ///
    /// Fails if the slot does not exist or the value is not of the column's type.
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let len = self.len();
        let expected = self.data_type();
        let slot_missing = || Error::InvalidTablet {
            reason: format!("slot {index} is out of range for a column of length {len}"),
        };
        match (self, value) {
            (Self::Boolean(v), Value::Boolean(x)) => *v.get_mut(index).ok_or_else(slot_missing)? = x,
            (Self::Int32(v), Value::Int32(x)) => *v.get_mut(index).ok_or_else(slot_missing)? = x,
            (Self::Int64(v), Value::Int64(x)) => *v.get_mut(index).ok_or_else(slot_missing)? = x,
            (Self::Float(v), Value::Float(x)) => *v.get_mut(index).ok_or_else(slot_missing)? = x,
            (Self::Double(v), Value::Double(x)) => *v.get_mut(index).ok_or_else(slot_missing)? = x,
            (Self::Text(v), Value::Text(x)) => *v.get_mut(index).ok_or_else(slot_missing)? = x,
            (_, value) => {
                return Err(Error::InvalidTablet {
                    reason: format!(
                        "cannot store a {actual} value in a {expected} column",
                        actual = value.data_type()
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Boolean(v) => v.serialize(serializer),
            Self::Int32(v) => v.serialize(serializer),
            Self::Int64(v) => v.serialize(serializer),
            Self::Float(v) => v.serialize(serializer),
            Self::Double(v) => v.serialize(serializer),
            Self::Text(v) => v.serialize(serializer),
        }
    }
}

/// The in-memory representation of a [`Tablet`]'s values
#[derive(Debug, Clone, PartialEq)]
pub enum TabletValues {
    /// One tuple of values per row, in measurement order
    Rows(Vec<Vec<Value>>),
    /// One typed buffer per measurement
    Columns(Vec<Column>),
}

impl TabletValues {
    fn row_count(&self) -> Option<usize> {
        match self {
            Self::Rows(rows) => Some(rows.len()),
            Self::Columns(columns) => columns.first().map(Column::len),
        }
    }
}

/// A batch of values for a single device, submitted to the store in one insert call
#[derive(Debug, Clone, PartialEq)]
pub struct Tablet {
    device_id: String,
    measurements: Vec<String>,
    data_types: Vec<TSDataType>,
    values: TabletValues,
    timestamps: Vec<i64>,
}

impl Tablet {
    /// Create a new [`Tablet`], checking that the values agree with the declared schema
    /// and with the timestamps
    pub fn try_new(
        device_id: impl Into<String>,
        measurements: Vec<String>,
        data_types: Vec<TSDataType>,
        values: TabletValues,
        timestamps: Vec<i64>,
    ) -> Result<Self> {
        let invalid = |reason: String| Err(Error::InvalidTablet { reason });

        if measurements.len() != data_types.len() {
            return invalid(format!(
                "{} measurements declared with {} data types",
                measurements.len(),
                data_types.len()
            ));
        }

        match &values {
            TabletValues::Rows(rows) => {
                if rows.len() != timestamps.len() {
                    return invalid(format!(
                        "{} rows for {} timestamps",
                        rows.len(),
                        timestamps.len()
                    ));
                }
                for (i, row) in rows.iter().enumerate() {
                    if row.len() != data_types.len() {
                        return invalid(format!(
                            "row {i} has {} values for {} measurements",
                            row.len(),
                            data_types.len()
                        ));
                    }
                    if let Some((value, declared)) = row
                        .iter()
                        .zip(&data_types)
                        .find(|(v, t)| v.data_type() != **t)
                    {
                        return invalid(format!(
                            "row {i} holds a {} value where {declared} is declared",
                            value.data_type()
                        ));
                    }
                }
            }
            TabletValues::Columns(columns) => {
                if columns.len() != data_types.len() {
                    return invalid(format!(
                        "{} columns for {} measurements",
                        columns.len(),
                        data_types.len()
                    ));
                }
                for ((column, declared), name) in columns.iter().zip(&data_types).zip(&measurements)
                {
                    if column.data_type() != *declared {
                        return invalid(format!(
                            "column '{name}' is {} but declared {declared}",
                            column.data_type()
                        ));
                    }
                    if column.len() != timestamps.len() {
                        return invalid(format!(
                            "column '{name}' has {} values for {} timestamps",
                            column.len(),
                            timestamps.len()
                        ));
                    }
                }
            }
        }

        Ok(Self {
            device_id: device_id.into(),
            measurements,
            data_types,
            values,
            timestamps,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn measurements(&self) -> &[String] {
        &self.measurements
    }

    pub fn data_types(&self) -> &[TSDataType] {
        &self.data_types
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn values(&self) -> &TabletValues {
        &self.values
    }

    pub fn row_count(&self) -> usize {
        self.values.row_count().unwrap_or(self.timestamps.len())
    }

    /// Whether the values are held as typed column buffers
    pub fn is_columnar(&self) -> bool {
        matches!(self.values, TabletValues::Columns(_))
    }

    /// Get the value of measurement `column` at `row`
    pub fn value(&self, row: usize, column: usize) -> Option<Value> {
        match &self.values {
            TabletValues::Rows(rows) => rows.get(row).and_then(|r| r.get(column)).cloned(),
            TabletValues::Columns(columns) => columns.get(column).and_then(|c| c.get(row)),
        }
    }

    /// Get every value of measurement `column`, in row order
    pub fn column_values(&self, column: usize) -> Vec<Value> {
        (0..self.row_count())
            .filter_map(|row| self.value(row, column))
            .collect()
    }
}

/// Serializes to the body of the REST `insertTablet` API, which takes values column-major
impl Serialize for Tablet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Tablet", 6)?;
        state.serialize_field("device", &self.device_id)?;
        state.serialize_field("measurements", &self.measurements)?;
        state.serialize_field("data_types", &self.data_types)?;
        state.serialize_field("timestamps", &self.timestamps)?;
        state.serialize_field(
            "values",
            &ColumnMajor {
                values: &self.values,
                width: self.data_types.len(),
            },
        )?;
        state.serialize_field("is_aligned", &false)?;
        state.end()
    }
}

struct ColumnMajor<'a> {
    values: &'a TabletValues,
    width: usize,
}

impl Serialize for ColumnMajor<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.values {
            TabletValues::Columns(columns) => columns.serialize(serializer),
            TabletValues::Rows(rows) => {
                let mut seq = serializer.serialize_seq(Some(self.width))?;
                for column in 0..self.width {
                    seq.serialize_element(&RowsColumn { rows, column })?;
                }
                seq.end()
            }
        }
    }
}

/// One column of a row-oriented tablet, transposed on the fly
struct RowsColumn<'a> {
    rows: &'a [Vec<Value>],
    column: usize,
}

impl Serialize for RowsColumn<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows.iter().map(|row| &row[self.column]))
    }
}
