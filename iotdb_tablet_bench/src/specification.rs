use anyhow::Context;
use iotdb_client::TSDataType;
use serde::{Deserialize, Serialize};

use crate::{driver::RunConfig, encoder::Encoding};

/// The specification of a benchmark scenario
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScenarioSpec {
    /// The name of this scenario
    pub name: String,
    /// One measurement per entry, named `s0`, `s1`, ... in this order
    pub data_types: Vec<TSDataType>,
    /// How tablets are represented in memory
    #[serde(default)]
    pub encoding: Encoding,
    /// Count-check every series after its insert
    #[serde(default)]
    pub validate: bool,
    /// Rows per tablet
    pub rows: usize,
    /// Number of series to insert, one tablet each
    pub columns: usize,
}

impl ScenarioSpec {
    pub fn from_path(path: &str) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario file '{path}'"))?;
        let res = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse scenario file '{path}'"))?;

        Ok(res)
    }

    pub fn to_json_string_pretty(&self) -> Result<String, anyhow::Error> {
        let res = serde_json::to_string_pretty(&self).context("failed to encode json to string")?;
        Ok(res)
    }

    pub fn run_config(&self, seed: u64, random_values: bool) -> RunConfig {
        RunConfig {
            data_types: self.data_types.clone(),
            encoding: self.encoding,
            validate: self.validate,
            rows: self.rows,
            columns: self.columns,
            seed,
            random_values,
        }
    }
}
