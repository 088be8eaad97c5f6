//! Tablet insertion benchmark for IoTDB.
//!
//! Synthesizes one tablet per series in either a row-oriented or a columnar representation,
//! inserts them one after another over a single [`iotdb_client::Session`], optionally
//! count-checks each series and reports the wall-clock cost of the run.

pub mod driver;
pub mod encoder;
pub mod memory;
pub mod report;
pub mod specification;
pub mod specs;
pub mod validation;
