//! Per-sensor temperature statistics: mean, median and modes of every sensor
//! found in a file of readings.

pub mod config;
pub mod error;
pub mod parser;
pub mod reader;
pub mod registry;
pub mod report;
pub mod sensor;
