use memchr::memchr_iter;
use serde::Deserialize;

use crate::error::{Error, Location, Result};
use crate::registry::Registry;

/// One temperature reading as it comes off the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub id: String,
    pub temperature: f64,
}

/// A record before validation. Anything besides `id` and `temperature`
/// (timestamps, units, ...) is ignored.
#[derive(Debug, Deserialize)]
struct RawReading {
    id: Option<Scalar>,
    temperature: Option<Scalar>,
}

/// Producers are not consistent about quoting, so both `23.5` and `"23.5"`
/// are accepted, and likewise for ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl RawReading {
    fn validate(self, record: Location) -> Result<Reading> {
        let id = match self.id {
            Some(Scalar::Text(id)) => id,
            Some(Scalar::Number(id)) => id.to_string(),
            None => {
                return Err(Error::MissingField {
                    record,
                    field: "id",
                })
            }
        };
        let temperature = match self.temperature {
            Some(Scalar::Number(value)) => parse_temperature(record, &value.to_string())?,
            Some(Scalar::Text(value)) => parse_temperature(record, &value)?,
            None => {
                return Err(Error::MissingField {
                    record,
                    field: "temperature",
                })
            }
        };
        Ok(Reading { id, temperature })
    }
}

fn parse_temperature(record: Location, value: &str) -> Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(temperature) if temperature.is_finite() => Ok(temperature),
        _ => Err(Error::InvalidTemperature {
            record,
            value: value.to_string(),
        }),
    }
}

/// Parses a whole JSON array of readings.
pub fn parse_document(input: &[u8]) -> Result<Vec<Reading>> {
    let records: Vec<RawReading> = serde_json::from_slice(input).map_err(Error::Parse)?;
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.validate(Location::Index(index)))
        .collect()
}

/// Parses a single JSON Lines record. Blank lines yield `None`.
pub fn parse_line(line: &[u8], number: usize) -> Result<Option<Reading>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }
    let record: RawReading =
        serde_json::from_slice(line).map_err(|source| Error::ParseLine { line: number, source })?;
    record.validate(Location::Line(number)).map(Some)
}

/// Parses a block of complete JSON Lines into a partial registry.
///
/// `first_line` is the 1-based line number of the first line in `chunk`.
pub fn parse_chunk(chunk: &[u8], first_line: usize) -> Result<Registry> {
    let mut results = Registry::new();
    let mut record = |line: &[u8], number: usize| -> Result<()> {
        if let Some(reading) = parse_line(line, number)? {
            results.record(&reading.id, reading.temperature);
        }
        Ok(())
    };

    let mut start = 0;
    let mut number = first_line;
    for end in memchr_iter(b'\n', chunk) {
        record(&chunk[start..end], number)?;
        start = end + 1;
        number += 1;
    }
    if start < chunk.len() {
        record(&chunk[start..], number)?;
    }

    Ok(results)
}
