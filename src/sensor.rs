use crate::error::{Error, Result};
use crate::report::SensorReport;

/// Rounds half up to two decimal places.
///
/// This is `floor(x * 100 + 0.5) / 100`, so negative halves move toward
/// positive infinity: `-2.125` becomes `-2.12`, not `-2.13`.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// All readings of a single sensor.
///
/// The running total makes the mean O(1). It is a Neumaier compensated sum,
/// so the mean does not depend on the order readings arrive or chunks merge.
/// Median and modes need the readings in ascending order; that copy is
/// rebuilt lazily whenever anything was appended since the last sort.
#[derive(Debug, Clone)]
pub struct Sensor {
    id: String,
    values: Vec<f64>,
    total: f64,
    compensation: f64,
    sorted: Vec<f64>,
    dirty: bool,
}

impl Sensor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Vec::new(),
            total: 0.0,
            compensation: 0.0,
            sorted: Vec::new(),
            dirty: false,
        }
    }

    pub fn with_reading(id: impl Into<String>, temperature: f64) -> Self {
        let mut sensor = Self::new(id);
        sensor.ingest(temperature);
        sensor
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Readings in arrival order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    fn add(&mut self, value: f64) {
        let total = self.total + value;
        self.compensation += if self.total.abs() >= value.abs() {
            (self.total - total) + value
        } else {
            (value - total) + self.total
        };
        self.total = total;
    }

    #[inline]
    pub fn ingest(&mut self, temperature: f64) {
        self.add(temperature);
        self.values.push(temperature);
        self.dirty = true;
    }

    /// Folds the readings of another accumulator for the same sensor into this one.
    pub fn merge(&mut self, other: &Sensor) {
        debug_assert_eq!(self.id, other.id);
        if other.is_empty() {
            return;
        }
        self.add(other.total);
        self.add(other.compensation);
        self.values.extend_from_slice(&other.values);
        self.dirty = true;
    }

    fn count(&self) -> Result<usize> {
        match self.values.len() {
            0 => Err(Error::NoData(self.id.clone())),
            n => Ok(n),
        }
    }

    fn sorted(&mut self) -> &[f64] {
        if self.dirty {
            self.sorted.clear();
            self.sorted.extend_from_slice(&self.values);
            self.sorted.sort_unstable_by(f64::total_cmp);
            self.dirty = false;
        }
        &self.sorted
    }

    pub fn mean(&self) -> Result<f64> {
        let n = self.count()?;
        Ok(round2((self.total + self.compensation) / n as f64))
    }

    pub fn median(&mut self) -> Result<f64> {
        let n = self.count()?;
        let sorted = self.sorted();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[(n - 1) / 2] + sorted[n / 2]) / 2.0
        };
        Ok(round2(median))
    }

    /// Values shared by the longest run of equal readings, one entry per value, ascending.
    ///
    /// Only values seen at least twice qualify, so a sensor whose readings are
    /// all distinct has no mode.
    pub fn modes(&mut self) -> Result<Vec<f64>> {
        self.count()?;
        let mut modes = Vec::new();
        let mut longest = 1;
        for run in self.sorted().chunk_by(|a, b| a == b) {
            if run.len() < 2 || run.len() < longest {
                continue;
            }
            if run.len() > longest {
                longest = run.len();
                modes.clear();
            }
            // -0.0 and 0.0 share a run
            modes.push(run[0] + 0.0);
        }
        Ok(modes)
    }

    pub fn summary(&mut self) -> Result<SensorReport> {
        Ok(SensorReport {
            id: self.id.clone(),
            average: self.mean()?,
            median: self.median()?,
            mode: self.modes()?,
        })
    }
}
