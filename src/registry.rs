use std::collections::{btree_map::Entry, BTreeMap};

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::parser::Reading;
use crate::report::SensorReport;
use crate::sensor::Sensor;

/// Sensors keyed by id, iterated in ascending id order.
///
/// Ids are compared byte for byte; `"A"` and `"a"` are different sensors.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    sensors: BTreeMap<String, Sensor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Total number of readings across all sensors.
    pub fn readings(&self) -> usize {
        self.sensors.values().map(Sensor::len).sum()
    }

    pub fn get(&self, id: &str) -> Option<&Sensor> {
        self.sensors.get(id)
    }

    #[inline]
    pub fn record(&mut self, id: &str, temperature: f64) {
        if let Some(sensor) = self.sensors.get_mut(id) {
            sensor.ingest(temperature);
        } else {
            self.sensors
                .insert(id.to_string(), Sensor::with_reading(id, temperature));
        }
    }

    pub fn extend<I: IntoIterator<Item = Reading>>(&mut self, readings: I) {
        readings
            .into_iter()
            .for_each(|reading| self.record(&reading.id, reading.temperature));
    }

    /// Folds a partial registry, e.g. one built from a single chunk of input, into this one.
    pub fn merge(&mut self, other: Registry) {
        for (id, sensor) in other.sensors {
            match self.sensors.entry(id) {
                Entry::Occupied(mut entry) => entry.get_mut().merge(&sensor),
                Entry::Vacant(entry) => {
                    entry.insert(sensor);
                }
            }
        }
    }

    /// Statistics for every sensor, ascending by id.
    ///
    /// Sensors are independent, so each one is summarised on the current rayon pool.
    pub fn report(&mut self) -> Result<Vec<SensorReport>> {
        debug!(
            sensors = self.len(),
            readings = self.readings(),
            "computing statistics"
        );
        self.sensors
            .par_iter_mut()
            .map(|(_, sensor)| sensor.summary())
            .collect()
    }
}

impl FromIterator<Reading> for Registry {
    fn from_iter<I: IntoIterator<Item = Reading>>(readings: I) -> Self {
        let mut registry = Registry::new();
        registry.extend(readings);
        registry
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn reading(id: &str, temperature: f64) -> Reading {
        Reading {
            id: id.to_string(),
            temperature,
        }
    }

    #[test]
    fn creates_sensor_on_first_reading() {
        let mut registry = Registry::new();
        registry.record("A", 10.0);
        registry.record("A", 20.0);
        registry.record("B", 5.0);
        assert_eq!(2, registry.len());
        assert_eq!(3, registry.readings());
        assert_eq!(&[10.0, 20.0], registry.get("A").unwrap().values());
        assert_eq!("B", registry.get("B").unwrap().id());
        assert!(registry.get("C").is_none());
    }

    #[test]
    fn report_per_sensor_in_id_order() {
        let mut registry: Registry = [
            reading("A", 10.0),
            reading("A", 20.0),
            reading("B", 5.0),
            reading("A", 30.0),
        ]
        .into_iter()
        .collect();

        let report = registry.report().unwrap();
        assert_eq!(
            vec![
                SensorReport {
                    id: "A".to_string(),
                    average: 20.0,
                    median: 20.0,
                    mode: vec![],
                },
                SensorReport {
                    id: "B".to_string(),
                    average: 5.0,
                    median: 5.0,
                    mode: vec![],
                },
            ],
            report
        );
    }

    #[test]
    fn ids_are_case_sensitive() {
        let mut registry: Registry = [reading("kitchen", 1.0), reading("Kitchen", 3.0)]
            .into_iter()
            .collect();
        let ids = registry
            .report()
            .unwrap()
            .into_iter()
            .map(|report| report.id)
            .collect::<Vec<_>>();
        assert_eq!(vec!["Kitchen", "kitchen"], ids);
    }

    #[test]
    fn reordered_input_gives_same_report() {
        let readings = [
            reading("x", 2.5),
            reading("y", -4.0),
            reading("x", 7.0),
            reading("x", 2.5),
            reading("y", -4.0),
            reading("y", 1.0),
        ];
        let mut forward: Registry = readings.iter().cloned().collect();
        let mut backward: Registry = readings.iter().rev().cloned().collect();
        assert_eq!(forward.report().unwrap(), backward.report().unwrap());
    }

    #[test]
    fn merge_matches_single_pass() {
        let readings = [
            reading("a", 1.0),
            reading("b", 2.0),
            reading("a", 1.0),
            reading("c", 9.0),
            reading("b", 4.0),
        ];
        let mut whole: Registry = readings.iter().cloned().collect();
        let (head, tail) = readings.split_at(2);
        let mut merged: Registry = head.iter().cloned().collect();
        merged.merge(tail.iter().cloned().collect());

        assert_eq!(whole.readings(), merged.readings());
        assert_eq!(whole.report().unwrap(), merged.report().unwrap());
    }

    #[test]
    fn empty_registry_reports_nothing() {
        assert!(Registry::new().report().unwrap().is_empty());
    }

    fn reading_stream(max_len: usize) -> impl Strategy<Value = Vec<Reading>> {
        proptest::collection::vec(
            (
                prop::sample::select(vec!["a", "b", "B", "c"]),
                (-400_i32..400).prop_map(|quarters| quarters as f64 / 4.0),
            )
                .prop_map(|(id, temperature)| reading(id, temperature)),
            1..=max_len,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        // --- merging a split input equals a single pass ---
        #[test]
        fn split_then_merge_equals_single_pass(
            (readings, split) in reading_stream(120)
                .prop_flat_map(|readings| {
                    let len = readings.len();
                    (Just(readings), 0..=len)
                }),
        ) {
            let mut whole: Registry = readings.iter().cloned().collect();
            let (head, tail) = readings.split_at(split);
            let mut merged: Registry = head.iter().cloned().collect();
            merged.merge(tail.iter().cloned().collect());

            prop_assert_eq!(whole.readings(), merged.readings());
            prop_assert_eq!(whole.report().unwrap(), merged.report().unwrap());
        }

        // --- report does not depend on arrival order ---
        #[test]
        fn shuffled_input_gives_same_report(
            (readings, reordered) in reading_stream(120)
                .prop_flat_map(|readings| (Just(readings.clone()), Just(readings).prop_shuffle())),
        ) {
            let mut forward: Registry = readings.into_iter().collect();
            let mut shuffled: Registry = reordered.into_iter().collect();
            prop_assert_eq!(forward.report().unwrap(), shuffled.report().unwrap());
        }
    }
}
