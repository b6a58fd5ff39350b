//! Time-sampled values and their evaluation.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::value::Value;

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Hash)]
pub struct TimeSample {
    pub time: OrderedFloat<f64>,
    pub value: Value,
}

/// Samples kept sorted by time with at most one sample per time.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Hash, Default)]
#[serde(from = "Vec<TimeSample>", into = "Vec<TimeSample>")]
pub struct TimeSamples {
    samples: Vec<TimeSample>,
}

impl From<Vec<TimeSample>> for TimeSamples {
    fn from(samples: Vec<TimeSample>) -> Self {
        let mut result = TimeSamples::new();
        for sample in samples {
            result.insert(sample.time.into_inner(), sample.value);
        }
        result
    }
}

impl From<TimeSamples> for Vec<TimeSample> {
    fn from(samples: TimeSamples) -> Self {
        samples.samples
    }
}

impl<V: Into<Value>> FromIterator<(f64, V)> for TimeSamples {
    fn from_iter<I: IntoIterator<Item = (f64, V)>>(iter: I) -> Self {
        let mut result = TimeSamples::new();
        for (time, value) in iter {
            result.insert(time, value.into());
        }
        result
    }
}

impl TimeSamples {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeSample> {
        self.samples.iter()
    }

    /// Inserts a sample, replacing any sample already at `time`.
    pub fn insert(&mut self, time: f64, value: Value) {
        let key = OrderedFloat(time);
        match self.samples.binary_search_by(|s| s.time.cmp(&key)) {
            Ok(index) => self.samples[index].value = value,
            Err(index) => self.samples.insert(index, TimeSample { time: key, value }),
        }
    }

    pub fn remove(&mut self, time: f64) -> Option<Value> {
        let key = OrderedFloat(time);
        let index = self
            .samples
            .binary_search_by(|s| s.time.cmp(&key))
            .ok()?;
        Some(self.samples.remove(index).value)
    }

    pub fn get(&self, time: f64) -> Option<&Value> {
        let key = OrderedFloat(time);
        self.samples
            .binary_search_by(|s| s.time.cmp(&key))
            .ok()
            .map(|index| &self.samples[index].value)
    }

    /// Evaluates the samples at `time`.
    ///
    /// Before the first sample the first value holds, after the last the last
    /// value holds. In between, `interpolate` selects a linear blend of the
    /// bracketing samples; otherwise (or when the pair cannot be blended) the
    /// earlier sample holds.
    pub fn evaluate(&self, time: f64, interpolate: bool) -> Option<Value> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;

        if time.is_nan() || time <= *first.time {
            return Some(first.value.clone());
        }
        if time >= *last.time {
            return Some(last.value.clone());
        }

        // Strictly inside the range: there is a last sample at or before `time`
        // and one after it.
        let index = self.samples.partition_point(|s| *s.time <= time);
        let before = &self.samples[index - 1];
        let after = &self.samples[index];

        if !interpolate || *before.time == time {
            return Some(before.value.clone());
        }

        let span = *after.time - *before.time;
        let t = (time - *before.time) / span;
        Some(
            before
                .value
                .lerp(&after.value, t)
                .unwrap_or_else(|| before.value.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> TimeSamples {
        [(0.0, 10.0), (10.0, 20.0)].into_iter().collect()
    }

    #[test]
    fn test_evaluate_clamps_outside_range() {
        let samples = ramp();
        assert_eq!(samples.evaluate(-5.0, true), Some(Value::from(10.0)));
        assert_eq!(samples.evaluate(15.0, true), Some(Value::from(20.0)));
    }

    #[test]
    fn test_evaluate_interpolates_inside_range() {
        assert_eq!(ramp().evaluate(5.0, true), Some(Value::from(15.0)));
    }

    #[test]
    fn test_evaluate_holds_without_interpolation() {
        assert_eq!(ramp().evaluate(5.0, false), Some(Value::from(10.0)));
        assert_eq!(ramp().evaluate(10.0, false), Some(Value::from(20.0)));
    }

    #[test]
    fn test_non_numeric_values_hold_earlier_sample() {
        let samples: TimeSamples = [(0.0, "a"), (4.0, "b")].into_iter().collect();
        assert_eq!(samples.evaluate(3.9, true), Some(Value::from("a")));
    }

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut samples = TimeSamples::new();
        samples.insert(5.0, Value::Int(1));
        samples.insert(1.0, Value::Int(2));
        samples.insert(5.0, Value::Int(3));
        let times: Vec<f64> = samples.iter().map(|s| *s.time).collect();
        assert_eq!(times, vec![1.0, 5.0]);
        assert_eq!(samples.get(5.0), Some(&Value::Int(3)));
    }

    #[test]
    fn test_deserialize_sorts_samples() {
        let json = r#"[{"time": 3.0, "value": 1}, {"time": 1.0, "value": 2}]"#;
        let samples: TimeSamples = serde_json::from_str(json).unwrap();
        assert_eq!(samples.iter().next().map(|s| *s.time), Some(1.0));
    }

    #[test]
    fn test_empty_samples_have_no_value() {
        assert_eq!(TimeSamples::new().evaluate(0.0, true), None);
    }
}
