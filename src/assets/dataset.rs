//! Scientific dataset input
//!
//! A [`Dataset`] is a bag of named numeric fields. The time texture cache
//! consumes two of them: a scalar field laid out as consecutive square
//! samples, and a time-coordinate sequence whose length is the sample count.

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::io::SourceLoader;
use crate::errors::{HorizonError, Result};

/// Default key of the scalar field (density).
pub const DEFAULT_FIELD_KEY: &str = "rho";
/// Default key of the time-coordinate sequence.
pub const DEFAULT_TIME_KEY: &str = "t";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    fields: FxHashMap<String, Vec<f64>>,
}

impl Dataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, values: Vec<f64>) -> Self {
        self.fields.insert(key.into(), values);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, values: Vec<f64>) {
        self.fields.insert(key.into(), values);
    }

    /// Looks up a field, failing with a data-shape error when absent.
    pub fn field(&self, key: &str) -> Result<&[f64]> {
        self.fields
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| HorizonError::data_shape(format!("dataset has no field '{key}'")))
    }

    /// Number of time samples, taken from the length of `time_key`.
    pub fn sample_count(&self, time_key: &str) -> Result<usize> {
        self.field(time_key).map(<[f64]>::len)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Builds a dataset from a JSON object of (possibly nested) numeric arrays.
    ///
    /// Nested arrays are flattened in row-major order.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(HorizonError::data_shape("dataset root must be a JSON object"));
        };

        let mut dataset = Self::new();
        for (key, field) in map {
            let mut values = Vec::new();
            flatten_numbers(key, field, &mut values)?;
            dataset.insert(key.clone(), values);
        }
        Ok(dataset)
    }
}

fn flatten_numbers(key: &str, value: &Value, out: &mut Vec<f64>) -> Result<()> {
    match value {
        Value::Number(n) => {
            let v = n
                .as_f64()
                .ok_or_else(|| HorizonError::data_shape(format!("field '{key}': number out of range")))?;
            out.push(v);
        }
        Value::Array(items) => {
            for item in items {
                flatten_numbers(key, item, out)?;
            }
        }
        other => {
            return Err(HorizonError::data_shape(format!(
                "field '{key}': expected numbers, found {other}"
            )));
        }
    }
    Ok(())
}

/// Dataset reader trait.
pub trait DatasetReader {
    fn read_dataset(&self, path: &str) -> Result<Dataset>;
}

/// Reads JSON datasets through a [`SourceLoader`].
pub struct JsonDatasetReader<L> {
    loader: L,
}

impl<L: SourceLoader> JsonDatasetReader<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }
}

impl<L: SourceLoader> DatasetReader for JsonDatasetReader<L> {
    fn read_dataset(&self, path: &str) -> Result<Dataset> {
        let bytes = self.loader.read_bytes(path)?;
        let value: Value = serde_json::from_slice(&bytes)?;
        let dataset = Dataset::from_json_value(&value)?;
        log::info!(
            "Loaded dataset '{path}' with fields [{}]",
            dataset.keys().collect::<Vec<_>>().join(", ")
        );
        Ok(dataset)
    }
}

/// A dataset already held in memory.
impl DatasetReader for Dataset {
    fn read_dataset(&self, _path: &str) -> Result<Dataset> {
        Ok(self.clone())
    }
}
