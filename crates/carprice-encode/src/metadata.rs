//! Encoding metadata saved alongside a trained model.

use std::collections::BTreeMap;

/// Everything the encoder needs to turn a listing into a model row.
///
/// Produced at training time and loaded unchanged; nothing here is
/// re-derived at prediction time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncodingMetadata {
    /// Car model name → cylinder descriptor, e.g. `"6 cylinders"`.
    pub car_cylinders_mapping: BTreeMap<String, String>,
    /// Condition label → ordinal code.
    pub condition_mapping: BTreeMap<String, i64>,
    /// Baseline year for `age = reference_year - year`.
    pub reference_year: i64,
    /// Categorical columns expanded to drop-first indicator columns.
    pub encoded_columns: Vec<String>,
    /// Per encoded column, the categories in training factor order.
    ///
    /// The first category of each list is the dropped baseline.
    pub categories: BTreeMap<String, Vec<String>>,
    /// Trained column names, in model input order.
    pub feature_names: Vec<String>,
}

impl EncodingMetadata {
    /// Return the number of trained feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the car model names with a cylinder descriptor.
    pub fn car_names(&self) -> impl Iterator<Item = &str> {
        self.car_cylinders_mapping.keys().map(String::as_str)
    }

    /// Return the known condition labels.
    pub fn conditions(&self) -> impl Iterator<Item = &str> {
        self.condition_mapping.keys().map(String::as_str)
    }
}

/// Name of the indicator column for `category` of `column`.
#[must_use]
pub fn indicator_name(column: &str, category: &str) -> String {
    format!("{column}_{category}")
}
