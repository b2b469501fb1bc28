//! Fixed-schema feature encoder.
//!
//! Every trained feature name is resolved once, when the encoder is built, to
//! the slot source that fills it: a derived integer field or the indicator of
//! one `(column, category)` pair. Encoding a listing then allocates a row of
//! `feature_names.len()` integers and fills each slot by lookup; indicators
//! the listing does not select stay 0.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::error::EncodeError;
use crate::listing::{CarListing, CategoricalField, NumericField};
use crate::metadata::{EncodingMetadata, indicator_name};

/// Title status that sets `clean_title` to 1.
const CLEAN_TITLE: &str = "clean";

/// Source of one output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Numeric(NumericField),
    /// `category` indexes the column's training category list (never 0, the baseline).
    Indicator {
        field: CategoricalField,
        category: usize,
    },
}

#[derive(Debug, Clone)]
struct EncodedColumn {
    field: CategoricalField,
    categories: Vec<String>,
}

/// Integer features derived from one listing.
struct Derived {
    odometer: i64,
    condition: i64,
    cylinders: i64,
    clean_title: i64,
    age: i64,
}

impl Derived {
    fn get(&self, field: NumericField) -> i64 {
        match field {
            NumericField::Odometer => self.odometer,
            NumericField::Condition => self.condition,
            NumericField::Cylinders => self.cylinders,
            NumericField::CleanTitle => self.clean_title,
            NumericField::Age => self.age,
        }
    }
}

/// One encoded listing: an integer per trained feature, in trained order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRow<'a> {
    names: &'a [String],
    values: Vec<i64>,
}

impl EncodedRow<'_> {
    /// Return the column names, identical to the trained `feature_names`.
    #[must_use]
    pub fn names(&self) -> &[String] {
        self.names
    }

    /// Return the column values.
    #[must_use]
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Return the value of the named column.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<i64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Iterate `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Return the row as floating-point model input.
    #[must_use]
    pub fn to_features(&self) -> Vec<f64> {
        self.values.iter().map(|&v| v as f64).collect()
    }

    /// Return the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Encodes [`CarListing`]s into rows aligned with a trained feature set.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    metadata: EncodingMetadata,
    encoded: Vec<EncodedColumn>,
    slots: Vec<Slot>,
}

impl FeatureEncoder {
    /// Resolve every trained feature name against the encoding metadata.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EncodeError::UnknownEncodedColumn`] | an encoded column is not a categorical listing field |
    /// | [`EncodeError::MissingCategories`] | an encoded column has no (or an empty) category list |
    /// | [`EncodeError::AmbiguousIndicator`] | two categories or columns produce the same feature name |
    /// | [`EncodeError::DuplicateFeature`] | a feature name appears twice |
    /// | [`EncodeError::BaselineIndicatorColumn`] | a feature is the indicator of a baseline category |
    /// | [`EncodeError::RawCategoricalFeature`] | a categorical field is a feature without being encoded |
    /// | [`EncodeError::UnresolvedFeature`] | a feature matches no derived field or indicator |
    /// | [`EncodeError::MissingIndicatorColumn`] | a non-baseline category has no feature column |
    #[instrument(skip_all, fields(n_features = metadata.feature_names.len()))]
    pub fn new(metadata: EncodingMetadata) -> Result<Self, EncodeError> {
        let mut encoded: Vec<EncodedColumn> = Vec::with_capacity(metadata.encoded_columns.len());
        for column in &metadata.encoded_columns {
            let field = CategoricalField::from_column(column).ok_or_else(|| {
                EncodeError::UnknownEncodedColumn {
                    column: column.clone(),
                }
            })?;
            if encoded.iter().any(|e| e.field == field) {
                continue;
            }
            let categories = match metadata.categories.get(column) {
                Some(categories) if !categories.is_empty() => categories.clone(),
                _ => {
                    return Err(EncodeError::MissingCategories {
                        column: column.clone(),
                    });
                }
            };
            encoded.push(EncodedColumn { field, categories });
        }

        let mut indicators: HashMap<String, Slot> = HashMap::new();
        let mut baselines: HashSet<String> = HashSet::new();
        for col in &encoded {
            baselines.insert(indicator_name(col.field.column(), &col.categories[0]));
            for (category, value) in col.categories.iter().enumerate().skip(1) {
                let name = indicator_name(col.field.column(), value);
                let slot = Slot::Indicator {
                    field: col.field,
                    category,
                };
                if NumericField::from_column(&name).is_some()
                    || indicators.insert(name.clone(), slot).is_some()
                {
                    return Err(EncodeError::AmbiguousIndicator { name });
                }
            }
        }
        if let Some(name) = baselines.iter().find(|b| indicators.contains_key(*b)) {
            return Err(EncodeError::AmbiguousIndicator { name: name.clone() });
        }

        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(metadata.n_features());
        let mut slots = Vec::with_capacity(metadata.n_features());
        for (position, name) in metadata.feature_names.iter().enumerate() {
            if let Some(&first) = positions.get(name.as_str()) {
                return Err(EncodeError::DuplicateFeature {
                    name: name.clone(),
                    first,
                    second: position,
                });
            }
            positions.insert(name.as_str(), position);

            let slot = if let Some(field) = NumericField::from_column(name) {
                Slot::Numeric(field)
            } else if let Some(&slot) = indicators.get(name) {
                slot
            } else if baselines.contains(name) {
                return Err(EncodeError::BaselineIndicatorColumn { name: name.clone() });
            } else if CategoricalField::from_column(name).is_some() {
                return Err(EncodeError::RawCategoricalFeature { name: name.clone() });
            } else {
                return Err(EncodeError::UnresolvedFeature {
                    name: name.clone(),
                    position,
                });
            };
            slots.push(slot);
        }

        for col in &encoded {
            for value in col.categories.iter().skip(1) {
                let name = indicator_name(col.field.column(), value);
                if !positions.contains_key(name.as_str()) {
                    return Err(EncodeError::MissingIndicatorColumn { name });
                }
            }
        }

        debug!(
            n_encoded_columns = encoded.len(),
            n_indicators = indicators.len(),
            "feature schema resolved"
        );

        Ok(Self {
            metadata,
            encoded,
            slots,
        })
    }

    /// Encode one listing into a row aligned with `feature_names`.
    ///
    /// The cylinder, condition, and category lookups run for every listing,
    /// whether or not the trained feature set uses the derived value.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EncodeError::UnknownCarModel`] | `car_name` is not in the cylinder mapping |
    /// | [`EncodeError::MissingCylinderCount`] | the cylinder descriptor has no digits |
    /// | [`EncodeError::CylinderCountOverflow`] | the cylinder digits overflow `i64` |
    /// | [`EncodeError::UnknownCondition`] | `condition` is not in the condition mapping |
    /// | [`EncodeError::YearOutOfRange`] | `reference_year - year` overflows |
    /// | [`EncodeError::UnknownCategory`] | an encoded field holds an untrained category |
    #[instrument(skip_all, fields(car_name = %listing.car_name))]
    pub fn encode(&self, listing: &CarListing) -> Result<EncodedRow<'_>, EncodeError> {
        let reference_year = self.metadata.reference_year;
        let derived = Derived {
            odometer: listing.odometer,
            condition: self.condition_code(&listing.condition)?,
            cylinders: self.cylinders(&listing.car_name)?,
            clean_title: i64::from(listing.title_status == CLEAN_TITLE),
            age: reference_year.checked_sub(listing.year).ok_or(
                EncodeError::YearOutOfRange {
                    year: listing.year,
                    reference_year,
                },
            )?,
        };

        let mut observed = Vec::with_capacity(self.encoded.len());
        for col in &self.encoded {
            let value = listing.categorical(col.field);
            let category = col
                .categories
                .iter()
                .position(|c| c == value)
                .ok_or_else(|| EncodeError::UnknownCategory {
                    column: col.field.column().to_string(),
                    value: value.to_string(),
                })?;
            observed.push((col.field, category));
        }

        let values: Vec<i64> = self
            .slots
            .iter()
            .map(|slot| match *slot {
                Slot::Numeric(field) => derived.get(field),
                Slot::Indicator { field, category } => {
                    i64::from(observed.contains(&(field, category)))
                }
            })
            .collect();

        debug!(
            cylinders = derived.cylinders,
            condition = derived.condition,
            age = derived.age,
            n_active = values.iter().filter(|&&v| v != 0).count(),
            "listing encoded"
        );

        Ok(EncodedRow {
            names: &self.metadata.feature_names,
            values,
        })
    }

    /// Return the metadata this encoder was built from.
    #[must_use]
    pub fn metadata(&self) -> &EncodingMetadata {
        &self.metadata
    }

    /// Return the trained feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.metadata.feature_names
    }

    /// Return the number of trained feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.slots.len()
    }

    /// Return the fields that are one-hot encoded, in metadata order.
    pub fn encoded_fields(&self) -> impl Iterator<Item = CategoricalField> + '_ {
        self.encoded.iter().map(|c| c.field)
    }

    fn condition_code(&self, condition: &str) -> Result<i64, EncodeError> {
        self.metadata
            .condition_mapping
            .get(condition)
            .copied()
            .ok_or_else(|| EncodeError::UnknownCondition {
                condition: condition.to_string(),
            })
    }

    fn cylinders(&self, car_name: &str) -> Result<i64, EncodeError> {
        let descriptor = self
            .metadata
            .car_cylinders_mapping
            .get(car_name)
            .ok_or_else(|| EncodeError::UnknownCarModel {
                car_name: car_name.to_string(),
            })?;
        let digits = first_digit_run(descriptor).ok_or_else(|| EncodeError::MissingCylinderCount {
            car_name: car_name.to_string(),
            descriptor: descriptor.clone(),
        })?;
        // A run of ASCII digits only fails to parse on overflow.
        digits.parse().map_err(|_| EncodeError::CylinderCountOverflow {
            car_name: car_name.to_string(),
            digits: digits.to_string(),
        })
    }
}

/// Return the first contiguous run of ASCII digits in `s`.
fn first_digit_run(s: &str) -> Option<&str> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::ErrorKind;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn metadata() -> EncodingMetadata {
        let mut categories = BTreeMap::new();
        categories.insert("car_name".into(), strings(&["honda civic", "toyota rav4"]));
        categories.insert("transmission".into(), strings(&["automatic", "manual", "other"]));
        categories.insert("drive".into(), strings(&["4wd", "fwd", "rwd"]));
        categories.insert("fuel".into(), strings(&["diesel", "electric", "gas", "hybrid"]));
        EncodingMetadata {
            car_cylinders_mapping: BTreeMap::from([
                ("toyota rav4".into(), "4 cylinders".into()),
                ("honda civic".into(), "other".into()),
            ]),
            condition_mapping: BTreeMap::from([("good".into(), 3), ("fair".into(), 2)]),
            reference_year: 2024,
            encoded_columns: strings(&["car_name", "transmission", "drive", "fuel"]),
            categories,
            feature_names: strings(&[
                "odometer",
                "condition",
                "cylinders",
                "clean_title",
                "age",
                "car_name_toyota rav4",
                "transmission_manual",
                "transmission_other",
                "drive_fwd",
                "drive_rwd",
                "fuel_electric",
                "fuel_gas",
                "fuel_hybrid",
            ]),
        }
    }

    fn rav4() -> CarListing {
        CarListing {
            car_name: "toyota rav4".into(),
            odometer: 50_000,
            condition: "good".into(),
            transmission: "automatic".into(),
            year: 2015,
            drive: "fwd".into(),
            title_status: "clean".into(),
            fuel: "gas".into(),
        }
    }

    #[test]
    fn rav4_scenario() {
        let encoder = FeatureEncoder::new(metadata()).unwrap();
        let row = encoder.encode(&rav4()).unwrap();
        assert_eq!(row.get("odometer"), Some(50_000));
        assert_eq!(row.get("cylinders"), Some(4));
        assert_eq!(row.get("condition"), Some(3));
        assert_eq!(row.get("clean_title"), Some(1));
        assert_eq!(row.get("age"), Some(9));
        assert_eq!(row.get("car_name_toyota rav4"), Some(1));
        assert_eq!(row.get("drive_fwd"), Some(1));
        assert_eq!(row.get("fuel_gas"), Some(1));
        for zero in [
            "transmission_manual",
            "transmission_other",
            "drive_rwd",
            "fuel_electric",
            "fuel_hybrid",
        ] {
            assert_eq!(row.get(zero), Some(0), "{zero} should be zero-filled");
        }
    }

    #[test]
    fn columns_match_feature_names() {
        let meta = metadata();
        let encoder = FeatureEncoder::new(meta.clone()).unwrap();
        let row = encoder.encode(&rav4()).unwrap();
        assert_eq!(row.names(), meta.feature_names.as_slice());
        assert_eq!(row.len(), meta.feature_names.len());
        assert_eq!(row.to_features().len(), row.len());
    }

    #[test]
    fn feature_order_follows_metadata_not_derivation() {
        let mut meta = metadata();
        meta.feature_names.reverse();
        let encoder = FeatureEncoder::new(meta.clone()).unwrap();
        let row = encoder.encode(&rav4()).unwrap();
        assert_eq!(row.names().first().map(String::as_str), Some("fuel_hybrid"));
        assert_eq!(row.values().last(), Some(&50_000));
    }

    #[test]
    fn one_hot_selects_exactly_the_observed_category() {
        let encoder = FeatureEncoder::new(metadata()).unwrap();
        for fuel in ["electric", "gas", "hybrid"] {
            let listing = CarListing {
                fuel: fuel.into(),
                ..rav4()
            };
            let row = encoder.encode(&listing).unwrap();
            for other in ["electric", "gas", "hybrid"] {
                let expected = i64::from(other == fuel);
                assert_eq!(row.get(&format!("fuel_{other}")), Some(expected));
            }
        }
    }

    #[test]
    fn one_hot_selects_observed_category_in_every_column() {
        let mut meta = metadata();
        meta.car_cylinders_mapping
            .insert("honda civic".into(), "4 cylinders".into());
        meta.car_cylinders_mapping
            .insert("subaru outback".into(), "6 cylinders".into());
        meta.categories.insert(
            "car_name".into(),
            strings(&["honda civic", "subaru outback", "toyota rav4"]),
        );
        meta.feature_names.push("car_name_subaru outback".into());
        let encoder = FeatureEncoder::new(meta.clone()).unwrap();
        let reference = encoder.encode(&rav4()).unwrap();

        for field in CategoricalField::ALL {
            let column = field.column();
            let categories = &meta.categories[column];
            for value in categories {
                let mut listing = rav4();
                match field {
                    CategoricalField::CarName => listing.car_name = value.clone(),
                    CategoricalField::Transmission => listing.transmission = value.clone(),
                    CategoricalField::Drive => listing.drive = value.clone(),
                    CategoricalField::Fuel => listing.fuel = value.clone(),
                }
                let row = encoder.encode(&listing).unwrap();

                for other in categories.iter().skip(1) {
                    let name = indicator_name(column, other);
                    let expected = i64::from(other == value);
                    assert_eq!(row.get(&name), Some(expected), "{column}={value}: {name}");
                }
                let prefix = format!("{column}_");
                for (name, v) in row.iter() {
                    let is_indicator = meta.encoded_columns.iter().any(|c| name.starts_with(&format!("{c}_")));
                    if is_indicator && !name.starts_with(&prefix) {
                        assert_eq!(Some(v), reference.get(name), "{column}={value} changed {name}");
                    }
                }
            }
        }
    }

    #[test]
    fn baseline_category_is_all_zeros() {
        let encoder = FeatureEncoder::new(metadata()).unwrap();
        let listing = CarListing {
            transmission: "automatic".into(),
            drive: "4wd".into(),
            fuel: "diesel".into(),
            ..rav4()
        };
        let row = encoder.encode(&listing).unwrap();
        for (name, value) in row.iter() {
            if name.starts_with("transmission_") || name.starts_with("drive_") || name.starts_with("fuel_") {
                assert_eq!(value, 0, "{name}");
            }
        }
    }

    #[test]
    fn age_is_reference_minus_year() {
        let encoder = FeatureEncoder::new(metadata()).unwrap();
        for year in [1990, 2015, 2024, 2026] {
            let row = encoder.encode(&CarListing { year, ..rav4() }).unwrap();
            assert_eq!(row.get("age"), Some(2024 - year));
        }
    }

    #[test]
    fn clean_title_indicator() {
        let encoder = FeatureEncoder::new(metadata()).unwrap();
        for (status, expected) in [("clean", 1), ("rebuilt", 0), ("salvage", 0), ("Clean", 0), ("", 0)] {
            let listing = CarListing {
                title_status: status.into(),
                ..rav4()
            };
            assert_eq!(encoder.encode(&listing).unwrap().get("clean_title"), Some(expected));
        }
    }

    #[test]
    fn unknown_car_model_error() {
        let encoder = FeatureEncoder::new(metadata()).unwrap();
        let listing = CarListing {
            car_name: "delorean dmc-12".into(),
            ..rav4()
        };
        let err = encoder.encode(&listing).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownCarModel { ref car_name } if car_name == "delorean dmc-12"));
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn descriptor_without_digits_error() {
        let encoder = FeatureEncoder::new(metadata()).unwrap();
        let listing = CarListing {
            car_name: "honda civic".into(),
            ..rav4()
        };
        let err = encoder.encode(&listing).unwrap_err();
        assert!(matches!(err, EncodeError::MissingCylinderCount { ref descriptor, .. } if descriptor == "other"));
    }

    #[test]
    fn cylinder_overflow_error() {
        let mut meta = metadata();
        meta.car_cylinders_mapping
            .insert("toyota rav4".into(), "99999999999999999999 cylinders".into());
        let encoder = FeatureEncoder::new(meta).unwrap();
        let err = encoder.encode(&rav4()).unwrap_err();
        assert!(matches!(err, EncodeError::CylinderCountOverflow { .. }));
    }

    #[test]
    fn unknown_condition_error() {
        let encoder = FeatureEncoder::new(metadata()).unwrap();
        let listing = CarListing {
            condition: "pristine".into(),
            ..rav4()
        };
        let err = encoder.encode(&listing).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownCondition { ref condition } if condition == "pristine"));
    }

    #[test]
    fn unknown_category_error() {
        let encoder = FeatureEncoder::new(metadata()).unwrap();
        let listing = CarListing {
            drive: "awd".into(),
            ..rav4()
        };
        let err = encoder.encode(&listing).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::UnknownCategory { ref column, ref value } if column == "drive" && value == "awd"
        ));
    }

    #[test]
    fn year_overflow_error() {
        let encoder = FeatureEncoder::new(metadata()).unwrap();
        let listing = CarListing {
            year: i64::MIN,
            ..rav4()
        };
        let err = encoder.encode(&listing).unwrap_err();
        assert!(matches!(err, EncodeError::YearOutOfRange { .. }));
    }

    #[test]
    fn first_digit_run_extraction() {
        assert_eq!(first_digit_run("4 cylinders"), Some("4"));
        assert_eq!(first_digit_run("v12 and 3"), Some("12"));
        assert_eq!(first_digit_run("other"), None);
        assert_eq!(first_digit_run(""), None);
    }

    // --- Schema resolution ---

    fn schema_err(meta: EncodingMetadata) -> EncodeError {
        let err = FeatureEncoder::new(meta).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema, "{err}");
        err
    }

    #[test]
    fn unresolved_feature_error() {
        let mut meta = metadata();
        meta.feature_names.push("year".into());
        let err = schema_err(meta);
        assert!(matches!(err, EncodeError::UnresolvedFeature { ref name, position: 13 } if name == "year"));
    }

    #[test]
    fn duplicate_feature_error() {
        let mut meta = metadata();
        meta.feature_names.push("age".into());
        let err = schema_err(meta);
        assert!(matches!(err, EncodeError::DuplicateFeature { first: 4, second: 13, .. }));
    }

    #[test]
    fn unknown_encoded_column_error() {
        let mut meta = metadata();
        meta.encoded_columns.push("condition".into());
        let err = schema_err(meta);
        assert!(matches!(err, EncodeError::UnknownEncodedColumn { ref column } if column == "condition"));
    }

    #[test]
    fn missing_categories_error() {
        let mut meta = metadata();
        meta.categories.remove("fuel");
        assert!(matches!(schema_err(meta), EncodeError::MissingCategories { .. }));

        let mut meta = metadata();
        meta.categories.insert("fuel".into(), Vec::new());
        assert!(matches!(schema_err(meta), EncodeError::MissingCategories { .. }));
    }

    #[test]
    fn missing_indicator_column_error() {
        let mut meta = metadata();
        meta.feature_names.retain(|n| n != "drive_rwd");
        let err = schema_err(meta);
        assert!(matches!(err, EncodeError::MissingIndicatorColumn { ref name } if name == "drive_rwd"));
    }

    #[test]
    fn baseline_indicator_column_error() {
        let mut meta = metadata();
        meta.feature_names.push("fuel_diesel".into());
        assert!(matches!(schema_err(meta), EncodeError::BaselineIndicatorColumn { .. }));
    }

    #[test]
    fn raw_categorical_feature_error() {
        let mut meta = metadata();
        meta.encoded_columns.retain(|c| c != "drive");
        meta.feature_names.retain(|n| !n.starts_with("drive_"));
        meta.feature_names.push("drive".into());
        assert!(matches!(schema_err(meta), EncodeError::RawCategoricalFeature { .. }));
    }

    #[test]
    fn ambiguous_indicator_error() {
        let mut meta = metadata();
        meta.categories
            .insert("fuel".into(), strings(&["diesel", "gas", "gas"]));
        assert!(matches!(schema_err(meta), EncodeError::AmbiguousIndicator { .. }));
    }

    #[test]
    fn unencoded_fields_are_not_required() {
        let mut meta = metadata();
        meta.encoded_columns.retain(|c| c != "car_name");
        meta.feature_names.retain(|n| !n.starts_with("car_name_"));
        let encoder = FeatureEncoder::new(meta).unwrap();
        assert_eq!(encoder.encoded_fields().count(), 3);
        let row = encoder.encode(&rav4()).unwrap();
        assert_eq!(row.len(), 12);
    }
}
