//! Error types for carprice-encode.

use carprice_forest::ForestError;

/// Broad failure class, for callers that react per class rather than per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An input value has no entry in a required mapping or cannot be parsed.
    Encoding,
    /// The encoding metadata cannot be reconciled with the trained feature set.
    Schema,
    /// The ensemble is empty or a member estimator failed.
    Prediction,
}

/// Errors from building an encoder or encoding a listing.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    // --- Encoding ---
    /// Returned when the car model has no entry in the cylinder mapping.
    #[error("unknown car model \"{car_name}\": not present in the cylinder mapping")]
    UnknownCarModel {
        /// The unmapped car model name.
        car_name: String,
    },

    /// Returned when a cylinder descriptor contains no decimal digits.
    #[error("cylinder descriptor \"{descriptor}\" for \"{car_name}\" contains no digits")]
    MissingCylinderCount {
        /// The car model whose descriptor was looked up.
        car_name: String,
        /// The mapped descriptor string.
        descriptor: String,
    },

    /// Returned when the digit run of a cylinder descriptor does not fit an `i64`.
    #[error("cylinder count \"{digits}\" for \"{car_name}\" is out of range")]
    CylinderCountOverflow {
        /// The car model whose descriptor was looked up.
        car_name: String,
        /// The extracted digit run.
        digits: String,
    },

    /// Returned when the condition label has no entry in the condition mapping.
    #[error("unknown condition \"{condition}\": not present in the condition mapping")]
    UnknownCondition {
        /// The unmapped condition label.
        condition: String,
    },

    /// Returned when `reference_year - year` does not fit an `i64`.
    #[error("year {year} is out of range for reference year {reference_year}")]
    YearOutOfRange {
        /// The listing's model year.
        year: i64,
        /// The package's reference year.
        reference_year: i64,
    },

    /// Returned when a one-hot encoded field holds a value the model never saw.
    #[error("unknown {column} \"{value}\": not a trained category")]
    UnknownCategory {
        /// The encoded column name.
        column: String,
        /// The unrecognised value.
        value: String,
    },

    // --- Schema ---
    /// Returned when a trained feature name maps to no derived or indicator column.
    #[error("feature \"{name}\" (position {position}) cannot be produced from a listing")]
    UnresolvedFeature {
        /// The unresolvable feature name.
        name: String,
        /// Zero-based position in `feature_names`.
        position: usize,
    },

    /// Returned when the same feature name appears twice.
    #[error("feature \"{name}\" appears at positions {first} and {second}")]
    DuplicateFeature {
        /// The duplicated feature name.
        name: String,
        /// Position of the first occurrence.
        first: usize,
        /// Position of the second occurrence.
        second: usize,
    },

    /// Returned when an encoded column is not a categorical listing field.
    #[error("encoded column \"{column}\" is not a categorical listing field")]
    UnknownEncodedColumn {
        /// The offending column name.
        column: String,
    },

    /// Returned when an encoded column has no stored training category order.
    #[error("no training categories stored for encoded column \"{column}\"")]
    MissingCategories {
        /// The encoded column lacking categories.
        column: String,
    },

    /// Returned when a non-baseline category has no indicator column in the feature set.
    #[error("indicator column \"{name}\" is missing from the trained feature names")]
    MissingIndicatorColumn {
        /// The expected indicator column name.
        name: String,
    },

    /// Returned when the feature set contains the indicator of a dropped baseline category.
    #[error("feature \"{name}\" is the indicator of a baseline category, which is never produced")]
    BaselineIndicatorColumn {
        /// The baseline indicator name.
        name: String,
    },

    /// Returned when a categorical field appears as a raw feature instead of being encoded.
    #[error("categorical field \"{name}\" is a trained feature but is not one-hot encoded")]
    RawCategoricalFeature {
        /// The categorical field name.
        name: String,
    },

    /// Returned when two columns or categories produce the same feature name.
    #[error("feature name \"{name}\" is produced by more than one column")]
    AmbiguousIndicator {
        /// The colliding feature name.
        name: String,
    },

    /// Returned when the model's feature names disagree with the encoding metadata.
    #[error("model expects {model_n_features} features, encoding metadata lists {n_features}; first difference at position {position}")]
    ModelFeatureMismatch {
        /// Number of features the model was trained on.
        model_n_features: usize,
        /// Number of features in the encoding metadata.
        n_features: usize,
        /// First position where the two name lists differ.
        position: usize,
    },
}

impl EncodeError {
    /// Return the failure class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCarModel { .. }
            | Self::MissingCylinderCount { .. }
            | Self::CylinderCountOverflow { .. }
            | Self::UnknownCondition { .. }
            | Self::YearOutOfRange { .. }
            | Self::UnknownCategory { .. } => ErrorKind::Encoding,
            Self::UnresolvedFeature { .. }
            | Self::DuplicateFeature { .. }
            | Self::UnknownEncodedColumn { .. }
            | Self::MissingCategories { .. }
            | Self::MissingIndicatorColumn { .. }
            | Self::BaselineIndicatorColumn { .. }
            | Self::RawCategoricalFeature { .. }
            | Self::AmbiguousIndicator { .. }
            | Self::ModelFeatureMismatch { .. } => ErrorKind::Schema,
        }
    }
}

/// Errors from a full listing-to-estimate request.
#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    /// The listing could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The ensemble could not produce an estimate.
    #[error(transparent)]
    Predict(#[from] ForestError),
}

impl EstimateError {
    /// Return the failure class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encode(e) => e.kind(),
            Self::Predict(_) => ErrorKind::Prediction,
        }
    }
}
