//! Feature encoding for used-car price models.
//!
//! Turns a raw [`CarListing`] into the integer row a trained forest expects:
//! cylinder and condition lookups, title and age derivations, and drop-first
//! one-hot indicators, laid out exactly as the trained `feature_names`.

mod encoder;
mod error;
mod listing;
mod metadata;
mod package;

pub use encoder::{EncodedRow, FeatureEncoder};
pub use error::{EncodeError, ErrorKind, EstimateError};
pub use listing::{CarListing, CategoricalField, NumericField};
pub use metadata::{EncodingMetadata, indicator_name};
pub use package::ModelPackage;
