//! The model package: a trained forest bundled with its encoding metadata.

use carprice_forest::{EnsembleEstimate, IntervalEstimator, RandomForestRegressor};
use tracing::{info, instrument};

use crate::encoder::{EncodedRow, FeatureEncoder};
use crate::error::{EncodeError, EstimateError};
use crate::listing::CarListing;
use crate::metadata::EncodingMetadata;

/// Unvalidated wire form of a [`ModelPackage`].
#[derive(Clone, serde::Serialize, serde::Deserialize)]
struct PackageRepr {
    model: RandomForestRegressor,
    metadata: EncodingMetadata,
}

/// A loaded, validated, read-only model package.
///
/// Construct once at process start and pass by reference to every request.
/// Construction resolves the feature schema, so a package that exists can
/// only fail per listing (encoding) or per member tree (prediction).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "PackageRepr", into = "PackageRepr")]
pub struct ModelPackage {
    model: RandomForestRegressor,
    encoder: FeatureEncoder,
}

impl TryFrom<PackageRepr> for ModelPackage {
    type Error = EncodeError;

    fn try_from(repr: PackageRepr) -> Result<Self, Self::Error> {
        Self::new(repr.model, repr.metadata)
    }
}

impl From<ModelPackage> for PackageRepr {
    fn from(package: ModelPackage) -> Self {
        Self {
            model: package.model,
            metadata: package.encoder.metadata().clone(),
        }
    }
}

impl ModelPackage {
    /// Bundle a forest with its encoding metadata.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::ModelFeatureMismatch`] when the forest's feature
    /// names differ from `metadata.feature_names`, or any schema error from
    /// [`FeatureEncoder::new`].
    #[instrument(skip_all, fields(n_trees = model.n_trees()))]
    pub fn new(model: RandomForestRegressor, metadata: EncodingMetadata) -> Result<Self, EncodeError> {
        let model_names = model.feature_names();
        if model_names != metadata.feature_names.as_slice() {
            let position = model_names
                .iter()
                .zip(&metadata.feature_names)
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| model_names.len().min(metadata.feature_names.len()));
            return Err(EncodeError::ModelFeatureMismatch {
                model_n_features: model_names.len(),
                n_features: metadata.feature_names.len(),
                position,
            });
        }
        let encoder = FeatureEncoder::new(metadata)?;
        info!(
            n_trees = model.n_trees(),
            n_features = encoder.n_features(),
            "model package ready"
        );
        Ok(Self { model, encoder })
    }

    /// Encode a listing into a row aligned with the model's features.
    ///
    /// # Errors
    ///
    /// See [`FeatureEncoder::encode`].
    pub fn encode(&self, listing: &CarListing) -> Result<EncodedRow<'_>, EncodeError> {
        self.encoder.encode(listing)
    }

    /// Estimate a listing's price with a confidence interval.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::Encode`] when the listing cannot be encoded
    /// and [`EstimateError::Predict`] when the ensemble cannot produce an
    /// estimate (empty forest, failing member).
    pub fn estimate(
        &self,
        listing: &CarListing,
        estimator: &IntervalEstimator,
    ) -> Result<EnsembleEstimate, EstimateError> {
        let row = self.encode(listing)?;
        Ok(estimator.estimate(&self.model, &row.to_features())?)
    }

    /// Return the trained forest.
    #[must_use]
    pub fn model(&self) -> &RandomForestRegressor {
        &self.model
    }

    /// Return the feature encoder.
    #[must_use]
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Return the encoding metadata.
    #[must_use]
    pub fn metadata(&self) -> &EncodingMetadata {
        self.encoder.metadata()
    }
}
