//! Model package files: versioned bincode envelopes and JSON exports.

use std::path::{Path, PathBuf};

use carprice_encode::{EncodingMetadata, ModelPackage};
use carprice_forest::RandomForestRegressor;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// On-disk encoding of a package file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFormat {
    /// Versioned bincode envelope.
    Binary,
    /// Plain JSON `{ "model": ..., "metadata": ... }`.
    Json,
}

impl PackageFormat {
    /// Pick the format from the file extension: `.json` is JSON, anything else binary.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Binary,
        }
    }
}

/// Versioned envelope for the binary package.
#[derive(serde::Serialize, serde::Deserialize)]
struct PackageEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of trees in the forest.
    n_trees: usize,
    /// Number of features the model was trained on.
    n_features: usize,
    model: RandomForestRegressor,
    metadata: EncodingMetadata,
}

/// Unvalidated package contents as stored in a JSON export.
#[derive(serde::Serialize, serde::Deserialize)]
struct PackageParts {
    model: RandomForestRegressor,
    metadata: EncodingMetadata,
}

/// Reads a [`ModelPackage`] from disk.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | file doesn't exist or is unreadable |
/// | [`IoError::DeserializePackage`] | bincode decoding failed, including malformed trees |
/// | [`IoError::Json`] | JSON decoding failed, including malformed trees |
/// | [`IoError::IncompatiblePackageVersion`] | binary format version mismatch |
/// | [`IoError::InvalidPackage`] | forest and metadata cannot be reconciled |
pub struct PackageReader {
    path: PathBuf,
    format: PackageFormat,
}

impl PackageReader {
    /// Create a reader, choosing the format from the file extension.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            format: PackageFormat::from_path(path),
        }
    }

    /// Override the format chosen from the extension.
    #[must_use]
    pub fn with_format(mut self, format: PackageFormat) -> Self {
        self.format = format;
        self
    }

    /// Read, decode, and validate the package.
    #[instrument(skip(self), fields(path = %self.path.display(), format = ?self.format))]
    pub fn read(&self) -> Result<ModelPackage, IoError> {
        let bytes = std::fs::read(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let (model, metadata) = match self.format {
            PackageFormat::Binary => {
                let envelope: PackageEnvelope = bincode::deserialize(&bytes).map_err(|e| {
                    IoError::DeserializePackage {
                        path: self.path.clone(),
                        source: e,
                    }
                })?;
                if envelope.format_version != FORMAT_VERSION {
                    return Err(IoError::IncompatiblePackageVersion {
                        expected: FORMAT_VERSION,
                        found: envelope.format_version,
                        path: self.path.clone(),
                    });
                }
                debug!(
                    n_trees = envelope.n_trees,
                    n_features = envelope.n_features,
                    "package envelope decoded"
                );
                (envelope.model, envelope.metadata)
            }
            PackageFormat::Json => {
                let parts: PackageParts =
                    serde_json::from_slice(&bytes).map_err(|e| IoError::Json {
                        path: self.path.clone(),
                        source: e,
                    })?;
                (parts.model, parts.metadata)
            }
        };

        let package = ModelPackage::new(model, metadata).map_err(|e| IoError::InvalidPackage {
            path: self.path.clone(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = package.model().n_trees(),
            n_features = package.model().n_features(),
            "model package loaded"
        );
        Ok(package)
    }
}

/// Writes a [`ModelPackage`] to disk.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::SerializePackage`] | bincode encoding failed |
/// | [`IoError::Json`] | JSON encoding failed |
/// | [`IoError::WriteFile`] | file write failed |
pub struct PackageWriter {
    path: PathBuf,
    format: PackageFormat,
}

impl PackageWriter {
    /// Create a writer, choosing the format from the file extension.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            format: PackageFormat::from_path(path),
        }
    }

    /// Override the format chosen from the extension.
    #[must_use]
    pub fn with_format(mut self, format: PackageFormat) -> Self {
        self.format = format;
        self
    }

    /// Encode and write the package.
    #[instrument(skip_all, fields(path = %self.path.display(), format = ?self.format))]
    pub fn write(&self, package: &ModelPackage) -> Result<(), IoError> {
        let bytes = match self.format {
            PackageFormat::Binary => {
                let envelope = PackageEnvelope {
                    format_version: FORMAT_VERSION,
                    n_trees: package.model().n_trees(),
                    n_features: package.model().n_features(),
                    model: package.model().clone(),
                    metadata: package.metadata().clone(),
                };
                bincode::serialize(&envelope)
                    .map_err(|e| IoError::SerializePackage { source: e })?
            }
            PackageFormat::Json => {
                let parts = PackageParts {
                    model: package.model().clone(),
                    metadata: package.metadata().clone(),
                };
                serde_json::to_vec_pretty(&parts).map_err(|e| IoError::Json {
                    path: self.path.clone(),
                    source: e,
                })?
            }
        };

        std::fs::write(&self.path, &bytes).map_err(|e| IoError::WriteFile {
            path: self.path.clone(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = package.model().n_trees(),
            "model package saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use carprice_encode::CarListing;
    use carprice_forest::{IntervalEstimator, Node, RegressionTree};
    use tempfile::TempDir;

    use super::*;

    fn names() -> Vec<String> {
        ["odometer", "condition", "cylinders", "age", "fuel_gas"]
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    fn package() -> ModelPackage {
        let trees = (0..5)
            .map(|i| {
                RegressionTree::from_nodes(
                    vec![
                        Node::split(3, 6.0, 1, 2),
                        Node::leaf(20_000.0 + 500.0 * f64::from(i)),
                        Node::leaf(11_000.0 - 300.0 * f64::from(i)),
                    ],
                    5,
                )
                .unwrap()
            })
            .collect();
        let model = RandomForestRegressor::new(trees, names()).unwrap();
        let metadata = EncodingMetadata {
            car_cylinders_mapping: BTreeMap::from([("honda accord".into(), "4 cylinders".into())]),
            condition_mapping: BTreeMap::from([("like new".into(), 5)]),
            reference_year: 2024,
            encoded_columns: vec!["fuel".into()],
            categories: BTreeMap::from([("fuel".into(), vec!["diesel".into(), "gas".into()])]),
            feature_names: names(),
        };
        ModelPackage::new(model, metadata).unwrap()
    }

    fn listing() -> CarListing {
        CarListing {
            car_name: "honda accord".into(),
            odometer: 80_000,
            condition: "like new".into(),
            transmission: "automatic".into(),
            year: 2016,
            drive: "fwd".into(),
            title_status: "clean".into(),
            fuel: "gas".into(),
        }
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(PackageFormat::from_path(Path::new("m.json")), PackageFormat::Json);
        assert_eq!(PackageFormat::from_path(Path::new("m.JSON")), PackageFormat::Json);
        assert_eq!(PackageFormat::from_path(Path::new("m.bin")), PackageFormat::Binary);
        assert_eq!(PackageFormat::from_path(Path::new("model")), PackageFormat::Binary);
    }

    #[test]
    fn round_trip_identical_estimates() {
        let dir = TempDir::new().unwrap();
        let original = package();
        let estimator = IntervalEstimator::new();
        let expected = original.estimate(&listing(), &estimator).unwrap();

        for file in ["package.bin", "package.json"] {
            let path = dir.path().join(file);
            PackageWriter::new(&path).write(&original).unwrap();
            let loaded = PackageReader::new(&path).read().unwrap();
            assert_eq!(loaded.metadata(), original.metadata());
            let restored = loaded.estimate(&listing(), &estimator).unwrap();
            assert_eq!(restored, expected, "estimates differ after {file} round trip");
        }
    }

    #[test]
    fn load_nonexistent_file_error() {
        let err = PackageReader::new(Path::new("/tmp/nonexistent_package_7f3a.bin"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"not a valid bincode file").unwrap();
        let err = PackageReader::new(&path).read().unwrap_err();
        assert!(matches!(err, IoError::DeserializePackage { .. }));
    }

    #[test]
    fn version_mismatch_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.bin");
        let original = package();
        let envelope = PackageEnvelope {
            format_version: FORMAT_VERSION + 1,
            n_trees: original.model().n_trees(),
            n_features: original.model().n_features(),
            model: original.model().clone(),
            metadata: original.metadata().clone(),
        };
        std::fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();
        let err = PackageReader::new(&path).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::IncompatiblePackageVersion { expected: 1, found: 2, .. }
        ));
    }

    #[test]
    fn schema_error_reported_at_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stale.json");
        let original = package();
        let mut metadata = original.metadata().clone();
        metadata.categories.insert(
            "fuel".into(),
            vec!["diesel".into(), "gas".into(), "electric".into()],
        );
        let parts = PackageParts {
            model: original.model().clone(),
            metadata,
        };
        std::fs::write(&path, serde_json::to_vec(&parts).unwrap()).unwrap();
        let err = PackageReader::new(&path).read().unwrap_err();
        match err {
            IoError::InvalidPackage { source, .. } => assert!(matches!(
                source,
                carprice_encode::EncodeError::MissingIndicatorColumn { ref name } if name == "fuel_electric"
            )),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn explicit_format_overrides_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.dat");
        PackageWriter::new(&path)
            .with_format(PackageFormat::Json)
            .write(&package())
            .unwrap();
        assert!(PackageReader::new(&path).read().is_err());
        let loaded = PackageReader::new(&path)
            .with_format(PackageFormat::Json)
            .read()
            .unwrap();
        assert_eq!(loaded.model().n_trees(), 5);
    }
}
