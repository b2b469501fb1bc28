//! JSON artifact writer for batch price estimates.

use std::fs;
use std::path::{Path, PathBuf};

use carprice_encode::{CarListing, ErrorKind, EstimateError};
use carprice_forest::EnsembleEstimate;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::IoError;

/// The outcome of estimating one listing of a batch.
#[derive(Debug)]
pub struct ListingEstimate<'a> {
    /// Zero-based row index in the input file.
    pub row: usize,
    /// The listing that was estimated.
    pub listing: &'a CarListing,
    /// The estimate, or why there is none.
    pub result: Result<EnsembleEstimate, EstimateError>,
}

/// Writes batch estimates to a pretty-printed JSON file.
///
/// Creates the parent directory on construction if it does not exist.
pub struct EstimateWriter {
    path: PathBuf,
}

impl EstimateWriter {
    /// Create a new writer targeting the given output file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the parent directory cannot be created.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn new(path: &Path) -> Result<Self, IoError> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(|e| IoError::OutputDirCreate {
                path: dir.to_path_buf(),
                source: e,
            })?;
            debug!("output directory ready");
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Return the output file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every estimate, successful or not, in row order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Json`] | the artifact cannot be encoded |
    /// | [`IoError::WriteFile`] | the file cannot be written |
    #[instrument(skip_all, fields(path = %self.path.display(), n = estimates.len()))]
    pub fn write(&self, z_score: f64, estimates: &[ListingEstimate<'_>]) -> Result<(), IoError> {
        let predictions: Vec<EstimateEntry<'_>> = estimates.iter().map(EstimateEntry::from).collect();
        let n_failed = predictions.iter().filter(|p| p.error.is_some()).count();
        if n_failed > 0 {
            warn!(n_failed, "some listings could not be estimated");
        }

        let artifact = EstimateArtifact {
            n_listings: estimates.len(),
            n_failed,
            z_score,
            predictions,
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::Json {
            path: self.path.clone(),
            source: e,
        })?;
        fs::write(&self.path, &json).map_err(|e| IoError::WriteFile {
            path: self.path.clone(),
            source: e,
        })?;

        info!(path = %self.path.display(), "estimates written");
        Ok(())
    }
}

// --- Serialization structs ---

#[derive(Serialize)]
struct EstimateArtifact<'a> {
    n_listings: usize,
    n_failed: usize,
    z_score: f64,
    predictions: Vec<EstimateEntry<'a>>,
}

#[derive(Serialize)]
struct EstimateEntry<'a> {
    row: usize,
    car_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    point: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upper: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    std_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorEntry>,
}

#[derive(Serialize)]
struct ErrorEntry {
    kind: &'static str,
    message: String,
}

impl<'a> From<&'a ListingEstimate<'_>> for EstimateEntry<'a> {
    fn from(estimate: &'a ListingEstimate<'_>) -> Self {
        let mut entry = EstimateEntry {
            row: estimate.row,
            car_name: &estimate.listing.car_name,
            point: None,
            lower: None,
            upper: None,
            std_error: None,
            error: None,
        };
        match &estimate.result {
            Ok(est) => {
                entry.point = Some(est.point);
                entry.lower = Some(est.lower);
                entry.upper = Some(est.upper);
                entry.std_error = Some(est.std_error);
            }
            Err(e) => {
                entry.error = Some(ErrorEntry {
                    kind: kind_label(e.kind()),
                    message: e.to_string(),
                });
            }
        }
        entry
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Encoding => "encoding",
        ErrorKind::Schema => "schema",
        ErrorKind::Prediction => "prediction",
    }
}

#[cfg(test)]
mod tests {
    use carprice_encode::EncodeError;
    use tempfile::TempDir;

    use super::*;

    fn listing(car_name: &str) -> CarListing {
        CarListing {
            car_name: car_name.into(),
            odometer: 42_000,
            condition: "good".into(),
            transmission: "automatic".into(),
            year: 2019,
            drive: "4wd".into(),
            title_status: "clean".into(),
            fuel: "gas".into(),
        }
    }

    #[test]
    fn writes_successes_and_failures() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("estimates.json");
        let writer = EstimateWriter::new(&path).unwrap();

        let ok = listing("subaru outback");
        let bad = listing("trabant 601");
        let estimates = vec![
            ListingEstimate {
                row: 0,
                listing: &ok,
                result: Ok(EnsembleEstimate {
                    point: 21_000.0,
                    lower: 20_500.0,
                    upper: 21_500.0,
                    std_error: 255.1,
                    n_estimators: 100,
                }),
            },
            ListingEstimate {
                row: 1,
                listing: &bad,
                result: Err(EstimateError::Encode(EncodeError::UnknownCarModel {
                    car_name: "trabant 601".into(),
                })),
            },
        ];
        writer.write(1.96, &estimates).unwrap();

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(writer.path()).unwrap()).unwrap();
        assert_eq!(content["n_listings"], 2);
        assert_eq!(content["n_failed"], 1);
        let predictions = content["predictions"].as_array().unwrap();
        assert_eq!(predictions[0]["car_name"], "subaru outback");
        assert_eq!(predictions[0]["point"], 21_000.0);
        assert!(predictions[0].get("error").is_none());
        assert_eq!(predictions[1]["error"]["kind"], "encoding");
        assert!(predictions[1].get("point").is_none());
    }
}
