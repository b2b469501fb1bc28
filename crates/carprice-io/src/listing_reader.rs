//! CSV listing reader.

use std::path::{Path, PathBuf};

use carprice_encode::CarListing;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Header columns every listing CSV must provide.
const REQUIRED_COLUMNS: [&str; 8] = [
    "car_name",
    "odometer",
    "condition",
    "transmission",
    "year",
    "drive",
    "title_status",
    "fuel",
];

/// Reads car listings from a CSV file.
///
/// Expected CSV format:
/// - Header row required, containing at least the eight listing fields in any order
/// - Extra columns are ignored
/// - `odometer` and `year` must be integers
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::MissingColumns`] | Header lacks one or more listing fields |
/// | [`IoError::CsvParse`] | Malformed record or non-integer numeric cell |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
pub struct ListingReader {
    path: PathBuf,
}

impl ListingReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<CarListing>, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.parse_error(0, e))?;
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !header.iter().any(|h| h == **c))
            .map(|c| (*c).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(IoError::MissingColumns {
                path: self.path.clone(),
                missing,
            });
        }
        debug!(n_columns = header.len(), "read CSV header");

        let listings = rdr
            .deserialize::<CarListing>()
            .enumerate()
            .map(|(row_index, result)| result.map_err(|e| self.parse_error(row_index, e)))
            .collect::<Result<Vec<_>, _>>()?;

        if listings.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(n_listings = listings.len(), "listings loaded");
        Ok(listings)
    }

    fn parse_error(&self, row_index: usize, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            row_index,
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "car_name,odometer,condition,transmission,year,drive,title_status,fuel\n";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_valid_listings() {
        let csv = format!(
            "{HEADER}toyota rav4,50000,good,automatic,2015,fwd,clean,gas\nford f-150,120000,fair,automatic,2010,4wd,rebuilt,gas\n"
        );
        let f = write_csv(&csv);
        let listings = ListingReader::new(f.path()).read().unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].car_name, "toyota rav4");
        assert_eq!(listings[1].odometer, 120_000);
        assert_eq!(listings[1].title_status, "rebuilt");
    }

    #[test]
    fn columns_in_any_order_with_extras() {
        let csv = "fuel,year,notes,car_name,odometer,condition,transmission,drive,title_status\n\
                   gas,2018,one owner,honda civic,30000,excellent,manual,fwd,clean\n";
        let f = write_csv(csv);
        let listings = ListingReader::new(f.path()).read().unwrap();
        assert_eq!(listings[0].year, 2018);
        assert_eq!(listings[0].transmission, "manual");
    }

    #[test]
    fn missing_columns_error() {
        let f = write_csv("car_name,odometer,condition\ntoyota rav4,50000,good\n");
        let err = ListingReader::new(f.path()).read().unwrap_err();
        match err {
            IoError::MissingColumns { missing, .. } => {
                assert_eq!(
                    missing,
                    vec!["transmission", "year", "drive", "title_status", "fuel"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_integer_odometer_error() {
        let csv = format!(
            "{HEADER}toyota rav4,50000,good,automatic,2015,fwd,clean,gas\ntoyota rav4,lots,good,automatic,2015,fwd,clean,gas\n"
        );
        let f = write_csv(&csv);
        let err = ListingReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::CsvParse { row_index: 1, .. }));
    }

    #[test]
    fn empty_dataset_error() {
        let f = write_csv(HEADER);
        let err = ListingReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn file_not_found_error() {
        let err = ListingReader::new(Path::new("/tmp/nonexistent_listings_91c2.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
