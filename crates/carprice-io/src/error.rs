//! I/O error types for carprice-io.

use std::path::PathBuf;

use carprice_encode::EncodeError;

/// Errors from package files, listing CSVs, and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a package cannot be encoded as bincode.
    #[error("failed to serialize model package")]
    SerializePackage {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when a binary package file cannot be decoded.
    #[error("failed to deserialize model package from {path}")]
    DeserializePackage {
        /// Path to the package file.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when a JSON document cannot be encoded or decoded.
    #[error("invalid JSON in {path}")]
    Json {
        /// Path to the JSON file.
        path: PathBuf,
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when loading a package with an incompatible format version.
    #[error("incompatible package version in {path}: expected {expected}, found {found}")]
    IncompatiblePackageVersion {
        /// The package format version this build expects.
        expected: u32,
        /// The package format version found in the file.
        found: u32,
        /// Path to the package file.
        path: PathBuf,
    },

    /// Returned when a decoded package fails schema validation.
    #[error("model package {path} is inconsistent")]
    InvalidPackage {
        /// Path to the package file.
        path: PathBuf,
        /// The schema error.
        source: EncodeError,
    },

    /// Returned when the CSV parser encounters a malformed or mistyped record.
    #[error("CSV parse error in {path} at row {row_index} (byte offset {offset})")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV header lacks listing fields.
    #[error("{path} is missing listing columns: {}", .missing.join(", "))]
    MissingColumns {
        /// Path to the CSV file.
        path: PathBuf,
        /// Required column names absent from the header.
        missing: Vec<String>,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an output file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
