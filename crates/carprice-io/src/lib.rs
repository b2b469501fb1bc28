//! File I/O for the carprice pipeline: model packages, listing CSVs, and
//! JSON estimate artifacts.

mod error;
mod listing_reader;
mod package_file;
mod writer;

pub use error::IoError;
pub use listing_reader::ListingReader;
pub use package_file::{PackageFormat, PackageReader, PackageWriter};
pub use writer::{EstimateWriter, ListingEstimate};
