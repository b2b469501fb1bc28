use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use carprice_encode::{CarListing, ModelPackage};
use carprice_forest::{EnsembleEstimate, IntervalEstimator, Z_95};
use carprice_io::{EstimateWriter, ListingEstimate, ListingReader, PackageReader, PackageWriter};

#[derive(Parser)]
#[command(name = "carprice")]
#[command(about = "Used-car price estimates with ensemble confidence intervals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,
}

/// Raw attributes of a single listing.
#[derive(Args, Debug, Clone)]
struct ListingArgs {
    /// Car model name, e.g. "toyota rav4"
    #[arg(long)]
    car_name: String,

    /// Odometer reading in miles
    #[arg(long, value_parser = clap::value_parser!(i64).range(5000..=300_000))]
    odometer: i64,

    /// Condition label, e.g. "good"
    #[arg(long)]
    condition: String,

    /// Transmission type
    #[arg(long)]
    transmission: String,

    /// Model year
    #[arg(long)]
    year: i64,

    /// Drive type, e.g. "fwd"
    #[arg(long)]
    drive: String,

    /// Title status; only "clean" counts as a clean title
    #[arg(long)]
    title_status: String,

    /// Fuel type
    #[arg(long)]
    fuel: String,
}

impl From<ListingArgs> for CarListing {
    fn from(args: ListingArgs) -> Self {
        Self {
            car_name: args.car_name,
            odometer: args.odometer,
            condition: args.condition,
            transmission: args.transmission,
            year: args.year,
            drive: args.drive,
            title_status: args.title_status,
            fuel: args.fuel,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate the price of one listing
    Predict {
        /// Path to the model package (.json for JSON, anything else binary)
        #[arg(long)]
        model: PathBuf,

        #[command(flatten)]
        listing: ListingArgs,

        /// Standard-normal multiplier for the interval half-width
        #[arg(long, default_value_t = Z_95, value_parser = parse_z_score)]
        z_score: f64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Estimate every listing of a CSV file and write a JSON artifact
    Batch {
        /// Path to the model package
        #[arg(long)]
        model: PathBuf,

        /// Path to the listings CSV file
        #[arg(long)]
        listings: PathBuf,

        /// Output JSON file
        #[arg(long)]
        output: PathBuf,

        /// Standard-normal multiplier for the interval half-width
        #[arg(long, default_value_t = Z_95, value_parser = parse_z_score)]
        z_score: f64,
    },

    /// Summarize a model package
    Inspect {
        /// Path to the model package
        #[arg(long)]
        model: PathBuf,
    },

    /// Print the encoded feature row of one listing
    Encode {
        /// Path to the model package
        #[arg(long)]
        model: PathBuf,

        #[command(flatten)]
        listing: ListingArgs,
    },

    /// Rewrite a model package in the format implied by the output extension
    Convert {
        /// Source package
        #[arg(long)]
        input: PathBuf,

        /// Destination package
        #[arg(long)]
        output: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct PredictOutput<'a> {
    car_name: &'a str,
    point: f64,
    lower: f64,
    upper: f64,
    std_error: f64,
    n_estimators: usize,
    z_score: f64,
}

#[derive(Serialize)]
struct BatchOutput {
    n_listings: usize,
    n_estimated: usize,
    n_failed: usize,
    output: String,
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    n_trees: usize,
    n_features: usize,
    max_depth: usize,
    reference_year: i64,
    n_car_models: usize,
    n_conditions: usize,
    encoded_columns: &'a [String],
    feature_names: &'a [String],
}

#[derive(Serialize)]
struct ConvertOutput {
    input: String,
    output: String,
    n_trees: usize,
    n_features: usize,
}

fn parse_z_score(s: &str) -> Result<f64, String> {
    let z: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if z.is_finite() && z > 0.0 {
        Ok(z)
    } else {
        Err(format!("z-score must be positive and finite, got {z}"))
    }
}

fn load_package(path: &Path) -> Result<ModelPackage> {
    PackageReader::new(path)
        .read()
        .with_context(|| format!("failed to load model package {}", path.display()))
}

/// Format a price as whole dollars with thousands separators, e.g. `$12,345`.
///
/// Halves round to even and the sign follows the dollar sign (`$-2,500`).
fn format_dollars(value: f64) -> String {
    let rendered = format!("{value:.0}");
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", rendered.as_str()),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${sign}{grouped}")
}

fn print_estimate(
    listing: &CarListing,
    estimate: &EnsembleEstimate,
    z_score: f64,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Predicted Price: {}", format_dollars(estimate.point));
            println!(
                "Reasonable Range: {} - {}",
                format_dollars(estimate.lower),
                format_dollars(estimate.upper)
            );
        }
        OutputFormat::Json => {
            let output = PredictOutput {
                car_name: &listing.car_name,
                point: estimate.point,
                lower: estimate.lower,
                upper: estimate.upper,
                std_error: estimate.std_error,
                n_estimators: estimate.n_estimators,
                z_score,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Predict {
            model,
            listing,
            z_score,
            format,
        } => {
            let estimator = IntervalEstimator::new().with_z_score(z_score);
            let package = load_package(&model)?;
            let listing = CarListing::from(listing);

            let estimate = package
                .estimate(&listing, &estimator)
                .with_context(|| format!("failed to estimate price for \"{}\"", listing.car_name))?;
            info!(
                point = estimate.point,
                std_error = estimate.std_error,
                "estimate complete"
            );

            print_estimate(&listing, &estimate, estimator.z_score(), format)?;
        }

        Command::Batch {
            model,
            listings,
            output,
            z_score,
        } => {
            let estimator = IntervalEstimator::new().with_z_score(z_score);

            // 1. Load package once
            let package = load_package(&model)?;

            // 2. Read listings
            let rows = ListingReader::new(&listings)
                .read()
                .context("failed to read listings CSV")?;

            // 3. Estimate sequentially, keeping per-row failures
            let estimates: Vec<ListingEstimate<'_>> = rows
                .iter()
                .enumerate()
                .map(|(row, listing)| {
                    let result = package.estimate(listing, &estimator);
                    if let Err(e) = &result {
                        warn!(row, car_name = %listing.car_name, error = %e, "listing not estimated");
                    }
                    ListingEstimate {
                        row,
                        listing,
                        result,
                    }
                })
                .collect();
            let n_failed = estimates.iter().filter(|e| e.result.is_err()).count();

            // 4. Write JSON artifact
            let writer = EstimateWriter::new(&output)?;
            writer.write(estimator.z_score(), &estimates)?;

            // 5. Print summary
            let summary = BatchOutput {
                n_listings: estimates.len(),
                n_estimated: estimates.len() - n_failed,
                n_failed,
                output: writer.path().display().to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Inspect { model } => {
            let package = load_package(&model)?;
            let metadata = package.metadata();
            let forest = package.model();

            let output = InspectOutput {
                n_trees: forest.n_trees(),
                n_features: forest.n_features(),
                max_depth: forest.trees().iter().map(|t| t.depth()).max().unwrap_or(0),
                reference_year: metadata.reference_year,
                n_car_models: metadata.car_cylinders_mapping.len(),
                n_conditions: metadata.condition_mapping.len(),
                encoded_columns: &metadata.encoded_columns,
                feature_names: &metadata.feature_names,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Encode { model, listing } => {
            let package = load_package(&model)?;
            let listing = CarListing::from(listing);

            let row = package
                .encode(&listing)
                .with_context(|| format!("failed to encode \"{}\"", listing.car_name))?;

            let mut object = serde_json::Map::with_capacity(row.len());
            for (name, value) in row.iter() {
                object.insert(name.to_string(), serde_json::Value::from(value));
            }
            println!("{}", serde_json::to_string_pretty(&object)?);
        }

        Command::Convert { input, output } => {
            let package = load_package(&input)?;
            PackageWriter::new(&output)
                .write(&package)
                .with_context(|| format!("failed to write model package {}", output.display()))?;

            let summary = ConvertOutput {
                input: input.display().to_string(),
                output: output.display().to_string(),
                n_trees: package.model().n_trees(),
                n_features: package.model().n_features(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
