//! Raw listing record and the field vocabulary the encoder understands.

use std::fmt;

/// One used-car listing as entered by a user.
///
/// Field names match the column names of the training data, so the record
/// deserializes directly from CSV headers or JSON objects.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CarListing {
    /// Car model name, e.g. `"toyota rav4"`.
    pub car_name: String,
    /// Mileage.
    pub odometer: i64,
    /// Condition label, e.g. `"good"`.
    pub condition: String,
    /// Transmission label, e.g. `"automatic"`.
    pub transmission: String,
    /// Model year.
    pub year: i64,
    /// Drive type label, e.g. `"fwd"`.
    pub drive: String,
    /// Title status label, e.g. `"clean"`.
    pub title_status: String,
    /// Fuel type label, e.g. `"gas"`.
    pub fuel: String,
}

impl CarListing {
    /// Return the raw value of a categorical field.
    #[must_use]
    pub fn categorical(&self, field: CategoricalField) -> &str {
        match field {
            CategoricalField::CarName => &self.car_name,
            CategoricalField::Transmission => &self.transmission,
            CategoricalField::Drive => &self.drive,
            CategoricalField::Fuel => &self.fuel,
        }
    }
}

/// Free-form label fields eligible for one-hot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoricalField {
    /// Car model name, e.g. `"toyota rav4"`.
    CarName,
    /// Transmission type.
    Transmission,
    /// Drive type, e.g. `"fwd"`.
    Drive,
    /// Fuel type.
    Fuel,
}

impl CategoricalField {
    /// Every categorical field, in listing order.
    pub const ALL: [Self; 4] = [Self::CarName, Self::Transmission, Self::Drive, Self::Fuel];

    /// Return the column name of this field.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::CarName => "car_name",
            Self::Transmission => "transmission",
            Self::Drive => "drive",
            Self::Fuel => "fuel",
        }
    }

    /// Look up a field by column name.
    #[must_use]
    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == column)
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Integer features derived from a listing without one-hot expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    /// Mileage, passed through.
    Odometer,
    /// Ordinal code from the condition mapping.
    Condition,
    /// Cylinder count parsed from the car model's descriptor.
    Cylinders,
    /// 1 when the title status is `"clean"`, else 0.
    CleanTitle,
    /// `reference_year - year`.
    Age,
}

impl NumericField {
    /// Every numeric field.
    pub const ALL: [Self; 5] = [
        Self::Odometer,
        Self::Condition,
        Self::Cylinders,
        Self::CleanTitle,
        Self::Age,
    ];

    /// Return the feature column name of this field.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Odometer => "odometer",
            Self::Condition => "condition",
            Self::Cylinders => "cylinders",
            Self::CleanTitle => "clean_title",
            Self::Age => "age",
        }
    }

    /// Look up a field by feature column name.
    #[must_use]
    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == column)
    }
}
