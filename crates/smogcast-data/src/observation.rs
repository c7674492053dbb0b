//! Sensor observation schema.

use serde::{Deserialize, Serialize};

/// Batch CSV column names, in the order they are written.
pub const BATCH_COLUMNS: [&str; 9] = [
    "Timestamp",
    "City",
    "Country",
    "Latitude",
    "Longitude",
    "Temperature",
    "Humidity",
    "CO",
    "PM2.5",
];

/// Columns a batch header must carry to be usable.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Timestamp",
    "City",
    "Temperature",
    "Humidity",
    "CO",
    "PM2.5",
];

/// One sensor reading for a city.
///
/// Numeric fields are `None` when the upstream API call failed or the value
/// in the batch could not be parsed. The timestamp is kept exactly as it was
/// recorded; parsing happens during feature engineering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Recording time, raw text
    #[serde(rename = "Timestamp")]
    pub timestamp: String,

    /// City name
    #[serde(rename = "City")]
    pub city: String,

    /// Country name
    #[serde(rename = "Country", default)]
    pub country: String,

    /// Latitude in degrees
    #[serde(rename = "Latitude", default, deserialize_with = "csv::invalid_option")]
    pub latitude: Option<f64>,

    /// Longitude in degrees
    #[serde(rename = "Longitude", default, deserialize_with = "csv::invalid_option")]
    pub longitude: Option<f64>,

    /// Air temperature in °C
    #[serde(rename = "Temperature", deserialize_with = "csv::invalid_option")]
    pub temperature: Option<f64>,

    /// Relative humidity in %
    #[serde(rename = "Humidity", deserialize_with = "csv::invalid_option")]
    pub humidity: Option<f64>,

    /// Carbon monoxide concentration in µg/m³
    #[serde(rename = "CO", deserialize_with = "csv::invalid_option")]
    pub co: Option<f64>,

    /// Fine particulate concentration in µg/m³
    #[serde(rename = "PM2.5", deserialize_with = "csv::invalid_option")]
    pub pm25: Option<f64>,
}

impl Observation {
    /// Create an observation with no location metadata.
    pub fn new(
        timestamp: impl Into<String>,
        city: impl Into<String>,
        temperature: Option<f64>,
        humidity: Option<f64>,
        co: Option<f64>,
        pm25: Option<f64>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            city: city.into(),
            country: String::new(),
            latitude: None,
            longitude: None,
            temperature,
            humidity,
            co,
            pm25,
        }
    }

    /// Set the country and coordinates.
    pub fn with_location(
        mut self,
        country: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        self.country = country.into();
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Deduplication key: `(City, Timestamp)`.
    pub fn key(&self) -> (&str, &str) {
        (&self.city, &self.timestamp)
    }

    /// Treat `NaN` readings as missing.
    pub(crate) fn normalize(mut self) -> Self {
        for value in [
            &mut self.latitude,
            &mut self.longitude,
            &mut self.temperature,
            &mut self.humidity,
            &mut self.co,
            &mut self.pm25,
        ] {
            if value.is_some_and(f64::is_nan) {
                *value = None;
            }
        }
        self
    }
}
