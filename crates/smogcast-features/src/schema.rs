//! Feature schema.

use serde::{Deserialize, Serialize};

/// Categorical input column.
pub const CATEGORICAL_FEATURE: &str = "City";

/// Numeric input columns in model order.
pub const NUMERIC_FEATURES: [&str; 8] = [
    "Temperature",
    "Humidity",
    "CO",
    "Hour",
    "Day",
    "Month",
    "Temp_Humidity_Interaction",
    "CO_Temp_Interaction",
];

/// Label column.
pub const TARGET: &str = "PM2.5";

/// One engineered input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// City name
    pub city: String,
    /// Air temperature
    pub temperature: f64,
    /// Relative humidity
    pub humidity: f64,
    /// Carbon monoxide
    pub co: f64,
    /// Hour of day, 0-23
    pub hour: u32,
    /// Day of month, 1-31
    pub day: u32,
    /// Month, 1-12
    pub month: u32,
    /// `temperature * humidity`
    pub temp_humidity_interaction: f64,
    /// `co * temperature`
    pub co_temp_interaction: f64,
}

impl FeatureRow {
    /// Numeric values in [`NUMERIC_FEATURES`] order.
    pub fn numeric(&self) -> [f64; 8] {
        [
            self.temperature,
            self.humidity,
            self.co,
            f64::from(self.hour),
            f64::from(self.day),
            f64::from(self.month),
            self.temp_humidity_interaction,
            self.co_temp_interaction,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_order() {
        let row = FeatureRow {
            city: "Oslo".into(),
            temperature: 1.0,
            humidity: 2.0,
            co: 3.0,
            hour: 4,
            day: 5,
            month: 6,
            temp_humidity_interaction: 7.0,
            co_temp_interaction: 8.0,
        };
        assert_eq!(row.numeric(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }
}
