//! Feature engineering.
//!
//! Observations are loaded into a polars frame and filtered in two passes:
//! rows missing a required reading first, then rows whose timestamp did not
//! parse. The surviving rows gain time-part and interaction columns.

use crate::error::{FeatureError, Result};
use crate::schema::{FeatureRow, TARGET};
use crate::timestamp::parse_timestamp;
use chrono::{Datelike, Timelike};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use smogcast_data::Observation;

const ROW_INDEX: &str = "row_index";

/// Counts of rows removed during feature engineering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropReport {
    /// Rows before filtering
    pub input_rows: usize,
    /// Rows with a missing required reading
    pub missing_values: usize,
    /// Rows whose timestamp could not be parsed
    pub unparsable_timestamp: usize,
}

impl DropReport {
    /// Total rows removed.
    pub const fn dropped(&self) -> usize {
        self.missing_values + self.unparsable_timestamp
    }

    /// Rows that survived.
    pub const fn retained(&self) -> usize {
        self.input_rows - self.dropped()
    }
}

/// Labeled features ready for training.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    /// Feature rows
    pub rows: Vec<FeatureRow>,
    /// PM2.5 label for each row
    pub labels: Vec<f64>,
    /// What was dropped on the way
    pub dropped: DropReport,
}

impl FeatureSet {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Features for inference, where the label may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnlabeledSet {
    /// Feature rows
    pub rows: Vec<FeatureRow>,
    /// Index of each row in the input observations
    pub source_rows: Vec<usize>,
    /// What was dropped on the way
    pub dropped: DropReport,
}

/// Derives model features from observations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Create a feature engineer.
    pub const fn new() -> Self {
        Self
    }

    /// Engineer labeled features. Rows missing PM2.5, Temperature, Humidity
    /// or CO are dropped, then rows with unparsable timestamps.
    pub fn engineer(&self, observations: &[Observation]) -> Result<FeatureSet> {
        let (df, dropped) = self.derive(observations, true)?;
        let rows = extract_rows(&df)?;
        let labels = extract_f64(&df, TARGET)?;

        Ok(FeatureSet {
            rows,
            labels,
            dropped,
        })
    }

    /// Engineer features without requiring a label.
    pub fn engineer_unlabeled(&self, observations: &[Observation]) -> Result<UnlabeledSet> {
        let (df, dropped) = self.derive(observations, false)?;
        let rows = extract_rows(&df)?;
        let index = df.column(ROW_INDEX)?.i64()?;
        let source_rows = (0..df.height())
            .map(|i| {
                index
                    .get(i)
                    .and_then(|v| usize::try_from(v).ok())
                    .ok_or(FeatureError::UnexpectedNull {
                        column: ROW_INDEX,
                        row: i,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(UnlabeledSet {
            rows,
            source_rows,
            dropped,
        })
    }

    fn derive(
        &self,
        observations: &[Observation],
        labeled: bool,
    ) -> Result<(DataFrame, DropReport)> {
        let df = observations_frame(observations)?;
        let input_rows = df.height();

        let mut required = col("Temperature")
            .is_not_null()
            .and(col("Humidity").is_not_null())
            .and(col("CO").is_not_null());
        if labeled {
            required = required.and(col(TARGET).is_not_null());
        }

        let complete = df.lazy().filter(required).collect()?;
        let after_missing = complete.height();

        let df = complete
            .lazy()
            .filter(col("Hour").is_not_null())
            .with_columns([
                (col("Temperature") * col("Humidity")).alias("Temp_Humidity_Interaction"),
                (col("CO") * col("Temperature")).alias("CO_Temp_Interaction"),
            ])
            .collect()?;

        let dropped = DropReport {
            input_rows,
            missing_values: input_rows - after_missing,
            unparsable_timestamp: after_missing - df.height(),
        };

        if dropped.dropped() > 0 {
            tracing::info!(
                "Feature engineering dropped {} of {} rows \
                 ({} missing values, {} unparsable timestamps)",
                dropped.dropped(),
                input_rows,
                dropped.missing_values,
                dropped.unparsable_timestamp
            );
        } else {
            tracing::debug!("Feature engineering kept all {} rows", input_rows);
        }

        Ok((df, dropped))
    }
}

/// Build the working frame, with timestamps already split into parts.
fn observations_frame(observations: &[Observation]) -> Result<DataFrame> {
    let n = observations.len();
    let mut index = Vec::with_capacity(n);
    let mut cities = Vec::with_capacity(n);
    let mut temperature = Vec::with_capacity(n);
    let mut humidity = Vec::with_capacity(n);
    let mut co = Vec::with_capacity(n);
    let mut pm25 = Vec::with_capacity(n);
    let mut hours = Vec::with_capacity(n);
    let mut days = Vec::with_capacity(n);
    let mut months = Vec::with_capacity(n);

    for (i, obs) in observations.iter().enumerate() {
        let ts = parse_timestamp(&obs.timestamp);
        index.push(i as i64);
        cities.push(obs.city.clone());
        temperature.push(obs.temperature);
        humidity.push(obs.humidity);
        co.push(obs.co);
        pm25.push(obs.pm25);
        hours.push(ts.map(|t| i64::from(t.hour())));
        days.push(ts.map(|t| i64::from(t.day())));
        months.push(ts.map(|t| i64::from(t.month())));
    }

    let df = DataFrame::new(vec![
        Series::new(ROW_INDEX.into(), index).into(),
        Series::new("City".into(), cities).into(),
        Series::new("Temperature".into(), temperature).into(),
        Series::new("Humidity".into(), humidity).into(),
        Series::new("CO".into(), co).into(),
        Series::new(TARGET.into(), pm25).into(),
        Series::new("Hour".into(), hours).into(),
        Series::new("Day".into(), days).into(),
        Series::new("Month".into(), months).into(),
    ])?;

    Ok(df)
}

fn extract_f64(df: &DataFrame, column: &'static str) -> Result<Vec<f64>> {
    let values = df.column(column)?.f64()?;
    (0..df.height())
        .map(|row| values.get(row).ok_or(FeatureError::UnexpectedNull { column, row }))
        .collect()
}

fn extract_u32(df: &DataFrame, column: &'static str) -> Result<Vec<u32>> {
    let values = df.column(column)?.i64()?;
    (0..df.height())
        .map(|row| {
            values
                .get(row)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or(FeatureError::UnexpectedNull { column, row })
        })
        .collect()
}

fn extract_rows(df: &DataFrame) -> Result<Vec<FeatureRow>> {
    let cities = df.column("City")?.str()?;
    let temperature = extract_f64(df, "Temperature")?;
    let humidity = extract_f64(df, "Humidity")?;
    let co = extract_f64(df, "CO")?;
    let temp_humidity = extract_f64(df, "Temp_Humidity_Interaction")?;
    let co_temp = extract_f64(df, "CO_Temp_Interaction")?;
    let hours = extract_u32(df, "Hour")?;
    let days = extract_u32(df, "Day")?;
    let months = extract_u32(df, "Month")?;

    (0..df.height())
        .map(|i| {
            let city = cities.get(i).ok_or(FeatureError::UnexpectedNull {
                column: "City",
                row: i,
            })?;
            Ok(FeatureRow {
                city: city.to_string(),
                temperature: temperature[i],
                humidity: humidity[i],
                co: co[i],
                hour: hours[i],
                day: days[i],
                month: months[i],
                temp_humidity_interaction: temp_humidity[i],
                co_temp_interaction: co_temp[i],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeSet;

    fn obs(
        ts: &str,
        city: &str,
        t: Option<f64>,
        h: Option<f64>,
        co: Option<f64>,
        pm: Option<f64>,
    ) -> Observation {
        Observation::new(ts, city, t, h, co, pm)
    }

    #[test]
    fn test_derived_features() {
        let rows = vec![obs(
            "2025-03-14 09:26:53",
            "Delhi",
            Some(30.0),
            Some(40.0),
            Some(900.0),
            Some(85.0),
        )];
        let set = FeatureEngineer::new().engineer(&rows).unwrap();

        assert_eq!(set.len(), 1);
        let row = &set.rows[0];
        assert_eq!((row.hour, row.day, row.month), (9, 14, 3));
        assert_relative_eq!(row.temp_humidity_interaction, 1200.0);
        assert_relative_eq!(row.co_temp_interaction, 27000.0);
        assert_relative_eq!(set.labels[0], 85.0);
        assert_eq!(
            set.dropped,
            DropReport {
                input_rows: 1,
                missing_values: 0,
                unparsable_timestamp: 0
            }
        );
    }

    #[test]
    fn test_interactions_hold_for_every_retained_row() {
        let cities = ["Delhi", "Oslo", "Lima", "Cairo", "Quito"];
        let rows: Vec<Observation> = (0..60)
            .map(|i| {
                let temperature = -10.0 + (i * 7 % 45) as f64 + 0.25;
                let humidity = 15.0 + (i * 13 % 80) as f64;
                let co = 50.0 + (i * 29 % 900) as f64 * 1.5;
                let ts = if i % 11 == 0 {
                    "not a timestamp".to_string()
                } else {
                    format!("2025-{:02}-{:02} {:02}:30:00", 1 + i % 12, 1 + i % 28, i % 24)
                };
                let pm25 = if i % 9 == 0 { None } else { Some(5.0 + i as f64) };
                let city = cities[i % cities.len()];
                obs(&ts, city, Some(temperature), Some(humidity), Some(co), pm25)
            })
            .collect();
        let set = FeatureEngineer::new().engineer(&rows).unwrap();

        assert!(set.len() > 40);
        assert_eq!(set.dropped.retained(), set.len());
        let seen: BTreeSet<_> = set.rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(seen.len(), cities.len());
        for row in &set.rows {
            assert_relative_eq!(row.temp_humidity_interaction, row.temperature * row.humidity);
            assert_relative_eq!(row.co_temp_interaction, row.co * row.temperature);
        }
    }

    #[test]
    fn test_drop_counts_are_complete() {
        let rows = vec![
            obs("2025-01-01 00:00:00", "A", Some(1.0), Some(2.0), Some(3.0), Some(4.0)),
            obs("2025-01-01 01:00:00", "A", None, Some(2.0), Some(3.0), Some(4.0)),
            obs("2025-01-01 02:00:00", "A", Some(1.0), Some(2.0), Some(3.0), None),
            obs("garbage", "A", Some(1.0), Some(2.0), Some(3.0), Some(4.0)),
            obs("garbage", "A", None, None, None, None),
            obs("2025-01-01 05:00:00", "B", Some(-1.0), Some(90.0), Some(0.0), Some(7.5)),
        ];
        let set = FeatureEngineer::new().engineer(&rows).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.dropped.missing_values, 3);
        assert_eq!(set.dropped.unparsable_timestamp, 1);
        assert_eq!(set.dropped.retained(), set.len());
        assert!(set.labels.iter().all(|v| v.is_finite()));
        assert_eq!(set.rows[1].city, "B");
    }

    #[test]
    fn test_unlabeled_keeps_rows_without_pm25() {
        let rows = vec![
            obs("2025-01-01 00:00:00", "A", Some(1.0), Some(2.0), Some(3.0), None),
            obs("bad", "A", Some(1.0), Some(2.0), Some(3.0), None),
            obs("2025-01-01 02:00:00", "B", Some(1.0), Some(2.0), Some(3.0), Some(9.0)),
        ];
        let set = FeatureEngineer::new().engineer_unlabeled(&rows).unwrap();
        assert_eq!(set.rows.len(), 2);
        assert_eq!(set.source_rows, vec![0, 2]);
        assert_eq!(set.dropped.unparsable_timestamp, 1);
    }

    #[test]
    fn test_empty_input() {
        let set = FeatureEngineer::new().engineer(&[]).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.dropped, DropReport::default());
    }

    #[test]
    fn test_deterministic() {
        let rows: Vec<Observation> = (0..24)
            .map(|h| {
                let ts = format!("2025-02-03 {:02}:00:00", h);
                obs(&ts, "C", Some(h as f64), Some(50.0), Some(200.0), Some(10.0))
            })
            .collect();
        let a = FeatureEngineer::new().engineer(&rows).unwrap();
        let b = FeatureEngineer::new().engineer(&rows).unwrap();
        assert_eq!(a, b);
    }
}
