//! Batch CSV codec.
//!
//! A batch is one CSV file of observations with a header row. Columns are
//! matched by exact name; their order is irrelevant.

use crate::error::{DataError, Result};
use crate::observation::{Observation, REQUIRED_COLUMNS};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Where a batch comes from. Supply order is historical first, then live.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchSource {
    /// Accumulated history of all collection runs
    #[display("historical")]
    Historical,

    /// Most recent collection run
    #[display("live")]
    Live,
}

/// A decoded batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Source kind
    pub source: BatchSource,
    /// Object name the batch was fetched under
    pub name: String,
    /// Observations in file order
    pub rows: Vec<Observation>,
}

impl Batch {
    /// Create a batch from already decoded rows.
    pub fn new(source: BatchSource, name: impl Into<String>, rows: Vec<Observation>) -> Self {
        Self {
            source,
            name: name.into(),
            rows,
        }
    }

    /// Decode a batch from raw CSV bytes.
    pub fn from_csv(source: BatchSource, name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(source, name, decode_batch(bytes)?))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decode observations from CSV bytes.
///
/// Fails only when the header lacks a required column. Rows whose field
/// count differs from the header's, short or long, are skipped; unparsable
/// numeric values become `None`.
pub fn decode_batch(bytes: &[u8]) -> Result<Vec<Observation>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = reader.headers()?.clone();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(DataError::MissingColumn(required.to_string()));
        }
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                skipped += 1;
                tracing::debug!("Skipping unreadable batch row: {}", e);
                continue;
            }
        };
        if record.len() != headers.len() {
            skipped += 1;
            tracing::debug!(
                "Skipping batch row with {} fields, header has {}",
                record.len(),
                headers.len()
            );
            continue;
        }
        match record.deserialize::<Observation>(Some(&headers)) {
            Ok(obs) => rows.push(obs.normalize()),
            Err(e) => {
                skipped += 1;
                tracing::debug!("Skipping undecodable batch row: {}", e);
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} malformed rows while reading batch", skipped);
    }

    Ok(rows)
}

/// Encode observations as CSV bytes in the canonical column order.
pub fn encode_batch(rows: &[Observation]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    // An empty batch still carries its header.
    if rows.is_empty() {
        writer.write_record(crate::observation::BATCH_COLUMNS)?;
    }
    writer.into_inner().map_err(|e| DataError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::BATCH_COLUMNS;
    use rstest::rstest;

    const SAMPLE: &str = "\
Timestamp,City,Country,Latitude,Longitude,Temperature,Humidity,CO,PM2.5
2025-03-01 10:00:00,Delhi,India,28.61,77.21,31.5,40,912.3,88.1
2025-03-01 10:00:00,Paris,France,48.85,2.35,12.0,71,201.9,
";

    #[test]
    fn test_decode_sample() {
        let rows = decode_batch(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].city, "Delhi");
        assert_eq!(rows[0].pm25, Some(88.1));
        assert_eq!(rows[1].pm25, None);
        assert_eq!(rows[1].latitude, Some(48.85));
    }

    #[test]
    fn test_column_order_is_irrelevant() {
        let csv = "PM2.5,CO,Humidity,Temperature,City,Timestamp\n\
                   10.5,300,55,20,Oslo,2025-01-01 00:00:00\n";
        let rows = decode_batch(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].city, "Oslo");
        assert_eq!(rows[0].temperature, Some(20.0));
        assert_eq!(rows[0].country, "");
        assert_eq!(rows[0].latitude, None);
    }

    #[rstest]
    #[case("not-a-number")]
    #[case("nan")]
    #[case("")]
    fn test_bad_numeric_becomes_none(#[case] value: &str) {
        let csv = format!(
            "Timestamp,City,Temperature,Humidity,CO,PM2.5\n\
             2025-01-01 00:00:00,Oslo,{value},55,300,10\n"
        );
        let rows = decode_batch(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].temperature, None);
        assert_eq!(rows[0].humidity, Some(55.0));
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "Timestamp,City,Temperature,Humidity,CO\n2025-01-01,Oslo,1,2,3\n";
        let err = decode_batch(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "PM2.5"));
    }

    #[rstest]
    #[case::short("2025-01-01 00:00:00,Oslo")]
    #[case::long("2025-01-01 00:00:00,Oslo,1,2,3,4,5,6")]
    fn test_row_with_wrong_field_count_is_skipped(#[case] bad_row: &str) {
        let csv = format!(
            "Timestamp,City,Temperature,Humidity,CO,PM2.5\n{bad_row}\n\
             2025-01-01 01:00:00,Oslo,1,2,3,4\n"
        );
        let rows = decode_batch(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, "2025-01-01 01:00:00");
        assert_eq!(rows[0].pm25, Some(4.0));
    }

    #[test]
    fn test_encode_writes_canonical_header() {
        let rows = decode_batch(SAMPLE.as_bytes()).unwrap();
        let bytes = encode_batch(&rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, BATCH_COLUMNS.join(","));
        assert!(text.contains("Paris,France,48.85,2.35,12.0,71.0,201.9,"));
    }

    #[test]
    fn test_encode_empty_batch_has_header() {
        let bytes = encode_batch(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().trim(), BATCH_COLUMNS.join(","));
    }

    #[test]
    fn test_batch_source_display() {
        assert_eq!(BatchSource::Historical.to_string(), "historical");
        assert_eq!(BatchSource::Live.to_string(), "live");
    }
}
