use csv::ReaderBuilder;
use ndarray::{Array1, Array2};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::dataset::{Dataset, Diagnosis, DIMENSIONS, FEATURE_NAMES};
use crate::error::{PipelineError, Result};

pub const LABEL_COLUMN: &str = "status";

pub fn to_diagnosis(status: &str) -> Option<Diagnosis> {
    status
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(Diagnosis::from_label)
}

pub fn parse(file_path: impl AsRef<Path>) -> Result<Dataset> {
    let file = File::open(file_path.as_ref())?;
    parse_reader(BufReader::new(file))
}

/// Reads a header row with the 26 schema columns in schema order followed by
/// the `status` column, then one sample per record.
pub fn parse_reader<R: Read>(reader: R) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    check_header(reader.headers()?)?;

    let mut values = Vec::new();
    let mut labels = Vec::new();

    for (row, result) in reader.records().enumerate() {
        let record = result?;

        if record.len() != DIMENSIONS + 1 {
            return Err(PipelineError::Data(format!(
                "row {row}: expected {} fields, found {}",
                DIMENSIONS + 1,
                record.len()
            )));
        }

        for (column, field) in record.iter().take(DIMENSIONS).enumerate() {
            let value = field.trim().parse::<f64>().map_err(|_| {
                PipelineError::Data(format!(
                    "row {row}, column '{}': cannot parse '{field}' as a number",
                    FEATURE_NAMES[column]
                ))
            })?;
            values.push(value);
        }

        let status = record.get(DIMENSIONS).unwrap_or_default();
        let diagnosis = to_diagnosis(status).ok_or_else(|| {
            PipelineError::Data(format!(
                "row {row}: unexpected {LABEL_COLUMN} '{status}' (expected 0 or 1)"
            ))
        })?;
        labels.push(diagnosis.label());
    }

    if labels.is_empty() {
        return Err(PipelineError::Data("dataset contains no samples".to_string()));
    }

    let features = Array2::from_shape_vec((labels.len(), DIMENSIONS), values).map_err(|e| {
        PipelineError::Shape {
            expected: format!("{} x {DIMENSIONS}", labels.len()),
            actual: e.to_string(),
        }
    })?;

    Dataset::new(features, Array1::from_vec(labels))
}

fn check_header(header: &csv::StringRecord) -> Result<()> {
    let columns: Vec<&str> = header.iter().map(str::trim).collect();
    let expected: Vec<&str> = FEATURE_NAMES
        .iter()
        .copied()
        .chain(std::iter::once(LABEL_COLUMN))
        .collect();

    if columns != expected {
        return Err(PipelineError::Data(format!(
            "CSV header does not match the feature schema: expected [{}], found [{}]",
            expected.join(", "),
            columns.join(", ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> String {
        let mut columns: Vec<&str> = FEATURE_NAMES.to_vec();
        columns.push(LABEL_COLUMN);
        columns.join(",")
    }

    fn row(value: f64, status: &str) -> String {
        let mut fields: Vec<String> = (0..DIMENSIONS)
            .map(|i| format!("{}", value + i as f64))
            .collect();
        fields.push(status.to_string());
        fields.join(",")
    }

    #[test]
    fn test_parse_valid_csv() {
        let csv = format!("{}\n{}\n{}\n", header(), row(0.5, "0"), row(1.5, "1"));

        let data = parse_reader(csv.as_bytes()).unwrap();

        assert_eq!(data.shape(), (2, DIMENSIONS));
        assert_eq!(data.labels().to_vec(), vec![0, 1]);
        assert!((data.features()[[1, 2]] - 3.5).abs() < 1e-12);
        assert_eq!(data.feature_names()[11], "hnr");
    }

    #[test]
    fn test_header_out_of_order_rejected() {
        let mut columns: Vec<&str> = FEATURE_NAMES.to_vec();
        columns.swap(0, 1);
        columns.push(LABEL_COLUMN);
        let csv = format!("{}\n{}\n", columns.join(","), row(0.0, "1"));

        let err = parse_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn test_bad_label_rejected() {
        let csv = format!("{}\n{}\n", header(), row(0.0, "2"));
        assert!(parse_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_unparsable_value_rejected() {
        let bad = row(0.0, "0").replacen("0,", "abc,", 1);
        let csv = format!("{}\n{bad}\n", header());

        let err = parse_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("jitter_local"));
    }

    #[test]
    fn test_empty_csv_rejected() {
        let csv = format!("{}\n", header());
        assert!(parse_reader(csv.as_bytes()).is_err());
    }
}
