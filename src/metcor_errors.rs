use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetcorError {
    #[error("Point outside of the configured grid extent: lon = {lon}, lat = {lat}")]
    OutOfBounds { lon: f64, lat: f64 },

    #[error("Value not found in tagged data: {0}")]
    ValueNotFound(String),

    #[error("Original value index out of bounds: {0}")]
    OriginalValueNotFound(usize),

    #[error("Attached correlated data set is empty")]
    EmptyDataSet,

    #[error("Length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Invalid auxiliary tag: {0}")]
    InvalidAuxTag(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid correlated data header: {0}")]
    InvalidCorrelatedHeader(String),

    #[error("Malformed correlated data at line {line}: {reason}")]
    CorrelatedDataLine { line: usize, reason: String },

    #[error("Invalid date or time: {0}")]
    InvalidDate(String),

    #[error("Correlated data has not been loaded")]
    MissingCorrelatedData,

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV writer error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration parsing error: {0}")]
    ConfigError(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    RegexError(#[from] regex::Error),
}

impl PartialEq for MetcorError {
    fn eq(&self, other: &Self) -> bool {
        use MetcorError::*;
        match (self, other) {
            (
                OutOfBounds {
                    lon: lon_a,
                    lat: lat_a,
                },
                OutOfBounds {
                    lon: lon_b,
                    lat: lat_b,
                },
            ) => lon_a == lon_b && lat_a == lat_b,
            (ValueNotFound(a), ValueNotFound(b)) => a == b,
            (OriginalValueNotFound(a), OriginalValueNotFound(b)) => a == b,
            (
                LengthMismatch {
                    expected: ea,
                    found: fa,
                },
                LengthMismatch {
                    expected: eb,
                    found: fb,
                },
            ) => ea == eb && fa == fb,
            (InvalidAuxTag(a), InvalidAuxTag(b)) => a == b,
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (InvalidCorrelatedHeader(a), InvalidCorrelatedHeader(b)) => a == b,
            (
                CorrelatedDataLine {
                    line: la,
                    reason: ra,
                },
                CorrelatedDataLine {
                    line: lb,
                    reason: rb,
                },
            ) => la == lb && ra == rb,
            (InvalidDate(a), InvalidDate(b)) => a == b,

            // Wrapped foreign errors are not comparable: same variant is enough
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (ConfigError(_), ConfigError(_)) => true,
            (RegexError(_), RegexError(_)) => true,

            (EmptyDataSet, EmptyDataSet) => true,
            (MissingCorrelatedData, MissingCorrelatedData) => true,

            _ => false,
        }
    }
}

#[cfg(test)]
mod metcor_errors_test {
    use super::*;

    #[test]
    fn test_partial_eq_payloads() {
        assert_eq!(
            MetcorError::ValueNotFound("SO4".into()),
            MetcorError::ValueNotFound("SO4".into())
        );
        assert_ne!(
            MetcorError::ValueNotFound("SO4".into()),
            MetcorError::ValueNotFound("NO3".into())
        );
        assert_eq!(
            MetcorError::LengthMismatch {
                expected: 2,
                found: 3
            },
            MetcorError::LengthMismatch {
                expected: 2,
                found: 3
            }
        );
        assert_ne!(MetcorError::EmptyDataSet, MetcorError::MissingCorrelatedData);
    }

    #[test]
    fn test_io_errors_compare_by_variant() {
        let a = MetcorError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "a"));
        let b = MetcorError::from(std::io::Error::new(std::io::ErrorKind::Other, "b"));
        assert_eq!(a, b);
    }
}
