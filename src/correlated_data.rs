//! # Correlated data files
//!
//! The correlated data file lists, for consecutive sampling windows at one or more receptors, the
//! measured pollutant concentrations. Columns are separated by any run of spaces or tabs.
//!
//! ```text
//! IDATE     ITIME  FDATE     FTIME  LATR    LONR     SO4    NO3
//! THRESH    2.5    1.0
//! 20100506  0000   20100507  0000   45.434  -75.676  3.392  5.493
//! 20100507  0030   20100507  1200   45.434  -75.676  1.250  0.870
//! ```
//!
//! * The header must start with `IDATE ITIME FDATE FTIME LATR LONR` (any case) and name at least
//!   one pollutant.
//! * Data lines carry a start date `YYYYMMDD`, a start time `HHMM`, an end date and time, the
//!   receptor latitude and longitude (kept verbatim, they are matched against the endpoint tags)
//!   and one value per pollutant.
//! * An optional `THRESH` line gives one PSCF threshold per pollutant.
//! * Times with 30 minutes or more are rounded up to the next hour.
//!
//! See also
//! ------------
//! * [`crate::tagging`] – Attaches the records to the endpoints of a grid.
//! * [`crate::thresholds::compute_thresholds`] – Derives thresholds from [`CorrelatedData::column`].

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use hifitime::{Epoch, Unit};
use regex::Regex;
use tracing::info;

use crate::{
    constants::{PollutantNames, ROUND_UP_MINUTES},
    geo_point::Concentration,
    metcor_errors::MetcorError,
    thresholds::Threshold,
};

const HEADER: [&str; 6] = ["IDATE", "ITIME", "FDATE", "FTIME", "LATR", "LONR"];
const THRESH: &str = "THRESH";

/// One sampling window.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationRecord {
    /// Start of the window, rounded to the hour.
    pub start: Epoch,
    /// End of the window, rounded to the hour.
    pub end: Epoch,
    pub receptor_lat: String,
    pub receptor_lon: String,
    /// One value per pollutant, in header order.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorrelatedData {
    pollutants: PollutantNames,
    records: Vec<CorrelationRecord>,
    thresholds: Option<Vec<Threshold>>,
}

/// Compiled patterns of the file grammar.
struct LineParser {
    separator: Regex,
    date: Regex,
    time: Regex,
}

impl LineParser {
    fn new() -> Result<Self, MetcorError> {
        Ok(LineParser {
            separator: Regex::new(r"[ \t]+")?,
            date: Regex::new(r"^(\d{4})(\d{2})(\d{2})$")?,
            time: Regex::new(r"^(\d{2})(\d{2})$")?,
        })
    }

    fn fields<'a>(&self, line: &'a str) -> Vec<&'a str> {
        self.separator.split(line.trim()).collect()
    }

    /// Epoch of `date` `time`, rounded to the hour.
    fn timestamp(&self, date: &str, time: &str, line: usize) -> Result<Epoch, MetcorError> {
        let bad = |what: &str| MetcorError::CorrelatedDataLine {
            line,
            reason: format!("{what} '{date} {time}'"),
        };
        let d = self.date.captures(date).ok_or_else(|| bad("malformed date"))?;
        let t = self.time.captures(time).ok_or_else(|| bad("malformed time"))?;

        // the patterns only match digits
        let num = |s: &str| s.parse::<u32>().unwrap_or_default();
        let (year, month, day) = (num(&d[1]) as i32, num(&d[2]) as u8, num(&d[3]) as u8);
        let (hour, minute) = (num(&t[1]) as u8, num(&t[2]) as u8);
        if minute >= 60 {
            return Err(bad("invalid minutes"));
        }

        let epoch = Epoch::maybe_from_gregorian_tai(year, month, day, hour, 0, 0, 0)
            .map_err(|e| MetcorError::InvalidDate(format!("{date} {time}: {e}")))?;
        Ok(if minute >= ROUND_UP_MINUTES {
            epoch + Unit::Hour * 1_i64
        } else {
            epoch
        })
    }
}

fn parse_value(field: &str, line: usize) -> Result<f64, MetcorError> {
    field
        .parse::<f64>()
        .map_err(|_| MetcorError::CorrelatedDataLine {
            line,
            reason: format!("'{field}' is not a number"),
        })
}

impl CorrelatedData {
    /// Read a correlated data file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MetcorError> {
        let path = path.as_ref();
        let data = Self::from_reader(BufReader::new(File::open(path)?))?;
        info!(
            path = %path.display(),
            records = data.records.len(),
            pollutants = data.pollutants.len(),
            "correlated data loaded"
        );
        Ok(data)
    }

    /// Parse correlated data from any buffered reader.
    ///
    /// Errors
    /// ----------
    /// * [`MetcorError::InvalidCorrelatedHeader`] for a missing or malformed header,
    /// * [`MetcorError::CorrelatedDataLine`] for a line with the wrong number of columns, a value
    ///   that is not a number, or a malformed date or time,
    /// * [`MetcorError::InvalidDate`] for a date that does not exist in the calendar.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, MetcorError> {
        let parser = LineParser::new()?;
        let mut lines = reader.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => {
                    return Err(MetcorError::InvalidCorrelatedHeader("empty file".into()));
                }
            }
        };

        let columns = parser.fields(&header);
        let prefix_ok = columns.len() > HEADER.len()
            && HEADER
                .iter()
                .zip(&columns)
                .all(|(expected, found)| expected.eq_ignore_ascii_case(found));
        if !prefix_ok {
            return Err(MetcorError::InvalidCorrelatedHeader(header.trim().to_string()));
        }

        let pollutants: PollutantNames =
            columns[HEADER.len()..].iter().map(|s| s.to_string()).collect();
        let n = pollutants.len();
        let mut data = CorrelatedData {
            pollutants,
            ..Default::default()
        };

        for (idx, line) in lines {
            let line = line?;
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let fields = parser.fields(&line);

            if fields[0].eq_ignore_ascii_case(THRESH) {
                if fields.len() != n + 1 {
                    return Err(MetcorError::CorrelatedDataLine {
                        line: line_no,
                        reason: format!("THRESH needs {n} values, found {}", fields.len() - 1),
                    });
                }
                let thresholds = data
                    .pollutants
                    .iter()
                    .zip(&fields[1..])
                    .map(|(name, v)| Ok(Threshold::new(name.clone(), parse_value(v, line_no)?)))
                    .collect::<Result<Vec<_>, MetcorError>>()?;
                data.thresholds = Some(thresholds);
                continue;
            }

            if fields.len() != HEADER.len() + n {
                return Err(MetcorError::CorrelatedDataLine {
                    line: line_no,
                    reason: format!(
                        "expected {} columns, found {}",
                        HEADER.len() + n,
                        fields.len()
                    ),
                });
            }

            let values = fields[HEADER.len()..]
                .iter()
                .map(|v| parse_value(v, line_no))
                .collect::<Result<Vec<_>, _>>()?;
            data.records.push(CorrelationRecord {
                start: parser.timestamp(fields[0], fields[1], line_no)?,
                end: parser.timestamp(fields[2], fields[3], line_no)?,
                receptor_lat: fields[4].to_string(),
                receptor_lon: fields[5].to_string(),
                values,
            });
        }

        Ok(data)
    }

    pub fn pollutants(&self) -> &[String] {
        &self.pollutants
    }

    pub fn records(&self) -> &[CorrelationRecord] {
        &self.records
    }

    /// Thresholds of the `THRESH` line, if the file has one.
    pub fn supplied_thresholds(&self) -> Option<&[Threshold]> {
        self.thresholds.as_deref()
    }

    /// Every value of pollutant `k`, in record order.
    pub fn column(&self, k: usize) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.values.get(k).copied())
            .collect()
    }

    /// Named concentrations of a record, ready to be attached to endpoints.
    pub fn concentrations(&self, record: &CorrelationRecord) -> Vec<Concentration> {
        self.pollutants
            .iter()
            .zip(&record.values)
            .map(|(name, &v)| Concentration::new(name.clone(), v))
            .collect()
    }
}
