// 📇 Membership Records - Input table of the territorial engine
//
// One row per member per year, produced upstream by the yearly unification
// step. Only the columns the territorial engine needs are read; the rest of
// the row is ignored.
//
// A missing required column aborts the run (MalformedInputSchema), so does a
// cell that cannot be parsed. Empty metric cells are simply absent values.

use crate::error::InputError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

// ============================================================================
// COLUMN MAP
// ============================================================================

/// Names of the input columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub member_id: String,
    pub year: String,
    pub city: String,
    pub region: String,
    pub competitions: String,
    pub points: String,
    /// Optional
    pub age: String,
    /// Optional
    pub membership_type: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            member_id: "member_id".to_string(),
            year: "year".to_string(),
            city: "city".to_string(),
            region: "region".to_string(),
            competitions: "competitions".to_string(),
            points: "points".to_string(),
            age: "age".to_string(),
            membership_type: "membership_type".to_string(),
        }
    }
}

impl ColumnMap {
    pub fn required(&self) -> [&str; 6] {
        [
            self.member_id.as_str(),
            self.year.as_str(),
            self.city.as_str(),
            self.region.as_str(),
            self.competitions.as_str(),
            self.points.as_str(),
        ]
    }
}

/// How to read the membership table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFormat {
    pub delimiter: u8,
    pub columns: ColumnMap,
    /// Membership-type values flagging a competitive member (case-insensitive)
    pub competitive_values: Vec<String>,
}

impl Default for InputFormat {
    fn default() -> Self {
        InputFormat {
            delimiter: b',',
            columns: ColumnMap::default(),
            competitive_values: vec!["AGONISTA".to_string(), "AGONISTICA".to_string()],
        }
    }
}

// ============================================================================
// MEMBERSHIP RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub member_id: String,
    pub year: i32,
    pub city: Option<String>,
    pub region: Option<String>,
    pub competitions: Option<f64>,
    pub points: Option<f64>,
    pub age: Option<f64>,
    pub competitive: bool,
}

impl MembershipRecord {
    /// Minimal record, metrics empty
    pub fn new(member_id: &str, year: i32, city: Option<&str>) -> Self {
        MembershipRecord {
            member_id: member_id.to_string(),
            year,
            city: city.map(str::to_string),
            region: None,
            competitions: None,
            points: None,
            age: None,
            competitive: false,
        }
    }
}

/// A record with its derived territorial columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record: MembershipRecord,
    pub province: Option<String>,
    /// `None` when the province is unresolved
    pub metropolitan: Option<bool>,
}

// ============================================================================
// LOADING
// ============================================================================

/// Load the membership table from a delimited file
pub fn load_records(path: &Path, format: &InputFormat) -> Result<Vec<MembershipRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open membership file: {:?}", path))?;
    read_records(file, format)
        .with_context(|| format!("Failed to read membership file: {:?}", path))
}

/// Read membership records from any reader
pub fn read_records<R: Read>(reader: R, format: &InputFormat) -> Result<Vec<MembershipRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read header row")?.clone();
    let positions = ColumnPositions::locate(&headers, &format.columns)?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.context("Failed to read membership row")?;
        let line = row.position().map(|p| p.line() as usize).unwrap_or(0);
        records.push(positions.parse(&row, line, format)?);
    }

    Ok(records)
}

struct ColumnPositions {
    member_id: usize,
    year: usize,
    city: usize,
    region: usize,
    competitions: usize,
    points: usize,
    age: Option<usize>,
    membership_type: Option<usize>,
}

impl ColumnPositions {
    fn locate(headers: &csv::StringRecord, columns: &ColumnMap) -> Result<Self, InputError> {
        let find = |name: &str| {
            headers.iter().position(|h| {
                h.trim_start_matches('\u{feff}')
                    .trim()
                    .eq_ignore_ascii_case(name.trim())
            })
        };

        let missing: Vec<String> = columns
            .required()
            .into_iter()
            .filter(|name| find(*name).is_none())
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(InputError::MissingColumns { missing });
        }

        let required = |name: &str| find(name).ok_or_else(|| InputError::MissingColumns {
            missing: vec![name.to_string()],
        });

        Ok(ColumnPositions {
            member_id: required(&columns.member_id)?,
            year: required(&columns.year)?,
            city: required(&columns.city)?,
            region: required(&columns.region)?,
            competitions: required(&columns.competitions)?,
            points: required(&columns.points)?,
            age: find(&columns.age),
            membership_type: find(&columns.membership_type),
        })
    }

    fn parse(
        &self,
        row: &csv::StringRecord,
        line: usize,
        format: &InputFormat,
    ) -> Result<MembershipRecord, InputError> {
        let columns = &format.columns;
        let cell = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");
        let invalid = |column: &str, value: &str| InputError::InvalidValue {
            row: line,
            column: column.to_string(),
            value: value.to_string(),
        };

        let member_id = cell(self.member_id);
        if member_id.is_empty() {
            return Err(invalid(&columns.member_id, member_id));
        }

        let year_cell = cell(self.year);
        let year = parse_year(year_cell).ok_or_else(|| invalid(&columns.year, year_cell))?;

        let number = |idx: usize, column: &str| {
            let value = cell(idx);
            parse_number(value).map_err(|_| invalid(column, value))
        };

        let competitions = number(self.competitions, &columns.competitions)?;
        let points = number(self.points, &columns.points)?;
        let age = match self.age {
            Some(idx) => number(idx, &columns.age)?,
            None => None,
        };

        let competitive = self
            .membership_type
            .map(|idx| is_competitive(cell(idx), &format.competitive_values))
            .unwrap_or(false);

        Ok(MembershipRecord {
            member_id: member_id.to_string(),
            year,
            city: non_blank(row.get(self.city)),
            region: non_blank(row.get(self.region)),
            competitions,
            points,
            age,
            competitive,
        })
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Raw city text is kept untouched; only fully blank cells become `None`
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

/// Integer year, also accepting spreadsheet floats like "2024.0"
fn parse_year(value: &str) -> Option<i32> {
    if let Ok(year) = value.parse::<i32>() {
        return Some(year);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|y| y.is_finite() && y.fract() == 0.0)
        .filter(|y| (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(y))
        .map(|y| y as i32)
}

/// Empty and NaN cells are absent; a lone comma is a decimal separator
fn parse_number(value: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    let parsed = if value.contains(',') && !value.contains('.') {
        value.replace(',', ".").parse::<f64>()?
    } else {
        value.parse::<f64>()?
    };

    Ok(Some(parsed).filter(|v| v.is_finite()))
}

fn is_competitive(value: &str, competitive_values: &[String]) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }

    competitive_values
        .iter()
        .any(|v| v.trim().to_uppercase() == value.to_uppercase())
        || ["1", "TRUE", "SI", "SÌ", "YES", "Y"]
            .iter()
            .any(|truthy| value.to_uppercase() == *truthy)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
member_id,year,city,region,competitions,points,age,membership_type,club
A,2025,MILANO,LOM,12,340.5,54,Agonista,Circolo Milano
B,2025,roma,LAZ,3,,61,Ordinaria,Circolo Roma
C,2024.0, ,,\"2,5\",10,,1,
";

    #[test]
    fn test_read_records() {
        let records = read_records(SAMPLE.as_bytes(), &InputFormat::default()).unwrap();

        assert_eq!(records.len(), 3);

        assert_eq!(records[0].member_id, "A");
        assert_eq!(records[0].year, 2025);
        assert_eq!(records[0].city.as_deref(), Some("MILANO"));
        assert_eq!(records[0].region.as_deref(), Some("LOM"));
        assert_eq!(records[0].competitions, Some(12.0));
        assert_eq!(records[0].points, Some(340.5));
        assert_eq!(records[0].age, Some(54.0));
        assert!(records[0].competitive);

        assert_eq!(records[1].points, None);
        assert!(!records[1].competitive);

        assert_eq!(records[2].year, 2024);
        assert_eq!(records[2].city, None);
        assert_eq!(records[2].region, None);
        assert_eq!(records[2].competitions, Some(2.5));
        assert_eq!(records[2].age, None);
        assert!(records[2].competitive);
    }

    #[test]
    fn test_missing_columns_are_all_named() {
        let data = "member_id,city,competitions\nA,MILANO,1\n";
        let err = read_records(data.as_bytes(), &InputFormat::default()).unwrap_err();

        let input_err = err.downcast_ref::<InputError>().unwrap();
        assert_eq!(
            input_err,
            &InputError::MissingColumns {
                missing: vec![
                    "year".to_string(),
                    "region".to_string(),
                    "points".to_string()
                ]
            }
        );
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let data = "member_id,year,city,region,competitions,points\nA,2025,Milano,LOM,1,2\n";
        let records = read_records(data.as_bytes(), &InputFormat::default()).unwrap();

        assert_eq!(records[0].age, None);
        assert!(!records[0].competitive);
    }

    #[test]
    fn test_headers_match_case_insensitively() {
        let data = "\u{feff}Member_ID;YEAR;City;Region;Competitions;Points\nA;2025;Milano;LOM;1;2\n";
        let format = InputFormat {
            delimiter: b';',
            ..InputFormat::default()
        };
        let records = read_records(data.as_bytes(), &format).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].member_id, "A");
    }

    #[test]
    fn test_custom_column_names() {
        let data = "Codice,Anno,Citta,Regione,Gare,Punti\nX1,2023,Bari,PUG,4,8\n";
        let format = InputFormat {
            columns: ColumnMap {
                member_id: "Codice".to_string(),
                year: "Anno".to_string(),
                city: "Citta".to_string(),
                region: "Regione".to_string(),
                competitions: "Gare".to_string(),
                points: "Punti".to_string(),
                ..ColumnMap::default()
            },
            ..InputFormat::default()
        };
        let records = read_records(data.as_bytes(), &format).unwrap();

        assert_eq!(records[0].member_id, "X1");
        assert_eq!(records[0].city.as_deref(), Some("Bari"));
    }

    #[test]
    fn test_invalid_year_is_fatal() {
        let data = "member_id,year,city,region,competitions,points\nA,2O25,Milano,LOM,1,2\n";
        let err = read_records(data.as_bytes(), &InputFormat::default()).unwrap_err();

        match err.downcast_ref::<InputError>() {
            Some(InputError::InvalidValue { row, column, value }) => {
                assert_eq!(*row, 2);
                assert_eq!(column, "year");
                assert_eq!(value, "2O25");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_year_is_fatal() {
        let data = "member_id,year,city,region,competitions,points\nA,1e10,Milano,LOM,1,2\n";
        let err = read_records(data.as_bytes(), &InputFormat::default()).unwrap_err();

        match err.downcast_ref::<InputError>() {
            Some(InputError::InvalidValue { column, value, .. }) => {
                assert_eq!(column, "year");
                assert_eq!(value, "1e10");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2025"), Some(2025));
        assert_eq!(parse_year("2024.0"), Some(2024));
        assert_eq!(parse_year("2024.5"), None);
        assert_eq!(parse_year("1e10"), None);
        assert_eq!(parse_year("-1e10"), None);
        assert_eq!(parse_year("inf"), None);
    }

    #[test]
    fn test_empty_member_id_is_fatal() {
        let data = "member_id,year,city,region,competitions,points\n ,2025,Milano,LOM,1,2\n";
        let err = read_records(data.as_bytes(), &InputFormat::default()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_non_numeric_metric_is_fatal() {
        let data = "member_id,year,city,region,competitions,points\nA,2025,Milano,LOM,tante,2\n";
        assert!(read_records(data.as_bytes(), &InputFormat::default()).is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(""), Ok(None));
        assert_eq!(parse_number("NaN"), Ok(None));
        assert_eq!(parse_number("3"), Ok(Some(3.0)));
        assert_eq!(parse_number("3,25"), Ok(Some(3.25)));
        assert!(parse_number("abc").is_err());
    }

    #[test]
    fn test_is_competitive() {
        let values = vec!["AGONISTA".to_string()];

        assert!(is_competitive("agonista", &values));
        assert!(is_competitive("Sì", &values));
        assert!(is_competitive("1", &values));
        assert!(!is_competitive("ORDINARIA", &values));
        assert!(!is_competitive("", &values));
    }

    #[test]
    fn test_load_records_missing_file() {
        let result = load_records(Path::new("/no/such/members.csv"), &InputFormat::default());
        assert!(result.is_err());
    }
}
