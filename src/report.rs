// 📝 Report Writer - Delimited artifacts + JSON summary
//
// Files written to the output directory:
//   province_summary.csv, province_trend.csv, region_summary.csv,
//   metropolitan_comparison.csv, unresolved_cities.csv,
//   members_enriched.csv, territorial_summary.json

use crate::aggregator::{
    MetroComparison, ProvinceSummary, ProvinceTrendRow, RegionSummary, TerritorialSummary,
};
use crate::data_quality::QualityReport;
use crate::geo::{ResolutionReport, UnresolvedCity};
use crate::records::EnrichedRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROVINCE_SUMMARY_FILE: &str = "province_summary.csv";
pub const PROVINCE_TREND_FILE: &str = "province_trend.csv";
pub const REGION_SUMMARY_FILE: &str = "region_summary.csv";
pub const METRO_COMPARISON_FILE: &str = "metropolitan_comparison.csv";
pub const UNRESOLVED_FILE: &str = "unresolved_cities.csv";
pub const ENRICHED_FILE: &str = "members_enriched.csv";
pub const SUMMARY_JSON_FILE: &str = "territorial_summary.json";

// ============================================================================
// RUN REPORT
// ============================================================================

/// Everything a run produces apart from the enriched rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub input: Option<String>,
    /// SHA-256 over the resolved province column
    pub resolution_fingerprint: String,
    pub resolution: ResolutionReport,
    pub summary: TerritorialSummary,
    pub quality: QualityReport,
}

impl RunReport {
    pub fn headline(&self) -> String {
        format!(
            "Run {}: {} | {} provinces, {} regions in {}",
            self.run_id,
            self.resolution.summary(),
            self.summary.provinces.len(),
            self.summary.regions.len(),
            self.summary
                .diagnostics
                .latest_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "-".to_string())
        )
    }
}

/// Flat row of `members_enriched.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub member_id: String,
    pub year: i32,
    pub city: Option<String>,
    pub region: Option<String>,
    pub competitions: Option<f64>,
    pub points: Option<f64>,
    pub age: Option<f64>,
    pub competitive: bool,
    pub province: Option<String>,
    pub metropolitan: Option<bool>,
}

impl From<&EnrichedRecord> for EnrichedRow {
    fn from(r: &EnrichedRecord) -> Self {
        EnrichedRow {
            member_id: r.record.member_id.clone(),
            year: r.record.year,
            city: r.record.city.clone(),
            region: r.record.region.clone(),
            competitions: r.record.competitions,
            points: r.record.points,
            age: r.record.age,
            competitive: r.record.competitive,
            province: r.province.clone(),
            metropolitan: r.metropolitan,
        }
    }
}

// ============================================================================
// WRITERS
// ============================================================================

/// Write every artifact, returning the paths written
pub fn write_outputs(
    dir: &Path,
    report: &RunReport,
    enriched: &[EnrichedRecord],
    delimiter: u8,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let summary = &report.summary;
    let mut written = vec![
        write_csv(&dir.join(PROVINCE_SUMMARY_FILE), &summary.provinces, delimiter)?,
        write_csv(&dir.join(PROVINCE_TREND_FILE), &summary.trend, delimiter)?,
        write_csv(&dir.join(REGION_SUMMARY_FILE), &summary.regions, delimiter)?,
        write_csv(&dir.join(METRO_COMPARISON_FILE), &summary.metropolitan, delimiter)?,
        write_csv(&dir.join(UNRESOLVED_FILE), &report.resolution.unresolved, delimiter)?,
    ];

    let rows: Vec<EnrichedRow> = enriched.iter().map(EnrichedRow::from).collect();
    written.push(write_csv(&dir.join(ENRICHED_FILE), &rows, delimiter)?);
    written.push(write_json(&dir.join(SUMMARY_JSON_FILE), report)?);

    Ok(written)
}

/// A row type with a fixed column layout
///
/// The columns must match the serialized field names, so that a table with
/// no rows still carries its header.
pub trait Tabular: Serialize {
    const COLUMNS: &'static [&'static str];
}

impl Tabular for ProvinceSummary {
    const COLUMNS: &'static [&'static str] = &[
        "year", "province", "region_code", "members", "mean_competitions", "mean_age",
        "total_points", "competitive_members", "population", "penetration_per_100k",
        "metropolitan",
    ];
}

impl Tabular for ProvinceTrendRow {
    const COLUMNS: &'static [&'static str] = &["province", "year", "members"];
}

impl Tabular for RegionSummary {
    const COLUMNS: &'static [&'static str] = &[
        "year", "region", "region_name", "members", "mean_competitions", "mean_age",
        "total_points", "competitive_members", "population", "penetration_per_100k",
    ];
}

impl Tabular for MetroComparison {
    const COLUMNS: &'static [&'static str] = &[
        "year", "bucket", "members", "mean_competitions", "mean_age", "competitive_pct",
    ];
}

impl Tabular for UnresolvedCity {
    const COLUMNS: &'static [&'static str] = &["city", "occurrences"];
}

impl Tabular for EnrichedRow {
    const COLUMNS: &'static [&'static str] = &[
        "member_id", "year", "city", "region", "competitions", "points", "age",
        "competitive", "province", "metropolitan",
    ];
}

/// Write rows with a header, even when there are no rows
pub fn write_csv<T: Tabular>(path: &Path, rows: &[T], delimiter: u8) -> Result<PathBuf> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    if rows.is_empty() {
        wtr.write_record(T::COLUMNS)
            .with_context(|| format!("Failed to write header to {:?}", path))?;
    }
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("Failed to write row to {:?}", path))?;
    }
    wtr.flush()?;

    Ok(path.to_path_buf())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path.to_path_buf())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MetroBucket;
    use crate::records::MembershipRecord;

    fn sample_report() -> RunReport {
        RunReport {
            run_id: "run-1".to_string(),
            generated_at: Utc::now(),
            input: Some("members.csv".to_string()),
            resolution_fingerprint: "abc".to_string(),
            resolution: ResolutionReport::default(),
            summary: TerritorialSummary {
                provinces: vec![ProvinceSummary {
                    year: 2025,
                    province: "Milano".to_string(),
                    region_code: Some("LOM".to_string()),
                    members: 1,
                    mean_competitions: None,
                    mean_age: Some(50.0),
                    total_points: 0.0,
                    competitive_members: 0,
                    population: 3_214_000,
                    penetration_per_100k: 0.031,
                    metropolitan: true,
                }],
                trend: vec![ProvinceTrendRow {
                    province: "Milano".to_string(),
                    year: 2025,
                    members: 1,
                }],
                regions: vec![],
                metropolitan: vec![MetroComparison {
                    year: 2025,
                    bucket: MetroBucket::Metropolitan,
                    members: 1,
                    mean_competitions: None,
                    mean_age: Some(50.0),
                    competitive_pct: 0.0,
                }],
                diagnostics: Default::default(),
            },
            quality: QualityReport::default(),
        }
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let enriched = vec![EnrichedRecord {
            record: MembershipRecord::new("A", 2025, Some("MILANO")),
            province: Some("Milano".to_string()),
            metropolitan: Some(true),
        }];

        let written = write_outputs(dir.path(), &sample_report(), &enriched, b',').unwrap();
        assert_eq!(written.len(), 7);

        let provinces = fs::read_to_string(dir.path().join(PROVINCE_SUMMARY_FILE)).unwrap();
        let mut lines = provinces.lines();
        assert_eq!(
            lines.next(),
            Some("year,province,region_code,members,mean_competitions,mean_age,total_points,competitive_members,population,penetration_per_100k,metropolitan")
        );
        assert_eq!(
            lines.next(),
            Some("2025,Milano,LOM,1,,50.0,0.0,0,3214000,0.031,true")
        );

        let metro = fs::read_to_string(dir.path().join(METRO_COMPARISON_FILE)).unwrap();
        assert!(metro.lines().nth(1).unwrap().starts_with("2025,Metropolitan,1,"));

        // Empty tables still get a header
        let regions = fs::read_to_string(dir.path().join(REGION_SUMMARY_FILE)).unwrap();
        assert!(regions.starts_with("year,region,region_name,members"));
        assert_eq!(regions.lines().count(), 1);

        let unresolved = fs::read_to_string(dir.path().join(UNRESOLVED_FILE)).unwrap();
        assert_eq!(unresolved.trim(), "city,occurrences");

        let members = fs::read_to_string(dir.path().join(ENRICHED_FILE)).unwrap();
        assert_eq!(
            members.lines().nth(1),
            Some("A,2025,MILANO,,,,,false,Milano,true")
        );

        let json = fs::read_to_string(dir.path().join(SUMMARY_JSON_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["run_id"], "run-1");
        assert_eq!(value["summary"]["provinces"][0]["province"], "Milano");
    }

    #[test]
    fn test_headers_match_serialized_fields() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();

        let path = write_csv(&dir.path().join("p.csv"), &report.summary.provinces, b',').unwrap();
        let from_rows = fs::read_to_string(path).unwrap();
        let empty = write_csv::<ProvinceSummary>(&dir.path().join("e.csv"), &[], b',').unwrap();
        let from_empty = fs::read_to_string(empty).unwrap();

        assert_eq!(from_rows.lines().next(), from_empty.lines().next());
    }

    #[test]
    fn test_semicolon_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![ProvinceTrendRow {
            province: "Forlì-Cesena".to_string(),
            year: 2024,
            members: 3,
        }];

        let path = write_csv(&dir.path().join("t.csv"), &rows, b';').unwrap();
        let text = fs::read_to_string(path).unwrap();

        assert_eq!(text, "province;year;members\nForlì-Cesena;2024;3\n");
    }

    #[test]
    fn test_headline() {
        let headline = sample_report().headline();
        assert!(headline.starts_with("Run run-1: 0 records"));
        assert!(headline.ends_with("1 provinces, 0 regions in -"));
    }
}
