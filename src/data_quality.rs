// ✅ Data Quality Engine - Reference consistency + run diagnostics
//
// Nothing in here stops a run. Reference defects and run anomalies become
// QualityIssues with a severity; the caller decides whether to log them,
// print them or fail (`reference --check` fails on Critical).

use crate::aggregator::AggregationDiagnostics;
use crate::geo::{CityAliasIndex, ReferenceGeoTable, ResolutionReport};
use serde::{Deserialize, Serialize};

// ============================================================================
// QUALITY ISSUE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Reference data is inconsistent, lookups will be wrong
    Warning,  // Results are usable but incomplete
    Info,     // Documented discrepancy, no action required
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub subject: String,
    pub issue: String,
    pub recommendation: String,
}

impl QualityIssue {
    fn new(severity: Severity, subject: &str, issue: String, recommendation: &str) -> Self {
        QualityIssue {
            severity,
            subject: subject.to_string(),
            issue,
            recommendation: recommendation.to_string(),
        }
    }
}

// ============================================================================
// QUALITY REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.count(Severity::Critical) > 0
    }

    pub fn extend(&mut self, other: QualityReport) {
        self.issues.extend(other.issues);
    }

    pub fn summary(&self) -> String {
        format!(
            "{} issues: {} critical, {} warnings, {} info",
            self.issues.len(),
            self.count(Severity::Critical),
            self.count(Severity::Warning),
            self.count(Severity::Info)
        )
    }
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

pub struct DataQualityEngine {
    /// Unresolved share of records above which a warning is raised
    unresolved_rate_threshold: f64,

    /// How many unresolved values to name in the warning
    sample_size: usize,
}

impl DataQualityEngine {
    pub fn new() -> Self {
        DataQualityEngine {
            unresolved_rate_threshold: 0.10,
            sample_size: 5,
        }
    }

    pub fn with_threshold(unresolved_rate_threshold: f64) -> Self {
        DataQualityEngine {
            unresolved_rate_threshold,
            ..Self::new()
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Consistency of the reference tables and the alias index
    pub fn check_reference(&self, geo: &ReferenceGeoTable, aliases: &CityAliasIndex) -> QualityReport {
        let mut issues = Vec::new();

        // Rule 1: every province points at a known region
        for province in geo.provinces() {
            if geo.region(&province.region_code).is_none() {
                issues.push(QualityIssue::new(
                    Severity::Critical,
                    &province.name,
                    format!("Region code '{}' not in region table", province.region_code),
                    "Add the region or fix the province's region code",
                ));
            }
        }

        // Rule 2: alias targets exist
        for alias in aliases.dangling_targets(geo) {
            issues.push(QualityIssue::new(
                Severity::Warning,
                &alias.city,
                format!("Alias target '{}' is not a known province", alias.province),
                "Point the alias at a canonical province name",
            ));
        }

        // Rule 3: metropolitan list matches the province set
        for name in ReferenceGeoTable::unknown_metropolitan_names() {
            issues.push(QualityIssue::new(
                Severity::Warning,
                name,
                "Metropolitan entry is not a known province".to_string(),
                "Fix the metropolitan province list",
            ));
        }

        // Rule 4: region totals vs. province sums (reported, never reconciled)
        for region in geo.regions() {
            let provinces_total = geo.province_population_sum(&region.code);
            if region.population < provinces_total {
                issues.push(QualityIssue::new(
                    Severity::Info,
                    &region.code,
                    format!(
                        "Region population {} is below the sum of its provinces {}",
                        region.population, provinces_total
                    ),
                    "Figures come from independent sources; no reconciliation applied",
                ));
            }
        }

        QualityReport { issues }
    }

    /// Anomalies of a single run
    pub fn check_run(
        &self,
        resolution: &ResolutionReport,
        diagnostics: &AggregationDiagnostics,
    ) -> QualityReport {
        let mut issues = Vec::new();

        if resolution.unresolved_records > 0 {
            let severity = if resolution.unresolved_rate() > self.unresolved_rate_threshold {
                Severity::Warning
            } else {
                Severity::Info
            };
            let sample: Vec<String> = resolution
                .top_unresolved(self.sample_size)
                .iter()
                .map(|u| format!("{} ({})", u.city, u.occurrences))
                .collect();

            issues.push(QualityIssue::new(
                severity,
                "city",
                format!(
                    "{} of {} records unresolved ({:.1}%), {} blank; most frequent: {}",
                    resolution.unresolved_records,
                    resolution.total_records,
                    resolution.unresolved_rate() * 100.0,
                    resolution.blank_records,
                    if sample.is_empty() { "-".to_string() } else { sample.join(", ") }
                ),
                "Extend the alias table with the listed spellings and re-run",
            ));
        }

        for province in &diagnostics.provinces_missing_population {
            issues.push(QualityIssue::new(
                Severity::Warning,
                province,
                "Province has no population data; penetration reported as 0".to_string(),
                "Fix the alias target or add the province to the reference table",
            ));
        }

        for region in &diagnostics.regions_missing_population {
            issues.push(QualityIssue::new(
                Severity::Warning,
                region,
                "Region has no population data; penetration reported as 0".to_string(),
                "Use a region code or name from the reference table",
            ));
        }

        if !diagnostics.conflicting_members.is_empty() {
            issues.push(QualityIssue::new(
                Severity::Warning,
                "member_id",
                format!(
                    "{} members appear under more than one province in {}",
                    diagnostics.conflicting_members.len(),
                    diagnostics
                        .latest_year
                        .map(|y| y.to_string())
                        .unwrap_or_default()
                ),
                "Check the upstream unification for duplicate rows",
            ));
        }

        if diagnostics.records_without_region > 0 {
            issues.push(QualityIssue::new(
                Severity::Info,
                "region",
                format!(
                    "{} latest-year records have no region and are left out of the region summary",
                    diagnostics.records_without_region
                ),
                "Fill the region column upstream",
            ));
        }

        QualityReport { issues }
    }
}

impl Default for DataQualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MemberConflict;
    use crate::geo::{Province, Region, UnresolvedCity};

    #[test]
    fn test_builtin_reference_has_no_critical_issues() {
        let engine = DataQualityEngine::new();
        let report = engine.check_reference(
            &ReferenceGeoTable::italy(),
            &CityAliasIndex::with_defaults(),
        );

        assert!(!report.has_critical_issues(), "{:?}", report.issues);
        assert_eq!(report.count(Severity::Warning), 0);
    }

    #[test]
    fn test_reference_defects_are_reported() {
        let geo = ReferenceGeoTable::from_parts(
            vec![
                Province {
                    name: "Orphan".to_string(),
                    population: 100,
                    region_code: "NOPE".to_string(),
                    is_metropolitan: false,
                },
                Province {
                    name: "Big".to_string(),
                    population: 500,
                    region_code: "SML".to_string(),
                    is_metropolitan: false,
                },
            ],
            vec![Region {
                code: "SML".to_string(),
                name: "Smallregion".to_string(),
                population: 400,
            }],
        );
        let mut aliases = CityAliasIndex::new();
        aliases.insert("MACONDO", "Aracataca");

        let report = DataQualityEngine::new().check_reference(&geo, &aliases);

        assert!(report.has_critical_issues());
        assert_eq!(report.count(Severity::Critical), 1);
        assert_eq!(report.count(Severity::Warning), 1);
        assert_eq!(report.count(Severity::Info), 1);
        assert_eq!(report.issues[0].subject, "Orphan");
    }

    #[test]
    fn test_run_issues() {
        let resolution = ResolutionReport {
            total_records: 10,
            resolved_records: 7,
            unresolved_records: 3,
            blank_records: 1,
            distinct_cities: 5,
            distinct_unresolved: 1,
            by_tier: Default::default(),
            unresolved: vec![UnresolvedCity {
                city: "ATLANTIDE".to_string(),
                occurrences: 2,
            }],
        };
        let diagnostics = AggregationDiagnostics {
            latest_year: Some(2025),
            latest_year_members: 7,
            provinces_missing_population: vec!["Aracataca".to_string()],
            regions_missing_population: vec![],
            records_without_region: 2,
            conflicting_members: vec![MemberConflict {
                member_id: "A".to_string(),
                provinces: vec!["Modena".to_string(), "Parma".to_string()],
            }],
        };

        let report = DataQualityEngine::new().check_run(&resolution, &diagnostics);

        assert_eq!(report.issues.len(), 4);
        assert_eq!(report.issues[0].severity, Severity::Warning);
        assert!(report.issues[0].issue.contains("ATLANTIDE (2)"));
        assert_eq!(report.count(Severity::Info), 1);
        assert!(!report.has_critical_issues());
    }

    #[test]
    fn test_low_unresolved_rate_is_info() {
        let resolution = ResolutionReport {
            total_records: 100,
            resolved_records: 99,
            unresolved_records: 1,
            ..ResolutionReport::default()
        };

        let report = DataQualityEngine::with_threshold(0.05)
            .check_run(&resolution, &AggregationDiagnostics::default());

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Info);
        assert!(report.issues[0].issue.contains("most frequent: -"));
    }

    #[test]
    fn test_report_summary() {
        let mut report = QualityReport::default();
        report.extend(QualityReport {
            issues: vec![QualityIssue::new(
                Severity::Info,
                "x",
                "y".to_string(),
                "z",
            )],
        });

        assert_eq!(report.summary(), "1 issues: 0 critical, 0 warnings, 1 info");
    }
}
