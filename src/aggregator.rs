// 📊 Territorial Aggregator - Penetration per province, region, metro area
//
// Turns the resolved membership table into four views:
//   1. per-province summary (latest year)
//   2. per-province yearly trend (all years)
//   3. per-region summary (latest year, record's own region field)
//   4. metropolitan vs. other provinces (latest year)
//
// Penetration = distinct members / population × 100,000, or 0 when the
// population is unknown or zero. Groups are keyed in name order before the
// stable sort on the metric, so ties never depend on input order.

use crate::geo::{ProvinceResolver, ReferenceGeoTable, ResolutionReport};
use crate::records::{EnrichedRecord, MembershipRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

/// Members per 100,000 residents
pub fn penetration_rate(members: usize, population: u64) -> f64 {
    if population == 0 {
        0.0
    } else {
        members as f64 / population as f64 * 100_000.0
    }
}

// ============================================================================
// SUMMARY ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceSummary {
    pub year: i32,
    pub province: String,
    pub region_code: Option<String>,
    pub members: usize,
    pub mean_competitions: Option<f64>,
    pub mean_age: Option<f64>,
    pub total_points: f64,
    pub competitive_members: usize,
    pub population: u64,
    pub penetration_per_100k: f64,
    pub metropolitan: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvinceTrendRow {
    pub province: String,
    pub year: i32,
    pub members: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub year: i32,
    pub region: String,
    pub region_name: Option<String>,
    pub members: usize,
    pub mean_competitions: Option<f64>,
    pub mean_age: Option<f64>,
    pub total_points: f64,
    pub competitive_members: usize,
    pub population: u64,
    pub penetration_per_100k: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetroBucket {
    Metropolitan,
    Other,
}

impl MetroBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetroBucket::Metropolitan => "Metropolitan",
            MetroBucket::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetroComparison {
    pub year: i32,
    pub bucket: MetroBucket,
    pub members: usize,
    pub mean_competitions: Option<f64>,
    pub mean_age: Option<f64>,
    /// 0 - 100
    pub competitive_pct: f64,
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// A member found under more than one province in the same year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberConflict {
    pub member_id: String,
    pub provinces: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationDiagnostics {
    pub latest_year: Option<i32>,
    pub latest_year_members: usize,
    /// Resolved provinces with no population figure
    pub provinces_missing_population: Vec<String>,
    /// Region keys with no population figure
    pub regions_missing_population: Vec<String>,
    /// Latest-year records with a blank region field
    pub records_without_region: usize,
    pub conflicting_members: Vec<MemberConflict>,
}

/// Everything the aggregator computes in one pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerritorialSummary {
    pub provinces: Vec<ProvinceSummary>,
    pub trend: Vec<ProvinceTrendRow>,
    pub regions: Vec<RegionSummary>,
    pub metropolitan: Vec<MetroComparison>,
    pub diagnostics: AggregationDiagnostics,
}

// ============================================================================
// GROUP ACCUMULATOR
// ============================================================================

#[derive(Default)]
struct GroupStats<'r> {
    members: HashSet<&'r str>,
    competitive: HashSet<&'r str>,
    competitions_sum: f64,
    competitions_n: usize,
    age_sum: f64,
    age_n: usize,
    points_sum: f64,
}

impl<'r> GroupStats<'r> {
    fn add(&mut self, record: &'r MembershipRecord) {
        self.members.insert(&record.member_id);
        if record.competitive {
            self.competitive.insert(&record.member_id);
        }
        if let Some(c) = record.competitions {
            self.competitions_sum += c;
            self.competitions_n += 1;
        }
        if let Some(a) = record.age {
            self.age_sum += a;
            self.age_n += 1;
        }
        if let Some(p) = record.points {
            self.points_sum += p;
        }
    }

    fn mean_competitions(&self) -> Option<f64> {
        mean(self.competitions_sum, self.competitions_n)
    }

    fn mean_age(&self) -> Option<f64> {
        mean(self.age_sum, self.age_n)
    }

    fn competitive_pct(&self) -> f64 {
        if self.members.is_empty() {
            0.0
        } else {
            self.competitive.len() as f64 / self.members.len() as f64 * 100.0
        }
    }
}

fn mean(sum: f64, n: usize) -> Option<f64> {
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

// ============================================================================
// TERRITORIAL AGGREGATOR
// ============================================================================

pub struct TerritorialAggregator<'a> {
    geo: &'a ReferenceGeoTable,
}

impl<'a> TerritorialAggregator<'a> {
    pub fn new(geo: &'a ReferenceGeoTable) -> Self {
        TerritorialAggregator { geo }
    }

    /// Attach province and metropolitan flag to every record
    ///
    /// The resolver runs once per distinct city value.
    pub fn enrich(
        &self,
        resolver: &ProvinceResolver<'_>,
        records: Vec<MembershipRecord>,
    ) -> (Vec<EnrichedRecord>, ResolutionReport) {
        let outcome = resolver.resolve_column(records.iter().map(|r| r.city.as_deref()));

        let enriched = records
            .into_iter()
            .zip(outcome.provinces)
            .map(|(record, province)| {
                let metropolitan = province.as_deref().map(|p| self.geo.is_metropolitan(p));
                EnrichedRecord {
                    record,
                    province,
                    metropolitan,
                }
            })
            .collect();

        (enriched, outcome.report)
    }

    /// Compute all four views
    pub fn aggregate(&self, records: &[EnrichedRecord]) -> TerritorialSummary {
        let latest_year = latest_year(records);
        let mut diagnostics = AggregationDiagnostics {
            latest_year,
            ..AggregationDiagnostics::default()
        };

        let trend = self.province_trend(records);

        let Some(year) = latest_year else {
            return TerritorialSummary {
                trend,
                diagnostics,
                ..TerritorialSummary::default()
            };
        };

        let latest: Vec<&EnrichedRecord> =
            records.iter().filter(|r| r.record.year == year).collect();

        diagnostics.latest_year_members = latest
            .iter()
            .map(|r| r.record.member_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        diagnostics.records_without_region = latest
            .iter()
            .filter(|r| r.record.region.as_deref().map_or(true, |g| g.trim().is_empty()))
            .count();
        diagnostics.conflicting_members = member_conflicts(&latest);

        let provinces = self.province_summary(year, &latest, &mut diagnostics);
        let regions = self.region_summary(year, &latest, &mut diagnostics);
        let metropolitan = metropolitan_comparison(year, &latest);

        TerritorialSummary {
            provinces,
            trend,
            regions,
            metropolitan,
            diagnostics,
        }
    }

    // ========================================================================
    // VIEWS
    // ========================================================================

    fn province_summary(
        &self,
        year: i32,
        latest: &[&EnrichedRecord],
        diagnostics: &mut AggregationDiagnostics,
    ) -> Vec<ProvinceSummary> {
        let mut groups: BTreeMap<&str, GroupStats> = BTreeMap::new();
        for r in latest {
            if let Some(province) = r.province.as_deref() {
                groups.entry(province).or_default().add(&r.record);
            }
        }

        let mut rows: Vec<ProvinceSummary> = groups
            .into_iter()
            .map(|(province, stats)| {
                let population = match self.geo.province_population(province) {
                    Some(p) => p,
                    None => {
                        warn!(province, "province has no population data; penetration set to 0");
                        diagnostics.provinces_missing_population.push(province.to_string());
                        0
                    }
                };

                ProvinceSummary {
                    year,
                    province: province.to_string(),
                    region_code: self.geo.region_of(province).map(str::to_string),
                    members: stats.members.len(),
                    mean_competitions: stats.mean_competitions(),
                    mean_age: stats.mean_age(),
                    total_points: stats.points_sum,
                    competitive_members: stats.competitive.len(),
                    population,
                    penetration_per_100k: penetration_rate(stats.members.len(), population),
                    metropolitan: self.geo.is_metropolitan(province),
                }
            })
            .collect();

        rows.sort_by(|a, b| b.members.cmp(&a.members));
        rows
    }

    /// Distinct members per (province, year), only for combinations with members
    pub fn province_trend(&self, records: &[EnrichedRecord]) -> Vec<ProvinceTrendRow> {
        let mut groups: BTreeMap<(&str, i32), HashSet<&str>> = BTreeMap::new();
        for r in records {
            if let Some(province) = r.province.as_deref() {
                groups
                    .entry((province, r.record.year))
                    .or_default()
                    .insert(&r.record.member_id);
            }
        }

        groups
            .into_iter()
            .map(|((province, year), members)| ProvinceTrendRow {
                province: province.to_string(),
                year,
                members: members.len(),
            })
            .collect()
    }

    fn region_summary(
        &self,
        year: i32,
        latest: &[&EnrichedRecord],
        diagnostics: &mut AggregationDiagnostics,
    ) -> Vec<RegionSummary> {
        // Known spellings of a region share its code; unknown values keep their own
        let mut groups: BTreeMap<&str, GroupStats> = BTreeMap::new();
        for r in latest {
            if let Some(region) = r.record.region.as_deref().map(str::trim) {
                if !region.is_empty() {
                    let key = self.geo.region(region).map_or(region, |g| g.code.as_str());
                    groups.entry(key).or_default().add(&r.record);
                }
            }
        }

        let mut rows: Vec<RegionSummary> = groups
            .into_iter()
            .map(|(key, stats)| {
                let reference = self.geo.region(key);
                let population = match reference {
                    Some(region) => region.population,
                    None => {
                        warn!(region = key, "region has no population data; penetration set to 0");
                        diagnostics.regions_missing_population.push(key.to_string());
                        0
                    }
                };

                RegionSummary {
                    year,
                    region: key.to_string(),
                    region_name: reference.map(|r| r.name.clone()),
                    members: stats.members.len(),
                    mean_competitions: stats.mean_competitions(),
                    mean_age: stats.mean_age(),
                    total_points: stats.points_sum,
                    competitive_members: stats.competitive.len(),
                    population,
                    penetration_per_100k: penetration_rate(stats.members.len(), population),
                }
            })
            .collect();

        rows.sort_by(|a, b| b.members.cmp(&a.members));
        rows
    }
}

fn metropolitan_comparison(year: i32, latest: &[&EnrichedRecord]) -> Vec<MetroComparison> {
    let mut metro = GroupStats::default();
    let mut other = GroupStats::default();

    for r in latest {
        match r.metropolitan {
            Some(true) => metro.add(&r.record),
            Some(false) => other.add(&r.record),
            None => {}
        }
    }

    [(MetroBucket::Metropolitan, metro), (MetroBucket::Other, other)]
        .into_iter()
        .map(|(bucket, stats)| MetroComparison {
            year,
            bucket,
            members: stats.members.len(),
            mean_competitions: stats.mean_competitions(),
            mean_age: stats.mean_age(),
            competitive_pct: stats.competitive_pct(),
        })
        .collect()
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn latest_year(records: &[EnrichedRecord]) -> Option<i32> {
    records.iter().map(|r| r.record.year).max()
}

/// Members resolved to more than one province in the given records
fn member_conflicts(latest: &[&EnrichedRecord]) -> Vec<MemberConflict> {
    let mut by_member: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for r in latest {
        if let Some(province) = r.province.as_deref() {
            by_member
                .entry(&r.record.member_id)
                .or_default()
                .insert(province);
        }
    }

    by_member
        .into_iter()
        .filter(|(_, provinces)| provinces.len() > 1)
        .map(|(member_id, provinces)| MemberConflict {
            member_id: member_id.to_string(),
            provinces: provinces.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
