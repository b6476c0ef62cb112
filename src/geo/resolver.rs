// 🧭 Province Resolver - Raw city string → canonical province
//
// Ordered tiers, first match wins:
//   1. blank input            → unresolved, no lookup
//   2. exact alias            → trim + uppercase, alias lookup
//   3. cleaned alias          → drop apostrophes, hyphens → spaces, alias lookup
//   4. province name          → normalized input equals a province name
//   5. otherwise              → unresolved
//
// An alias always wins over the province-name fallback. Unresolved is a
// normal outcome, counted in the ResolutionReport, never an error.

use crate::geo::aliases::CityAliasIndex;
use crate::geo::reference::ReferenceGeoTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

// ============================================================================
// RESOLUTION TIER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// Normalized input found in the alias index
    ExactAlias,

    /// Input found after removing apostrophes and hyphens
    CleanedAlias,

    /// Input is itself a province name (provincial capital)
    ProvinceName,
}

impl ResolutionTier {
    /// Evaluation order, part of the resolution contract
    pub const ORDER: [ResolutionTier; 3] = [
        ResolutionTier::ExactAlias,
        ResolutionTier::CleanedAlias,
        ResolutionTier::ProvinceName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::ExactAlias => "exact_alias",
            ResolutionTier::CleanedAlias => "cleaned_alias",
            ResolutionTier::ProvinceName => "province_name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub province: &'a str,
    pub tier: ResolutionTier,
}

// ============================================================================
// RESOLUTION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedCity {
    pub city: String,
    pub occurrences: usize,
}

/// Outcome statistics of a batch resolution pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub total_records: usize,
    pub resolved_records: usize,
    pub unresolved_records: usize,
    /// Records with a null or whitespace-only city (part of unresolved)
    pub blank_records: usize,
    /// Distinct non-blank cities after trimming and uppercasing
    pub distinct_cities: usize,
    pub distinct_unresolved: usize,
    /// Resolved records per tier
    pub by_tier: BTreeMap<ResolutionTier, usize>,
    /// Every non-blank unresolved value, most frequent first
    pub unresolved: Vec<UnresolvedCity>,
}

impl ResolutionReport {
    /// Share of records left unresolved (0.0 - 1.0)
    pub fn unresolved_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.unresolved_records as f64 / self.total_records as f64
        }
    }

    /// The `n` most frequent unresolved values
    pub fn top_unresolved(&self, n: usize) -> &[UnresolvedCity] {
        &self.unresolved[..n.min(self.unresolved.len())]
    }

    pub fn summary(&self) -> String {
        format!(
            "{} records: {} resolved, {} unresolved ({:.1}%), {} distinct cities, {} distinct unresolved",
            self.total_records,
            self.resolved_records,
            self.unresolved_records,
            self.unresolved_rate() * 100.0,
            self.distinct_cities,
            self.distinct_unresolved
        )
    }
}

/// Resolved column plus its statistics
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    pub provinces: Vec<Option<String>>,
    pub report: ResolutionReport,
}

// ============================================================================
// PROVINCE RESOLVER
// ============================================================================

pub struct ProvinceResolver<'a> {
    aliases: &'a CityAliasIndex,
    geo: &'a ReferenceGeoTable,
}

impl<'a> ProvinceResolver<'a> {
    pub fn new(aliases: &'a CityAliasIndex, geo: &'a ReferenceGeoTable) -> Self {
        ProvinceResolver { aliases, geo }
    }

    /// Resolve a raw city name to its province, `None` when unresolved
    pub fn resolve(&self, raw: Option<&str>) -> Option<&'a str> {
        self.resolve_detailed(raw).map(|r| r.province)
    }

    /// Resolve and report which tier matched
    pub fn resolve_detailed(&self, raw: Option<&str>) -> Option<Resolution<'a>> {
        let normalized = normalize_city(raw?)?;

        ResolutionTier::ORDER.iter().find_map(|&tier| {
            self.apply_tier(tier, &normalized)
                .map(|province| Resolution { province, tier })
        })
    }

    fn apply_tier(&self, tier: ResolutionTier, normalized: &str) -> Option<&'a str> {
        match tier {
            ResolutionTier::ExactAlias => self.aliases.lookup(normalized),
            ResolutionTier::CleanedAlias => self.aliases.lookup(&clean_city(normalized)),
            ResolutionTier::ProvinceName => self.geo.province_named(normalized),
        }
    }

    /// Resolve a whole column, once per distinct raw value
    ///
    /// Output order matches input order.
    pub fn resolve_column<'r, I>(&self, cities: I) -> ResolutionOutcome
    where
        I: IntoIterator<Item = Option<&'r str>>,
    {
        let mut memo: HashMap<&'r str, Option<Resolution<'a>>> = HashMap::new();
        let mut distinct: HashSet<String> = HashSet::new();
        let mut unresolved_counts: HashMap<String, usize> = HashMap::new();
        let mut report = ResolutionReport::default();
        let mut provinces = Vec::new();

        for raw in cities {
            report.total_records += 1;

            let resolution = match raw {
                Some(city) => *memo.entry(city).or_insert_with(|| {
                    if let Some(normalized) = normalize_city(city) {
                        distinct.insert(normalized);
                    }
                    self.resolve_detailed(Some(city))
                }),
                None => None,
            };

            match resolution {
                Some(r) => {
                    report.resolved_records += 1;
                    *report.by_tier.entry(r.tier).or_insert(0) += 1;
                    provinces.push(Some(r.province.to_string()));
                }
                None => {
                    report.unresolved_records += 1;
                    match raw.and_then(normalize_city) {
                        Some(normalized) => *unresolved_counts.entry(normalized).or_insert(0) += 1,
                        None => report.blank_records += 1,
                    }
                    provinces.push(None);
                }
            }
        }

        report.distinct_cities = distinct.len();
        report.distinct_unresolved = unresolved_counts.len();

        let mut unresolved: Vec<UnresolvedCity> = unresolved_counts
            .into_iter()
            .map(|(city, occurrences)| UnresolvedCity { city, occurrences })
            .collect();
        unresolved.sort_by(|a, b| b.occurrences.cmp(&a.occurrences).then(a.city.cmp(&b.city)));
        report.unresolved = unresolved;

        ResolutionOutcome { provinces, report }
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Trim and uppercase; `None` for blank input
pub fn normalize_city(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Apostrophe variants dropped by [`clean_city`]
const APOSTROPHES: [char; 4] = ['\'', '’', '‘', '`'];

/// Remove apostrophes and turn hyphens into spaces
///
/// Example: "SANT’ANGELO-LODIGIANO" → "SANTANGELO LODIGIANO"
pub fn clean_city(normalized: &str) -> String {
    normalized
        .chars()
        .filter(|c| !APOSTROPHES.contains(c))
        .map(|c| if c == '-' { ' ' } else { c })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> (CityAliasIndex, ReferenceGeoTable) {
        (CityAliasIndex::with_defaults(), ReferenceGeoTable::italy())
    }

    #[test]
    fn test_every_province_resolves_to_itself() {
        let (aliases, geo) = fixtures();
        let resolver = ProvinceResolver::new(&aliases, &geo);

        for province in geo.provinces() {
            assert_eq!(
                resolver.resolve(Some(&province.name)),
                Some(province.name.as_str()),
                "province {} did not resolve to itself",
                province.name
            );
        }
    }

    #[test]
    fn test_every_alias_resolves_with_any_casing() {
        let (aliases, geo) = fixtures();
        let resolver = ProvinceResolver::new(&aliases, &geo);

        for (city, province) in aliases.entries() {
            assert_eq!(resolver.resolve(Some(city)), Some(province));

            let lower = format!("  {}\t", city.to_lowercase());
            assert_eq!(resolver.resolve(Some(&lower)), Some(province), "alias {}", city);
        }
    }

    #[test]
    fn test_blank_inputs_are_unresolved() {
        let (aliases, geo) = fixtures();
        let resolver = ProvinceResolver::new(&aliases, &geo);

        assert_eq!(resolver.resolve(None), None);
        assert_eq!(resolver.resolve(Some("")), None);
        assert_eq!(resolver.resolve(Some("   ")), None);
    }

    #[test]
    fn test_unknown_place_is_unresolved() {
        let (aliases, geo) = fixtures();
        let resolver = ProvinceResolver::new(&aliases, &geo);

        assert_eq!(resolver.resolve(Some("Non-Existent-Place-XYZ")), None);
    }

    #[test]
    fn test_tiers() {
        let (aliases, geo) = fixtures();
        let resolver = ProvinceResolver::new(&aliases, &geo);

        let exact = resolver.resolve_detailed(Some("sesto san giovanni")).unwrap();
        assert_eq!(exact.province, "Milano");
        assert_eq!(exact.tier, ResolutionTier::ExactAlias);

        // Typographic apostrophe is not in the table, the cleaned form is
        let cleaned = resolver.resolve_detailed(Some("Palazzolo sull’Oglio")).unwrap();
        assert_eq!(cleaned.province, "Brescia");
        assert_eq!(cleaned.tier, ResolutionTier::CleanedAlias);

        let hyphen = resolver.resolve_detailed(Some("Santarcangelo-di-Romagna")).unwrap();
        assert_eq!(hyphen.province, "Rimini");
        assert_eq!(hyphen.tier, ResolutionTier::CleanedAlias);

        let capital = resolver.resolve_detailed(Some("roma")).unwrap();
        assert_eq!(capital.province, "Roma");
        assert_eq!(capital.tier, ResolutionTier::ProvinceName);
    }

    #[test]
    fn test_alias_wins_over_province_name() {
        let geo = ReferenceGeoTable::italy();
        let mut aliases = CityAliasIndex::new();
        // A (contrived) alias shadowing a province name
        aliases.insert("PRATO", "Firenze");
        let resolver = ProvinceResolver::new(&aliases, &geo);

        let resolution = resolver.resolve_detailed(Some("Prato")).unwrap();
        assert_eq!(resolution.province, "Firenze");
        assert_eq!(resolution.tier, ResolutionTier::ExactAlias);
    }

    #[test]
    fn test_dangling_alias_still_resolves() {
        let geo = ReferenceGeoTable::italy();
        let mut aliases = CityAliasIndex::new();
        aliases.insert("MACONDO", "Aracataca");
        let resolver = ProvinceResolver::new(&aliases, &geo);

        assert_eq!(resolver.resolve(Some("Macondo")), Some("Aracataca"));
    }

    #[test]
    fn test_clean_city() {
        assert_eq!(clean_city("SANT'ANTIOCO"), "SANTANTIOCO");
        assert_eq!(clean_city("CORIGLIANO-ROSSANO"), "CORIGLIANO ROSSANO");
        assert_eq!(clean_city("L’AQUILA"), "LAQUILA");
        assert_eq!(clean_city("SANT‘ANTIOCO"), "SANTANTIOCO");
        assert_eq!(clean_city("SANT`ANTIOCO"), "SANTANTIOCO");
    }

    #[test]
    fn test_apostrophe_variants_resolve() {
        let (aliases, geo) = fixtures();
        let resolver = ProvinceResolver::new(&aliases, &geo);

        for city in ["Sant’Antioco", "Sant‘Antioco", "Sant`Antioco"] {
            let resolution = resolver.resolve_detailed(Some(city)).unwrap();
            assert_eq!(resolution.province, "Sud Sardegna", "city {}", city);
            assert_eq!(resolution.tier, ResolutionTier::CleanedAlias);
        }
    }

    #[test]
    fn test_resolve_column_report() {
        let (aliases, geo) = fixtures();
        let resolver = ProvinceResolver::new(&aliases, &geo);

        let cities = vec![
            Some("MILANO"),
            Some("roma"),
            Some("Nonexistent"),
            Some("nonexistent "),
            Some("Atlantide"),
            Some("Rho"),
            None,
            Some("  "),
            Some("MILANO"),
        ];
        let outcome = resolver.resolve_column(cities);

        assert_eq!(
            outcome.provinces,
            vec![
                Some("Milano".to_string()),
                Some("Roma".to_string()),
                None,
                None,
                None,
                Some("Milano".to_string()),
                None,
                None,
                Some("Milano".to_string()),
            ]
        );

        let report = &outcome.report;
        assert_eq!(report.total_records, 9);
        assert_eq!(report.resolved_records, 4);
        assert_eq!(report.unresolved_records, 5);
        assert_eq!(report.blank_records, 2);
        // MILANO, ROMA, NONEXISTENT, ATLANTIDE, RHO
        assert_eq!(report.distinct_cities, 5);
        assert_eq!(report.distinct_unresolved, 2);
        assert_eq!(report.by_tier.get(&ResolutionTier::ProvinceName), Some(&3));
        assert_eq!(report.by_tier.get(&ResolutionTier::ExactAlias), Some(&1));
        assert_eq!(
            report.unresolved,
            vec![
                UnresolvedCity { city: "NONEXISTENT".to_string(), occurrences: 2 },
                UnresolvedCity { city: "ATLANTIDE".to_string(), occurrences: 1 },
            ]
        );
        assert_eq!(report.top_unresolved(1).len(), 1);
        assert_eq!(report.top_unresolved(10).len(), 2);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let (aliases, geo) = fixtures();
        let resolver = ProvinceResolver::new(&aliases, &geo);
        let cities = vec![Some("Monza"), Some("Bozen"), Some("???"), None, Some("Cefalù")];

        let first = resolver.resolve_column(cities.clone());
        let second = resolver.resolve_column(cities);

        assert_eq!(first.provinces, second.provinces);
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn test_empty_column() {
        let (aliases, geo) = fixtures();
        let resolver = ProvinceResolver::new(&aliases, &geo);

        let outcome = resolver.resolve_column(Vec::<Option<&str>>::new());
        assert!(outcome.provinces.is_empty());
        assert_eq!(outcome.report.unresolved_rate(), 0.0);
    }
}
