// 🚀 Batch Pipeline - load → resolve → aggregate → report → persist
//
// The only place that touches files, the database and the log at once.
// Every step below it takes plain values.

use crate::aggregator::TerritorialAggregator;
use crate::config::Config;
use crate::data_quality::{DataQualityEngine, QualityReport, Severity};
use crate::db::{self, PersistStats, RunRecord};
use crate::geo::{CityAliasIndex, ProvinceResolver, ReferenceGeoTable};
use crate::records::{load_records, EnrichedRecord, MembershipRecord};
use crate::report::{write_outputs, RunReport};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What a run leaves behind
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub written: Vec<PathBuf>,
    pub persisted: Option<PersistStats>,
}

/// Alias index with the configured extension file merged in
pub fn build_alias_index(config: &Config) -> Result<CityAliasIndex> {
    let mut aliases = CityAliasIndex::with_defaults();

    if let Some(path) = &config.alias_file {
        let merged = aliases.extend_from_csv(path)?;
        info!("Merged {} aliases from {:?}", merged, path);
    }

    Ok(aliases)
}

/// Full batch run as configured
pub fn run(config: &Config) -> Result<RunOutcome> {
    let input = config
        .input
        .as_ref()
        .ok_or_else(|| anyhow!("No input file configured (use --input or set `input` in the config file)"))?;
    let format = config.input_format()?;

    let records = load_records(input, &format)?;
    info!("Loaded {} records from {:?}", records.len(), input);

    let geo = ReferenceGeoTable::italy();
    let aliases = build_alias_index(config)?;

    let (report, enriched) = analyze(
        records,
        &geo,
        &aliases,
        config,
        Some(input.display().to_string()),
    );

    let written = write_outputs(&config.output_dir, &report, &enriched, format.delimiter)?;
    info!("Wrote {} files to {:?}", written.len(), config.output_dir);

    let persisted = match &config.database {
        Some(path) => {
            let conn = db::open_database(path)?;
            let stats = db::persist_run(&conn, &enriched, &RunRecord::from(&report))
                .context("Failed to persist run")?;
            Some(stats)
        }
        None => None,
    };

    info!("{}", report.headline());

    Ok(RunOutcome {
        report,
        written,
        persisted,
    })
}

/// Resolve, aggregate and check an in-memory table
pub fn analyze(
    records: Vec<MembershipRecord>,
    geo: &ReferenceGeoTable,
    aliases: &CityAliasIndex,
    config: &Config,
    input: Option<String>,
) -> (RunReport, Vec<EnrichedRecord>) {
    let engine = DataQualityEngine::with_threshold(config.unresolved_warning_rate)
        .with_sample_size(config.top_unresolved);

    let mut quality = engine.check_reference(geo, aliases);

    let resolver = ProvinceResolver::new(aliases, geo);
    let aggregator = TerritorialAggregator::new(geo);

    let (enriched, resolution) = aggregator.enrich(&resolver, records);
    info!(
        resolved = resolution.resolved_records,
        unresolved = resolution.unresolved_records,
        distinct = resolution.distinct_cities,
        "Resolution pass complete"
    );
    for tier in resolution.by_tier.iter() {
        debug!(tier = tier.0.as_str(), records = *tier.1, "resolved by tier");
    }
    for city in resolution.top_unresolved(config.top_unresolved) {
        debug!(city = %city.city, occurrences = city.occurrences, "unresolved city");
    }

    let summary = aggregator.aggregate(&enriched);
    quality.extend(engine.check_run(&resolution, &summary.diagnostics));
    log_issues(&quality);

    let report = RunReport {
        run_id: uuid::Uuid::new_v4().to_string(),
        generated_at: Utc::now(),
        input,
        resolution_fingerprint: resolution_fingerprint(&enriched),
        resolution,
        summary,
        quality,
    };

    (report, enriched)
}

/// SHA-256 over the resolved province column, in record order
///
/// Two runs over the same input and alias table produce the same value.
pub fn resolution_fingerprint(records: &[EnrichedRecord]) -> String {
    let mut hasher = Sha256::new();
    for r in records {
        hasher.update(r.province.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

fn log_issues(quality: &QualityReport) {
    for issue in &quality.issues {
        match issue.severity {
            Severity::Critical | Severity::Warning => {
                warn!(subject = %issue.subject, "{}", issue.issue)
            }
            Severity::Info => debug!(subject = %issue.subject, "{}", issue.issue),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn record(member_id: &str, year: i32, city: &str) -> MembershipRecord {
        MembershipRecord::new(member_id, year, Some(city))
    }

    #[test]
    fn test_analyze_scenario() {
        let geo = ReferenceGeoTable::italy();
        let aliases = CityAliasIndex::with_defaults();
        let records = vec![
            record("A", 2025, "MILANO"),
            record("B", 2025, "roma"),
            record("C", 2025, "Nonexistent"),
        ];

        let (report, enriched) = analyze(records, &geo, &aliases, &Config::default(), None);

        assert_eq!(enriched[0].province.as_deref(), Some("Milano"));
        assert_eq!(enriched[1].province.as_deref(), Some("Roma"));
        assert_eq!(enriched[2].province, None);
        assert_eq!(report.resolution.unresolved_records, 1);
        assert_eq!(report.summary.provinces.len(), 2);
        assert_eq!(report.resolution_fingerprint.len(), 64);
        // 1 of 3 unresolved is above the default threshold
        assert_eq!(report.quality.count(Severity::Warning), 1);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let geo = ReferenceGeoTable::italy();
        let aliases = CityAliasIndex::with_defaults();
        let records = vec![record("A", 2025, "MILANO"), record("B", 2025, "atlantide")];

        let (first, _) = analyze(records.clone(), &geo, &aliases, &Config::default(), None);
        let (second, _) = analyze(records, &geo, &aliases, &Config::default(), None);

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.resolution_fingerprint, second.resolution_fingerprint);
    }

    #[test]
    fn test_fingerprint_tracks_resolution() {
        let resolved = vec![EnrichedRecord {
            record: record("A", 2025, "X"),
            province: Some("Milano".to_string()),
            metropolitan: Some(true),
        }];
        let unresolved = vec![EnrichedRecord {
            province: None,
            metropolitan: None,
            ..resolved[0].clone()
        }];

        assert_ne!(
            resolution_fingerprint(&resolved),
            resolution_fingerprint(&unresolved)
        );
    }

    #[test]
    fn test_run_requires_input() {
        let err = run(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("No input file configured"));
    }

    #[test]
    fn test_alias_file_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.csv");
        fs::write(&path, "city,province\nMACONDO,Modena\n").unwrap();

        let config = Config {
            alias_file: Some(path),
            ..Config::default()
        };
        let aliases = build_alias_index(&config).unwrap();

        assert_eq!(aliases.lookup("MACONDO"), Some("Modena"));
    }

    #[test]
    fn test_run_writes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("members.csv");
        fs::write(
            &input,
            "member_id,year,city,region,competitions,points\n\
             A,2025,MILANO,LOM,3,10\n\
             B,2025,roma,LAZ,1,2\n\
             C,2025,Nonexistent,,,\n",
        )
        .unwrap();

        let config = Config {
            input: Some(input),
            output_dir: dir.path().join("out"),
            database: Some(dir.path().join("territory.db")),
            ..Config::default()
        };

        let first = run(&config).unwrap();
        assert_eq!(first.written.len(), 7);
        assert_eq!(first.persisted.unwrap().inserted, 3);

        let second = run(&config).unwrap();
        assert_eq!(second.persisted.unwrap().refreshed, 3);
        assert_eq!(
            first.report.resolution_fingerprint,
            second.report.resolution_fingerprint
        );

        let conn = db::open_database(config.database.as_ref().unwrap()).unwrap();
        assert_eq!(db::count_members(&conn).unwrap(), 3);
        assert_eq!(db::get_runs(&conn).unwrap().len(), 2);
    }
}
