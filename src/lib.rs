// Territorial Penetration - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod aggregator;
pub mod config;
pub mod data_quality;
pub mod db;
pub mod error;
pub mod geo;
pub mod pipeline;
pub mod records;
pub mod report;

// Re-export commonly used types
pub use aggregator::{
    penetration_rate, AggregationDiagnostics, MemberConflict, MetroBucket, MetroComparison,
    ProvinceSummary, ProvinceTrendRow, RegionSummary, TerritorialAggregator, TerritorialSummary,
};
pub use config::Config;
pub use data_quality::{DataQualityEngine, QualityIssue, QualityReport, Severity};
pub use db::{
    get_events_for_entity, get_runs, insert_enriched_records, insert_event, insert_run,
    open_database, persist_run, setup_database, Event, PersistStats, RunRecord,
};
pub use error::InputError;
pub use geo::{
    CityAlias, CityAliasIndex, Province, ProvinceResolver, Region, Resolution, ResolutionReport,
    ResolutionTier, ReferenceGeoTable, UnresolvedCity,
};
pub use pipeline::{analyze, run, RunOutcome};
pub use records::{
    load_records, read_records, ColumnMap, EnrichedRecord, InputFormat, MembershipRecord,
};
pub use report::{write_outputs, RunReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
