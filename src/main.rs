use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use territorial_penetration::{
    pipeline, CityAliasIndex, Config, DataQualityEngine, ProvinceResolver, ReferenceGeoTable,
    Severity,
};

#[derive(Parser, Debug)]
#[command(name = "territorial-penetration")]
#[command(about = "Province/region penetration of a membership table")]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true, env = "TERRITORY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve, aggregate and write the territorial summaries
    Run {
        /// Membership table
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// SQLite database for enriched records and the run log
        #[arg(long)]
        db: Option<PathBuf>,

        /// Extra aliases, `city,province` CSV
        #[arg(long)]
        aliases: Option<PathBuf>,
    },

    /// Resolve city names to provinces
    Resolve {
        #[arg(required = true)]
        cities: Vec<String>,

        /// Extra aliases, `city,province` CSV
        #[arg(long)]
        aliases: Option<PathBuf>,
    },

    /// Print the province reference table
    Reference {
        /// Run the consistency checks; exit non-zero on a critical issue
        #[arg(long)]
        check: bool,
    },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "territorial_penetration=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            input,
            output_dir,
            db,
            aliases,
        } => {
            if input.is_some() {
                config.input = input;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if db.is_some() {
                config.database = db;
            }
            if aliases.is_some() {
                config.alias_file = aliases;
            }
            run(&config)
        }
        Command::Resolve { cities, aliases } => {
            if aliases.is_some() {
                config.alias_file = aliases;
            }
            resolve(&config, &cities)
        }
        Command::Reference { check } => reference(&config, check),
    }
}

fn run(config: &Config) -> Result<ExitCode> {
    println!("🗺️  Territorial penetration run");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let outcome = pipeline::run(config)?;
    let report = &outcome.report;

    println!("\n🔎 {}", report.resolution.summary());
    for city in report.resolution.top_unresolved(config.top_unresolved) {
        println!("   {:<30} {}", city.city, city.occurrences);
    }

    println!("\n📊 {}", report.quality.summary());
    for issue in &report.quality.issues {
        if issue.severity != Severity::Info {
            println!("   [{:?}] {}: {}", issue.severity, issue.subject, issue.issue);
        }
    }

    println!("\n📂 Output:");
    for path in &outcome.written {
        println!("   {}", path.display());
    }

    if let Some(stats) = outcome.persisted {
        println!(
            "\n💾 Database: {} inserted, {} refreshed ({} reassigned)",
            stats.inserted, stats.refreshed, stats.reassigned
        );
    }

    println!("\n✅ {}", report.headline());
    Ok(ExitCode::SUCCESS)
}

fn resolve(config: &Config, cities: &[String]) -> Result<ExitCode> {
    let geo = ReferenceGeoTable::italy();
    let aliases = pipeline::build_alias_index(config)?;
    let resolver = ProvinceResolver::new(&aliases, &geo);

    for city in cities {
        match resolver.resolve_detailed(Some(city.as_str())) {
            Some(r) => println!("{}\t{}\t{}", city, r.province, r.tier.as_str()),
            None => println!("{}\tunresolved", city),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn reference(config: &Config, check: bool) -> Result<ExitCode> {
    let geo = ReferenceGeoTable::italy();

    if !check {
        println!("province\tregion\tpopulation\tmetropolitan");
        for p in geo.provinces() {
            println!(
                "{}\t{}\t{}\t{}",
                p.name, p.region_code, p.population, p.is_metropolitan
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let aliases: CityAliasIndex = pipeline::build_alias_index(config)?;
    let report = DataQualityEngine::new().check_reference(&geo, &aliases);

    println!(
        "🔍 {} provinces, {} regions, {} aliases",
        geo.province_count(),
        geo.regions().count(),
        aliases.len()
    );
    for issue in &report.issues {
        println!(
            "   [{:?}] {}: {} ({})",
            issue.severity, issue.subject, issue.issue, issue.recommendation
        );
    }
    println!("{}", report.summary());

    if report.has_critical_issues() {
        println!("❌ Reference tables are inconsistent");
        Ok(ExitCode::FAILURE)
    } else {
        println!("✅ Reference tables are consistent");
        Ok(ExitCode::SUCCESS)
    }
}
