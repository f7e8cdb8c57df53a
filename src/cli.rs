//! CLI definition and dispatch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::abicom::{AbicomCalendar, AbicomSeries};
use crate::adapters::anfavea::{AnfaveaCalendar, AnfaveaSeries};
use crate::adapters::bcb::{BcbCalendar, SgsSeries};
use crate::adapters::csv_log_store::CsvLogStore;
use crate::adapters::fgv::{FgvCalendar, FgvSeries};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::http::HttpClient;
use crate::adapters::ibge::{IbgeCalendar, SidraSeries};
use crate::adapters::publisher::FilePublisher;
use crate::adapters::render::Renderer;
use crate::adapters::ssp::{SspCalendar, SspSeries};
use crate::domain::catalog::Catalog;
use crate::domain::error::MacropostError;
use crate::domain::run::{run_source, RunSummary, SourceRun};
use crate::domain::source::SourceId;
use crate::ports::calendar_port::CalendarPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::series_port::SeriesPort;

const DEFAULT_FGV_SERIES_URL: &str = "https://extra-ibre.fgv.br/IBRE/sitefgvdados/consulta.aspx";

#[derive(Parser, Debug)]
#[command(name = "macropost", about = "Scheduled posting of Brazilian economic data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the posting loop for one source, or all of them
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Restrict the run to a single source
        #[arg(long, value_enum)]
        source: Option<SourceId>,
        /// Override today's date (YYYY-MM-DD); defaults to the local date
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List the indicators configured for a source
    Catalog {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_enum)]
        source: SourceId,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing();
    match cli.command {
        Command::Run {
            config,
            source,
            date,
        } => match run_sources(&config, source, date) {
            Ok(report) => {
                println!("{report}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "run failed");
                eprintln!("error: {e}");
                ExitCode::from(&e)
            }
        },
        Command::Catalog { config, source } => match print_catalog(&config, source) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(&e)
            }
        },
    }
}

fn init_tracing() {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

struct Settings {
    catalog_dir: PathBuf,
    logs_dir: PathBuf,
    out_dir: PathBuf,
    fgv_series_url: String,
    abicom_cache: Option<PathBuf>,
}

impl Settings {
    fn load(config: &dyn ConfigPort) -> Self {
        let dir = |section: &str, key: &str, default: &str| {
            PathBuf::from(
                config
                    .get_string(section, key)
                    .unwrap_or_else(|| default.to_string()),
            )
        };
        Self {
            catalog_dir: dir("catalog", "dir", "data/catalog"),
            logs_dir: dir("logs", "dir", "tweeted-logs"),
            out_dir: dir("output", "dir", "outbox"),
            fgv_series_url: config
                .get_string("fgv", "series_url")
                .unwrap_or_else(|| DEFAULT_FGV_SERIES_URL.to_string()),
            abicom_cache: config.get_string("abicom", "cache").map(PathBuf::from),
        }
    }
}

fn run_sources(
    config_path: &Path,
    source: Option<SourceId>,
    date: Option<NaiveDate>,
) -> Result<String, MacropostError> {
    let config = FileConfigAdapter::from_file(config_path)?;
    let settings = Settings::load(&config);
    let http = HttpClient::new(
        config.get_int("http", "timeout", 10) as u64,
        config.get_int("http", "attempts", 5) as u32,
        config.get_int("http", "delay", 5) as u64,
    )?;
    let today = date.unwrap_or_else(|| chrono::Local::now().date_naive());

    let sources: Vec<SourceId> = match source {
        Some(s) => vec![s],
        None => SourceId::ALL.to_vec(),
    };

    let mut lines = Vec::with_capacity(sources.len());
    for source in sources {
        match source_summary(source, &settings, &http, today) {
            Ok(summary) => lines.push(summary.to_string()),
            Err(e) => {
                // One broken source must not stop the others.
                error!(source = source.as_str(), error = %e, "source run failed");
                lines.push(format!(
                    "{} scheduler: skipped ({e}).",
                    source.display_name()
                ));
            }
        }
    }
    Ok(lines.join("\n"))
}

fn source_summary(
    source: SourceId,
    settings: &Settings,
    http: &HttpClient,
    today: NaiveDate,
) -> Result<RunSummary, MacropostError> {
    let catalog = Catalog::load(&settings.catalog_dir, source)?;
    if catalog.is_empty() {
        warn!(source = source.as_str(), "catalog is empty");
    }
    let mut store = CsvLogStore::open(&settings.logs_dir, source.log_period(), today)?;
    let renderer = Renderer::new(source);
    let publisher = FilePublisher::new(&settings.out_dir);

    let (calendar, series): (Box<dyn CalendarPort + '_>, Box<dyn SeriesPort + '_>) = match source {
        SourceId::Bcb => (
            Box::new(BcbCalendar::new(http)),
            Box::new(SgsSeries::new(http)),
        ),
        SourceId::Ibge => (
            Box::new(IbgeCalendar::new(http)),
            Box::new(SidraSeries::new(http)),
        ),
        SourceId::Fgv => (
            Box::new(FgvCalendar::new(http)),
            Box::new(FgvSeries::new(http, &settings.fgv_series_url)),
        ),
        SourceId::Abicom => (
            Box::new(AbicomCalendar::new(http)),
            Box::new(AbicomSeries::new(http, settings.abicom_cache.clone())),
        ),
        SourceId::Anfavea => (
            Box::new(AnfaveaCalendar::new(http)),
            Box::new(AnfaveaSeries::new(http)),
        ),
        SourceId::Ssp => (Box::new(SspCalendar), Box::new(SspSeries::new(http))),
    };

    let run = SourceRun {
        source,
        catalog: &catalog,
        calendar: calendar.as_ref(),
        series: series.as_ref(),
        renderer: &renderer,
        publisher: &publisher,
    };
    Ok(run_source(&run, &mut store, today))
}

fn print_catalog(config_path: &Path, source: SourceId) -> Result<(), MacropostError> {
    let config = FileConfigAdapter::from_file(config_path)?;
    let settings = Settings::load(&config);
    let catalog = Catalog::load(&settings.catalog_dir, source)?;
    println!("{} indicators:", source.display_name());
    for def in catalog.definitions() {
        println!(
            "  {}: \"{}\" ({} series, {:?}/{:?})",
            def.name,
            def.title,
            def.series_codes.len(),
            def.chart,
            def.text
        );
    }
    Ok(())
}
