use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use imgfolio_engine::{EngineConfig, FetchSettings, DEFAULT_CORS_PROXY, DEFAULT_PDF_NAME};
use imgfolio_logging::LogDestination;

/// Collect the images of a web page and save a selection of them as a PDF.
#[derive(Debug, Parser)]
#[command(name = "imgfolio", version, about)]
pub struct Args {
    /// Page to fetch on startup.
    pub url: Option<String>,

    /// Directory the PDF is written to.
    #[arg(long, short = 'o', default_value = ".")]
    pub output_dir: PathBuf,

    /// Name of the generated PDF.
    #[arg(long, default_value = DEFAULT_PDF_NAME)]
    pub file_name: String,

    /// CORS proxy prefix the encoded page URL is appended to.
    #[arg(long, default_value = DEFAULT_CORS_PROXY, conflicts_with = "no_proxy")]
    pub proxy: String,

    /// Fetch pages directly instead of through the proxy.
    #[arg(long)]
    pub no_proxy: bool,

    /// Route image downloads through the proxy too.
    #[arg(long)]
    pub proxy_images: bool,

    /// Select these 1-based gallery positions, save the PDF and exit.
    #[arg(long, value_delimiter = ',', requires = "url")]
    pub select: Option<Vec<usize>>,

    /// Select every image, save the PDF and exit.
    #[arg(long, requires = "url", conflicts_with = "select")]
    pub all: bool,

    /// Where log output goes.
    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,

    /// Log file used by `--log file` and `--log both`.
    #[arg(long, default_value = "imgfolio.log")]
    pub log_file: PathBuf,

    /// Log debug details.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

/// What the run should do once the startup page is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Interactive,
    Batch(BatchSelection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSelection {
    All,
    Indexes(Vec<usize>),
}

impl Args {
    pub fn run_mode(&self) -> RunMode {
        if self.all {
            RunMode::Batch(BatchSelection::All)
        } else if let Some(indexes) = &self.select {
            RunMode::Batch(BatchSelection::Indexes(indexes.clone()))
        } else {
            RunMode::Interactive
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default_with_output(self.output_dir.clone());
        config.fetch = if self.no_proxy {
            FetchSettings::direct()
        } else {
            FetchSettings {
                proxy_prefix: Some(self.proxy.clone()),
                ..FetchSettings::default()
            }
        };
        config.images.via_proxy = self.proxy_images && !self.no_proxy;
        config.file_name = self.file_name.clone();
        config
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}
