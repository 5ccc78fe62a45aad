use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "compat-scrape",
    version,
    about = "Browser compatibility extraction from MDN feature pages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Scrape(ScrapeArgs),
    InitDb(InitDbArgs),
    ImportPage(ImportPageArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScrapeArgs {
    #[arg(long)]
    pub page: PathBuf,

    #[arg(long, default_value_t = 0)]
    pub feature_id: i64,

    #[arg(long)]
    pub feature_slug: String,

    #[arg(long)]
    pub canonical: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub report: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report_format: ReportFormat,

    #[arg(long, default_value = "en")]
    pub locale: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Html,
}

#[derive(Args, Debug, Clone)]
pub struct InitDbArgs {
    #[arg(long, default_value = ".cache/compat-scrape/store.sqlite")]
    pub db: PathBuf,

    #[arg(long)]
    pub canonical: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ImportPageArgs {
    #[arg(long, default_value = ".cache/compat-scrape/store.sqlite")]
    pub db: PathBuf,

    #[arg(long)]
    pub page_id: i64,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/compat-scrape/store.sqlite")]
    pub db: PathBuf,
}
