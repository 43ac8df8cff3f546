use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "meteo-ingest")]
#[command(about = "Bulk loader for Météo-France hourly observations and station metadata")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file [default: ./meteo-ingest.toml when present]"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Show a progress bar on stderr")]
    pub progress: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load every hourly observation archive whose URL matches a period
    Observations {
        #[arg(short, long, help = "Period selector matched against file URLs (e.g. '2020-2023')")]
        period: Option<String>,

        #[arg(long, help = "Merge rows even when their station is not in the station table")]
        all_stations: bool,
    },

    /// Load the station metadata file
    Stations {
        #[arg(short, long, help = "Station CSV URL [default: POSTES_CSV_URL]")]
        url: Option<String>,

        #[arg(long, help = "Records per transaction")]
        batch_size: Option<usize>,

        #[arg(long, help = "Transactions in flight per wave")]
        max_parallel: Option<usize>,
    },

    /// List the catalog files a run would load, without touching the database
    List {
        #[arg(short, long)]
        period: Option<String>,
    },

    /// Create the station and observation tables when missing
    InitDb,
}
