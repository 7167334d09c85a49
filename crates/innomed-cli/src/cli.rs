//! Command-line argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use innomed_stream::ClientConfig;

/// InnoMed - Molecule Innovation Twin discovery client
///
/// Examples:
///   innomed stream --molecule Aspirin --prompt "What is the market outlook?"
///   innomed query --molecule Metformin --prompt "Latest clinical trials?"
///   innomed report --molecule Aspirin --out ./reports
///   innomed mit --molecule Aspirin
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Analysis backend base URL
    #[arg(
        long,
        global = true,
        default_value = "http://localhost:8000",
        env = "INNOMED_BASE_URL"
    )]
    pub base_url: String,

    /// Timeout in seconds for non-streaming requests
    #[arg(long, global = true, default_value = "120", value_name = "SECS")]
    pub timeout: u64,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream an analysis and print results as they arrive
    Stream {
        #[command(flatten)]
        query: QueryArgs,

        /// Print only the final result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the analysis as a single request/response exchange
    Query {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Download the PDF report for a molecule
    Report {
        /// Molecule name
        #[arg(short, long)]
        molecule: String,

        /// Directory the report is written to
        #[arg(short, long, default_value = ".", value_name = "DIR")]
        out: PathBuf,
    },
    /// Print the stored Molecule Innovation Twin for a molecule
    Mit {
        /// Molecule name
        #[arg(short, long)]
        molecule: String,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct QueryArgs {
    /// Molecule name to analyze
    #[arg(short, long)]
    pub molecule: String,

    /// Question about the molecule
    #[arg(short, long)]
    pub prompt: String,
}

impl Args {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
            .request_timeout(Duration::from_secs(self.timeout))
    }
}
