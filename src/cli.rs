use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Overrides the PORT environment variable
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Generate recipes for a user once and print them as JSON
    Generate {
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Run a receipt image through OCR and merge the items into a user's pantry
    Receipt {
        #[arg(short, long)]
        image: PathBuf,
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Merge a `name,quantity` CSV file into a user's pantry
    ImportPantry {
        #[arg(short, long)]
        csv: PathBuf,
        #[arg(short, long)]
        user: Option<String>,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
