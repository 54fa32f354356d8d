// CLI module - command-line argument parsing
//
// Subcommands cover the import/analysis flow, the two filtered views,
// and the same config management helpers as other tools of this shape:
// - config --show: Display effective configuration
// - config --reset: Regenerate config file with defaults
// - config --path: Show config file path

use crate::config::VERSION;
use crate::filters::Connector;
use clap::{Parser, Subcommand, ValueEnum};

/// lookbook - terminal client for the outfit-analysis service
#[derive(Parser)]
#[command(name = "lookbook")]
#[command(version = VERSION)]
#[command(about = "Import image boards and browse AI-detected outfits", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a board from its public URL and watch the analysis
    Import {
        /// Public URL of the source board
        url: String,

        /// Optional display name for the board
        #[arg(long)]
        name: Option<String>,
    },

    /// (Re-)analyze an existing board and watch progress
    Analyze {
        /// Board id
        board_id: String,
    },

    /// List imported boards
    Boards,

    /// Delete a board and its analysis results
    Delete {
        /// Board id
        board_id: String,
    },

    /// Show a board's outfits, filterable by season and style
    Outfits {
        /// Board id
        board_id: String,

        /// Filter by season (repeatable, OR-combined)
        #[arg(long = "season")]
        seasons: Vec<String>,

        /// Filter by style (repeatable, OR-combined)
        #[arg(long = "style")]
        styles: Vec<String>,
    },

    /// Show a board's garment trends with filtered drill-down
    Trends {
        /// Board id
        board_id: String,

        /// Filter by garment name (repeatable, ordered)
        #[arg(long = "garment")]
        garments: Vec<String>,

        /// Connector between adjacent garments (repeatable; defaults to or)
        #[arg(long = "connector", value_enum)]
        connectors: Vec<ConnectorArg>,

        /// Set every connector to AND
        #[arg(long, conflicts_with = "connectors")]
        all_and: bool,

        /// Filter by garment color (repeatable, OR-combined)
        #[arg(long = "color")]
        colors: Vec<String>,
    },

    /// Show one outfit with its detected garments
    Outfit {
        /// Outfit id
        outfit_id: String,
    },

    /// Show one garment's details
    Garment {
        /// Garment id
        garment_id: String,
    },

    /// Show similar products for a garment
    Products {
        /// Garment id
        garment_id: String,

        /// Run a fresh similar-product search instead of listing saved ones
        #[arg(long)]
        search: bool,
    },

    /// Store or clear the session token
    Token {
        /// Token value to store
        value: Option<String>,

        /// Remove the stored token
        #[arg(long, conflicts_with = "value")]
        clear: bool,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// CLI-facing connector spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConnectorArg {
    Or,
    And,
}

impl From<ConnectorArg> for Connector {
    fn from(arg: ConnectorArg) -> Self {
        match arg {
            ConnectorArg::Or => Connector::Or,
            ConnectorArg::And => Connector::And,
        }
    }
}
