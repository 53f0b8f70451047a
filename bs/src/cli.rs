//! CLI argument parsing for bs

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bs")]
#[command(author, version, about = "Persisted fixed-width bit-string arrays", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the JSON store file (overrides config)
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub shape: ShapeArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Array shape; unset fields come from the persisted config, then the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ShapeArgs {
    /// Bits per encoded character (1-8)
    #[arg(long, global = true)]
    pub chunk_size: Option<u8>,

    /// Number of items
    #[arg(long, global = true)]
    pub length: Option<usize>,

    /// Bits per item
    #[arg(long, global = true)]
    pub item_size: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a config file from defaults, --store and the shape flags
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print one item
    Get {
        /// Array id
        #[arg(required = true)]
        id: String,

        /// Item index
        #[arg(required = true)]
        index: usize,
    },

    /// Overwrite one item
    Set {
        /// Array id
        #[arg(required = true)]
        id: String,

        /// Item index
        #[arg(required = true)]
        index: usize,

        /// Binary value, exactly item-size digits
        #[arg(required = true)]
        value: String,
    },

    /// Print every item, one per line
    All {
        /// Array id
        #[arg(required = true)]
        id: String,
    },

    /// Count items equal to a value
    Count {
        /// Array id
        #[arg(required = true)]
        id: String,

        /// Binary value to count
        #[arg(required = true)]
        value: String,
    },

    /// Fill the array with random bits
    Randomize {
        /// Array id
        #[arg(required = true)]
        id: String,
    },

    /// Zero the array
    Reset {
        /// Array id
        #[arg(required = true)]
        id: String,
    },

    /// Show configuration and persisted form of an array
    Inspect {
        /// Array id
        #[arg(required = true)]
        id: String,
    },

    /// Encode a binary string to persisted text
    Encode {
        /// Binary digits
        #[arg(required = true)]
        binary: String,
    },

    /// Decode persisted text to a binary string
    Decode {
        /// Persisted text, overflow digit first
        #[arg(required = true)]
        text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        let cli = Cli::parse_from(["bs", "set", "demo", "2", "11", "--item-size", "2"]);
        assert_eq!(cli.shape.item_size, Some(2));
        match cli.command {
            Command::Set { id, index, value } => {
                assert_eq!(id, "demo");
                assert_eq!(index, 2);
                assert_eq!(value, "11");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_init() {
        let cli = Cli::parse_from(["bs", "init", "--force", "--length", "5"]);
        assert_eq!(cli.shape.length, Some(5));
        assert!(matches!(cli.command, Command::Init { force: true }));
    }

    #[test]
    fn test_rejects_negative_index() {
        assert!(Cli::try_parse_from(["bs", "get", "demo", "-1"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
