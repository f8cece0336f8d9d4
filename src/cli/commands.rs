//! CLI definition using clap

use clap::{Parser, ValueEnum};

use crate::session::{parse_tokens, Token};

/// Build C and C++ projects described by proj.bscf files.
///
/// Commands run left to right: clean (c), softclean (sc), build (b),
/// buildcache (bc), gnu, clang, msvc, echo (e), noecho (ne), force (f),
/// noforce (nf). Any other word builds the target of that name.
#[derive(Parser, Debug)]
#[command(name = "bscf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file path (overrides default XDG paths)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format for the build report
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Project directory containing proj.bscf
    #[arg(default_value = ".")]
    pub project: String,

    /// Commands and target names, applied in order (default: build)
    pub commands: Vec<String>,
}

impl Cli {
    pub fn tokens(&self) -> Vec<Token> {
        parse_tokens(&self.commands)
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON output
    Json,
    /// Plain text (one target per line)
    Plain,
}
