use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use storegate_core::config::Profile;

#[derive(Debug, Parser)]
#[command(
    name = "storegate",
    version,
    about = "App Store submission readiness checks for mobile projects"
)]
pub struct Args {
    /// Project root to validate
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Built-in validation profile
    #[arg(long, default_value = "standard")]
    pub profile: ProfileName,

    /// Load the validation profile from a TOML file (overrides --profile)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Log every rule evaluation to stderr
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProfileName {
    Standard,
    Strict,
    Lenient,
}

impl ProfileName {
    pub fn profile(self) -> Profile {
        match self {
            ProfileName::Standard => Profile::standard(),
            ProfileName::Strict => Profile::strict(),
            ProfileName::Lenient => Profile::lenient(),
        }
    }
}
