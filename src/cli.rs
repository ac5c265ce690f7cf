use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{
    DEFAULT_API_BASE, DEFAULT_IDENTIFIER_COLUMN, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL, DEFAULT_REFERENCE_SAMPLE_ROWS, DEFAULT_TEXT_LIMIT, DEFAULT_TIMEOUT_SECS,
};

#[derive(Parser, Debug)]
#[command(
    name = "pdfrecon",
    version,
    about = "Reconcile PDF documents against spreadsheet master data"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare every document against its reference record and write reports.
    Reconcile(ReconcileArgs),
    /// Inventory documents: hashes, page counts, identifiers, reference matches.
    Scan(ScanArgs),
    /// Verify the comparison service API key.
    CheckKey(CheckKeyArgs),
    /// Summarize the most recent reconcile run manifest.
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    #[arg(long)]
    pub reference: PathBuf,

    #[arg(long)]
    pub documents: Option<PathBuf>,

    /// Additional document files, processed after the --documents directory.
    pub files: Vec<PathBuf>,

    #[arg(long, default_value = "outputs")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_IDENTIFIER_COLUMN)]
    pub identifier_column: String,

    #[arg(long, value_enum, default_value_t = ParseMode::FreeText)]
    pub parse_mode: ParseMode,

    #[command(flatten)]
    pub service: ServiceArgs,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    #[arg(long, default_value_t = DEFAULT_TEXT_LIMIT)]
    pub text_limit: usize,

    #[arg(long, default_value_t = DEFAULT_REFERENCE_SAMPLE_ROWS)]
    pub reference_sample_rows: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ParseMode {
    FreeText,
    Structured,
}

impl ParseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FreeText => "free-text",
            Self::Structured => "structured",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[arg(long)]
    pub documents: PathBuf,

    #[arg(long)]
    pub reference: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_IDENTIFIER_COLUMN)]
    pub identifier_column: String,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckKeyArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "outputs")]
    pub output_dir: PathBuf,
}
