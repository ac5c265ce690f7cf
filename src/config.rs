use std::time::Duration;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::cli::{ParseMode, ReconcileArgs, ServiceArgs};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_IDENTIFIER_COLUMN: &str = "patient id";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TEXT_LIMIT: usize = 3800;
pub const DEFAULT_REFERENCE_SAMPLE_ROWS: usize = 20;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const TEMPERATURE: f32 = 0.0;

/// Connection settings for the comparison service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn from_args(args: &ServiceArgs, timeout_secs: u64) -> Result<Self> {
        let api_key = args
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(ToOwned::to_owned);

        let Some(api_key) = api_key else {
            bail!("API key not found: pass --api-key or set OPENAI_API_KEY");
        };

        if timeout_secs == 0 {
            bail!("--timeout-secs must be greater than zero");
        }

        Ok(Self {
            api_key,
            api_base: args.api_base.trim_end_matches('/').to_string(),
            model: args.model.clone(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Everything a batch run needs, resolved once at the command edge.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileConfig {
    pub identifier_column: String,
    #[serde(serialize_with = "serialize_parse_mode")]
    pub parse_mode: ParseMode,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub text_limit: usize,
    pub reference_sample_rows: usize,
    pub max_file_size: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            identifier_column: DEFAULT_IDENTIFIER_COLUMN.to_string(),
            parse_mode: ParseMode::FreeText,
            model: DEFAULT_MODEL.to_string(),
            temperature: TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            text_limit: DEFAULT_TEXT_LIMIT,
            reference_sample_rows: DEFAULT_REFERENCE_SAMPLE_ROWS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl ReconcileConfig {
    pub fn from_args(args: &ReconcileArgs) -> Result<Self> {
        if args.text_limit == 0 {
            bail!("--text-limit must be greater than zero");
        }
        if args.max_tokens == 0 {
            bail!("--max-tokens must be greater than zero");
        }
        if args.identifier_column.trim().is_empty() {
            bail!("--identifier-column must not be empty");
        }

        Ok(Self {
            identifier_column: args.identifier_column.clone(),
            parse_mode: args.parse_mode,
            model: args.service.model.clone(),
            temperature: TEMPERATURE,
            max_tokens: args.max_tokens,
            text_limit: args.text_limit,
            reference_sample_rows: args.reference_sample_rows,
            max_file_size: args.max_file_size,
        })
    }
}

fn serialize_parse_mode<S>(mode: &ParseMode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(mode.as_str())
}
