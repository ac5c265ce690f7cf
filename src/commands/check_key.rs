use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::CheckKeyArgs;
use crate::compare::OpenAiService;
use crate::config::ServiceConfig;

pub fn run(args: CheckKeyArgs) -> Result<()> {
    let config = ServiceConfig::from_args(&args.service, args.timeout_secs)?;
    let api_base = config.api_base.clone();
    let model = config.model.clone();

    let service = OpenAiService::new(config)?;
    let models = service
        .list_models()
        .with_context(|| format!("API key check failed against {api_base}"))?;

    info!(api_base = %api_base, models = models.len(), "API key is valid");
    if models.iter().any(|id| *id == model) {
        info!(model = %model, "configured model is available");
    } else {
        warn!(model = %model, "configured model is not listed for this key");
    }

    Ok(())
}
