use std::path::Path;

use anyhow::Result;

use daylog::config::{self, EnvSource, LoggingConfig};
use daylog::logging;
use daylog::settings::Settings;

fn main() -> Result<()> {
    // Load .env BEFORE reading any settings
    let dotenv_path = config::load_dotenv();

    let logging_config = LoggingConfig::load(Path::new(config::LOGGING_CONFIG_FILE))?;
    let logger = logging::initialize(&logging_config)?;

    if let Some(path) = dotenv_path {
        tracing::info!("Loaded environment from {}", path.display());
    }
    tracing::info!("Logging to: {}", logging_config.log_dir.display());

    let settings = Settings::resolve(&EnvSource, &logger);

    // Never log secret values, only whether they are available
    tracing::info!(
        "OpenAI: {}, MongoDB: {}, Discord: {}",
        availability(settings.openai_key.is_some()),
        availability(settings.db.is_some()),
        availability(settings.discord_token.is_some()),
    );
    match settings.flask_port {
        Some(port) => tracing::info!("Web server port: {}", port),
        None => tracing::warn!("Web server port is not configured"),
    }

    Ok(())
}

fn availability(present: bool) -> &'static str {
    if present {
        "configured"
    } else {
        "missing"
    }
}
