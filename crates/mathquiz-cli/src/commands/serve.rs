//! The `mathquiz serve` command.

use std::path::PathBuf;

use anyhow::Result;

use mathquiz_providers::config::load_config_from;
use mathquiz_server::AppState;

pub async fn execute(bind: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(bind) = bind {
        config.bind = bind;
    }
    config.validate()?;

    let state = AppState::from_config(&config).await?;
    mathquiz_server::serve(state, &config.bind).await
}
