use crate::ai::BackendKind;
use crate::config;
use crate::error::Result;
use colored::Colorize;
use std::path::Path;

/// Store `key` for `backend` and make that backend the default.
pub fn handle_auth(backend: &str, key: &str, config_path: Option<&Path>) -> Result<()> {
    let kind: BackendKind = backend.parse()?;
    let key = key.trim();
    if key.is_empty() {
        return Err(crate::ai::AiError::NotConfigured(kind).into());
    }

    let mut cfg = config::load_config(config_path)?;
    cfg.ai.set_api_key(kind, key.to_string());
    cfg.ai.backend = kind;
    let path = config::save_config(&cfg, config_path)?;

    println!(
        "{} {} key saved to {}",
        "✓".green(),
        kind,
        path.display()
    );
    Ok(())
}
