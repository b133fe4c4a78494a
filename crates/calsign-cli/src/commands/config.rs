//! Configuration commands.

use std::path::Path;

use crate::config::SignConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret::SecretRef;

const REDACTED: &str = "<redacted>";

/// Dump the effective configuration, loaded from `path`, to stdout.
pub fn dump(config: &SignConfig, path: &Path) -> ClientResult<()> {
    println!("{}", render_dump(config, path)?);
    Ok(())
}

/// The dump text. Inline credentials are replaced by a placeholder;
/// `env::` and `pass::` references are shown since they hold no secret.
pub fn render_dump(config: &SignConfig, path: &Path) -> ClientResult<String> {
    let mut shown = config.clone();
    for value in [
        &mut shown.calendar.access_token,
        &mut shown.calendar.api_key,
        &mut shown.calendar.client_secret,
    ] {
        if let Some(v) = value
            && matches!(SecretRef::parse(v), SecretRef::Plain(_))
        {
            *v = REDACTED.to_string();
        }
    }

    let toml_str = toml::to_string_pretty(&shown)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    Ok(format!("# config.toml ({})\n{}", path.display(), toml_str))
}

/// Validate the configuration.
pub fn validate(config: &SignConfig) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;

    // Make sure secret references point somewhere
    for (field, value) in [
        ("access_token", &config.calendar.access_token),
        ("api_key", &config.calendar.api_key),
        ("client_secret", &config.calendar.client_secret),
    ] {
        if let Some(value) = value {
            crate::secret::resolve(value).map_err(|e| {
                ClientError::Config(format!("invalid [calendar] {}: {}", field, e))
            })?;
        }
    }

    if let Some(token_file) = &config.calendar.token_file
        && !token_file.exists()
    {
        return Err(ClientError::Config(format!(
            "[calendar] token_file {} does not exist",
            token_file.display()
        )));
    }

    if config.device.port.is_none() {
        println!("No [device] port set; only --debug and --test will work.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ClientResult<()> {
    println!("config: {}", SignConfig::default_path().display());
    Ok(())
}
