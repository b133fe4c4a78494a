//! Secret references in configuration values.
//!
//! Credentials in `config.toml` may point elsewhere instead of holding the
//! secret inline:
//!
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - `pass::path/in/store` runs `pass show path/in/store` and takes the first line
//!
//! Anything else is used as-is.
//!
//! [`SecretToken`] resolves a reference again on every fetch, so a token
//! rotated in the environment or password store is picked up without a
//! restart.

use std::process::Command;

/// A parsed configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Env(&'a str),
    Pass(&'a str),
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else {
            Self::Plain(value)
        }
    }

    /// Looks the secret up.
    pub fn resolve(&self) -> Result<String, String> {
        match *self {
            Self::Plain(value) => Ok(value.to_string()),
            Self::Env(var) => {
                std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
            }
            Self::Pass(path) => first_line_of_pass(path),
        }
    }
}

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    SecretRef::parse(value).resolve()
}

/// A bearer token read from a secret reference on every fetch.
#[cfg(feature = "google")]
#[derive(Debug, Clone)]
pub struct SecretToken {
    field: &'static str,
    reference: String,
}

#[cfg(feature = "google")]
impl SecretToken {
    pub fn new(field: &'static str, reference: impl Into<String>) -> Self {
        Self {
            field,
            reference: reference.into(),
        }
    }

    async fn lookup(&self) -> Result<String, calsign_providers::ProviderError> {
        use calsign_providers::ProviderError;

        let reference = self.reference.clone();
        // `pass` is a subprocess, keep it off the runtime threads
        let resolved = tokio::task::spawn_blocking(move || resolve(&reference))
            .await
            .map_err(|e| ProviderError::configuration(format!("secret lookup aborted: {}", e)))?;
        resolved.map_err(|e| {
            ProviderError::authentication(format!("failed to resolve {}: {}", self.field, e))
        })
    }
}

#[cfg(feature = "google")]
impl calsign_providers::google::TokenProvider for SecretToken {
    fn access_token(
        &self,
    ) -> calsign_providers::BoxFuture<'_, calsign_providers::ProviderResult<String>> {
        Box::pin(self.lookup())
    }
}

fn first_line_of_pass(path: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}
