//! Where the user secret comes from.

use std::io::{self, BufRead};

use clap::Args;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("no secret given: use --password-env VAR or --password-stdin")]
    Missing,
    #[error("environment variable {0} is not set")]
    UnsetVariable(String),
    #[error("secret is empty")]
    Empty,
    #[error("failed to read secret: {0}")]
    Io(#[from] io::Error),
}

/// Secrets are never taken as flag values, so they stay out of shell history
/// and process listings.
#[derive(Args, Debug, Clone)]
pub struct SecretSource {
    /// Read the secret from this environment variable
    #[arg(long, value_name = "VAR", conflicts_with = "password_stdin")]
    pub password_env: Option<String>,
    /// Read the secret from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

impl SecretSource {
    pub fn uses_stdin(&self) -> bool {
        self.password_stdin
    }

    pub fn read(&self) -> Result<Zeroizing<Vec<u8>>, SecretError> {
        let secret = if let Some(var) = &self.password_env {
            let value = std::env::var(var).map_err(|_| SecretError::UnsetVariable(var.clone()))?;
            Zeroizing::new(value.into_bytes())
        } else if self.password_stdin {
            let mut line = Zeroizing::new(String::new());
            io::stdin().lock().read_line(&mut line)?;
            let trimmed = line.trim_end_matches(['\r', '\n']);
            Zeroizing::new(trimmed.as_bytes().to_vec())
        } else {
            return Err(SecretError::Missing);
        };
        if secret.is_empty() {
            return Err(SecretError::Empty);
        }
        Ok(secret)
    }
}
