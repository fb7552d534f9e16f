//! Back-office credential resolution.
//!
//! YAML stores only environment variable NAMES under
//! `/api/credentials_env/{username,password,token}`. Values are read once,
//! here, and carried in [`ResolvedCredentials`], whose `Debug` redacts them.
//! Errors name the variable, never its value.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::{str_at, ConfigMode};

pub const DEFAULT_USERNAME_ENV: &str = "CCR_API_USERNAME";
pub const DEFAULT_PASSWORD_ENV: &str = "CCR_API_PASSWORD";
pub const DEFAULT_TOKEN_ENV: &str = "CCR_API_TOKEN";

#[derive(Clone, Default)]
pub struct ResolvedCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    /// A pre-issued bearer token; skips the login call when present.
    pub token: Option<String>,
}

impl ResolvedCredentials {
    pub fn has_login(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

struct CredentialEnvNames {
    username_var: String,
    password_var: String,
    token_var: String,
}

fn parse_env_names(config_json: &Value) -> CredentialEnvNames {
    CredentialEnvNames {
        username_var: str_at(config_json, "/api/credentials_env/username")
            .unwrap_or_else(|| DEFAULT_USERNAME_ENV.to_string()),
        password_var: str_at(config_json, "/api/credentials_env/password")
            .unwrap_or_else(|| DEFAULT_PASSWORD_ENV.to_string()),
        token_var: str_at(config_json, "/api/credentials_env/token")
            .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string()),
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve credentials from the environment.
///
/// | Mode      | Required                                   |
/// |-----------|--------------------------------------------|
/// | CONNECTED | token, or username and password            |
/// | OFFLINE   | nothing                                    |
pub fn resolve_credentials_for_mode(
    config_json: &Value,
    mode: ConfigMode,
) -> Result<ResolvedCredentials> {
    let names = parse_env_names(config_json);
    let creds = ResolvedCredentials {
        username: resolve_env(&names.username_var),
        password: resolve_env(&names.password_var),
        token: resolve_env(&names.token_var),
    };

    if mode == ConfigMode::Connected && creds.token.is_none() {
        if creds.username.is_none() {
            bail!(
                "SECRETS_MISSING mode=CONNECTED: set env var '{}' (bearer token) \
                 or '{}' and '{}' (login)",
                names.token_var,
                names.username_var,
                names.password_var,
            );
        }
        if creds.password.is_none() {
            bail!(
                "SECRETS_MISSING mode=CONNECTED: required env var '{}' \
                 (password) is not set or empty",
                names.password_var,
            );
        }
    }

    Ok(creds)
}
