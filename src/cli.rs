//! CLI argument parsing, validation, and startup helpers.

use crate::{DEFAULT_SHUTDOWN_TIMEOUT, ServerConfig};
use std::time::Duration;
use crate::claims::Claims;
use crate::session::{
    DEFAULT_ACCESS_EXPIRY_SECS, DEFAULT_REFRESH_EXPIRY_SECS, RefreshConfig, SessionConfig,
    SessionManager,
};
use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};

const MIN_SECRET_LENGTH: usize = 32;

pub const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
pub const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokengate",
    about = "Signed session tokens with refresh for HTTP services"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Path to file containing the access token secret. Prefer the ACCESS_TOKEN_SECRET env var
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_EXPIRY", default_value_t = DEFAULT_ACCESS_EXPIRY_SECS)]
    pub access_expiry: i64,

    /// Path to file containing the refresh token secret. Refresh is disabled when no secret is given
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Refresh token (and cookie) lifetime in seconds
    #[arg(long, env = "REFRESH_TOKEN_EXPIRY", default_value_t = DEFAULT_REFRESH_EXPIRY_SECS)]
    pub refresh_expiry: i64,

    /// Set the Secure flag on the refresh cookie (use behind HTTPS)
    #[arg(long, env = "SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Seconds in-flight requests get to finish after SIGINT/SIGTERM
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = DEFAULT_SHUTDOWN_TIMEOUT.as_secs())]
    pub shutdown_timeout: u64,

    /// Print an access token carrying these claims and exit. Repeatable
    #[arg(long = "issue", value_name = "KEY=VALUE", value_parser = parse_claim)]
    pub issue: Vec<(String, String)>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn parse_claim(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Claim must be KEY=VALUE: {}", s))?;
    if key.is_empty() {
        return Err(format!("Claim name must not be empty: {}", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Errors while loading secrets at startup.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("{env} is required. Set the environment variable (recommended) or use {flag}")]
    Missing {
        env: &'static str,
        flag: &'static str,
    },
    #[error("failed to read secret file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{env} is shorter than {min} characters. Use a longer secret")]
    TooShort { env: &'static str, min: usize },
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a secret from `env_var`, falling back to `file`.
/// Returns `Ok(None)` when neither is set.
pub fn load_secret(
    env_var: &'static str,
    file: Option<&str>,
) -> Result<Option<String>, SecretError> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = file {
        std::fs::read_to_string(path)
            .map_err(|source| SecretError::Read {
                path: path.to_string(),
                source,
            })?
            .trim()
            .to_string()
    } else {
        return Ok(None);
    };

    if secret.len() < MIN_SECRET_LENGTH {
        return Err(SecretError::TooShort {
            env: env_var,
            min: MIN_SECRET_LENGTH,
        });
    }

    Ok(Some(secret))
}

/// Load the access secret (required) and the refresh secret (optional).
/// Logs and returns None if either cannot be loaded.
pub fn load_secrets(args: &Args) -> Option<(String, Option<String>)> {
    let access = match load_secret(ACCESS_SECRET_ENV, args.access_secret_file.as_deref()) {
        Ok(Some(secret)) => secret,
        Ok(None) => {
            error!(
                "{}",
                SecretError::Missing {
                    env: ACCESS_SECRET_ENV,
                    flag: "--access-secret-file",
                }
            );
            return None;
        }
        Err(e) => {
            error!(error = %e, "Failed to load access token secret");
            return None;
        }
    };

    let refresh = match load_secret(REFRESH_SECRET_ENV, args.refresh_secret_file.as_deref()) {
        Ok(secret) => secret,
        Err(e) => {
            error!(error = %e, "Failed to load refresh token secret");
            return None;
        }
    };

    Some((access, refresh))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    access_secret: String,
    refresh_secret: Option<String>,
) -> ServerConfig {
    let mut session = SessionConfig::new(access_secret).with_access_expiry(args.access_expiry);

    match refresh_secret {
        Some(secret) => {
            session = session.with_refresh(
                RefreshConfig::new(secret)
                    .with_expiry(args.refresh_expiry)
                    .with_secure_cookie(args.secure_cookies),
            );
            info!(
                access_expiry = args.access_expiry,
                refresh_expiry = args.refresh_expiry,
                secure_cookies = args.secure_cookies,
                "Refresh tokens enabled"
            );
        }
        None => info!(
            access_expiry = args.access_expiry,
            "Refresh tokens disabled, no refresh secret configured"
        ),
    }

    if session.shares_secret() {
        warn!("Access and refresh tokens share a secret. Use a different secret for each");
    }

    ServerConfig {
        session,
        shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
    }
}

/// Handle the --issue flag: print an access token for the given claims.
/// Exits the process on failure.
pub fn handle_issue(config: &ServerConfig, claims: Vec<(String, String)>) {
    let session = SessionManager::new(config.session.clone());
    let claims: Claims = claims.into_iter().collect();

    match session.issue_access_only(&claims) {
        Ok(token) => println!("{}", token),
        Err(e) => {
            error!(error = %e, "Failed to issue token");
            std::process::exit(1);
        }
    }
}
