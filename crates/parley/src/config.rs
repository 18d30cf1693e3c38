//! Loading [`SessionConfig`] from the process environment.
//!
//! | Variable                    | Field              | Default      |
//! |-----------------------------|--------------------|--------------|
//! | `PARLEY_BASE_URL`           | `base_url`         | local origin |
//! | `PARLEY_DEFAULT_IDENTITY`   | `default_identity` | `guest`      |
//! | `PARLEY_TOKEN_TIMEOUT_SECS` | `token_timeout`    | none         |
//!
//! Empty values count as unset.

use std::time::Duration;

use parley_session::SessionConfig;

use crate::ParleyError;

pub const BASE_URL_VAR: &str = "PARLEY_BASE_URL";
pub const DEFAULT_IDENTITY_VAR: &str = "PARLEY_DEFAULT_IDENTITY";
pub const TOKEN_TIMEOUT_VAR: &str = "PARLEY_TOKEN_TIMEOUT_SECS";

/// Builds a [`SessionConfig`] from the `PARLEY_*` environment variables.
///
/// # Errors
/// Returns [`ParleyError::Config`] if the timeout isn't a whole number of
/// seconds.
pub fn from_env() -> Result<SessionConfig, ParleyError> {
    from_lookup(|name| std::env::var(name).ok())
}

/// Builds a [`SessionConfig`] from an arbitrary variable source.
pub fn from_lookup<L>(lookup: L) -> Result<SessionConfig, ParleyError>
where
    L: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let mut config = SessionConfig::default();

    if let Some(base_url) = var(BASE_URL_VAR) {
        config = config.with_base_url(base_url);
    }
    if let Some(identity) = var(DEFAULT_IDENTITY_VAR) {
        config = config.with_default_identity(identity);
    }
    if let Some(raw) = var(TOKEN_TIMEOUT_VAR) {
        let secs: u64 = raw.trim().parse().map_err(|_| {
            ParleyError::Config(format!(
                "{TOKEN_TIMEOUT_VAR} must be a whole number of seconds, got {raw:?}"
            ))
        })?;
        config = config.with_token_timeout(Duration::from_secs(secs));
    }

    tracing::debug!(
        base_url = ?config.base_url,
        default_identity = %config.default_identity,
        "loaded session config"
    );
    Ok(config)
}
