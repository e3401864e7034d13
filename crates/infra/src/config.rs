//! Process configuration read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

use portal_core::PortalUid;

use crate::promotion::ConflictPolicy;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be set when {when} is")]
    Missing { var: &'static str, when: &'static str },
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Push gateway that notifications are posted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    pub endpoint: String,
    pub credential: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `None` runs on the in-memory stores.
    pub database: Option<DatabaseConfig>,
    pub conflict_policy: ConflictPolicy,
    pub super_admins: Vec<PortalUid>,
    /// `None` leaves notifications unconfigured; every send then fails.
    pub push: Option<PushConfig>,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("PORTAL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| invalid("PORTAL_BIND_ADDR", &bind_raw, e))?;

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let use_persistent = match lookup("USE_PERSISTENT_STORES") {
            Some(raw) => raw
                .trim()
                .parse::<bool>()
                .map_err(|e| invalid("USE_PERSISTENT_STORES", &raw, e))?,
            None => false,
        };

        let database = if use_persistent {
            let url = lookup("DATABASE_URL").ok_or(ConfigError::Missing {
                var: "DATABASE_URL",
                when: "USE_PERSISTENT_STORES",
            })?;
            let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
                Some(raw) => match raw.trim().parse::<u32>() {
                    Ok(0) => return Err(invalid("DATABASE_MAX_CONNECTIONS", &raw, "must be at least 1")),
                    Ok(n) => n,
                    Err(e) => return Err(invalid("DATABASE_MAX_CONNECTIONS", &raw, e)),
                },
                None => 5,
            };
            Some(DatabaseConfig { url, max_connections })
        } else {
            None
        };

        let conflict_policy = match lookup("PORTAL_APPROVAL_CONFLICT") {
            Some(raw) => raw
                .parse::<ConflictPolicy>()
                .map_err(|e| invalid("PORTAL_APPROVAL_CONFLICT", &raw, e))?,
            None => ConflictPolicy::default(),
        };

        let super_admins = match lookup("PORTAL_SUPER_ADMINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| PortalUid::parse(s).map_err(|e| invalid("PORTAL_SUPER_ADMINS", &raw, e)))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let push = match lookup("PORTAL_PUSH_URL").filter(|s| !s.trim().is_empty()) {
            Some(endpoint) => {
                let credential = lookup("PORTAL_PUSH_TOKEN")
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::Missing {
                        var: "PORTAL_PUSH_TOKEN",
                        when: "PORTAL_PUSH_URL",
                    })?;
                Some(PushConfig { endpoint, credential })
            }
            None => None,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            database,
            conflict_policy,
            super_admins,
            push,
        })
    }
}
