use std::net::SocketAddr;

use anyhow::{Context, Result};
use platform_authz::RbacPermission;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cors_allowed_origins: Vec<String>,
    pub principals: Vec<PrincipalSeed>,
}

/// One entry of the `PRINCIPALS_FILE` fixture.
#[derive(Clone, Debug, Deserialize)]
pub struct PrincipalSeed {
    pub name: String,
    pub token: String,
    #[serde(default)]
    pub basic: Option<BasicCredentials>,
    #[serde(default)]
    pub permissions: Vec<RbacPermission>,
    #[serde(default)]
    pub is_staff: bool,
    /// Names of schedules owned by this principal.
    #[serde(default)]
    pub schedules: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allowed_origins: vec!["http://localhost:3000".into()],
            principals: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.into())
            .parse()
            .context("invalid BIND_ADDR")?;

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let principals = match std::env::var("PRINCIPALS_FILE") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read PRINCIPALS_FILE {path}"))?;
                parse_principals(&raw).with_context(|| format!("invalid PRINCIPALS_FILE {path}"))?
            }
            Err(_) => Vec::new(),
        };

        Ok(Self {
            bind_addr,
            cors_allowed_origins,
            principals,
        })
    }
}

pub fn parse_principals(raw: &str) -> Result<Vec<PrincipalSeed>> {
    serde_json::from_str(raw).context("principals must be a JSON array")
}
