use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub dm_requires_friendship: bool,
    pub admin: Option<AdminSeed>,
}

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup, so tests can avoid touching the
    /// process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("KSB_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("KSB_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let host = get("KSB_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("KSB_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("KSB_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path: PathBuf = get("KSB_DB_PATH").unwrap_or_else(|| "ksb.db".into()).into();

        let token_ttl_days: i64 = get("KSB_TOKEN_TTL_DAYS")
            .map(|v| v.parse::<i64>().context("KSB_TOKEN_TTL_DAYS must be an integer"))
            .transpose()?
            .unwrap_or(30);
        if token_ttl_days <= 0 {
            bail!("KSB_TOKEN_TTL_DAYS must be positive");
        }

        let dm_requires_friendship = get("KSB_DM_REQUIRES_FRIENDSHIP")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let admin = match (get("KSB_ADMIN_USERNAME"), get("KSB_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) if !username.is_empty() => {
                if password.len() < 8 {
                    bail!("KSB_ADMIN_PASSWORD must be at least 8 characters");
                }
                Some(AdminSeed { username, password })
            }
            (Some(_), None) => bail!("KSB_ADMIN_USERNAME is set but KSB_ADMIN_PASSWORD is not"),
            _ => None,
        };

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            token_ttl_days,
            dm_requires_friendship,
            admin,
        })
    }
}
