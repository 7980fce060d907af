use std::env;
use std::net::SocketAddr;

use anyhow::Context;

pub const DEFAULT_LOG_FILTER: &str = "ems_rs=debug,tower_http=info";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub rust_log: String,
    pub templates_dir: String,
    pub static_dir: String,
    pub session_expiry_hours: i64,
    pub seed_demo_data: bool,
}

impl Config {
    /// Reads `.env` when present, then the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let bind_addr = var_or("BIND_ADDR", "0.0.0.0:3000")
            .parse()
            .context("BIND_ADDR should be a socket address")?;
        let session_expiry_hours = var_or("SESSION_EXPIRY_HOURS", "24")
            .parse()
            .context("SESSION_EXPIRY_HOURS should be a whole number of hours")?;
        let seed_demo_data = parse_flag(&var_or("SEED_DEMO_DATA", "true"))
            .context("SEED_DEMO_DATA should be true or false")?;

        Ok(Self {
            bind_addr,
            rust_log: var_or("RUST_LOG", DEFAULT_LOG_FILTER),
            templates_dir: var_or("TEMPLATES_DIR", "templates"),
            static_dir: var_or("STATIC_DIR", "static"),
            session_expiry_hours,
            seed_demo_data,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
