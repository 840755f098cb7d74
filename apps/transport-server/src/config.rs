//! Server configuration from the environment

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use crypto_session::TransportConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub transport: TransportConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; unset keys keep their defaults,
    /// unparseable values are errors
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut transport = TransportConfig::default();

        if let Some(value) = get("PQ_KEM_ALGORITHM") {
            transport.kem_algorithm = value.parse().context("PQ_KEM_ALGORITHM")?;
        }
        if let Some(value) = get("PQ_AEAD_ALGORITHM") {
            transport.aead_algorithm = value.parse().context("PQ_AEAD_ALGORITHM")?;
        }
        if let Some(value) = get("PQ_KDF_CONTEXT") {
            transport.kdf_context = value;
        }
        if let Some(value) = get("PQ_SESSION_TTL_SECS") {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("PQ_SESSION_TTL_SECS: `{value}` is not a number"))?;
            // 0 disables expiry
            transport.session_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(value) = get("PQ_PLAINTEXT_POLICY") {
            transport.plaintext_policy = value.parse().context("PQ_PLAINTEXT_POLICY")?;
        }
        if let Some(value) = get("PQ_REQUIRE_KEY_CONFIRMATION") {
            transport.require_key_confirmation = parse_flag(&value)
                .with_context(|| format!("PQ_REQUIRE_KEY_CONFIRMATION: `{value}`"))?;
        }

        let bind_addr = get("PQ_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("PQ_BIND_ADDR: `{bind_addr}` is not a socket address"))?;

        Ok(Self {
            bind_addr,
            transport,
        })
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("expected a boolean"),
    }
}
