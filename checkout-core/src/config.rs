//! Configuration for the checkout core

use crate::pix::{PIX_KEY_MAX, TXID_MAX};
use serde::{Deserialize, Serialize};

/// Checkout configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulated settlement configuration
    pub settlement: SettlementConfig,

    /// PIX payload configuration
    pub pix: PixConfig,

    /// Session actor configuration
    pub session: SessionConfig,
}

/// Simulated settlement configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Card processing delay (milliseconds)
    pub card_latency_ms: u64,

    /// PIX confirmation delay (milliseconds)
    pub pix_latency_ms: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            card_latency_ms: 2500,
            pix_latency_ms: 0,
        }
    }
}

/// PIX payload configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixConfig {
    /// Receiver PIX key (e-mail, phone, CPF/CNPJ or random key), at most 77 chars
    pub key: String,

    /// Merchant name (truncated to 25 chars)
    pub merchant_name: String,

    /// Merchant city (truncated to 15 chars)
    pub merchant_city: String,

    /// Transaction id (up to 25 alphanumerics); `None` encodes `***`
    pub txid: Option<String>,

    /// External QR rendering service
    pub qr_service_url: String,

    /// How long the "copied" flag stays set (milliseconds)
    pub copy_feedback_ms: u64,
}

impl Default for PixConfig {
    fn default() -> Self {
        Self {
            key: "aivanalabs@pagamentos.com.br".to_string(),
            merchant_name: "Aivana Labs".to_string(),
            merchant_city: "Sao Paulo".to_string(),
            txid: None,
            qr_service_url: "https://api.qrserver.com/v1/create-qr-code/".to_string(),
            copy_feedback_ms: 2000,
        }
    }
}

/// Session actor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Mailbox capacity (pending intents)
    pub mailbox_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 64,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(ms) = std::env::var("CHECKOUT_CARD_LATENCY_MS") {
            config.settlement.card_latency_ms = parse_ms("CHECKOUT_CARD_LATENCY_MS", &ms)?;
        }

        if let Ok(ms) = std::env::var("CHECKOUT_PIX_LATENCY_MS") {
            config.settlement.pix_latency_ms = parse_ms("CHECKOUT_PIX_LATENCY_MS", &ms)?;
        }

        if let Ok(key) = std::env::var("CHECKOUT_PIX_KEY") {
            config.pix.key = key;
        }

        if let Ok(name) = std::env::var("CHECKOUT_PIX_MERCHANT_NAME") {
            config.pix.merchant_name = name;
        }

        if let Ok(city) = std::env::var("CHECKOUT_PIX_MERCHANT_CITY") {
            config.pix.merchant_city = city;
        }

        if let Ok(txid) = std::env::var("CHECKOUT_PIX_TXID") {
            config.pix.txid = Some(txid);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values the session relies on
    pub fn validate(&self) -> crate::Result<()> {
        if self.session.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "session.mailbox_capacity must be at least 1".to_string(),
            ));
        }
        if self.pix.key.trim().is_empty() {
            return Err(crate::Error::Config("pix.key must not be empty".to_string()));
        }
        if self.pix.key.chars().count() > PIX_KEY_MAX {
            return Err(crate::Error::Config(format!(
                "pix.key must be at most {} characters",
                PIX_KEY_MAX
            )));
        }
        if let Some(txid) = &self.pix.txid {
            if txid.is_empty()
                || txid.chars().count() > TXID_MAX
                || !txid.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return Err(crate::Error::Config(format!(
                    "pix.txid must be 1 to {} letters or digits",
                    TXID_MAX
                )));
            }
        }
        Ok(())
    }
}

fn parse_ms(var: &str, value: &str) -> crate::Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("{} must be milliseconds: {}", var, e)))
}
