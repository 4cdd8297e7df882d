//! Settlement boundary
//!
//! The checkout core hands a [`SettlementRequest`] to a [`SettlementGateway`]
//! and only looks at the success/failure outcome. [`SimulatedGateway`] stands
//! in for a real payment processor: it waits a fixed latency per method and
//! always succeeds.

use crate::config::SettlementConfig;
use crate::types::{PaymentMethod, SettlementRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Whole-form settlement failure
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementError {
    /// Issuer or processor refused the payment
    #[error("payment declined: {0}")]
    Declined(String),

    /// Gateway could not be reached or timed out
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Confirmation returned by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    /// Gateway reference
    pub reference: Uuid,

    /// Method the payment settled with
    pub method: PaymentMethod,

    /// Settlement timestamp
    pub settled_at: DateTime<Utc>,
}

/// Payment gateway abstraction
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    /// Settle a checkout, resolving once the payment is confirmed or refused
    async fn initiate(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementReceipt, SettlementError>;
}

/// Fixed-latency gateway that approves every request
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    card_latency: Duration,
    pix_latency: Duration,
}

impl SimulatedGateway {
    /// Create new simulated gateway
    pub fn new(config: &SettlementConfig) -> Self {
        Self {
            card_latency: Duration::from_millis(config.card_latency_ms),
            pix_latency: Duration::from_millis(config.pix_latency_ms),
        }
    }

    /// Delay applied to a method
    pub fn latency(&self, method: PaymentMethod) -> Duration {
        match method {
            PaymentMethod::Card => self.card_latency,
            PaymentMethod::Pix => self.pix_latency,
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(&SettlementConfig::default())
    }
}

#[async_trait]
impl SettlementGateway for SimulatedGateway {
    async fn initiate(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementReceipt, SettlementError> {
        let latency = self.latency(request.method);
        tracing::debug!(
            "Simulating {} settlement of {} for plan {} ({}ms)",
            request.method,
            request.amount,
            request.plan_id,
            latency.as_millis()
        );

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        Ok(SettlementReceipt {
            reference: Uuid::new_v4(),
            method: request.method,
            settled_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlanId;
    use rust_decimal::Decimal;

    fn request(method: PaymentMethod) -> SettlementRequest {
        SettlementRequest {
            plan_id: PlanId::new("creator"),
            amount: Decimal::new(97, 0),
            method,
            card: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_card_settlement_waits_latency() {
        let gateway = SimulatedGateway::default();
        let start = tokio::time::Instant::now();

        let receipt = gateway.initiate(&request(PaymentMethod::Card)).await.unwrap();

        assert_eq!(receipt.method, PaymentMethod::Card);
        assert!(start.elapsed() >= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pix_settlement_is_immediate() {
        let gateway = SimulatedGateway::default();
        let start = tokio::time::Instant::now();

        let receipt = gateway.initiate(&request(PaymentMethod::Pix)).await.unwrap();

        assert_eq!(receipt.method, PaymentMethod::Pix);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
