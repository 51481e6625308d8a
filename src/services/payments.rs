use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{config::AppConfig, errors::ServiceError};

/// Terminal result of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved,
    Declined,
}

/// External payment processor abstraction.
///
/// This is the checkout pipeline's one genuinely asynchronous boundary.
/// Implementations perform a single attempt with no internal retry;
/// callers own any retry policy and the timeout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn process_payment(
        &self,
        amount_cents: i64,
        user_id: Uuid,
    ) -> Result<PaymentOutcome, ServiceError>;
}

/// Simulated gateway standing in for a real payment network.
///
/// Sleeps for the configured latency, then resolves as one Bernoulli
/// trial: approved with the configured probability, declined otherwise,
/// independent per call.
pub struct SimulatedGateway {
    latency: Duration,
    approval_rate: f64,
}

impl SimulatedGateway {
    pub fn new(latency: Duration, approval_rate: f64) -> Self {
        Self {
            latency,
            approval_rate: approval_rate.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Duration::from_millis(config.payment_latency_ms),
            config.payment_approval_rate,
        )
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    #[instrument(skip(self))]
    async fn process_payment(
        &self,
        amount_cents: i64,
        user_id: Uuid,
    ) -> Result<PaymentOutcome, ServiceError> {
        tokio::time::sleep(self.latency).await;

        let approved = rand::thread_rng().gen_bool(self.approval_rate);
        let outcome = if approved {
            PaymentOutcome::Approved
        } else {
            PaymentOutcome::Declined
        };

        info!(amount_cents, ?outcome, "Simulated payment resolved");
        Ok(outcome)
    }
}
