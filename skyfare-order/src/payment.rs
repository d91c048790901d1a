use async_trait::async_trait;
use rand::Rng;
use skyfare_core::{ChargeRequest, PaymentError, PaymentOracle, PaymentOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Wraps the payment oracle with a deadline and turns declines into errors.
pub struct PaymentOrchestrator {
    oracle: Arc<dyn PaymentOracle>,
    timeout: Duration,
}

impl PaymentOrchestrator {
    pub fn new(oracle: Arc<dyn PaymentOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Charges `request`. Returns the provider reference on approval.
    pub async fn charge(&self, request: &ChargeRequest) -> Result<String, PaymentError> {
        let outcome = tokio::time::timeout(self.timeout, self.oracle.charge(request))
            .await
            .map_err(|_| PaymentError::Timeout(self.timeout.as_millis() as u64))??;

        if !outcome.approved {
            warn!(
                "Payment declined for flight {} ({} {})",
                request.flight_id, request.amount, request.currency
            );
            return Err(PaymentError::Declined(outcome.reference));
        }

        info!("Payment approved: {}", outcome.reference);
        Ok(outcome.reference)
    }
}

/// Stand-in provider that approves a configurable share of charges.
pub struct SimulatedPaymentOracle {
    approval_rate: f64,
}

impl SimulatedPaymentOracle {
    pub fn new(approval_rate: f64) -> Self {
        Self {
            approval_rate: approval_rate.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl PaymentOracle for SimulatedPaymentOracle {
    async fn charge(&self, request: &ChargeRequest) -> Result<PaymentOutcome, PaymentError> {
        if request.amount.is_sign_negative() || request.amount.is_zero() {
            return Err(PaymentError::Provider(format!(
                "refusing to charge {}",
                request.amount
            )));
        }
        let reference = format!("sim_{}", Uuid::new_v4().simple());
        let approved = rand::thread_rng().gen_bool(self.approval_rate);
        Ok(PaymentOutcome {
            approved,
            reference,
        })
    }
}
