use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub flight_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub description: String,
}

/// Yes/no answer from the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub approved: bool,
    pub reference: String, // Provider's transaction id
}

impl PaymentOutcome {
    pub fn approved(reference: impl Into<String>) -> Self {
        Self {
            approved: true,
            reference: reference.into(),
        }
    }

    pub fn declined(reference: impl Into<String>) -> Self {
        Self {
            approved: false,
            reference: reference.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Payment provider did not answer within {0} ms")]
    Timeout(u64),

    #[error("Payment provider error: {0}")]
    Provider(String),
}

/// A pluggable payment provider.
#[async_trait]
pub trait PaymentOracle: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<PaymentOutcome, PaymentError>;
}

/// Answers charges from a queue of prepared results, approving once the queue is empty.
#[derive(Debug, Default)]
pub struct ScriptedPaymentOracle {
    script: Mutex<VecDeque<Result<PaymentOutcome, PaymentError>>>,
    charges: Mutex<Vec<ChargeRequest>>,
}

impl ScriptedPaymentOracle {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Result<PaymentOutcome, PaymentError>>,
    {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            charges: Mutex::new(Vec::new()),
        }
    }

    pub fn approving() -> Self {
        Self::default()
    }

    /// Every request seen so far, in call order.
    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.charges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PaymentOracle for ScriptedPaymentOracle {
    async fn charge(&self, request: &ChargeRequest) -> Result<PaymentOutcome, PaymentError> {
        self.charges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.unwrap_or_else(|| Ok(PaymentOutcome::approved(format!("txn_{}", Uuid::new_v4().simple()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> ChargeRequest {
        ChargeRequest {
            flight_id: Uuid::new_v4(),
            amount: dec!(5250.00),
            currency: "INR".to_string(),
            payment_method: "card".to_string(),
            description: "AI101 seat 1A".to_string(),
        }
    }

    #[tokio::test]
    async fn test_scripted_oracle_replays_results() {
        let oracle = ScriptedPaymentOracle::new([
            Ok(PaymentOutcome::declined("txn_declined")),
            Err(PaymentError::Provider("gateway down".to_string())),
        ]);

        let first = oracle.charge(&request()).await.unwrap();
        assert!(!first.approved);
        assert!(oracle.charge(&request()).await.is_err());

        let third = oracle.charge(&request()).await.unwrap();
        assert!(third.approved);
        assert!(third.reference.starts_with("txn_"));
        assert_eq!(oracle.charges().len(), 3);
    }
}
