//! services/client/src/adapters/payment.rs
//!
//! The HTTP adapter for the `PaymentService` port. The checkout page itself
//! is hosted by the payment provider; this only creates and verifies sessions.

use async_trait::async_trait;
use life_lessons_core::domain::{CheckoutSession, PaymentVerification};
use life_lessons_core::ports::{PaymentService, PortResult};
use serde_json::json;

use crate::adapters::records::{CheckoutRecord, VerifyRecord};
use crate::adapters::rest::RestClient;

#[derive(Clone, Debug)]
pub struct HttpPaymentAdapter {
    client: RestClient,
}

impl HttpPaymentAdapter {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentService for HttpPaymentAdapter {
    async fn create_checkout_session(&self) -> PortResult<CheckoutSession> {
        let record: CheckoutRecord = self
            .client
            .post_empty("payment/create-checkout-session")
            .await?;
        Ok(record.to_domain())
    }

    async fn verify_session(&self, session_id: &str) -> PortResult<PaymentVerification> {
        let record: VerifyRecord = self
            .client
            .post("payment/verify-session", &json!({ "sessionId": session_id }))
            .await?;
        Ok(record.to_domain(session_id))
    }
}
