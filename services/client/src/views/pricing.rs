//! services/client/src/views/pricing.rs
//!
//! The premium upgrade flow: start a hosted checkout, then verify the
//! returned session and pick up the new premium flag.

use std::sync::Arc;

use life_lessons_core::access::{resolve_access, AccessDecision, RouteRequirement};
use life_lessons_core::domain::{CheckoutSession, PaymentVerification, User};
use life_lessons_core::ports::{PortError, PortResult};
use life_lessons_core::validation::ValidationErrors;
use tracing::{info, warn};

use super::state::AppContext;
use crate::cache::{keys, Mutation};

pub struct PricingView {
    ctx: Arc<AppContext>,
    checkout: Mutation<(), CheckoutSession>,
    verify: Mutation<String, PaymentVerification>,
}

impl PricingView {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let checkout = {
            let run_ctx = Arc::clone(&ctx);
            let check_ctx = Arc::clone(&ctx);
            Mutation::new("create-checkout-session", ctx.cache.clone(), move |()| {
                let ctx = Arc::clone(&run_ctx);
                async move {
                    let services = ctx.session.services()?;
                    services.payments.create_checkout_session().await
                }
            })
            .validate_with(move |_| {
                let mut errors = ValidationErrors::default();
                if check_ctx.viewer().is_premium {
                    errors.push("plan", "You are already a premium member");
                }
                errors.into_result()
            })
        };

        let verify = {
            let run_ctx = Arc::clone(&ctx);
            Mutation::new("verify-session", ctx.cache.clone(), move |session_id: String| {
                let ctx = Arc::clone(&run_ctx);
                async move {
                    let services = ctx.session.services()?;
                    services.payments.verify_session(&session_id).await
                }
            })
            .validate_with(|session_id: &String| {
                let mut errors = ValidationErrors::default();
                if session_id.trim().is_empty() {
                    errors.push("sessionId", "Missing checkout session id");
                }
                errors.into_result()
            })
            .invalidates(|_| vec![keys::current_user()])
        };

        Self {
            ctx,
            checkout,
            verify,
        }
    }

    pub fn access(&self) -> AccessDecision {
        resolve_access(&self.ctx.viewer(), RouteRequirement::Authenticated)
    }

    pub fn is_premium(&self) -> bool {
        self.ctx.viewer().is_premium
    }

    /// Starts a checkout. The caller sends the user to the returned URL.
    pub async fn start_checkout(&self) -> PortResult<CheckoutSession> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        let session = self.checkout.mutate(()).await?;
        info!(session_id = %session.id, "checkout session created");
        Ok(session)
    }

    /// Confirms a completed checkout and returns the refreshed user.
    pub async fn confirm(&self, session_id: &str) -> PortResult<User> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        let verification = self.verify.mutate(session_id.trim().to_string()).await?;
        if !verification.paid {
            warn!(session_id, "checkout session not paid");
            return Err(PortError::Client {
                status: 402,
                message: "Payment was not completed".to_string(),
            });
        }
        let user = self.ctx.refresh_user().await?;
        info!(user_id = %user.id, premium = user.is_premium, "payment verified");
        Ok(user)
    }
}
