//! Payment gateway decision point.
//!
//! The real processor integration is out of scope; what the workflow needs
//! is a pluggable outcome decision for a pending payment. Production wires
//! in the random simulation, tests wire in a fixed outcome.

use async_trait::async_trait;
use domain::Payment;
use rand::Rng;

/// Gateway verdict for a pending payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Approved,
    Declined,
}

/// Decides the fate of pending payments.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the outcome for the given payment attempt.
    async fn authorize(&self, payment: &Payment) -> Outcome;
}

/// Simulated gateway: approves with a configurable probability.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    approval_rate: f64,
}

impl SimulatedGateway {
    /// Creates a gateway approving with probability `approval_rate`,
    /// clamped to `[0, 1]`.
    pub fn new(approval_rate: f64) -> Self {
        Self {
            approval_rate: approval_rate.clamp(0.0, 1.0),
        }
    }
}

impl Default for SimulatedGateway {
    /// Approves roughly four out of five attempts.
    fn default() -> Self {
        Self::new(0.8)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(&self, _payment: &Payment) -> Outcome {
        if rand::thread_rng().gen_bool(self.approval_rate) {
            Outcome::Approved
        } else {
            Outcome::Declined
        }
    }
}

/// Deterministic gateway for tests and rehearsals.
#[derive(Debug, Clone, Copy)]
pub struct FixedGateway(pub Outcome);

impl FixedGateway {
    pub fn approving() -> Self {
        Self(Outcome::Approved)
    }

    pub fn declining() -> Self {
        Self(Outcome::Declined)
    }
}

#[async_trait]
impl PaymentGateway for FixedGateway {
    async fn authorize(&self, _payment: &Payment) -> Outcome {
        self.0
    }
}
