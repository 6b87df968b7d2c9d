//! Signature gate applied to every telemetry sample before it is stored.
//!
//! Signature verification itself is external; the station only consumes a
//! pass/fail verdict.

use crate::telemetry::TelemetrySample;

pub trait SignatureGate: Send + Sync {
    fn verify(&self, sample: &TelemetrySample) -> bool;
}

/// Accepts every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SignatureGate for AcceptAll {
    fn verify(&self, _sample: &TelemetrySample) -> bool {
        true
    }
}

/// Rejects samples that carry no signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireSignature;

impl SignatureGate for RequireSignature {
    fn verify(&self, sample: &TelemetrySample) -> bool {
        sample.signature.as_deref().is_some_and(|s| !s.is_empty())
    }
}

impl<F> SignatureGate for F
where
    F: Fn(&TelemetrySample) -> bool + Send + Sync,
{
    fn verify(&self, sample: &TelemetrySample) -> bool {
        self(sample)
    }
}
